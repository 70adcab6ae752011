//! Module lifecycle container
//!
//! # Lifecycle
//!
//! ```text
//! main: db, config, logger
//!    ↓
//! Application::new(.., [identity, workout, web])
//!    ↓
//! setup_modules        each module, in order: build stack, register routes,
//!    ↓                 provide capabilities (sibling look-ups not ready)
//! post_setup_modules   each module, in order: resolve sibling capabilities
//!    ↓
//! serve                seal mux, recovery → request log → mux
//!    ↓
//! [SIGINT / SIGTERM]   stop accepting, drain for up to 30s
//!    ↓
//! shutdown_modules     each set-up module, in reverse order
//! ```

mod application;
mod capability;
mod error;
mod healthcheck;
mod middleware;
mod mux;
mod registry;
mod server;
pub mod shutdown;
mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use application::{Application, Shared};
pub use capability::{Capabilities, Deferred};
pub use error::{MonolithError, Result};
pub use healthcheck::{DebugIndex, HealthCheckMessage};
pub use middleware::{
    AppService, RecoverPanic, RecoverPanicLayer, RequestLog, RequestLogLayer, RequestLogger,
    standard_chain,
};
pub use mux::{Mux, RouteDefinition};
pub use registry::{ModuleRegistry, ModuleState, ShutdownReport};
pub use server::ServeOptions;
pub use shutdown::{Termination, TerminationSignals};
pub use traits::{Module, Monolith};
