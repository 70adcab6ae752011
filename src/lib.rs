//! # SmartSplit
//!
//! A workout-planning web application built as a modular monolith.
//!
//! Feature modules (identity, workout, web) are hosted by one
//! [`Application`](monolith::Application) that owns the shared resources:
//! a pooled database handle, the request multiplexer, the configuration, a
//! logger and a registry of capabilities that modules export to each other.
//!
//! ## Lifecycle
//!
//! 1. **setup**: each module, in registration order, builds its own stack
//!    and registers routes. Sibling capabilities are not resolvable yet.
//! 2. **post-setup**: modules resolve sibling capabilities.
//! 3. **serve**: the mux is sealed and wrapped in the standard middleware
//!    chain (request logging, panic recovery) and served until SIGINT or
//!    SIGTERM, followed by a bounded drain of in-flight requests.
//! 4. **shutdown**: modules are stopped in reverse registration order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smartsplit::prelude::*;
//! use smartsplit::modules::{IdentityModule, WebModule, WorkoutModule};
//!
//! # async fn run(db: sea_orm::DatabaseConnection, config: Config) -> smartsplit::Result<()> {
//! let modules: Vec<Box<dyn Module>> = vec![
//!     Box::new(IdentityModule::new()),
//!     Box::new(WorkoutModule::new()),
//!     Box::new(WebModule::new()),
//! ];
//! let mut app = Application::new(db, config, smartsplit::logging::instance_span(), modules)?;
//!
//! app.setup_modules().await?;
//! app.post_setup_modules().await?;
//! app.serve().await?;
//! app.shutdown_modules().await;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod config;
pub mod error;
pub mod logging;
pub mod modules;
pub mod monolith;

pub use common::ApiResponse;
pub use error::{Error, Result};

/// Prelude module for convenient imports
///
/// ```
/// use smartsplit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::common::{ApiResponse, FormFields, JsonBody, PathId, StatusCode};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::monolith::{
        Application, Capabilities, Deferred, Module, Monolith, MonolithError, Mux,
        RequestLogger, RouteDefinition, ServeOptions,
    };
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
