//! Module contract and monolith facade
//!
//! These traits are the only surface a feature module sees of the
//! application that hosts it.

use super::{Capabilities, Mux};
use crate::config::Config;
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::Span;

/// Read-only view of the shared resources owned by the [`Application`].
///
/// A module receives a `&dyn Monolith` during [`Module::setup`] and
/// [`Module::post_setup`]. Nothing reachable from here can run a lifecycle
/// phase, so a module cannot re-trigger orchestration.
///
/// [`Application`]: super::Application
pub trait Monolith: Send + Sync {
    /// The shared, internally pooled database handle
    fn db(&self) -> &DatabaseConnection;

    /// The application logger; modules derive their own child span from it
    fn logger(&self) -> &Span;

    /// The shared request multiplexer
    fn mux(&self) -> &Mux;

    /// The loaded configuration
    fn config(&self) -> &Config;

    /// Capabilities exported by sibling modules
    fn capabilities(&self) -> &Capabilities;
}

/// A feature module hosted by the monolith
///
/// # Lifecycle
///
/// ```text
/// Uninitialized ── setup ──▶ SetupComplete ── post_setup ──▶ PostSetupComplete
///        │                        │                                │
///        │                        └──────────── shutdown ──────────┴──▶ ShutdownComplete
///        └── (setup failed: never shut down)
/// ```
///
/// # Example
///
/// ```rust,ignore
/// #[async_trait]
/// impl Module for WorkoutModule {
///     fn name(&self) -> &'static str {
///         "workout"
///     }
///
///     async fn setup(&mut self, mono: &dyn Monolith) -> Result<()> {
///         let service = Arc::new(WorkoutService::new(repository, self.logger.clone()));
///         mono.capabilities().provide::<dyn WorkoutClient>(self.name(), service.clone())?;
///         mono.mux().handle_all(self.name(), handlers.routes())?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Module: Send + Sync {
    /// Stable module name, used for logging and route ownership
    fn name(&self) -> &'static str;

    /// Build the module's own stack from shared resources and register its
    /// routes.
    ///
    /// Must not call into sibling modules: there is no guarantee that they
    /// have finished their own setup. Capability look-ups fail with
    /// [`MonolithError::CapabilityNotReady`](super::MonolithError::CapabilityNotReady)
    /// during this phase. Any error aborts application startup.
    async fn setup(&mut self, mono: &dyn Monolith) -> crate::Result<()>;

    /// Resolve sibling capabilities once every module completed setup.
    ///
    /// Fail fast when a dependency is absent.
    async fn post_setup(&mut self, _mono: &dyn Monolith) -> crate::Result<()> {
        Ok(())
    }

    /// Release module-owned resources.
    ///
    /// Errors are logged by the container and never stop the shutdown of
    /// the remaining modules.
    async fn shutdown(&mut self) -> crate::Result<()> {
        Ok(())
    }
}
