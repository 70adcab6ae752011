//! The application container
//!
//! Owns the shared resources and the ordered module registry, and runs the
//! lifecycle: setup → post-setup → serve → shutdown.

use super::healthcheck;
use super::middleware::{AppService, standard_chain};
use super::registry::{ModuleRegistry, ModuleState, ShutdownReport};
use super::server::{self, ServeOptions};
use super::shutdown::{self, TerminationSignals};
use super::{Capabilities, Module, Monolith, MonolithError, Mux};
use crate::common::{ApiResponse, StatusCode};
use crate::config::Config;
use sea_orm::DatabaseConnection;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::Span;

/// Owner of the database handle, mux, logger, config and capabilities.
///
/// Modules only ever see this through `&dyn Monolith`.
pub struct Shared {
    db: DatabaseConnection,
    mux: Mux,
    logger: Span,
    config: Config,
    capabilities: Capabilities,
    started_at: Instant,
}

impl Shared {
    pub fn new(db: DatabaseConnection, config: Config, logger: Span) -> Self {
        Self {
            db,
            mux: Mux::new(),
            logger,
            config,
            capabilities: Capabilities::new(),
            started_at: Instant::now(),
        }
    }
}

impl Monolith for Shared {
    fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    fn logger(&self) -> &Span {
        &self.logger
    }

    fn mux(&self) -> &Mux {
        &self.mux
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

/// The process-wide container.
///
/// # Example
///
/// ```rust,ignore
/// let mut app = Application::new(db, config, logger, vec![
///     Box::new(IdentityModule::new()),
///     Box::new(WorkoutModule::new()),
///     Box::new(WebModule::new()),
/// ])?;
///
/// app.setup_modules().await?;
/// app.post_setup_modules().await?;
/// let served = app.serve().await;
/// app.shutdown_modules().await;
/// served?;
/// ```
pub struct Application {
    shared: Shared,
    modules: ModuleRegistry,
}

impl Application {
    /// Build the container. `modules` is the registration order, which is
    /// also the dependency order.
    pub fn new(
        db: DatabaseConnection,
        config: Config,
        logger: Span,
        modules: Vec<Box<dyn Module>>,
    ) -> Result<Self, MonolithError> {
        let mut registry = ModuleRegistry::new();
        for module in modules {
            registry.register(module)?;
        }

        Ok(Self {
            shared: Shared::new(db, config, logger),
            modules: registry,
        })
    }

    /// The facade handed to modules
    pub fn monolith(&self) -> &dyn Monolith {
        &self.shared
    }

    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.names()
    }

    pub fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.modules.state_of(name)
    }

    /// Set up every module in registration order, stopping at the first
    /// failure and returning its error unchanged.
    ///
    /// Sibling capabilities become resolvable only once every module
    /// succeeded.
    pub async fn setup_modules(&mut self) -> crate::Result<()> {
        tracing::info!(parent: &self.shared.logger, modules = self.modules.len(), "running setup");
        self.modules
            .setup_all(&self.shared, &self.shared.logger)
            .await?;
        self.shared.capabilities.mark_ready();
        Ok(())
    }

    /// Run post-setup on every module. Fails unless setup completed for all
    /// of them.
    pub async fn post_setup_modules(&mut self) -> crate::Result<()> {
        tracing::info!(parent: &self.shared.logger, "running post-setup");
        self.modules
            .post_setup_all(&self.shared, &self.shared.logger)
            .await
    }

    /// Shut down, in reverse order, every module that completed setup.
    /// Never fails; module errors are logged.
    pub async fn shutdown_modules(&mut self) -> ShutdownReport {
        tracing::info!(parent: &self.shared.logger, "running shutdown");
        self.modules.shutdown_all(&self.shared.logger).await
    }

    /// Register the container's own routes, seal the mux and wrap it in the
    /// middleware chain.
    ///
    /// Only valid once every module completed post-setup, and only once.
    pub fn handler(&self) -> crate::Result<AppService> {
        for name in self.modules.names() {
            let state = self.modules.state_of(name);
            if state != Some(ModuleState::PostSetupComplete) {
                return Err(MonolithError::phase(
                    "serve",
                    format!("module '{name}' has not completed post-setup"),
                )
                .into());
            }
        }

        tracing::debug!(parent: &self.shared.logger, "adding healthcheck and debug routes");
        self.shared.mux.handle_all(
            "monolith",
            healthcheck::routes(self.shared.config.app.env, self.shared.started_at)?,
        )?;

        let router = self.shared.mux.seal()?.fallback(not_found);
        Ok(standard_chain(router, &self.shared.logger))
    }

    /// Serve on `0.0.0.0:{app.port}` until SIGINT or SIGTERM, then drain.
    pub async fn serve(&self) -> crate::Result<()> {
        let signals = TerminationSignals::install()?;

        let addr = SocketAddr::from(([0, 0, 0, 0], self.shared.config.app.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| MonolithError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        let handoff = signals.spawn(self.shared.logger.clone());
        self.serve_with(listener, ServeOptions::default(), shutdown::wait_for(handoff))
            .await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// Returns `Ok(())` after a clean drain and the drain timeout error when
    /// connections outlive [`ServeOptions::drain_timeout`].
    pub async fn serve_with<F>(
        &self,
        listener: TcpListener,
        options: ServeOptions,
        shutdown: F,
    ) -> crate::Result<()>
    where
        F: Future<Output = ()>,
    {
        let logger = &self.shared.logger;
        let service = self.handler()?;
        let addr = listener.local_addr().map_err(MonolithError::Listener)?;

        tracing::info!(
            parent: logger,
            addr = %addr,
            env = %self.shared.config.app.env,
            "starting server"
        );
        server::run(listener, service, options, shutdown, logger).await?;
        tracing::info!(parent: logger, addr = %addr, "stopped server");
        Ok(())
    }
}

async fn not_found() -> ApiResponse<()> {
    ApiResponse::error(
        StatusCode::NotFound,
        "the requested resource could not be found",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monolith::test_support::{RouteModule, TestModule, Trace, mock_db};
    use axum::body::Body;
    use axum::http::{Request, StatusCode as HttpStatusCode};
    use tower::ServiceExt;

    fn app(modules: Vec<Box<dyn Module>>) -> Application {
        Application::new(mock_db(), Config::default(), Span::none(), modules).unwrap()
    }

    #[tokio::test]
    async fn test_capabilities_unavailable_during_setup() {
        let trace = Trace::default();
        let mut app = app(vec![
            Box::new(TestModule::new("provider", &trace).providing(7)),
            Box::new(TestModule::new("consumer", &trace).resolving_during_setup()),
        ]);

        app.setup_modules().await.unwrap();
        app.post_setup_modules().await.unwrap();

        let events = trace.events();
        assert!(events.contains(&"resolve:consumer:not-ready".to_string()));
        assert!(events.contains(&"post:consumer:7".to_string()));
    }

    #[tokio::test]
    async fn test_handler_requires_post_setup() {
        let trace = Trace::default();
        let mut app = app(vec![Box::new(TestModule::new("a", &trace))]);
        app.setup_modules().await.unwrap();

        assert!(matches!(
            app.handler(),
            Err(crate::Error::Monolith(MonolithError::PhaseOrder { .. }))
        ));
        assert!(!app.monolith().mux().is_sealed());
    }

    #[tokio::test]
    async fn test_handler_serves_module_routes_and_healthcheck() {
        let trace = Trace::default();
        let mut app = app(vec![Box::new(RouteModule::new("a", "/a", &trace))]);
        app.setup_modules().await.unwrap();
        app.post_setup_modules().await.unwrap();

        let service = app.handler().unwrap();
        for (path, expected) in [
            ("/a", HttpStatusCode::OK),
            ("/api/v1/healthcheck", HttpStatusCode::OK),
            ("/nowhere", HttpStatusCode::NOT_FOUND),
        ] {
            let response = service
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), expected, "{path}");
        }

        // The mux is sealed once the handler exists.
        assert!(app.handler().is_err());
    }
}
