//! Identity module: user accounts stored in `identity.user`

pub mod handler;
pub mod model;
pub mod repository;
pub mod service;

pub use handler::UserHandlers;
pub use model::{CreateUser, UpdateUser, User};
pub use repository::{PgUserRepository, UserRepository};
pub use service::UserService;

use crate::logging::module_span;
use crate::monolith::{Module, Monolith};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::Span;

pub struct IdentityModule {
    repository: Option<Arc<dyn UserRepository>>,
    logger: Span,
}

impl IdentityModule {
    pub fn new() -> Self {
        Self {
            repository: None,
            logger: Span::none(),
        }
    }

    pub fn with_repository(repository: Arc<dyn UserRepository>) -> Self {
        Self {
            repository: Some(repository),
            logger: Span::none(),
        }
    }
}

impl Default for IdentityModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for IdentityModule {
    fn name(&self) -> &'static str {
        "identity"
    }

    async fn setup(&mut self, mono: &dyn Monolith) -> crate::Result<()> {
        self.logger = module_span(mono.logger(), self.name());

        tracing::info!(parent: &self.logger, "injecting database connection pool");
        let repository = match &self.repository {
            Some(repository) => Arc::clone(repository),
            None => Arc::new(PgUserRepository::new(mono.db().clone())),
        };
        let handlers = UserHandlers::new(Arc::new(UserService::new(
            repository,
            self.logger.clone(),
        )));

        tracing::info!(parent: &self.logger, "registering routes");
        mono.mux().handle_all(self.name(), handlers.routes()?)?;
        Ok(())
    }

    async fn post_setup(&mut self, _mono: &dyn Monolith) -> crate::Result<()> {
        tracing::info!(parent: &self.logger, "performing post setup process");
        Ok(())
    }
}
