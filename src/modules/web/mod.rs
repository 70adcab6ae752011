//! Web module: server-rendered dashboard over the workout capability

pub mod handler;
pub mod templates;
pub mod views;

pub use handler::WebHandlers;
pub use templates::{TemplateError, TemplateSet};

use crate::logging::module_span;
use crate::modules::workout::WorkoutClient;
use crate::monolith::{Deferred, Module, Monolith};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::Span;

pub struct WebModule {
    workout: Deferred<dyn WorkoutClient>,
    logger: Span,
}

impl WebModule {
    pub fn new() -> Self {
        Self {
            workout: Deferred::new(),
            logger: Span::none(),
        }
    }
}

impl Default for WebModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for WebModule {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn setup(&mut self, mono: &dyn Monolith) -> crate::Result<()> {
        self.logger = module_span(mono.logger(), self.name());

        // A template that fails to parse aborts startup.
        let templates = Arc::new(TemplateSet::embedded()?);
        tracing::info!(parent: &self.logger, "templates parsed");

        let handlers = WebHandlers::new(self.workout.clone(), templates);
        for route in handlers.routes()? {
            tracing::info!(parent: &self.logger, route = route.pattern(), "adding route");
            mono.mux().handle(self.name(), route)?;
        }
        Ok(())
    }

    async fn post_setup(&mut self, mono: &dyn Monolith) -> crate::Result<()> {
        self.workout.bind_from(mono.capabilities())?;
        tracing::info!(parent: &self.logger, "workout client bound");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::modules::workout::WorkoutModule;
    use crate::modules::workout::service::tests::MemoryWorkoutRepository;
    use crate::monolith::test_support::mock_db;
    use crate::monolith::{Application, MonolithError};

    #[tokio::test]
    async fn test_post_setup_fails_without_workout_module() {
        let mut app = Application::new(
            mock_db(),
            Config::default(),
            Span::none(),
            vec![Box::new(WebModule::new())],
        )
        .unwrap();

        app.setup_modules().await.unwrap();
        assert!(matches!(
            app.post_setup_modules().await,
            Err(crate::Error::Monolith(MonolithError::CapabilityMissing { .. }))
        ));
    }

    #[tokio::test]
    async fn test_binds_sibling_registered_later() {
        let repository = Arc::new(MemoryWorkoutRepository::with_muscles(&["Biceps"]));
        let mut app = Application::new(
            mock_db(),
            Config::default(),
            Span::none(),
            vec![
                Box::new(WebModule::new()),
                Box::new(WorkoutModule::with_repository(repository)),
            ],
        )
        .unwrap();

        app.setup_modules().await.unwrap();
        app.post_setup_modules().await.unwrap();
    }
}
