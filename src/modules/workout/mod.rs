//! Workout module: muscles, muscle ranks, plans and plan entries
//!
//! Exports [`WorkoutClient`] to sibling modules.

pub mod handler;
pub mod model;
pub mod repository;
pub mod service;

pub use handler::WorkoutHandlers;
pub use model::{Muscle, MuscleRank, Plan, PlanDetail, PlanEntry, PlanEntryDetail};
pub use repository::{PgWorkoutRepository, WorkoutRepository};
pub use service::{WorkoutClient, WorkoutService};

use crate::logging::module_span;
use crate::monolith::{Module, Monolith};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::Span;

pub struct WorkoutModule {
    repository: Option<Arc<dyn WorkoutRepository>>,
    logger: Span,
}

impl WorkoutModule {
    /// Module backed by the shared database handle
    pub fn new() -> Self {
        Self {
            repository: None,
            logger: Span::none(),
        }
    }

    /// Module backed by the given repository
    pub fn with_repository(repository: Arc<dyn WorkoutRepository>) -> Self {
        Self {
            repository: Some(repository),
            logger: Span::none(),
        }
    }
}

impl Default for WorkoutModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for WorkoutModule {
    fn name(&self) -> &'static str {
        "workout"
    }

    async fn setup(&mut self, mono: &dyn Monolith) -> crate::Result<()> {
        self.logger = module_span(mono.logger(), self.name());

        let repository = match &self.repository {
            Some(repository) => Arc::clone(repository),
            None => Arc::new(PgWorkoutRepository::new(mono.db().clone())),
        };
        let service = Arc::new(WorkoutService::new(repository, self.logger.clone()));

        let muscles = service.check_store().await?;
        tracing::info!(parent: &self.logger, muscles, "workout store reachable");

        mono.capabilities()
            .provide::<dyn WorkoutClient>(self.name(), service.clone())?;

        let handlers = WorkoutHandlers::new(service);
        for route in handlers.routes()? {
            tracing::info!(parent: &self.logger, route = route.pattern(), "adding route");
            mono.mux().handle(self.name(), route)?;
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> crate::Result<()> {
        tracing::info!(parent: &self.logger, "workout module stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::monolith::test_support::mock_db;
    use crate::monolith::{Application, MonolithError};
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_setup_fails_when_store_unreachable() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([sea_orm::DbErr::Custom(
                "relation \"workout.muscles\" does not exist".into(),
            )])
            .into_connection();
        let mut app = Application::new(
            db,
            Config::default(),
            Span::none(),
            vec![Box::new(WorkoutModule::new())],
        )
        .unwrap();

        assert!(matches!(
            app.setup_modules().await,
            Err(crate::Error::Database(_))
        ));
        assert!(app.monolith().mux().routes().is_empty());
    }

    #[tokio::test]
    async fn test_setup_exports_client_and_routes() {
        let repository = Arc::new(service::tests::MemoryWorkoutRepository::with_muscles(&[
            "Biceps",
        ]));
        let mut app = Application::new(
            mock_db(),
            Config::default(),
            Span::none(),
            vec![Box::new(WorkoutModule::with_repository(repository))],
        )
        .unwrap();

        // Not resolvable until setup completes.
        assert!(matches!(
            app.monolith().capabilities().resolve::<dyn WorkoutClient>(),
            Err(MonolithError::CapabilityNotReady { .. })
        ));

        app.setup_modules().await.unwrap();
        let client = app
            .monolith()
            .capabilities()
            .resolve::<dyn WorkoutClient>()
            .unwrap();
        assert_eq!(client.read_muscles().await.unwrap().len(), 1);
        assert!(
            app.monolith()
                .mux()
                .routes()
                .contains(&"GET /api/v0/workout/muscles".to_string())
        );
    }
}
