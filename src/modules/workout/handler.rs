use super::model::{
    Filters, Muscle, MuscleInput, MuscleRank, Plan, PlanDetail, PlanEntry, PlanEntryPatch,
    PlanInput, RankInput,
};
use super::service::{WorkoutClient, WorkoutService};
use crate::Result;
use crate::common::{ApiResponse, JsonBody, PathId};
use crate::monolith::{RequestLogger, RouteDefinition};
use axum::extract::{Query, State};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct WorkoutHandlers {
    service: Arc<WorkoutService>,
}

#[derive(Debug, Serialize)]
pub struct DeletedPlan {
    pub id: i32,
    pub deleted_entries: u64,
}

impl WorkoutHandlers {
    pub fn new(service: Arc<WorkoutService>) -> Self {
        Self { service }
    }

    pub fn routes(&self) -> crate::monolith::Result<Vec<RouteDefinition>> {
        let state = self.clone();
        Ok(vec![
            RouteDefinition::new("GET /api/v0/workout/muscles", list_muscles, state.clone())?,
            RouteDefinition::new("POST /api/v0/workout/muscles", create_muscle, state.clone())?,
            RouteDefinition::new("GET /api/v0/workout/ranks", list_ranks, state.clone())?,
            RouteDefinition::new("PUT /api/v0/workout/ranks", upsert_rank, state.clone())?,
            RouteDefinition::new("GET /api/v0/workout/plans", list_plans, state.clone())?,
            RouteDefinition::new("POST /api/v0/workout/plans", create_plan, state.clone())?,
            RouteDefinition::new("GET /api/v0/workout/plans/{id}", get_plan, state.clone())?,
            RouteDefinition::new("DELETE /api/v0/workout/plans/{id}", delete_plan, state.clone())?,
            RouteDefinition::new(
                "PATCH /api/v0/workout/plans/entries/{id}",
                patch_plan_entry,
                state,
            )?,
        ])
    }
}

async fn list_muscles(
    log: RequestLogger,
    State(h): State<WorkoutHandlers>,
) -> Result<ApiResponse<Vec<Muscle>>> {
    let muscles = h.service.read_muscles().await?;
    tracing::debug!(parent: log.span(), count = muscles.len(), "listed muscles");
    Ok(ApiResponse::success(muscles))
}

async fn create_muscle(
    log: RequestLogger,
    State(h): State<WorkoutHandlers>,
    JsonBody(input): JsonBody<MuscleInput>,
) -> Result<ApiResponse<Muscle>> {
    tracing::info!(parent: log.span(), name = %input.name, "creating muscle");
    let muscle = h.service.create_muscle(&input).await?;
    Ok(ApiResponse::created(muscle))
}

async fn list_ranks(
    State(h): State<WorkoutHandlers>,
    Query(filters): Query<Filters>,
) -> Result<ApiResponse<Vec<MuscleRank>>> {
    Ok(ApiResponse::success(h.service.read_ranks(filters).await?))
}

async fn upsert_rank(
    log: RequestLogger,
    State(h): State<WorkoutHandlers>,
    JsonBody(input): JsonBody<RankInput>,
) -> Result<ApiResponse<MuscleRank>> {
    tracing::info!(
        parent: log.span(),
        user_id = input.user_id,
        muscle_id = input.muscle_id,
        "setting muscle rank"
    );
    Ok(ApiResponse::success(h.service.set_rank(&input).await?))
}

async fn list_plans(
    State(h): State<WorkoutHandlers>,
    Query(filters): Query<Filters>,
) -> Result<ApiResponse<Vec<Plan>>> {
    Ok(ApiResponse::success(h.service.read_plans(filters).await?))
}

async fn create_plan(
    log: RequestLogger,
    State(h): State<WorkoutHandlers>,
    JsonBody(input): JsonBody<PlanInput>,
) -> Result<ApiResponse<PlanDetail>> {
    tracing::info!(
        parent: log.span(),
        user_id = input.user_id,
        muscles = input.muscle_ids.len(),
        "creating plan"
    );
    Ok(ApiResponse::created(h.service.create_plan(&input).await?))
}

async fn get_plan(
    State(h): State<WorkoutHandlers>,
    PathId(id): PathId,
) -> Result<ApiResponse<PlanDetail>> {
    Ok(ApiResponse::success(h.service.read_plan(id).await?))
}

async fn delete_plan(
    log: RequestLogger,
    State(h): State<WorkoutHandlers>,
    PathId(id): PathId,
) -> Result<ApiResponse<DeletedPlan>> {
    tracing::info!(parent: log.span(), plan_id = id, "deleting plan");
    let deleted_entries = h.service.remove_plan(id).await?;
    Ok(ApiResponse::success(DeletedPlan {
        id,
        deleted_entries,
    }))
}

async fn patch_plan_entry(
    State(h): State<WorkoutHandlers>,
    PathId(id): PathId,
    JsonBody(patch): JsonBody<PlanEntryPatch>,
) -> Result<ApiResponse<PlanEntry>> {
    Ok(ApiResponse::success(
        h.service.update_plan_entry_sets(id, patch.sets).await?,
    ))
}
