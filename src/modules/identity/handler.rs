use super::model::{CreateUser, UpdateUser, User};
use super::service::UserService;
use crate::Result;
use crate::common::{ApiResponse, JsonBody, PathId, StatusCode};
use crate::monolith::{RequestLogger, RouteDefinition};
use axum::extract::State;
use std::sync::Arc;

#[derive(Clone)]
pub struct UserHandlers {
    service: Arc<UserService>,
}

impl UserHandlers {
    pub fn new(service: Arc<UserService>) -> Self {
        Self { service }
    }

    pub fn routes(&self) -> crate::monolith::Result<Vec<RouteDefinition>> {
        let state = self.clone();
        Ok(vec![
            RouteDefinition::new("GET /api/v0/identity/users", list_users, state.clone())?,
            RouteDefinition::new("POST /api/v0/identity/users", create_user, state.clone())?,
            RouteDefinition::new("POST /api/v0/identity/register", register, state.clone())?,
            RouteDefinition::new("GET /api/v0/identity/users/{id}", get_user, state.clone())?,
            RouteDefinition::new("PUT /api/v0/identity/users/{id}", update_user, state.clone())?,
            RouteDefinition::new("DELETE /api/v0/identity/users/{id}", delete_user, state)?,
        ])
    }
}

async fn list_users(State(h): State<UserHandlers>) -> Result<ApiResponse<Vec<User>>> {
    Ok(ApiResponse::success(h.service.list_users().await?))
}

async fn create_user(
    log: RequestLogger,
    State(h): State<UserHandlers>,
    JsonBody(input): JsonBody<CreateUser>,
) -> Result<ApiResponse<User>> {
    tracing::info!(parent: log.span(), username = %input.username, "creating user");
    Ok(ApiResponse::created(h.service.create_user(&input).await?))
}

async fn register(
    log: RequestLogger,
    State(h): State<UserHandlers>,
    JsonBody(input): JsonBody<CreateUser>,
) -> Result<ApiResponse<User>> {
    tracing::info!(parent: log.span(), username = %input.username, "registering user");
    Ok(ApiResponse::created(h.service.register(&input).await?))
}

async fn get_user(State(h): State<UserHandlers>, PathId(id): PathId) -> Result<ApiResponse<User>> {
    Ok(ApiResponse::success(h.service.read_user(id).await?))
}

async fn update_user(
    log: RequestLogger,
    State(h): State<UserHandlers>,
    PathId(id): PathId,
    JsonBody(input): JsonBody<UpdateUser>,
) -> Result<ApiResponse<User>> {
    tracing::info!(parent: log.span(), user_id = id, "updating user");
    Ok(ApiResponse::success(h.service.update_user(id, &input).await?))
}

async fn delete_user(
    log: RequestLogger,
    State(h): State<UserHandlers>,
    PathId(id): PathId,
) -> Result<axum::http::StatusCode> {
    tracing::info!(parent: log.span(), user_id = id, "deleting user");
    h.service.delete_user(id).await?;
    Ok(StatusCode::NoContent.into())
}
