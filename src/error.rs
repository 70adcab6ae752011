use crate::common::{ApiResponse, INTERNAL_SERVER_ERROR_MESSAGE, StatusCode};
use crate::modules::web::templates::TemplateError;
use crate::monolith::MonolithError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Monolith(#[from] MonolithError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Status used when this error ends a request
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound { .. } => StatusCode::NotFound,
            Error::BadRequest(_) => StatusCode::BadRequest,
            Error::Validation(_) => StatusCode::UnprocessableEntity,
            Error::Monolith(MonolithError::Unbound { .. }) => StatusCode::ServiceUnavailable,
            _ => StatusCode::InternalServerError,
        }
    }

    /// Message safe to show to a client
    pub fn public_message(&self) -> String {
        match self {
            Error::NotFound { .. } => "the requested resource was not found".to_string(),
            Error::BadRequest(msg) | Error::Validation(msg) => msg.clone(),
            Error::Monolith(MonolithError::Unbound { .. }) => {
                "the service is still starting, try again shortly".to_string()
            }
            _ => INTERNAL_SERVER_ERROR_MESSAGE.to_string(),
        }
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        // Runs inside the request span installed by the logging middleware.
        let logger = tracing::Span::current();
        if matches!(status, StatusCode::InternalServerError) {
            tracing::error!(
                parent: &logger,
                error = %self,
                "an error occurred while processing request"
            );
        } else {
            tracing::info!(
                parent: &logger,
                error = %self,
                status = %status,
                "writing error response"
            );
        }
        ApiResponse::<()>::error(status, self.public_message()).into_response()
    }
}
