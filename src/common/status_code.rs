use axum::http::StatusCode as HttpStatusCode;
use strum_macros::{Display, EnumString};

/// Application-level status codes carried in error envelopes
///
/// The variant name doubles as the machine-readable `code` field of an
/// [`ApiError`](super::ApiError), so renaming a variant is a wire change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum StatusCode {
    Ok,
    Created,
    NoContent,
    BadRequest,
    NotFound,
    Conflict,
    UnprocessableEntity,
    InternalServerError,
    NotImplemented,
    ServiceUnavailable,
}

impl From<StatusCode> for HttpStatusCode {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::Ok => HttpStatusCode::OK,
            StatusCode::Created => HttpStatusCode::CREATED,
            StatusCode::NoContent => HttpStatusCode::NO_CONTENT,
            StatusCode::BadRequest => HttpStatusCode::BAD_REQUEST,
            StatusCode::NotFound => HttpStatusCode::NOT_FOUND,
            StatusCode::Conflict => HttpStatusCode::CONFLICT,
            StatusCode::UnprocessableEntity => HttpStatusCode::UNPROCESSABLE_ENTITY,
            StatusCode::InternalServerError => HttpStatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::NotImplemented => HttpStatusCode::NOT_IMPLEMENTED,
            StatusCode::ServiceUnavailable => HttpStatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
