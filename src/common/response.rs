use axum::{
    Json,
    http::StatusCode as HttpStatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Message returned for every 5xx answer. Internal detail stays in the logs.
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Standard API response wrapper
///
/// Every JSON endpoint of the identity and workout modules answers with this
/// envelope, so clients can branch on `success` before looking at `data`.
///
/// # Example
/// ```
/// use smartsplit::common::{ApiResponse, StatusCode};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Muscle {
///     id: i32,
///     name: String,
/// }
///
/// fn find(id: i32) -> ApiResponse<Muscle> {
///     if id == 1 {
///         ApiResponse::success(Muscle { id: 1, name: "Biceps".to_string() })
///     } else {
///         ApiResponse::error(StatusCode::NotFound, "the requested resource was not found")
///     }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    pub success: bool,

    #[serde(skip)]
    pub http_status: HttpStatusCode,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful response with data
    ///
    /// Defaults to HTTP 200 OK.
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            success: true,
            http_status: HttpStatusCode::OK,
        }
    }

    /// Create a successful response for a freshly created resource (HTTP 201)
    pub fn created(data: T) -> Self {
        Self {
            http_status: HttpStatusCode::CREATED,
            ..Self::success(data)
        }
    }

    /// Create an error response
    ///
    /// The error `code` is the `StatusCode` variant name.
    pub fn error(status: crate::common::StatusCode, message: impl Into<String>) -> ApiResponse<T> {
        ApiResponse {
            data: None,
            error: Some(ApiError {
                code: status.to_string(),
                message: message.into(),
            }),
            success: false,
            http_status: status.into(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.http_status, Json(self)).into_response()
    }
}
