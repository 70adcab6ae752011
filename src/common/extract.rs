use crate::Error;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::{Form, Json};
use serde::de::DeserializeOwned;

/// JSON request body whose decoding failures answer with the standard error
/// envelope instead of axum's plain-text rejection.
///
/// # Example
/// ```rust,ignore
/// async fn create_muscle(JsonBody(input): JsonBody<MuscleInput>) -> Result<ApiResponse<Muscle>> {
///     ...
/// }
/// ```
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|rejection| Error::BadRequest(format!("unable to decode request body: {}", rejection.body_text())))
    }
}

/// URL-encoded form fields in submission order; keys may repeat
#[derive(Debug, Clone, Default)]
pub struct FormFields(pub Vec<(String, String)>);

impl FormFields {
    /// Every value submitted under `key`
    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map(|Form(fields)| FormFields(fields))
            .map_err(|rejection| Error::BadRequest(format!("bad form: {}", rejection.body_text())))
    }
}

/// A positive integer `{id}` path parameter
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub i32);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| Error::BadRequest("missing id parameter".into()))?;

        match raw.parse::<i32>() {
            Ok(id) if id > 0 => Ok(PathId(id)),
            _ => Err(Error::BadRequest("invalid id parameter".into())),
        }
    }
}
