//! Middleware chain applied around the shared mux
//!
//! Outer to inner: [`RecoverPanic`] → [`RequestLog`] → router.

use crate::common::{ApiResponse, INTERNAL_SERVER_ERROR_MESSAGE, StatusCode};
use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::{HeaderValue, Request, header, request::Parts};
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::any::Any;
use std::convert::Infallible;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{Instrument, Span};
use uuid::Uuid;

/// Best-effort text of a panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn panic_response() -> Response {
    let mut response =
        ApiResponse::<()>::error(StatusCode::InternalServerError, INTERNAL_SERVER_ERROR_MESSAGE)
            .into_response();
    // Handler-local state may be corrupt; do not reuse the connection.
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

/// Request-scoped logger, available to every handler behind [`RequestLog`].
///
/// ```rust,ignore
/// async fn list_muscles(log: RequestLogger, State(h): State<Handlers>) -> Result<...> {
///     tracing::info!(parent: log.span(), "listing muscles");
///     ...
/// }
/// ```
#[derive(Clone, Debug)]
pub struct RequestLogger {
    id: Uuid,
    span: Span,
}

impl RequestLogger {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl<S> FromRequestParts<S> for RequestLogger
where
    S: Send + Sync,
{
    type Rejection = crate::Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestLogger>()
            .cloned()
            .ok_or_else(|| crate::Error::Internal("request logger missing from request".into()))
    }
}

/// Layer that attaches a [`RequestLogger`] to every request and logs its
/// receipt and completion.
#[derive(Clone)]
pub struct RequestLogLayer {
    logger: Span,
}

impl RequestLogLayer {
    pub fn new(logger: Span) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLog {
            inner,
            logger: self.logger.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequestLog<S> {
    inner: S,
    logger: Span,
}

impl<S> Service<Request<Body>> for RequestLog<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let id = Uuid::new_v4();
        let span = tracing::info_span!(
            parent: &self.logger,
            "request",
            id = %id,
            method = %request.method(),
            protocol = ?request.version(),
            path = %request.uri().path(),
        );
        request.extensions_mut().insert(RequestLogger {
            id,
            span: span.clone(),
        });

        // `inner` was driven to readiness; keep that instance for this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let started = Instant::now();
            tracing::info!(parent: &span, "received request");

            let response = inner.call(request).instrument(span.clone()).await?;

            tracing::info!(
                parent: &span,
                status = response.status().as_u16(),
                latency_ms = started.elapsed().as_millis() as u64,
                "request completed"
            );
            Ok(response)
        })
    }
}

/// Layer that turns a panicking handler into a generic 500 response.
#[derive(Clone)]
pub struct RecoverPanicLayer {
    logger: Span,
}

impl RecoverPanicLayer {
    pub fn new(logger: Span) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for RecoverPanicLayer {
    type Service = RecoverPanic<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecoverPanic {
            inner,
            logger: self.logger.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RecoverPanic<S> {
    inner: S,
    logger: Span,
}

impl<S> Service<Request<Body>> for RecoverPanic<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let method = request.method().clone();
        let path = request.uri().path().to_owned();
        let logger = self.logger.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let outcome = match catch_unwind(AssertUnwindSafe(|| inner.call(request))) {
                Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
                Err(panic) => Err(panic),
            };

            match outcome {
                Ok(result) => result,
                Err(panic) => {
                    tracing::error!(
                        parent: &logger,
                        method = %method,
                        path = %path,
                        panic = %panic_message(&*panic),
                        "recovered from panic while serving request"
                    );
                    Ok(panic_response())
                }
            }
        })
    }
}

/// The mux wrapped in the standard middleware chain
pub type AppService = RecoverPanic<RequestLog<axum::Router>>;

/// Wrap `router`: panic recovery outermost, then request logging.
pub fn standard_chain(router: axum::Router, logger: &Span) -> AppService {
    let logged = RequestLogLayer::new(logger.clone()).layer(router);
    RecoverPanicLayer::new(logger.clone()).layer(logged)
}
