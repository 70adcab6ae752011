//! Shared request multiplexer
//!
//! Modules register `METHOD /path` patterns during setup. The application
//! seals the mux when serving starts and takes the finished [`Router`] out of
//! it; registration after that point is an error.

use super::middleware::panic_message;
use super::{MonolithError, Result};
use axum::Router;
use axum::handler::Handler;
use axum::http::Method;
use axum::routing::{MethodFilter, MethodRouter};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, PoisonError};

const SUPPORTED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// A single `METHOD /path` pattern bound to its handler.
pub struct RouteDefinition {
    pattern: String,
    method: Method,
    path: String,
    handler: MethodRouter,
}

impl RouteDefinition {
    /// Bind `handler` to `pattern`, giving it `state`.
    ///
    /// ```rust,ignore
    /// RouteDefinition::new("GET /api/v0/workout/muscles", list_muscles, handlers.clone())?;
    /// ```
    pub fn new<H, T, S>(pattern: &str, handler: H, state: S) -> Result<Self>
    where
        H: Handler<T, S>,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let (method, path) = parse_pattern(pattern)?;
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| MonolithError::invalid_route(pattern, "unsupported method"))?;

        Ok(Self {
            pattern: format!("{} {}", method, path),
            method,
            path,
            handler: axum::routing::on(filter, handler).with_state(state),
        })
    }

    /// Bind a handler that needs no state
    pub fn stateless<H, T>(pattern: &str, handler: H) -> Result<Self>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::new(pattern, handler, ())
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn parse_pattern(pattern: &str) -> Result<(Method, String)> {
    let (method, path) = pattern
        .trim()
        .split_once(' ')
        .ok_or_else(|| MonolithError::invalid_route(pattern, "expected 'METHOD /path'"))?;

    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| MonolithError::invalid_route(pattern, "invalid method"))?;
    if !SUPPORTED_METHODS.contains(&method) {
        return Err(MonolithError::invalid_route(pattern, "unsupported method"));
    }

    let path = path.trim();
    if !path.starts_with('/') {
        return Err(MonolithError::invalid_route(pattern, "path must start with '/'"));
    }
    if path.split('/').any(|segment| segment.starts_with(':')) {
        return Err(MonolithError::invalid_route(
            pattern,
            "use '{name}' for path parameters",
        ));
    }

    Ok((method, path.to_string()))
}

/// Path with parameter names erased: `/plans/{id}` and `/plans/{plan}`
/// share the shape `/plans/{}`.
fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') && segment.ends_with('}') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

struct MuxState {
    router: Option<Router>,
    owners: HashMap<(Method, String), String>,
    patterns: Vec<String>,
}

/// The request multiplexer shared by every module.
pub struct Mux {
    state: Mutex<MuxState>,
}

impl Mux {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MuxState {
                router: Some(Router::new()),
                owners: HashMap::new(),
                patterns: Vec::new(),
            }),
        }
    }

    /// Register one route on behalf of `owner`.
    pub fn handle(&self, owner: &str, route: RouteDefinition) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let MuxState {
            router,
            owners,
            patterns,
        } = &mut *state;

        let Some(current) = router.as_ref() else {
            return Err(MonolithError::MuxSealed {
                pattern: route.pattern,
            });
        };

        let key = (route.method.clone(), route.path.clone());
        if let Some(first) = owners.get(&key) {
            return Err(MonolithError::DuplicateRoute {
                pattern: route.pattern,
                first: first.clone(),
                second: owner.to_string(),
            });
        }

        if let Some((_, existing)) = owners
            .keys()
            .find(|(_, path)| *path != route.path && path_shape(path) == path_shape(&route.path))
        {
            return Err(MonolithError::invalid_route(
                route.pattern,
                format!("conflicts with existing path '{existing}'"),
            ));
        }

        // Conflicts the shape check misses still panic inside the router. The
        // previous router stays intact and the panic becomes an error, though
        // the default panic hook prints it first.
        let candidate = current.clone();
        let RouteDefinition {
            pattern,
            path,
            handler,
            ..
        } = route;
        let extended = catch_unwind(AssertUnwindSafe(move || candidate.route(&path, handler)))
            .map_err(|panic| MonolithError::invalid_route(&pattern, panic_message(&*panic)))?;

        *router = Some(extended);
        owners.insert(key, owner.to_string());
        patterns.push(pattern);
        Ok(())
    }

    /// Register every route in `routes`, stopping at the first failure
    pub fn handle_all(
        &self,
        owner: &str,
        routes: impl IntoIterator<Item = RouteDefinition>,
    ) -> Result<()> {
        for route in routes {
            self.handle(owner, route)?;
        }
        Ok(())
    }

    /// Registered patterns, in registration order
    pub fn routes(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .patterns
            .clone()
    }

    pub fn is_sealed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .router
            .is_none()
    }

    /// Take the finished router out of the mux. Later registrations fail.
    pub(crate) fn seal(&self) -> Result<Router> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .router
            .take()
            .ok_or_else(|| MonolithError::phase("serve", "mux already sealed"))
    }
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}
