//! Canonical route accumulator.
//!
//! Registrations against any engine first land here; the binding
//! materializes native structures from the flattened view when it starts
//! listening. Paths use `:name` parameter syntax; bindings translate where
//! their native router differs.

use std::{future::Future, sync::Arc};

use http::Method;

use crate::{
    core::{request::CanonicalRequest, response::CanonicalResponse},
    ports::handler::{HandlerResult, SharedHandler, handler_fn},
};

/// One registered route before materialization
#[derive(Clone)]
pub struct RouteSpec {
    pub method: Method,
    pub path: String,
    pub handlers: Vec<SharedHandler>,
}

/// One registered middleware before materialization.
///
/// `scope: None` means global; `Some(prefix)` restricts it to paths under
/// that prefix.
#[derive(Clone)]
pub struct MiddlewareSpec {
    pub scope: Option<String>,
    pub handler: SharedHandler,
}

impl MiddlewareSpec {
    pub fn global(handler: SharedHandler) -> Self {
        Self { scope: None, handler }
    }

    pub fn scoped(scope: impl Into<String>, handler: SharedHandler) -> Self {
        Self {
            scope: Some(scope.into()),
            handler,
        }
    }
}

/// A route with its absolute path, produced by [`Router::flatten`]
#[derive(Clone)]
pub struct FlatRoute {
    pub method: Method,
    pub path: String,
    pub handlers: Vec<SharedHandler>,
}

/// A middleware with its absolute scope, produced by [`Router::flatten`]
#[derive(Clone)]
pub struct FlatMiddleware {
    pub scope: Option<String>,
    pub handler: SharedHandler,
}

/// Engine-neutral router: routes, middlewares and nested mounts.
///
/// Sub-routers mount under a path; a sub-router's own prefix joins beneath
/// the mount path. Duplicate `(path, method)` registrations are not a
/// conflict, they extend the handler chain in registration order.
#[derive(Clone, Default)]
pub struct Router {
    prefix: Option<String>,
    routes: Vec<RouteSpec>,
    middlewares: Vec<MiddlewareSpec>,
    mounts: Vec<(String, Router)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router carrying its own prefix, applied under wherever it mounts
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Register a handler closure for `method` at `path`
    pub fn route<F, Fut>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route_shared(method, path, handler_fn(handler))
    }

    /// Register a prebuilt handler for `method` at `path`
    pub fn route_shared(&mut self, method: Method, path: &str, handler: SharedHandler) -> &mut Self {
        self.route_chain(method, path, vec![handler])
    }

    /// Register a handler chain; earlier handlers can send and short-circuit
    pub fn route_chain(
        &mut self,
        method: Method,
        path: &str,
        handlers: Vec<SharedHandler>,
    ) -> &mut Self {
        self.routes.push(RouteSpec {
            method,
            path: path.to_string(),
            handlers,
        });
        self
    }

    pub fn get<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    pub fn put<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(Method::PUT, path, handler)
    }

    pub fn patch<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(Method::PATCH, path, handler)
    }

    pub fn delete<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(Method::DELETE, path, handler)
    }

    pub fn head<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(Method::HEAD, path, handler)
    }

    pub fn options<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(Method::OPTIONS, path, handler)
    }

    /// Register a global middleware closure
    pub fn use_middleware<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.use_shared(handler_fn(handler))
    }

    /// Register a middleware closure scoped to paths under `scope`
    pub fn use_at<F, Fut>(&mut self, scope: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.middlewares
            .push(MiddlewareSpec::scoped(scope, handler_fn(handler)));
        self
    }

    /// Register a prebuilt global middleware
    pub fn use_shared(&mut self, handler: SharedHandler) -> &mut Self {
        self.middlewares.push(MiddlewareSpec::global(handler));
        self
    }

    /// Mount a sub-router under `path`
    pub fn mount(&mut self, path: &str, router: Router) -> &mut Self {
        self.mounts.push((path.to_string(), router));
        self
    }

    pub(crate) fn push_route(&mut self, spec: RouteSpec) {
        self.routes.push(spec);
    }

    pub(crate) fn push_middleware(&mut self, spec: MiddlewareSpec) {
        self.middlewares.push(spec);
    }

    /// Flatten the tree into absolute-path routes and middlewares.
    ///
    /// A sub-router's global middleware becomes scoped to its subtree;
    /// middleware that is global at the top level stays global. Order is
    /// preserved: a router's own entries come before its mounts'.
    pub fn flatten(&self) -> (Vec<FlatRoute>, Vec<FlatMiddleware>) {
        let mut routes = Vec::new();
        let mut middlewares = Vec::new();
        self.flatten_into("", &mut routes, &mut middlewares);
        (routes, middlewares)
    }

    fn flatten_into(
        &self,
        base: &str,
        routes: &mut Vec<FlatRoute>,
        middlewares: &mut Vec<FlatMiddleware>,
    ) {
        let base = match &self.prefix {
            Some(prefix) => join_paths(base, prefix),
            None => base.to_string(),
        };
        for spec in &self.middlewares {
            let scope = match (&spec.scope, base.as_str()) {
                (Some(scope), _) => Some(join_paths(&base, scope)),
                (None, "") => None,
                (None, _) => Some(base.clone()),
            };
            middlewares.push(FlatMiddleware {
                scope,
                handler: spec.handler.clone(),
            });
        }
        for spec in &self.routes {
            routes.push(FlatRoute {
                method: spec.method.clone(),
                path: join_paths(&base, &spec.path),
                handlers: spec.handlers.clone(),
            });
        }
        for (path, sub) in &self.mounts {
            let mounted = join_paths(&base, path);
            sub.flatten_into(&mounted, routes, middlewares);
        }
    }
}

/// Join two path fragments without doubling or dropping slashes
pub(crate) fn join_paths(base: &str, tail: &str) -> String {
    let base = base.trim_end_matches('/');
    let tail = tail.trim_start_matches('/');
    if tail.is_empty() {
        if base.is_empty() {
            "/".to_string()
        } else {
            base.to_string()
        }
    } else {
        format!("{base}/{tail}")
    }
}
