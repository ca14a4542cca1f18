//! Universal adapter façade.
//!
//! The `UniversalAdapter` is the single surface a service programs against:
//! * Engine selection and binding at construction
//! * Route and middleware registration in canonical form
//! * Detached router creation and mounting
//! * Baseline middleware installation from configuration
//! * Deferred materialization: nothing native exists until `listen`
//!
//! Registrations accumulate in the binding's canonical router; the native
//! structures (axum `Router`, actix app factory, shim table) are built once
//! when `listen` runs, so registration order never races engine startup.

use std::{future::Future, sync::Arc};

use http::Method;

use crate::{
    adapters,
    config::models::AppConfig,
    context::AppContext,
    core::{
        detector,
        middleware::{body_limit, cookies, cors, rate_limit, request_log, secure_headers},
        request::CanonicalRequest,
        response::CanonicalResponse,
        router::{MiddlewareSpec, RouteSpec, Router},
    },
    ports::{
        engine::{EngineBinding, EngineId, EngineResult, ReadyCallback},
        handler::{HandlerResult, SharedHandler, handler_fn},
    },
};

pub struct UniversalAdapter {
    engine: EngineId,
    binding: Box<dyn EngineBinding>,
}

impl UniversalAdapter {
    /// Select an engine and create its binding.
    ///
    /// An engine named in configuration wins when compiled in; otherwise the
    /// highest-priority available engine is used.
    pub fn bind(ctx: &AppContext) -> EngineResult<Self> {
        let config = ctx.config();
        let preferred = config
            .engine
            .name
            .as_deref()
            .map(|name| name.parse::<EngineId>())
            .transpose()?;
        let engine = detector::select(preferred)?;
        tracing::info!("Selected engine: {engine}");

        let binding = adapters::create_binding(engine, ctx.handle().clone(), config)?;
        Ok(Self { engine, binding })
    }

    /// Engine this adapter is bound to
    pub fn engine(&self) -> EngineId {
        self.engine
    }

    /// Register a handler chain for `method` at `path`
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        handlers: Vec<SharedHandler>,
    ) -> &mut Self {
        self.binding.register_route(RouteSpec {
            method,
            path: path.to_string(),
            handlers,
        });
        self
    }

    fn route_one<F, Fut>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(method, path, vec![handler_fn(handler)])
    }

    pub fn get<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route_one(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route_one(Method::POST, path, handler)
    }

    pub fn put<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route_one(Method::PUT, path, handler)
    }

    pub fn patch<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route_one(Method::PATCH, path, handler)
    }

    pub fn delete<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route_one(Method::DELETE, path, handler)
    }

    pub fn head<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route_one(Method::HEAD, path, handler)
    }

    pub fn options<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route_one(Method::OPTIONS, path, handler)
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
        self.binding
            .register_middleware(MiddlewareSpec::scoped(scope, handler_fn(handler)));
        self
    }

    /// Register a prebuilt global middleware
    pub fn use_shared(&mut self, handler: SharedHandler) -> &mut Self {
        self.binding.register_middleware(MiddlewareSpec::global(handler));
        self
    }

    /// Detached canonical router carrying `prefix`
    pub fn create_router(&self, prefix: &str) -> Router {
        self.binding.create_router(prefix)
    }

    /// Mount a canonical router under `path`
    pub fn inject_router(&mut self, path: &str, router: Router) -> &mut Self {
        self.binding.mount_router(path, router);
        self
    }

    /// Install the baseline middleware from configuration.
    ///
    /// Fixed order: static files, body guard, CORS, secure headers, rate
    /// limit, request log, cookies. A step that fails to build is skipped
    /// with a warning; the rest still install.
    pub fn setup_baseline(&mut self, config: &AppConfig) -> &mut Self {
        if let Some(static_files) = &config.static_files {
            tracing::info!(
                "Serving static files from {} at {}",
                static_files.root,
                static_files.url_prefix
            );
            self.binding.install_static(static_files);
        }

        if let Some(body) = &config.body {
            self.use_shared(body_limit::body_guard(body.limit_bytes));
        }

        if let Some(cors_config) = &config.security.cors {
            self.use_shared(cors::cors_handler(cors_config.clone()));
        }

        if let Some(secure) = &config.security.secure_headers {
            self.use_shared(secure_headers::secure_headers_handler(secure.clone()));
        }

        if let Some(rate) = &config.security.rate_limit {
            match rate_limit::rate_limit_handler(rate) {
                Ok(handler) => {
                    self.use_shared(handler);
                }
                Err(e) => tracing::warn!("Skipping rate limiter: {e}"),
            }
        }

        if config.request_log.enabled {
            self.use_shared(request_log::request_log_handler());
        }

        if config.cookies.enabled {
            self.use_shared(cookies::cookies_handler());
        }

        self
    }

    /// Materialize the native server and serve forever.
    ///
    /// `on_ready` fires once the socket is bound. This call blocks the
    /// current thread for the life of the server.
    pub fn listen(self, port: u16, on_ready: ReadyCallback) -> EngineResult<()> {
        tracing::info!("Starting {} engine on port {port}", self.engine);
        self.binding.listen(port, on_ready)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::config::models::{RateLimitConfig, SecuritySection};

    #[derive(Default)]
    struct RecordingBinding {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl EngineBinding for RecordingBinding {
        fn engine(&self) -> EngineId {
            EngineId::Hyper
        }

        fn register_route(&mut self, spec: RouteSpec) {
            self.log
                .lock()
                .unwrap()
                .push(format!("route {} {}", spec.method, spec.path));
        }

        fn register_middleware(&mut self, spec: MiddlewareSpec) {
            self.log
                .lock()
                .unwrap()
                .push(format!("mw scope={:?}", spec.scope));
        }

        fn mount_router(&mut self, prefix: &str, _router: Router) {
            self.log.lock().unwrap().push(format!("mount {prefix}"));
        }

        fn listen(self: Box<Self>, _port: u16, _on_ready: ReadyCallback) -> EngineResult<()> {
            Ok(())
        }
    }

    fn adapter_with_recorder() -> (UniversalAdapter, Arc<Mutex<Vec<String>>>) {
        let binding = RecordingBinding::default();
        let log = binding.log.clone();
        (
            UniversalAdapter {
                engine: EngineId::Hyper,
                binding: Box::new(binding),
            },
            log,
        )
    }

    #[test]
    fn test_registrations_reach_the_binding() {
        let (mut adapter, log) = adapter_with_recorder();
        adapter.get("/users", |_req, _res| async { Ok(()) });
        adapter.use_at("/admin", |_req, _res| async { Ok(()) });
        adapter.inject_router("/api", Router::new());

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                "route GET /users".to_string(),
                "mw scope=Some(\"/admin\")".to_string(),
                "mount /api".to_string(),
            ]
        );
    }

    #[test]
    fn test_baseline_defaults_install_log_and_cookies_only() {
        let (mut adapter, log) = adapter_with_recorder();
        adapter.setup_baseline(&AppConfig::default());
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_baseline_skips_broken_rate_limiter() {
        let (mut adapter, log) = adapter_with_recorder();
        let config = AppConfig {
            security: SecuritySection {
                rate_limit: Some(RateLimitConfig {
                    window: "nonsense".to_string(),
                    max: 10,
                }),
                ..SecuritySection::default()
            },
            ..AppConfig::default()
        };
        adapter.setup_baseline(&config);
        // request log + cookies still install
        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
