//! Axum binding.
//!
//! The only binding that materializes into a full native router. Canonical
//! routes become `MethodRouter` entries, canonical middlewares become
//! `from_fn` layers, and a digest layer at the edge buffers the body once so
//! both see the same [`CanonicalRequest`]. Fallbacks at the router and
//! method level reproduce the JSON 404 for unmatched paths and methods
//! alike.

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, RawPathParams, Request},
    handler::HandlerWithoutStateExt,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header::SET_COOKIE};
use tokio::{net::TcpListener, runtime::Handle};
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    adapters::shared::{decode_path, to_native_path},
    config::models::{AppConfig, StaticFilesConfig},
    core::{
        dispatch::{error_response, log_completion, run_handlers, scope_matches, send_not_found},
        middleware::static_files,
        request::CanonicalRequest,
        response::{CanonicalResponse, ResponseParts},
        router::{FlatMiddleware, FlatRoute, MiddlewareSpec, RouteSpec, Router},
    },
    ports::{
        engine::{EngineBinding, EngineError, EngineId, EngineResult, ReadyCallback},
        handler::SharedHandler,
    },
};

pub struct AxumBinding {
    handle: Handle,
    host: String,
    router: Router,
    static_dir: Option<StaticFilesConfig>,
}

impl AxumBinding {
    pub fn new(handle: Handle, config: &AppConfig) -> Self {
        Self {
            handle,
            host: config.server.host.clone(),
            router: Router::new(),
            static_dir: None,
        }
    }
}

impl EngineBinding for AxumBinding {
    fn engine(&self) -> EngineId {
        EngineId::Axum
    }

    fn register_route(&mut self, route: RouteSpec) {
        self.router.push_route(route);
    }

    fn register_middleware(&mut self, middleware: MiddlewareSpec) {
        self.router.push_middleware(middleware);
    }

    fn mount_router(&mut self, prefix: &str, router: Router) {
        self.router.mount(prefix, router);
    }

    fn install_static(&mut self, config: &StaticFilesConfig) {
        // ServeDir only knows index.html and cannot nest at the root; other
        // shapes go through the portable handler
        if config.index_file == "index.html" && config.url_prefix != "/" {
            self.static_dir = Some(config.clone());
        } else {
            self.register_middleware(MiddlewareSpec::global(static_files::static_handler(
                config.clone(),
            )));
        }
    }

    fn listen(self: Box<Self>, port: u16, on_ready: ReadyCallback) -> EngineResult<()> {
        let (routes, middlewares) = self.router.flatten();
        let app = build_app(routes, middlewares, self.static_dir.as_ref())?;
        let addr = format!("{}:{}", self.host, port);
        tracing::info!("Starting axum engine on {addr}");
        self.handle.clone().block_on(async move {
            let listener = TcpListener::bind(&addr)
                .await
                .map_err(|source| EngineError::Bind {
                    addr: addr.clone(),
                    source,
                })?;
            on_ready();
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .map_err(|e| EngineError::Runtime(e.to_string()))
        })
    }
}

fn build_app(
    routes: Vec<FlatRoute>,
    middlewares: Vec<FlatMiddleware>,
    static_dir: Option<&StaticFilesConfig>,
) -> EngineResult<axum::Router> {
    let mut grouped: HashMap<String, HashMap<Method, Vec<SharedHandler>>> = HashMap::new();
    for route in routes {
        grouped
            .entry(to_native_path(&route.path))
            .or_default()
            .entry(route.method)
            .or_default()
            .extend(route.handlers);
    }

    let mut app = axum::Router::new();
    for (path, methods) in grouped {
        let mut method_router = MethodRouter::new();
        for (method, chain) in methods {
            let filter =
                MethodFilter::try_from(method).map_err(|e| EngineError::Route {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            let handler = move |params: RawPathParams, request: Request| {
                let chain = chain.clone();
                async move { run_chain(chain, params, request).await }
            };
            method_router = method_router.on(filter, handler);
        }
        // an existing path with the wrong method 404s, it never 405s
        app = app.route(&path, method_router.fallback(miss));
    }

    if let Some(config) = static_dir {
        let serve_dir = ServeDir::new(&config.root)
            .append_index_html_on_directories(true)
            .not_found_service(miss.into_service());
        app = app.nest_service(&config.url_prefix, serve_dir);
    }

    let mut app = app.fallback(miss);
    // layers added later run earlier, so reverse keeps registration order
    for mw in middlewares.into_iter().rev() {
        app = app.layer(axum::middleware::from_fn(move |request, next| {
            let mw = mw.clone();
            async move { apply_middleware(mw, request, next).await }
        }));
    }

    Ok(app
        .layer(axum::middleware::from_fn(digest))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new()))
}

/// Buffer the body, build the canonical request and stash it as an
/// extension for the layers and handlers downstream
async fn digest(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("failed to read request body: {e}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let headers = parts.headers.iter().map(|(name, value)| {
        (
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
    });
    let mut canonical = CanonicalRequest::new(parts.method.clone(), decode_path(parts.uri.path()))
        .with_headers(headers)
        .with_body(bytes.clone());
    if let Some(query) = parts.uri.query() {
        canonical = canonical.with_query(query);
    }
    if let Some(peer) = peer {
        canonical = canonical.with_remote_addr(peer);
    }
    let canonical = Arc::new(canonical);

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(canonical.clone());

    let response = next.run(request).await;
    log_completion(&canonical, response.status().as_u16(), start);
    response
}

/// One canonical middleware as an axum layer.
///
/// A middleware that commits the response short-circuits the stack; one
/// that only mutates headers has them merged onto whatever the inner
/// service produced.
async fn apply_middleware(mw: FlatMiddleware, request: Request, next: Next) -> Response {
    let Some(canonical) = request.extensions().get::<Arc<CanonicalRequest>>().cloned() else {
        return next.run(request).await;
    };
    if let Some(scope) = &mw.scope
        && !scope_matches(scope, canonical.path())
    {
        return next.run(request).await;
    }

    let res = CanonicalResponse::new();
    if let Err(e) = mw.handler.call(canonical, res.clone()).await {
        tracing::warn!("middleware failed: {e}");
        error_response(&res, 500, &e.to_string());
    }
    if res.is_sent() {
        return render(res.finish());
    }

    let deferred = res.finish();
    let mut response = next.run(request).await;
    for (name, value) in &deferred.headers {
        apply_header(response.headers_mut(), name, value);
    }
    response
}

async fn run_chain(chain: Vec<SharedHandler>, params: RawPathParams, request: Request) -> Response {
    let Some(base) = request.extensions().get::<Arc<CanonicalRequest>>().cloned() else {
        tracing::warn!("request reached a handler without passing the digest layer");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let params: HashMap<String, String> = params
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    let routed = Arc::new(base.fork_with_params(params));

    let res = CanonicalResponse::new();
    run_handlers(&chain, &routed, &res).await;
    if !res.is_sent() {
        send_not_found(&res);
    }
    render(res.finish())
}

async fn miss() -> Response {
    let res = CanonicalResponse::new();
    send_not_found(&res);
    render(res.finish())
}

fn render(parts: ResponseParts) -> Response {
    let mut response = Response::new(Body::from(parts.body));
    *response.status_mut() =
        StatusCode::from_u16(parts.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    for (name, value) in &parts.headers {
        apply_header(response.headers_mut(), name, value);
    }
    response
}

fn apply_header(headers: &mut HeaderMap, name: &str, value: &str) {
    let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
        return;
    };
    let Ok(value) = HeaderValue::from_str(value) else {
        return;
    };
    if name == SET_COOKIE {
        headers.append(name, value);
    } else {
        headers.insert(name, value);
    }
}
