//! Actix-web binding.
//!
//! Actix builds one `App` per worker from a factory closure, so the
//! materialized table lives behind an `Arc` and every worker registers the
//! same native resources. Actix still speaks http 0.2 internally; requests
//! and responses cross that boundary through byte-level conversions.
//!
//! Each resource carries an explicit route per registered method plus a
//! synthetic HEAD route borrowing the GET chain, and both the per-resource
//! and the app-wide default land in the canonical 404 path.

use std::{collections::HashMap, sync::Arc, time::Instant};

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer,
    http::{Method as ActixMethod, StatusCode as ActixStatusCode},
    web,
};
use http::Method;
use tokio::runtime::Handle;

use crate::{
    adapters::shared::{complete, decode_path, to_native_path},
    config::models::AppConfig,
    core::{
        dispatch::{run_handlers, run_middlewares, send_not_found},
        request::CanonicalRequest,
        response::{CanonicalResponse, ResponseParts},
        router::{FlatMiddleware, MiddlewareSpec, RouteSpec, Router},
    },
    ports::{
        engine::{EngineBinding, EngineError, EngineId, EngineResult, ReadyCallback},
        handler::SharedHandler,
    },
};

pub struct ActixBinding {
    host: String,
    workers: usize,
    router: Router,
}

impl ActixBinding {
    pub fn new(_handle: Handle, config: &AppConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            workers: config.server.workers,
            router: Router::new(),
        }
    }
}

impl EngineBinding for ActixBinding {
    fn engine(&self) -> EngineId {
        EngineId::ActixWeb
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

    fn listen(self: Box<Self>, port: u16, on_ready: ReadyCallback) -> EngineResult<()> {
        let (routes, middlewares) = self.router.flatten();

        let mut table: HashMap<String, HashMap<Method, Vec<SharedHandler>>> = HashMap::new();
        for route in routes {
            table
                .entry(to_native_path(&route.path))
                .or_default()
                .entry(route.method)
                .or_default()
                .extend(route.handlers);
        }

        let mut resources: Vec<(String, Vec<ActixMethod>)> = Vec::new();
        for (pattern, methods) in &table {
            let mut native = Vec::with_capacity(methods.len() + 1);
            for method in methods.keys() {
                let converted = ActixMethod::from_bytes(method.as_str().as_bytes()).map_err(
                    |e| EngineError::Route {
                        path: pattern.clone(),
                        reason: e.to_string(),
                    },
                )?;
                native.push(converted);
            }
            if methods.contains_key(&Method::GET) && !methods.contains_key(&Method::HEAD) {
                native.push(ActixMethod::HEAD);
            }
            resources.push((pattern.clone(), native));
        }
        let resources = Arc::new(resources);
        let dispatch = Arc::new(Dispatch { table, middlewares });

        let factory = move || {
            let mut app = App::new().app_data(web::Data::from(dispatch.clone()));
            for (pattern, methods) in resources.iter() {
                let mut resource = web::resource(pattern.as_str());
                for method in methods {
                    resource = resource.route(web::method(method.clone()).to(entry));
                }
                app = app.service(resource.default_service(web::route().to(miss)));
            }
            app.default_service(web::route().to(miss))
        };

        let addr = format!("{}:{}", self.host, port);
        let workers = self.workers;
        tracing::info!("Starting actix-web engine on {addr} with {workers} workers");

        actix_web::rt::System::new().block_on(async move {
            let server = HttpServer::new(factory)
                .workers(workers)
                .disable_signals()
                .bind(&addr)
                .map_err(|source| EngineError::Bind {
                    addr: addr.clone(),
                    source,
                })?;
            on_ready();
            server
                .run()
                .await
                .map_err(|e| EngineError::Runtime(e.to_string()))
        })
    }
}

/// Materialized table shared by every worker's `App`
struct Dispatch {
    table: HashMap<String, HashMap<Method, Vec<SharedHandler>>>,
    middlewares: Vec<FlatMiddleware>,
}

impl Dispatch {
    fn lookup(&self, pattern: &str, method: &Method) -> Option<Vec<SharedHandler>> {
        let methods = self.table.get(pattern)?;
        match methods.get(method) {
            Some(chain) => Some(chain.clone()),
            None if *method == Method::HEAD => methods.get(&Method::GET).cloned(),
            None => None,
        }
    }

    /// Same pipeline the shim runs, with the match supplied by actix
    async fn run(
        &self,
        req: CanonicalRequest,
        matched: Option<(Vec<SharedHandler>, HashMap<String, String>)>,
    ) -> ResponseParts {
        let start = Instant::now();
        let req = Arc::new(req);
        let res = CanonicalResponse::new();

        if run_middlewares(&self.middlewares, &req, &res).await {
            return complete(&req, res, start);
        }

        match matched {
            Some((handlers, params)) => {
                let routed = Arc::new(req.fork_with_params(params));
                run_handlers(&handlers, &routed, &res).await;
                if !res.is_sent() {
                    send_not_found(&res);
                }
            }
            None => send_not_found(&res),
        }

        complete(&req, res, start)
    }
}

/// Digest one actix request into canonical form
fn digest(req: &HttpRequest, body: web::Bytes) -> Option<CanonicalRequest> {
    let method = Method::from_bytes(req.method().as_str().as_bytes()).ok()?;
    let headers = req.headers().iter().map(|(name, value)| {
        (
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
    });

    let mut canonical = CanonicalRequest::new(method, decode_path(req.path()))
        .with_headers(headers)
        .with_body(body);
    let query = req.query_string();
    if !query.is_empty() {
        canonical = canonical.with_query(query);
    }
    if let Some(peer) = req.peer_addr() {
        canonical = canonical.with_remote_addr(peer);
    }
    Some(canonical)
}

async fn entry(req: HttpRequest, body: web::Bytes, dispatch: web::Data<Dispatch>) -> HttpResponse {
    let Some(canonical) = digest(&req, body) else {
        return HttpResponse::BadRequest().finish();
    };

    let matched = req.match_pattern().and_then(|pattern| {
        let chain = dispatch.lookup(&pattern, canonical.method())?;
        let params: HashMap<String, String> = req
            .match_info()
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Some((chain, params))
    });

    render(dispatch.run(canonical, matched).await)
}

async fn miss(req: HttpRequest, body: web::Bytes, dispatch: web::Data<Dispatch>) -> HttpResponse {
    let Some(canonical) = digest(&req, body) else {
        return HttpResponse::BadRequest().finish();
    };
    render(dispatch.run(canonical, None).await)
}

fn render(parts: ResponseParts) -> HttpResponse {
    let status =
        ActixStatusCode::from_u16(parts.status).unwrap_or(ActixStatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = HttpResponse::build(status);
    for (name, value) in &parts.headers {
        builder.append_header((name.as_str(), value.as_str()));
    }
    builder.body(parts.body)
}

#[cfg(test)]
mod tests {
    use actix_web::test;

    use super::*;
    use crate::ports::handler::handler_fn;

    fn demo_dispatch() -> Arc<Dispatch> {
        let mut table: HashMap<String, HashMap<Method, Vec<SharedHandler>>> = HashMap::new();
        table.insert(
            "/users/{id}".to_string(),
            HashMap::from([(
                Method::GET,
                vec![handler_fn(|req, res| async move {
                    let id = req.param("id").unwrap_or("?").to_string();
                    res.send_raw(format!("user {id}"))?;
                    Ok(())
                })],
            )]),
        );
        Arc::new(Dispatch {
            table,
            middlewares: Vec::new(),
        })
    }

    macro_rules! demo_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::from(demo_dispatch()))
                    .service(
                        web::resource("/users/{id}")
                            .route(web::method(ActixMethod::GET).to(entry))
                            .route(web::method(ActixMethod::HEAD).to(entry))
                            .default_service(web::route().to(miss)),
                    )
                    .default_service(web::route().to(miss)),
            )
        };
    }

    #[actix_web::test]
    async fn test_entry_fills_params_from_match_info() {
        let app = demo_app!().await;
        let req = test::TestRequest::get().uri("/users/42").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(test::read_body(res).await.as_ref(), b"user 42");
    }

    #[actix_web::test]
    async fn test_wrong_method_falls_to_the_canonical_404() {
        let app = demo_app!().await;
        let req = test::TestRequest::delete().uri("/users/42").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status().as_u16(), 404);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["message"], "Route not found");
    }

    #[actix_web::test]
    async fn test_unknown_path_falls_to_the_canonical_404() {
        let app = demo_app!().await;
        let req = test::TestRequest::get().uri("/nowhere").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status().as_u16(), 404);
    }
}
