//! Rouille binding.
//!
//! Rouille is fully synchronous: one handler closure called from a thread
//! pool. Each call digests the request, drives the async pipeline to
//! completion on the shared runtime, and unpacks the result into a
//! `rouille::Response`.

use std::{io::Read, sync::Arc};

use http::Method;
use tokio::runtime::Handle;

use crate::{
    adapters::shared::ShimRouter,
    config::models::AppConfig,
    core::{
        request::CanonicalRequest,
        router::{MiddlewareSpec, RouteSpec, Router},
    },
    ports::engine::{EngineBinding, EngineError, EngineId, EngineResult, ReadyCallback},
};

pub struct RouilleBinding {
    handle: Handle,
    host: String,
    workers: usize,
    router: Router,
}

impl RouilleBinding {
    pub fn new(handle: Handle, config: &AppConfig) -> Self {
        Self {
            handle,
            host: config.server.host.clone(),
            workers: config.server.workers,
            router: Router::new(),
        }
    }
}

impl EngineBinding for RouilleBinding {
    fn engine(&self) -> EngineId {
        EngineId::Rouille
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
        let shim = Arc::new(ShimRouter::build(routes, middlewares)?);
        let handle = self.handle.clone();
        let addr = format!("{}:{}", self.host, port);
        tracing::info!("Starting rouille engine on {addr}");

        let server = rouille::Server::new(&addr, move |request| respond(&shim, &handle, request))
            .map_err(|e| EngineError::Bind {
                addr: addr.clone(),
                source: std::io::Error::other(e.to_string()),
            })?
            .pool_size(self.workers);
        on_ready();
        server.run();
        Ok(())
    }
}

/// Digest one rouille request, run the pipeline, unpack the reply
fn respond(shim: &ShimRouter, handle: &Handle, request: &rouille::Request) -> rouille::Response {
    let method: Method = match request.method().parse() {
        Ok(method) => method,
        Err(_) => return rouille::Response::empty_400(),
    };

    let mut body = Vec::new();
    if let Some(mut data) = request.data()
        && let Err(e) = data.read_to_end(&mut body)
    {
        tracing::warn!("failed to read request body: {e}");
        return rouille::Response::empty_400();
    }

    // rouille decodes the path itself; the query string stays raw
    let mut canonical = CanonicalRequest::new(method, request.url())
        .with_headers(request.headers().map(|(n, v)| (n.to_string(), v.to_string())))
        .with_body(body)
        .with_remote_addr(*request.remote_addr());
    let query = request.raw_query_string();
    if !query.is_empty() {
        canonical = canonical.with_query(query);
    }

    let parts = handle.block_on(shim.dispatch(canonical));

    rouille::Response {
        status_code: parts.status,
        headers: parts
            .headers
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect(),
        data: rouille::ResponseBody::from_data(parts.body.to_vec()),
        upgrade: None,
    }
}
