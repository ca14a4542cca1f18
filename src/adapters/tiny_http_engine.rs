//! tiny_http binding.
//!
//! tiny_http exposes a blocking accept queue and nothing else. A small
//! worker pool pulls requests off the shared queue; each worker digests,
//! drives the async pipeline on the shared runtime, and writes the reply
//! back through the queue's responder.

use std::{io::Read, sync::Arc};

use http::Method;
use tokio::runtime::Handle;

use crate::{
    adapters::shared::{ShimRouter, decode_path, split_target},
    config::models::AppConfig,
    core::{
        request::CanonicalRequest,
        router::{MiddlewareSpec, RouteSpec, Router},
    },
    ports::engine::{EngineBinding, EngineError, EngineId, EngineResult, ReadyCallback},
};

pub struct TinyHttpBinding {
    handle: Handle,
    host: String,
    workers: usize,
    router: Router,
}

impl TinyHttpBinding {
    pub fn new(handle: Handle, config: &AppConfig) -> Self {
        Self {
            handle,
            host: config.server.host.clone(),
            workers: config.server.workers,
            router: Router::new(),
        }
    }
}

impl EngineBinding for TinyHttpBinding {
    fn engine(&self) -> EngineId {
        EngineId::TinyHttp
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
        let addr = format!("{}:{}", self.host, port);

        let server =
            Arc::new(
                tiny_http::Server::http(&addr).map_err(|e| EngineError::Bind {
                    addr: addr.clone(),
                    source: std::io::Error::other(e.to_string()),
                })?,
            );
        tracing::info!(
            "Starting tiny_http engine on {addr} with {} workers",
            self.workers
        );
        on_ready();

        let mut guards = Vec::with_capacity(self.workers);
        for worker in 0..self.workers {
            let server = server.clone();
            let shim = shim.clone();
            let handle = self.handle.clone();
            let guard = std::thread::Builder::new()
                .name(format!("manifold-tiny-http-{worker}"))
                .spawn(move || {
                    for request in server.incoming_requests() {
                        handle_one(&shim, &handle, request);
                    }
                })
                .map_err(|e| EngineError::Runtime(e.to_string()))?;
            guards.push(guard);
        }
        for guard in guards {
            if guard.join().is_err() {
                return Err(EngineError::Runtime("worker thread panicked".to_string()));
            }
        }
        Ok(())
    }
}

/// Digest one queued request, run the pipeline, write the reply
fn handle_one(shim: &ShimRouter, handle: &Handle, mut request: tiny_http::Request) {
    let method: Method = match request.method().as_str().parse() {
        Ok(method) => method,
        Err(_) => {
            respond_or_log(request, tiny_http::Response::empty(400));
            return;
        }
    };

    let headers: Vec<(String, String)> = request
        .headers()
        .iter()
        .map(|h| {
            (
                h.field.as_str().as_str().to_string(),
                h.value.as_str().to_string(),
            )
        })
        .collect();
    let peer = request.remote_addr().copied();

    let mut body = Vec::new();
    if let Err(e) = request.as_reader().read_to_end(&mut body) {
        tracing::warn!("failed to read request body: {e}");
        respond_or_log(request, tiny_http::Response::empty(400));
        return;
    }

    let (raw_path, query) = split_target(request.url());
    let mut canonical = CanonicalRequest::new(method, decode_path(raw_path))
        .with_headers(headers)
        .with_body(body);
    if let Some(query) = query {
        canonical = canonical.with_query(query);
    }
    if let Some(peer) = peer {
        canonical = canonical.with_remote_addr(peer);
    }

    let parts = handle.block_on(shim.dispatch(canonical));
    let headers = convert_headers(&parts.headers);
    let body = parts.body.to_vec();
    let length = body.len();
    let response = tiny_http::Response::new(
        tiny_http::StatusCode(parts.status),
        headers,
        std::io::Cursor::new(body),
        Some(length),
        None,
    );
    respond_or_log(request, response);
}

fn respond_or_log<R: Read>(request: tiny_http::Request, response: tiny_http::Response<R>) {
    if let Err(e) = request.respond(response) {
        tracing::debug!("failed to respond: {e}");
    }
}

fn convert_headers(headers: &[(String, String)]) -> Vec<tiny_http::Header> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
        })
        .collect()
}
