//! Raw hyper 1.x binding.
//!
//! Hyper has no router of its own, so this binding is the thinnest one: an
//! accept loop, a per-connection `service_fn`, and the shared shim for
//! everything behavioral.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, body::Incoming, service::service_fn};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use tokio::{net::TcpListener, runtime::Handle};

use crate::{
    adapters::shared::{ShimRouter, decode_path},
    config::models::AppConfig,
    core::{
        request::CanonicalRequest,
        response::ResponseParts,
        router::{MiddlewareSpec, RouteSpec, Router},
    },
    ports::engine::{EngineBinding, EngineError, EngineId, EngineResult, ReadyCallback},
};

pub struct HyperBinding {
    handle: Handle,
    host: String,
    router: Router,
}

impl HyperBinding {
    pub fn new(handle: Handle, config: &AppConfig) -> Self {
        Self {
            handle,
            host: config.server.host.clone(),
            router: Router::new(),
        }
    }
}

impl EngineBinding for HyperBinding {
    fn engine(&self) -> EngineId {
        EngineId::Hyper
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
        tracing::info!("Starting hyper engine on {addr}");
        self.handle.clone().block_on(serve(shim, addr, on_ready))
    }
}

async fn serve(shim: Arc<ShimRouter>, addr: String, on_ready: ReadyCallback) -> EngineResult<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| EngineError::Bind {
            addr: addr.clone(),
            source,
        })?;
    on_ready();

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!("accept failed: {e}");
                continue;
            }
        };

        let shim = shim.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |native| {
                let shim = shim.clone();
                async move { Ok::<_, Infallible>(handle(shim, native, peer).await) }
            });
            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                tracing::debug!("connection closed with error: {e}");
            }
        });
    }
}

/// Digest one hyper request, run the pipeline, render the reply
async fn handle(
    shim: Arc<ShimRouter>,
    native: Request<Incoming>,
    peer: SocketAddr,
) -> Response<Full<Bytes>> {
    let (parts, body) = native.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!("failed to read request body: {e}");
            return plain_response(400, "bad request body");
        }
    };

    let headers = parts.headers.iter().map(|(name, value)| {
        (
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
    });

    let mut canonical = CanonicalRequest::new(parts.method, decode_path(parts.uri.path()))
        .with_headers(headers)
        .with_body(body)
        .with_remote_addr(peer);
    if let Some(query) = parts.uri.query() {
        canonical = canonical.with_query(query);
    }

    render(shim.dispatch(canonical).await)
}

fn render(parts: ResponseParts) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(parts.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in &parts.headers {
        builder = builder.header(name, value);
    }
    builder.body(Full::new(parts.body)).unwrap_or_else(|e| {
        tracing::warn!("failed to assemble response: {e}");
        plain_response(500, "response assembly failed")
    })
}

fn plain_response(status: u16, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::copy_from_slice(message.as_bytes())));
    *response.status_mut() =
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_copies_status_and_headers() {
        let rendered = render(ResponseParts {
            status: 201,
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("set-cookie".to_string(), "a=1; Path=/".to_string()),
                ("set-cookie".to_string(), "b=2; Path=/".to_string()),
            ],
            body: Bytes::from_static(b"{}"),
            sent: true,
        });

        assert_eq!(rendered.status(), StatusCode::CREATED);
        assert_eq!(
            rendered.headers().get_all("set-cookie").iter().count(),
            2
        );
    }

    #[test]
    fn test_render_falls_back_on_invalid_status() {
        let rendered = render(ResponseParts {
            status: 1,
            headers: Vec::new(),
            body: Bytes::new(),
            sent: true,
        });
        assert_eq!(rendered.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
