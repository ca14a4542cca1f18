//! Pipeline execution shared by every engine binding.
//!
//! Runs the middleware chain, then a matched handler chain, and applies the
//! parity rules: an unmatched path or method gets the JSON 404 body, a
//! matched chain that never sends gets it too, and a handler error with the
//! response still open becomes a 500 envelope.

use std::{sync::Arc, time::Instant};

use crate::{
    core::{
        request::CanonicalRequest,
        response::CanonicalResponse,
        router::FlatMiddleware,
    },
    ports::handler::SharedHandler,
    routes::envelope::error_body,
};

/// Body served for any unmatched path or method
pub const NOT_FOUND_BODY: &str = r#"{"message":"Route not found"}"#;

/// Send the canonical 404 body
pub fn send_not_found(res: &CanonicalResponse) {
    res.set_status(404)
        .set_header("content-type", "application/json");
    if let Err(e) = res.send_raw(NOT_FOUND_BODY) {
        tracing::warn!("failed to send 404 fallback: {e}");
    }
}

/// Send an error envelope, unless the response was already committed
pub fn error_response(res: &CanonicalResponse, status: u16, message: &str) {
    if res.is_sent() {
        tracing::warn!(status, message, "error after response was sent");
        return;
    }
    res.set_status(status);
    if let Err(e) = res.send_json(&error_body(status, message)) {
        tracing::warn!("failed to send error envelope: {e}");
    }
}

/// Whether `path` falls under a middleware scope
pub fn scope_matches(scope: &str, path: &str) -> bool {
    let scope = scope.trim_end_matches('/');
    if scope.is_empty() {
        return true;
    }
    path == scope || path.strip_prefix(scope).is_some_and(|rest| rest.starts_with('/'))
}

/// Run the middleware chain.
///
/// Middleware runs before routing, so the request carries no path
/// parameters here. Returns `true` when a middleware committed the
/// response and dispatch should stop.
pub async fn run_middlewares(
    middlewares: &[FlatMiddleware],
    req: &Arc<CanonicalRequest>,
    res: &CanonicalResponse,
) -> bool {
    for mw in middlewares {
        if let Some(scope) = &mw.scope
            && !scope_matches(scope, req.path())
        {
            continue;
        }
        if let Err(e) = mw.handler.call(req.clone(), res.clone()).await {
            tracing::warn!("middleware failed: {e}");
            error_response(res, 500, &e.to_string());
        }
        if res.is_sent() {
            return true;
        }
    }
    false
}

/// Run a matched handler chain.
///
/// Handlers run in registration order until one commits the response. An
/// error stops the chain; whether the chain ever sent is the caller's
/// problem (the 404 fallback).
pub async fn run_handlers(
    handlers: &[SharedHandler],
    req: &Arc<CanonicalRequest>,
    res: &CanonicalResponse,
) {
    for handler in handlers {
        if res.is_sent() {
            break;
        }
        if let Err(e) = handler.call(req.clone(), res.clone()).await {
            tracing::warn!("handler failed: {e}");
            error_response(res, 500, &e.to_string());
            break;
        }
    }
}

/// Log one finished request in the engine-independent format
pub fn log_completion(req: &CanonicalRequest, status: u16, start: Instant) {
    tracing::info!(
        "Completed {} {} - {} in {:?}",
        req.method(),
        req.path(),
        status,
        start.elapsed()
    );
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::{
        core::router::Router,
        ports::handler::{HandlerError, handler_fn},
    };

    fn request(path: &str) -> Arc<CanonicalRequest> {
        Arc::new(CanonicalRequest::new(Method::GET, path))
    }

    #[test]
    fn test_scope_matches_on_boundaries() {
        assert!(scope_matches("/users", "/users"));
        assert!(scope_matches("/users", "/users/7"));
        assert!(!scope_matches("/users", "/users7"));
        assert!(scope_matches("/", "/anything"));
    }

    #[tokio::test]
    async fn test_middleware_short_circuits_when_it_sends() {
        let mut router = Router::new();
        router.use_middleware(|_req, res| async move {
            res.set_status(204).send_raw("")?;
            Ok(())
        });
        router.use_middleware(|_req, res| async move {
            res.set_status(500).send_raw("must not run")?;
            Ok(())
        });
        let (_, flat) = router.flatten();

        let res = CanonicalResponse::new();
        let stopped = run_middlewares(&flat, &request("/x"), &res).await;
        assert!(stopped);
        assert_eq!(res.finish().status, 204);
    }

    #[tokio::test]
    async fn test_scoped_middleware_skips_other_paths() {
        let mut router = Router::new();
        router.use_at("/admin", |_req, res| async move {
            res.set_status(401).send_raw("")?;
            Ok(())
        });
        let (_, flat) = router.flatten();

        let res = CanonicalResponse::new();
        let stopped = run_middlewares(&flat, &request("/public"), &res).await;
        assert!(!stopped);
        assert!(!res.is_sent());
    }

    #[tokio::test]
    async fn test_handler_error_becomes_500_envelope() {
        let handlers = vec![handler_fn(|_req, _res| async {
            Err(HandlerError::Internal("boom".to_string()))
        })];
        let res = CanonicalResponse::new();
        run_handlers(&handlers, &request("/x"), &res).await;
        let parts = res.finish();
        assert_eq!(parts.status, 500);
        let body: serde_json::Value = serde_json::from_slice(&parts.body).unwrap();
        assert_eq!(body["error"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_chain_falls_through_until_one_sends() {
        let handlers = vec![
            handler_fn(|_req, res| async move {
                res.set_header("x-seen", "1");
                Ok(())
            }),
            handler_fn(|_req, res| async move {
                res.send_raw("second")?;
                Ok(())
            }),
            handler_fn(|_req, res| async move {
                res.send_raw("third")?;
                Ok(())
            }),
        ];
        let res = CanonicalResponse::new();
        run_handlers(&handlers, &request("/x"), &res).await;
        let parts = res.finish();
        assert_eq!(parts.body.as_ref(), b"second");
        assert!(parts.headers.iter().any(|(n, _)| n == "x-seen"));
    }

    #[test]
    fn test_not_found_body_shape() {
        let res = CanonicalResponse::new();
        send_not_found(&res);
        let parts = res.finish();
        assert_eq!(parts.status, 404);
        let body: serde_json::Value = serde_json::from_slice(&parts.body).unwrap();
        assert_eq!(body["message"], "Route not found");
    }
}
