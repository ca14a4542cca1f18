//! Route node context.
//!
//! A node factory receives a `NodeContext`, registers handlers into it and
//! hands it back; discovery then mounts the node's router under its
//! segment. Every registered handler is wrapped with the node's error
//! guard, so a failure is journaled and answered with a 500 envelope
//! instead of escaping the node.

use std::{future::Future, sync::Arc};

use http::Method;
use thiserror::Error;

use crate::{
    core::{request::CanonicalRequest, response::CanonicalResponse, router::Router},
    ports::handler::{HandlerResult, SharedHandler, handler_fn},
    routes::{
        envelope::{Responder, ResponseKind, error_body},
        error_log::{ErrorLog, backtrace_string},
    },
};

/// Custom error type for node initialization
#[derive(Error, Debug)]
pub enum NodeError {
    /// The node factory could not build its routes
    #[error("node init failed: {0}")]
    Init(String),
}

/// Registration surface handed to one node factory
pub struct NodeContext {
    segment: String,
    kind: ResponseKind,
    errors: ErrorLog,
    router: Router,
}

impl NodeContext {
    pub fn new(segment: impl Into<String>, kind: ResponseKind, errors: ErrorLog) -> Self {
        Self {
            segment: segment.into(),
            kind,
            errors,
            router: Router::new(),
        }
    }

    /// Path segment this node mounts under
    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// This node's error journal
    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    /// Responder bound to this node's envelope kind
    pub fn responder(&self) -> Responder {
        Responder::new(self.kind)
    }

    /// Register a guarded handler for `method` at `path` (node-relative)
    pub fn route<F, Fut>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let guarded = guard(self.errors.clone(), handler_fn(handler));
        self.router.route_shared(method, path, guarded);
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

    /// Register a node-scoped middleware (unguarded; dispatch handles its
    /// errors)
    pub fn use_middleware<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.router.use_middleware(handler);
        self
    }

    /// Consume the context, yielding the router to mount
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Wrap a handler so an `Err` is journaled and, if the response is still
/// open, answered with a 500 envelope. The guarded handler itself always
/// returns `Ok`.
fn guard(errors: ErrorLog, handler: SharedHandler) -> SharedHandler {
    handler_fn(move |req, res| {
        let errors = errors.clone();
        let handler = handler.clone();
        async move {
            if let Err(e) = handler.call(req, res.clone()).await {
                let message = e.to_string();
                tracing::error!("handler failed: {message}");
                errors.record(&message, backtrace_string());
                if !res.is_sent() {
                    res.set_status(500);
                    res.send_json(&error_body(500, &message))?;
                }
            }
            Ok(())
        }
    })
}
