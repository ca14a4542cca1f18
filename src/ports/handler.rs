use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{
    request::CanonicalRequest,
    response::{CanonicalResponse, ResponseError},
};

/// Custom error type for handler and middleware execution
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    /// Error caused by a malformed or unprocessable request
    #[error("Request error: {0}")]
    Request(String),

    /// Error raised inside handler logic
    #[error("Internal error: {0}")]
    Internal(String),

    /// Error bubbled up from the canonical response
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),
}

/// Result type alias for handler operations
pub type HandlerResult = Result<(), HandlerError>;

/// Handler defines the port (interface) for a request-processing unit.
///
/// Middleware and route handlers share this contract: a unit receives the
/// canonical request and a handle to the canonical response. Flow control is
/// implicit; a unit that sends the response short-circuits the rest of the
/// pipeline, while a unit that leaves it unsent lets the next one run.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Process one request step
    ///
    /// # Arguments
    /// * `req` - The canonical request, shared across the pipeline
    /// * `res` - Handle to the canonical response
    async fn call(&self, req: Arc<CanonicalRequest>, res: CanonicalResponse) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, req: Arc<CanonicalRequest>, res: CanonicalResponse) -> HandlerResult {
        (self)(req, res).await
    }
}

/// Shared reference to a handler unit
pub type SharedHandler = Arc<dyn Handler>;

/// Wrap an async closure into a shared handler unit
pub fn handler_fn<F, Fut>(f: F) -> SharedHandler
where
    F: Fn(Arc<CanonicalRequest>, CanonicalResponse) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}
