use thiserror::Error;

use crate::{
    config::models::StaticFilesConfig,
    core::{
        middleware::static_files,
        router::{MiddlewareSpec, RouteSpec, Router},
    },
};

/// Identifier for a supported HTTP engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineId {
    Axum,
    ActixWeb,
    Hyper,
    Rouille,
    TinyHttp,
}

impl EngineId {
    /// Every engine this build knows about, in priority order
    pub const ALL: [EngineId; 5] = [
        EngineId::Axum,
        EngineId::ActixWeb,
        EngineId::Hyper,
        EngineId::Rouille,
        EngineId::TinyHttp,
    ];

    /// Canonical name used in configuration and logs
    pub fn as_str(self) -> &'static str {
        match self {
            EngineId::Axum => "axum",
            EngineId::ActixWeb => "actix-web",
            EngineId::Hyper => "hyper",
            EngineId::Rouille => "rouille",
            EngineId::TinyHttp => "tiny-http",
        }
    }

    /// Cargo feature that compiles this engine in
    pub fn feature(self) -> &'static str {
        match self {
            EngineId::Axum => "engine-axum",
            EngineId::ActixWeb => "engine-actix",
            EngineId::Hyper => "engine-hyper",
            EngineId::Rouille => "engine-rouille",
            EngineId::TinyHttp => "engine-tiny-http",
        }
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EngineId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, EngineError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "axum" => Ok(EngineId::Axum),
            "actix-web" | "actix" => Ok(EngineId::ActixWeb),
            "hyper" => Ok(EngineId::Hyper),
            "rouille" => Ok(EngineId::Rouille),
            "tiny-http" | "tiny_http" => Ok(EngineId::TinyHttp),
            other => Err(EngineError::Unknown(other.to_string())),
        }
    }
}

/// Callback fired once the listening socket is bound
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Custom error type for engine selection and serving
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    /// No compiled engine can serve
    #[error("No supported HTTP engine is available in this build")]
    NoneAvailable,

    /// Engine name not recognized
    #[error("Unknown engine '{0}'")]
    Unknown(String),

    /// Engine recognized but compiled out
    #[error("Engine '{name}' is not available; rebuild with the '{feature}' feature", name = .0.as_str(), feature = .0.feature())]
    Unavailable(EngineId),

    /// Route rejected by the engine's native table
    #[error("Invalid route '{path}': {reason}")]
    Route { path: String, reason: String },

    /// Listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Engine terminated abnormally while serving
    #[error("Engine runtime failure: {0}")]
    Runtime(String),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// EngineBinding defines the port (interface) between the universal adapter
/// facade and one concrete HTTP engine.
///
/// Registration methods only accumulate canonical specs; a binding
/// materializes its native routing structures when
/// [`listen`](EngineBinding::listen) runs. That keeps registration order,
/// fallback wiring, and the HEAD polyfill identical across engines.
pub trait EngineBinding: Send {
    /// Engine served by this binding
    fn engine(&self) -> EngineId;

    /// Register a single route at an absolute canonical path.
    ///
    /// Registration cannot fail; a path the native router rejects surfaces
    /// from [`listen`](EngineBinding::listen) as [`EngineError::Route`].
    fn register_route(&mut self, route: RouteSpec);

    /// Register a middleware unit, optionally scoped to a path prefix
    fn register_middleware(&mut self, middleware: MiddlewareSpec);

    /// Mount a canonical sub-router under a path prefix
    fn mount_router(&mut self, prefix: &str, router: Router);

    /// Create a detached canonical router for later mounting
    fn create_router(&self, prefix: &str) -> Router {
        Router::with_prefix(prefix)
    }

    /// Install static file serving
    ///
    /// The default goes through the canonical static middleware; bindings
    /// with a native equivalent may override.
    fn install_static(&mut self, config: &StaticFilesConfig) {
        self.register_middleware(MiddlewareSpec::global(static_files::static_handler(
            config.clone(),
        )))
    }

    /// Bind the listening socket and serve until the process exits
    ///
    /// # Arguments
    /// * `port` - TCP port to bind (host comes from configuration)
    /// * `on_ready` - Fired once the socket is bound
    ///
    /// Blocks the calling thread; returns only on a fatal engine error.
    fn listen(self: Box<Self>, port: u16, on_ready: ReadyCallback) -> EngineResult<()>;
}
