//! Manifold - one service codebase, any HTTP engine.
//!
//! Manifold is a universal backend adapter implementing a **hexagonal architecture**.
//! Routes, middleware, and response envelopes are declared once against a canonical
//! request/response model; at startup the service binds to whichever HTTP engine is
//! compiled in and preferred, and behaves identically on all of them. This library
//! exposes the core building blocks so you can embed the adapter or compose parts of
//! it inside your own application.
//!
//! # Features
//! - One registration surface (`get`/`post`/`use_middleware`/routers) over five engines:
//!   `axum`, `actix-web`, raw `hyper`, `rouille`, and `tiny_http`
//! - Engine detection at startup honoring a configured preference with fallback
//! - Express-style `:param` path captures, scoped middleware, and router mounting
//! - Convention-based route discovery with per-node failure isolation
//! - Response envelopes (JSON / HTML / text / stream) with canonical error bodies
//! - Baseline middleware: static files, body limits, CORS, secure headers,
//!   rate limiting, request logging, cookie parsing
//! - Configuration loading with layered overrides and full upfront validation
//! - Structured tracing via `tracing`
//!
//! # Quick Example
//! ```no_run
//! use manifold::{AppContext, UniversalAdapter, app, config::AppConfig, routes};
//!
//! # fn main() -> eyre::Result<()> {
//! let config = AppConfig::default();
//! let port = config.server.port;
//! let ctx = AppContext::new(config)?;
//! let mut adapter = UniversalAdapter::bind(&ctx)?;
//! adapter.setup_baseline(ctx.config());
//! ctx.block_on(routes::discover(&app::registry(), &ctx, &mut adapter));
//! adapter.listen(port, Box::new(|| println!("ready")))?;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (engine bindings) while
//! keeping business logic inside `core`. End users should prefer the re-exports
//! documented below instead of reaching into internal modules directly.
//!
//! # Error Handling
//! All fallible APIs return `eyre::Result<T>` or a domain specific error type. A custom
//! error context is always attached using `WrapErr` for debuggability.
//!
//! # Feature Flags
//! Each engine binding sits behind a Cargo feature (`engine-axum`, `engine-actix`,
//! `engine-hyper`, `engine-rouille`, `engine-tiny-http`); all are enabled by default.
// Re-export public modules with explicit visibility controls
pub mod app;
pub mod config;
pub mod context;
pub mod ports;
pub mod routes;
pub mod tracing_setup;

// These modules are implementation details and should not be directly used by users
pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    context::AppContext,
    core::{CanonicalRequest, CanonicalResponse, Router, UniversalAdapter},
    ports::{EngineBinding, EngineError, EngineId},
    routes::{HandlerRegistry, NodeContext},
};
