//! Baseline middleware units.
//!
//! Each builder returns a [`crate::ports::handler::SharedHandler`] that runs
//! in the canonical pipeline, identically on every engine.

pub mod body_limit;
pub mod cookies;
pub mod cors;
pub mod rate_limit;
pub mod request_log;
pub mod secure_headers;
pub mod static_files;
