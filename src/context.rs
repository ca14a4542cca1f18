//! Application context: configuration plus the async runtime.
//!
//! The binary owns a multi-threaded runtime through this context; the
//! blocking engines borrow its handle to drive the async pipeline from
//! their worker threads. Embedders already inside a runtime hand over a
//! handle instead.

use std::future::Future;

use eyre::{Result, WrapErr};
use tokio::runtime::{Handle, Runtime};

use crate::config::models::AppConfig;

enum RuntimeHolder {
    Owned(Runtime),
    External(Handle),
}

pub struct AppContext {
    config: AppConfig,
    runtime: RuntimeHolder,
}

impl AppContext {
    /// Build a context owning its own multi-threaded runtime
    pub fn new(config: AppConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("manifold-worker")
            .build()
            .with_context(|| "Failed to build the async runtime")?;
        Ok(Self {
            config,
            runtime: RuntimeHolder::Owned(runtime),
        })
    }

    /// Build a context on top of an existing runtime's handle
    pub fn with_handle(config: AppConfig, handle: Handle) -> Self {
        Self {
            config,
            runtime: RuntimeHolder::External(handle),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn handle(&self) -> &Handle {
        match &self.runtime {
            RuntimeHolder::Owned(runtime) => runtime.handle(),
            RuntimeHolder::External(handle) => handle,
        }
    }

    /// Drive a future to completion from synchronous code
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        match &self.runtime {
            RuntimeHolder::Owned(runtime) => runtime.block_on(future),
            RuntimeHolder::External(handle) => handle.block_on(future),
        }
    }
}
