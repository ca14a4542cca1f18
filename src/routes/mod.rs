//! Convention-based route tree.
//!
//! Nodes are declared in a compile-time [`HandlerRegistry`]; discovery runs
//! every factory concurrently, mounts each successful node under
//! `/<segment>` and isolates failures per node. Segments starting with
//! [`EXCLUSION_PREFIX`] are skipped.

pub mod envelope;
pub mod error_log;
pub mod node;

use std::path::Path;

use futures_util::future::{BoxFuture, join_all};

pub use envelope::{Responder, ResponseKind};
pub use error_log::{Captured, ErrorLog, capture};
pub use node::{NodeContext, NodeError};

use crate::{context::AppContext, core::universal::UniversalAdapter};

/// Segments starting with this are never mounted
pub const EXCLUSION_PREFIX: char = '_';

/// Builds one node's routes into the supplied context.
///
/// A plain `fn` pointer keeps the registry a compile-time table.
pub type NodeFactory = fn(NodeContext) -> BoxFuture<'static, Result<NodeContext, NodeError>>;

/// One registered node
#[derive(Clone, Copy)]
pub struct RegistryEntry {
    pub segment: &'static str,
    pub kind: ResponseKind,
    pub build: NodeFactory,
}

/// Compile-time route tree declaration
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<RegistryEntry>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a JSON node
    pub fn register(&mut self, segment: &'static str, build: NodeFactory) -> &mut Self {
        self.register_with(segment, ResponseKind::Json, build)
    }

    /// Register a node with an explicit envelope kind
    pub fn register_with(
        &mut self,
        segment: &'static str,
        kind: ResponseKind,
        build: NodeFactory,
    ) -> &mut Self {
        self.entries.push(RegistryEntry {
            segment,
            kind,
            build,
        });
        self
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }
}

/// What discovery did, in mount order
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub mounted: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, NodeError)>,
}

/// Split registry entries into lexicographically ordered buildable nodes
/// and skipped segments
fn partition_entries(entries: &[RegistryEntry]) -> (Vec<RegistryEntry>, Vec<String>) {
    let mut included: Vec<RegistryEntry> = Vec::new();
    let mut skipped = Vec::new();
    for entry in entries {
        if entry.segment.starts_with(EXCLUSION_PREFIX) {
            skipped.push(entry.segment.to_string());
        } else {
            included.push(*entry);
        }
    }
    included.sort_by_key(|e| e.segment);
    (included, skipped)
}

/// Build and mount every registered node.
///
/// Factories run concurrently; one node failing to initialize never stops
/// its siblings. Deterministic: the same registry yields the same report
/// and the same mounts.
pub async fn discover(
    registry: &HandlerRegistry,
    ctx: &AppContext,
    adapter: &mut UniversalAdapter,
) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();
    let (included, skipped) = partition_entries(registry.entries());
    for segment in &skipped {
        tracing::info!("Skipping excluded segment: {segment}");
    }
    report.skipped = skipped;

    let state_dir = ctx.config().handlers.state_dir.clone();
    let mut segments = Vec::with_capacity(included.len());
    let mut futures = Vec::with_capacity(included.len());
    for entry in included {
        let errors = ErrorLog::open(Path::new(&state_dir).join(entry.segment));
        let node = NodeContext::new(entry.segment, entry.kind, errors);
        segments.push(entry.segment);
        futures.push((entry.build)(node));
    }

    let results = join_all(futures).await;
    for (segment, result) in segments.into_iter().zip(results) {
        match result {
            Ok(node) => {
                adapter.inject_router(&format!("/{segment}"), node.into_router());
                tracing::info!("Mounted route node at /{segment}");
                report.mounted.push(segment.to_string());
            }
            Err(e) => {
                tracing::error!("Failed to initialize node '{segment}': {e}");
                report.failed.push((segment.to_string(), e));
            }
        }
    }
    report
}
