//! Per-node error journal.
//!
//! Each route node owns a JSON-array file `<state_dir>/<segment>/_errors.json`.
//! Recording is fire-and-forget: entries flow over an unbounded channel to a
//! single writer task per node, so handlers never block on disk and
//! concurrent appends cannot interleave. A corrupt or missing file is
//! replaced with a fresh array rather than failing the append.

use std::{
    backtrace::{Backtrace, BacktraceStatus},
    fmt::Display,
    future::Future,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// File name of the journal inside a node's state directory
pub const ERROR_LOG_FILE: &str = "_errors.json";

/// One journal entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Handle to one node's journal. Cloneable; all clones feed the same
/// writer task.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: Arc<PathBuf>,
    tx: mpsc::UnboundedSender<ErrorRecord>,
}

impl ErrorLog {
    /// Open the journal for a node state directory and spawn its writer.
    ///
    /// Must run inside a tokio runtime; the writer task lives until the
    /// last handle drops.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let path = Arc::new(dir.into().join(ERROR_LOG_FILE));
        let (tx, mut rx) = mpsc::unbounded_channel::<ErrorRecord>();

        let writer_path = path.clone();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = append_entry(&writer_path, &record).await {
                    tracing::warn!(
                        "failed to append to {}: {e}",
                        writer_path.display()
                    );
                }
            }
        });

        Self { path, tx }
    }

    /// Journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue an error for the writer. Never blocks, never fails the caller.
    pub fn record(&self, error: &str, stack: Option<String>) {
        let record = ErrorRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            error: error.to_string(),
            stack,
        };
        if self.tx.send(record).is_err() {
            tracing::warn!("error log writer gone, dropping record");
        }
    }
}

/// Read-modify-write append of one record to the JSON array on disk
pub async fn append_entry(path: &Path, record: &ErrorRecord) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut entries: Vec<Value> = match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!("corrupt error log {}, starting fresh: {e}", path.display());
            Vec::new()
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };

    entries.push(serde_json::to_value(record).map_err(io::Error::other)?);
    let rendered = serde_json::to_vec_pretty(&entries).map_err(io::Error::other)?;
    tokio::fs::write(path, rendered).await
}

/// Current backtrace when capture is enabled, `None` otherwise
pub fn backtrace_string() -> Option<String> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

/// Outcome of a captured fallible operation
#[derive(Debug, Clone)]
pub struct Captured {
    pub code: u16,
    pub data: Value,
}

/// Await a fallible operation, journaling the failure.
///
/// `Ok` becomes `success_code` plus the value as JSON; `Err` is recorded to
/// the node's journal and becomes a 500 with the error text as data.
pub async fn capture<T, E, Fut>(log: &ErrorLog, success_code: u16, fut: Fut) -> Captured
where
    T: Serialize,
    E: Display,
    Fut: Future<Output = Result<T, E>>,
{
    match fut.await {
        Ok(value) => match serde_json::to_value(&value) {
            Ok(data) => Captured {
                code: success_code,
                data,
            },
            Err(e) => {
                let message = e.to_string();
                log.record(&message, backtrace_string());
                Captured {
                    code: 500,
                    data: Value::String(message),
                }
            }
        },
        Err(e) => {
            let message = e.to_string();
            log.record(&message, backtrace_string());
            Captured {
                code: 500,
                data: Value::String(message),
            }
        }
    }
}
