//! Response envelope.
//!
//! Error responses share one shape everywhere:
//! `{"error": <reason phrase>, "message": <payload>}`. Success responses
//! pass the payload through untouched, serialized per the node's
//! [`ResponseKind`]. Reason phrases come from exactly one table,
//! `http::StatusCode::canonical_reason`.

use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    core::response::CanonicalResponse,
    ports::handler::{HandlerError, HandlerResult},
};

/// How a node serializes success payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    #[default]
    Json,
    Html,
    Text,
    Stream,
}

/// Reason phrase for a status code, `"Unknown Error"` when off the table
pub fn reason_phrase(code: u16) -> &'static str {
    http::StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown Error")
}

/// Error envelope with an arbitrary JSON payload as the message
pub fn error_envelope(code: u16, payload: Value) -> Value {
    json!({
        "error": reason_phrase(code),
        "message": payload,
    })
}

/// Error envelope with a plain string message
pub fn error_body(code: u16, message: &str) -> Value {
    error_envelope(code, Value::String(message.to_string()))
}

/// Bare strings stay bare; everything else serializes as JSON text
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Sends payloads in a node's configured shape.
///
/// Cloneable and cheap; handlers grab one from their
/// [`crate::routes::node::NodeContext`] and call it as the last step.
#[derive(Debug, Clone, Copy)]
pub struct Responder {
    kind: ResponseKind,
}

impl Responder {
    pub fn new(kind: ResponseKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// Send `payload` with `code`.
    ///
    /// Codes >= 400 get the error envelope regardless of kind; success goes
    /// out raw. A JSON payload on a stream node cannot be streamed and
    /// becomes a 500 envelope.
    pub fn send(&self, res: &CanonicalResponse, code: u16, payload: Value) -> HandlerResult {
        if code >= 400 {
            res.set_status(code);
            res.send_json(&error_envelope(code, payload))?;
            return Ok(());
        }
        match self.kind {
            ResponseKind::Json => {
                res.set_status(code);
                res.send_json(&payload)?;
            }
            ResponseKind::Html => {
                res.set_status(code)
                    .set_header("content-type", "text/html; charset=utf-8");
                res.send_raw(value_text(&payload))?;
            }
            ResponseKind::Text => {
                res.set_status(code)
                    .set_header("content-type", "text/plain; charset=utf-8");
                res.send_raw(value_text(&payload))?;
            }
            ResponseKind::Stream => {
                res.set_status(500);
                res.send_json(&error_body(500, "stream payload must be a readable stream"))?;
            }
        }
        Ok(())
    }

    /// Send a readable stream, buffered, as `application/octet-stream`
    pub fn send_stream(
        &self,
        res: &CanonicalResponse,
        code: u16,
        mut reader: impl Read,
    ) -> HandlerResult {
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .map_err(|e| HandlerError::Internal(format!("failed to read stream: {e}")))?;
        res.set_status(code);
        if res.header("content-type").is_none() {
            res.set_header("content-type", "application/octet-stream");
        }
        res.send_raw(buffer)?;
        Ok(())
    }
}
