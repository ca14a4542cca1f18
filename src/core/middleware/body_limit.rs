//! Request body size guard.

use crate::{
    ports::handler::{SharedHandler, handler_fn},
    routes::envelope::error_body,
};

/// Default cap when the config section leaves `limit_bytes` unset (1 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Reject requests whose buffered body exceeds `limit` with a 413 envelope
pub fn body_guard(limit: usize) -> SharedHandler {
    handler_fn(move |req, res| async move {
        if req.body().len() > limit {
            tracing::warn!(
                size = req.body().len(),
                limit,
                "request body over limit"
            );
            res.set_status(413);
            res.send_json(&error_body(413, "request body too large"))?;
        }
        Ok(())
    })
}
