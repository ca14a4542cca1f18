//! Request id assignment and arrival logging.
//!
//! Completion logging with latency lives in dispatch, which sees the final
//! status on every engine.

use uuid::Uuid;

use crate::ports::handler::{SharedHandler, handler_fn};

pub fn request_log_handler() -> SharedHandler {
    handler_fn(|req, res| async move {
        let request_id = Uuid::new_v4().to_string();
        res.set_header("x-request-id", &request_id);
        tracing::info!("Started {} {} [{}]", req.method(), req.path(), request_id);
        Ok(())
    })
}
