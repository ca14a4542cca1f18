//! CORS middleware.
//!
//! Sets the allow headers on every response and answers `OPTIONS`
//! preflights with an empty 204, short-circuiting the pipeline.

use std::sync::Arc;

use http::Method;

use crate::{
    config::models::CorsConfig,
    ports::handler::{SharedHandler, handler_fn},
};

pub fn cors_handler(config: CorsConfig) -> SharedHandler {
    let config = Arc::new(config);
    handler_fn(move |req, res| {
        let config = config.clone();
        async move {
            if let Some(origin) = config.allow_origin_for(req.header("origin")) {
                res.set_header("access-control-allow-origin", &origin);
            }
            res.set_header("access-control-allow-methods", &config.methods.join(", "));
            res.set_header("access-control-allow-headers", &config.headers.join(", "));
            if req.method() == Method::OPTIONS {
                res.set_status(204).send_raw("")?;
            }
            Ok(())
        }
    })
}
