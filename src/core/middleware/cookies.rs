//! Cookie pre-parsing.
//!
//! The cookie view on [`crate::core::request::CanonicalRequest`] is lazy;
//! this middleware warms it so handlers read an already-parsed map, and
//! logs how many cookies arrived.

use crate::ports::handler::{SharedHandler, handler_fn};

pub fn cookies_handler() -> SharedHandler {
    handler_fn(|req, _res| async move {
        let count = req.cookies().len();
        if count > 0 {
            tracing::debug!("Parsed {count} request cookie(s)");
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::Method;

    use super::*;
    use crate::core::{request::CanonicalRequest, response::CanonicalResponse};

    #[tokio::test]
    async fn test_cookie_view_is_warmed() {
        let handler = cookies_handler();
        let req = Arc::new(
            CanonicalRequest::new(Method::GET, "/").with_header("Cookie", "a=1; b=2"),
        );
        handler.call(req.clone(), CanonicalResponse::new()).await.unwrap();
        assert_eq!(req.cookies().len(), 2);
    }
}
