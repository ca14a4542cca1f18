//! Security hardening headers.

use std::sync::Arc;

use crate::{
    config::models::SecureHeadersConfig,
    ports::handler::{SharedHandler, handler_fn},
};

/// Stage the standard hardening headers on every response.
///
/// When CSP directives are configured, the policy string is built once with
/// directives in sorted order so the header is stable across restarts.
pub fn secure_headers_handler(config: SecureHeadersConfig) -> SharedHandler {
    let csp = config.csp.as_ref().map(|csp| {
        let mut directives: Vec<_> = csp.directives.iter().collect();
        directives.sort_by(|a, b| a.0.cmp(b.0));
        directives
            .iter()
            .map(|(name, values)| {
                if values.is_empty() {
                    name.to_string()
                } else {
                    format!("{} {}", name, values.join(" "))
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    });
    let csp = Arc::new(csp);

    handler_fn(move |_req, res| {
        let csp = csp.clone();
        async move {
            res.set_header("x-content-type-options", "nosniff")
                .set_header("x-frame-options", "DENY")
                .set_header("x-xss-protection", "1; mode=block")
                .set_header("referrer-policy", "strict-origin-when-cross-origin");
            if let Some(policy) = csp.as_ref() {
                res.set_header("content-security-policy", policy);
            }
            Ok(())
        }
    })
}
