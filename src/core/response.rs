//! Engine-neutral response model.
//!
//! A [`CanonicalResponse`] is a cheap-clone handle over shared mutable
//! state. Handlers and middleware stage status/headers/cookies with
//! chainable setters, then exactly one terminal op commits the body. The
//! owning binding drains the final state with [`CanonicalResponse::finish`]
//! and writes it to the wire.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Custom error type for response operations
#[derive(Error, Debug)]
pub enum ResponseError {
    /// A terminal operation ran on a response that was already sent
    #[error("response already sent")]
    AlreadySent,

    /// The payload could not be serialized to JSON
    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Final state handed to a binding after the pipeline ran
#[derive(Debug, Clone)]
pub struct ResponseParts {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub sent: bool,
}

#[derive(Debug)]
struct ResponseCore {
    status: u16,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    body: Bytes,
    sent: bool,
}

/// Shared handle to one in-flight response.
///
/// Clones observe the same state, so a middleware and the handler behind it
/// can both touch the response without handing it back explicitly.
#[derive(Debug, Clone)]
pub struct CanonicalResponse {
    core: Arc<Mutex<ResponseCore>>,
}

impl Default for CanonicalResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl CanonicalResponse {
    pub fn new() -> Self {
        Self {
            core: Arc::new(Mutex::new(ResponseCore {
                status: 200,
                headers: Vec::new(),
                cookies: Vec::new(),
                body: Bytes::new(),
                sent: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResponseCore> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stage the status code. Ignored with a warning once sent.
    pub fn set_status(&self, status: u16) -> &Self {
        let mut core = self.lock();
        if core.sent {
            warn!(status, "set_status after send, ignoring");
        } else {
            core.status = status;
        }
        self
    }

    /// Stage a header. Repeated names replace, except `set-cookie` which
    /// accumulates.
    pub fn set_header(&self, name: &str, value: &str) -> &Self {
        let mut core = self.lock();
        if core.sent {
            warn!(header = name, "set_header after send, ignoring");
            return self;
        }
        let lowered = name.to_ascii_lowercase();
        if lowered != "set-cookie" {
            core.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        }
        core.headers.push((lowered, value.to_string()));
        self
    }

    /// Stage a cookie, merged into `Set-Cookie` headers at finish
    pub fn set_cookie(&self, name: &str, value: &str) -> &Self {
        let mut core = self.lock();
        if core.sent {
            warn!(cookie = name, "set_cookie after send, ignoring");
            return self;
        }
        core.cookies.push((name.to_string(), value.to_string()));
        self
    }

    /// Whether a terminal operation has committed this response
    pub fn is_sent(&self) -> bool {
        self.lock().sent
    }

    /// Currently staged status code
    pub fn status(&self) -> u16 {
        self.lock().status
    }

    /// Staged value of a header, if any
    pub fn header(&self, name: &str) -> Option<String> {
        self.lock()
            .headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    /// Terminal: serialize `payload` as JSON and commit.
    ///
    /// Sets `content-type: application/json` unless one was staged already.
    /// A serialization failure leaves the response unsent.
    pub fn send_json<T: Serialize + ?Sized>(&self, payload: &T) -> Result<(), ResponseError> {
        let body = serde_json::to_vec(payload)?;
        let mut core = self.lock();
        if core.sent {
            return Err(ResponseError::AlreadySent);
        }
        if !core.headers.iter().any(|(n, _)| n == "content-type") {
            core.headers
                .push(("content-type".to_string(), "application/json".to_string()));
        }
        core.body = Bytes::from(body);
        core.sent = true;
        Ok(())
    }

    /// Terminal: commit `body` with whatever status/headers were staged
    pub fn send_raw(&self, body: impl Into<Bytes>) -> Result<(), ResponseError> {
        let mut core = self.lock();
        if core.sent {
            return Err(ResponseError::AlreadySent);
        }
        core.body = body.into();
        core.sent = true;
        Ok(())
    }

    /// Terminal: redirect to `location`.
    ///
    /// Keeps a staged 3xx status, otherwise forces 302.
    pub fn redirect(&self, location: &str) -> Result<(), ResponseError> {
        let mut core = self.lock();
        if core.sent {
            return Err(ResponseError::AlreadySent);
        }
        if !(300..400).contains(&core.status) {
            core.status = 302;
        }
        core.headers
            .retain(|(n, _)| !n.eq_ignore_ascii_case("location"));
        core.headers
            .push(("location".to_string(), location.to_string()));
        core.sent = true;
        Ok(())
    }

    /// Drain the final state for the wire.
    ///
    /// Cookies become `set-cookie: name=value; Path=/` headers. Callable on
    /// an unsent response too, so layered bindings can merge staged headers
    /// from middleware that never sent; `sent` tells the two apart.
    pub fn finish(&self) -> ResponseParts {
        let core = self.lock();
        let mut headers = core.headers.clone();
        for (name, value) in &core.cookies {
            headers.push(("set-cookie".to_string(), format!("{name}={value}; Path=/")));
        }
        ResponseParts {
            status: core.status,
            headers,
            body: core.body.clone(),
            sent: core.sent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_json_sets_content_type_once() {
        let res = CanonicalResponse::new();
        res.set_status(201).send_json(&serde_json::json!({"ok": true})).unwrap();
        let parts = res.finish();
        assert_eq!(parts.status, 201);
        assert!(parts.sent);
        assert_eq!(
            parts
                .headers
                .iter()
                .filter(|(n, _)| n == "content-type")
                .count(),
            1
        );
        assert_eq!(parts.body.as_ref(), br#"{"ok":true}"#);
    }

    #[test]
    fn test_second_terminal_errors_and_body_is_unchanged() {
        let res = CanonicalResponse::new();
        res.send_raw("first").unwrap();
        let err = res.send_raw("second").unwrap_err();
        assert!(matches!(err, ResponseError::AlreadySent));
        assert_eq!(res.finish().body.as_ref(), b"first");
    }

    #[test]
    fn test_setters_after_send_are_ignored() {
        let res = CanonicalResponse::new();
        res.set_status(200).send_raw("done").unwrap();
        res.set_status(500).set_header("x-late", "1");
        let parts = res.finish();
        assert_eq!(parts.status, 200);
        assert!(!parts.headers.iter().any(|(n, _)| n == "x-late"));
    }

    #[test]
    fn test_clones_share_state() {
        let res = CanonicalResponse::new();
        let other = res.clone();
        other.set_status(418);
        res.send_raw("teapot").unwrap();
        assert!(other.is_sent());
        assert_eq!(other.finish().status, 418);
    }

    #[test]
    fn test_redirect_forces_302_and_location() {
        let res = CanonicalResponse::new();
        res.redirect("/login").unwrap();
        let parts = res.finish();
        assert_eq!(parts.status, 302);
        assert!(parts
            .headers
            .iter()
            .any(|(n, v)| n == "location" && v == "/login"));
        assert!(matches!(
            res.redirect("/again").unwrap_err(),
            ResponseError::AlreadySent
        ));
    }

    #[test]
    fn test_finish_merges_cookies_into_set_cookie() {
        let res = CanonicalResponse::new();
        res.set_cookie("session", "abc").set_cookie("theme", "dark");
        res.send_raw("").unwrap();
        let parts = res.finish();
        let cookies: Vec<_> = parts
            .headers
            .iter()
            .filter(|(n, _)| n == "set-cookie")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(cookies, vec!["session=abc; Path=/", "theme=dark; Path=/"]);
    }

    #[test]
    fn test_set_header_replaces_except_set_cookie() {
        let res = CanonicalResponse::new();
        res.set_header("X-One", "a").set_header("x-one", "b");
        res.set_header("set-cookie", "a=1").set_header("Set-Cookie", "b=2");
        let parts = res.finish();
        assert_eq!(
            parts.headers.iter().filter(|(n, _)| n == "x-one").count(),
            1
        );
        assert_eq!(res.header("x-one").as_deref(), Some("b"));
        assert_eq!(
            parts
                .headers
                .iter()
                .filter(|(n, _)| n == "set-cookie")
                .count(),
            2
        );
    }
}
