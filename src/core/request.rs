//! Engine-neutral request model.
//!
//! Every binding digests its native request into a [`CanonicalRequest`]
//! before the pipeline runs, so handlers never see engine types. The struct
//! is immutable once built; derived views (parsed query, cookies) are
//! computed on first use and cached.

use std::{borrow::Cow, collections::HashMap, net::SocketAddr, sync::OnceLock};

use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One HTTP request in canonical form.
///
/// Header keys are stored lowercased, so lookups are case-insensitive and
/// duplicate keys collapse to the last value seen. Path parameters are empty
/// until routing has matched; middleware therefore observes an empty map.
#[derive(Debug, Clone)]
pub struct CanonicalRequest {
    method: Method,
    path: String,
    query_raw: Option<String>,
    headers: HashMap<String, String>,
    params: HashMap<String, String>,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    query: OnceLock<HashMap<String, String>>,
    cookies: OnceLock<HashMap<String, String>>,
}

impl CanonicalRequest {
    /// Start a request at a decoded path
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query_raw: None,
            headers: HashMap::new(),
            params: HashMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            query: OnceLock::new(),
            cookies: OnceLock::new(),
        }
    }

    /// Attach the raw query string (without the leading `?`)
    pub fn with_query(mut self, raw: impl Into<String>) -> Self {
        self.query_raw = Some(raw.into());
        self
    }

    /// Attach one header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Attach a batch of headers
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.headers
                .insert(name.as_ref().to_ascii_lowercase(), value.into());
        }
        self
    }

    /// Attach path parameters
    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    /// Attach the buffered request body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach the peer address
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Copy of this request carrying the matched route's path parameters.
    ///
    /// Dispatch builds the request before routing, so middleware sees no
    /// parameters; the matched chain gets this fork instead.
    pub(crate) fn fork_with_params(&self, params: HashMap<String, String>) -> Self {
        let mut forked = self.clone();
        forked.params = params;
        forked
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, if the request had one
    pub fn query_raw(&self) -> Option<&str> {
        self.query_raw.as_deref()
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All headers, keys lowercased
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// One path parameter by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All path parameters
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Buffered request body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as text, lossy on invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as a JSON value; `None` when the body is empty or not JSON
    pub fn body_json(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// Parsed query parameters (unique keys, last value wins)
    pub fn query(&self) -> &HashMap<String, String> {
        self.query.get_or_init(|| match &self.query_raw {
            Some(raw) => url::form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect(),
            None => HashMap::new(),
        })
    }

    /// Parsed cookies from the `Cookie` header
    pub fn cookies(&self) -> &HashMap<String, String> {
        self.cookies.get_or_init(|| {
            let mut cookies = HashMap::new();
            if let Some(header) = self.header("cookie") {
                for pair in header.split(';') {
                    if let Some((name, value)) = pair.split_once('=') {
                        cookies.insert(name.trim().to_string(), value.trim().to_string());
                    }
                }
            }
            cookies
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = CanonicalRequest::new(Method::GET, "/").with_header("Content-Type", "text/html");
        assert_eq!(req.header("content-type"), Some("text/html"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn test_query_parses_lazily_with_unique_keys() {
        let req = CanonicalRequest::new(Method::GET, "/search").with_query("q=one&q=two&page=3");
        assert_eq!(req.query().get("q").map(String::as_str), Some("two"));
        assert_eq!(req.query().get("page").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_cookies_parse_from_header() {
        let req = CanonicalRequest::new(Method::GET, "/")
            .with_header("Cookie", "session=abc123; theme=dark");
        assert_eq!(req.cookies().get("session").map(String::as_str), Some("abc123"));
        assert_eq!(req.cookies().get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn test_body_json_rejects_empty_and_garbage() {
        let empty = CanonicalRequest::new(Method::POST, "/");
        assert!(empty.body_json().is_none());

        let garbage = CanonicalRequest::new(Method::POST, "/").with_body("not json");
        assert!(garbage.body_json().is_none());

        let object = CanonicalRequest::new(Method::POST, "/").with_body(r#"{"name":"Ada"}"#);
        assert_eq!(object.body_json().unwrap()["name"], "Ada");
    }

    #[test]
    fn test_fork_with_params_keeps_base_untouched() {
        let base = CanonicalRequest::new(Method::GET, "/users/7");
        let forked =
            base.fork_with_params(HashMap::from([("id".to_string(), "7".to_string())]));
        assert!(base.params().is_empty());
        assert_eq!(forked.param("id"), Some("7"));
        assert_eq!(forked.path(), "/users/7");
    }
}
