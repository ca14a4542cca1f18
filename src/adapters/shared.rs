//! Routing shim shared by the engines without a usable native router.
//!
//! Hyper, Rouille and tiny_http hand us little more than a method and a
//! target string. This module gives them the canonical behavior: a matchit
//! trie over the flattened routes, the middleware pass, the HEAD-to-GET
//! polyfill and the JSON 404 fallback.

use std::{collections::HashMap, sync::Arc, time::Instant};

use bytes::Bytes;
use http::Method;

use crate::{
    core::{
        dispatch::{log_completion, run_handlers, run_middlewares, send_not_found},
        request::CanonicalRequest,
        response::{CanonicalResponse, ResponseParts},
        router::{FlatMiddleware, FlatRoute},
    },
    ports::{
        engine::{EngineError, EngineResult},
        handler::SharedHandler,
    },
};

/// Rewrite `:name` path parameters into the `{name}` syntax matchit
/// (and actix) expect
pub fn to_native_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a request target into path and raw query
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

/// Percent-decode a path, falling back to the raw text on bad encoding
pub fn decode_path(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Materialized routing table plus the ordered middleware chain.
///
/// Duplicate `(path, method)` registrations merge into one handler chain in
/// registration order, which preserves the first-send-wins behavior.
pub struct ShimRouter {
    trie: matchit::Router<HashMap<Method, Vec<SharedHandler>>>,
    middlewares: Vec<FlatMiddleware>,
}

impl ShimRouter {
    /// Build the trie from flattened registrations
    pub fn build(
        routes: Vec<FlatRoute>,
        middlewares: Vec<FlatMiddleware>,
    ) -> EngineResult<Self> {
        let mut grouped: HashMap<String, HashMap<Method, Vec<SharedHandler>>> = HashMap::new();
        for route in routes {
            grouped
                .entry(to_native_path(&route.path))
                .or_default()
                .entry(route.method)
                .or_default()
                .extend(route.handlers);
        }

        let mut trie = matchit::Router::new();
        for (path, methods) in grouped {
            trie.insert(path.clone(), methods)
                .map_err(|e| EngineError::Route {
                    path,
                    reason: e.to_string(),
                })?;
        }

        Ok(Self { trie, middlewares })
    }

    /// Run one digested request through the full pipeline
    pub async fn dispatch(&self, req: CanonicalRequest) -> ResponseParts {
        let start = Instant::now();
        let req = Arc::new(req);
        let res = CanonicalResponse::new();

        if run_middlewares(&self.middlewares, &req, &res).await {
            return complete(&req, res, start);
        }

        match self.lookup(req.method(), req.path()) {
            Some((handlers, params)) => {
                let routed = Arc::new(req.fork_with_params(params));
                run_handlers(&handlers, &routed, &res).await;
                if !res.is_sent() {
                    send_not_found(&res);
                }
            }
            None => send_not_found(&res),
        }

        complete(&req, res, start)
    }

    /// Find the handler chain for a method and path.
    ///
    /// A path that matches with the wrong method is treated like no match;
    /// the fallback sends 404, never 405. HEAD borrows the GET chain when no
    /// explicit HEAD route exists.
    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Vec<SharedHandler>, HashMap<String, String>)> {
        let matched = self.trie.at(path).ok()?;
        let chain = match matched.value.get(method) {
            Some(chain) => chain.clone(),
            None if *method == Method::HEAD => matched.value.get(&Method::GET)?.clone(),
            None => return None,
        };
        let params = matched
            .params
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Some((chain, params))
    }
}

/// Drain the response, strip HEAD bodies and log the completion line
pub(crate) fn complete(
    req: &CanonicalRequest,
    res: CanonicalResponse,
    start: Instant,
) -> ResponseParts {
    let mut parts = res.finish();
    if req.method() == Method::HEAD {
        parts.body = Bytes::new();
    }
    log_completion(req, parts.status, start);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::router::Router;

    fn build_shim(configure: impl FnOnce(&mut Router)) -> ShimRouter {
        let mut router = Router::new();
        configure(&mut router);
        let (routes, middlewares) = router.flatten();
        ShimRouter::build(routes, middlewares).unwrap()
    }

    #[test]
    fn test_to_native_path_rewrites_params() {
        assert_eq!(to_native_path("/users/:id"), "/users/{id}");
        assert_eq!(to_native_path("/a/:b/c/:d"), "/a/{b}/c/{d}");
        assert_eq!(to_native_path("/plain"), "/plain");
        assert_eq!(to_native_path("/"), "/");
    }

    #[test]
    fn test_split_target_separates_query() {
        assert_eq!(split_target("/users?page=2"), ("/users", Some("page=2")));
        assert_eq!(split_target("/users"), ("/users", None));
        assert_eq!(split_target("/x?"), ("/x", Some("")));
    }

    #[tokio::test]
    async fn test_dispatch_fills_path_params() {
        let shim = build_shim(|r| {
            r.get("/users/:id", |req, res| async move {
                let id = req.param("id").unwrap_or("?").to_string();
                res.send_raw(id)?;
                Ok(())
            });
        });

        let parts = shim
            .dispatch(CanonicalRequest::new(Method::GET, "/users/42"))
            .await;
        assert_eq!(parts.status, 200);
        assert_eq!(parts.body.as_ref(), b"42");
    }

    #[tokio::test]
    async fn test_wrong_method_gets_the_404_body() {
        let shim = build_shim(|r| {
            r.get("/users", |_req, res| async move {
                res.send_raw("listing")?;
                Ok(())
            });
        });

        let parts = shim
            .dispatch(CanonicalRequest::new(Method::DELETE, "/users"))
            .await;
        assert_eq!(parts.status, 404);
        let body: serde_json::Value = serde_json::from_slice(&parts.body).unwrap();
        assert_eq!(body["message"], "Route not found");
    }

    #[tokio::test]
    async fn test_head_borrows_get_chain_without_a_body() {
        let shim = build_shim(|r| {
            r.get("/users", |_req, res| async move {
                res.set_header("x-total", "3");
                res.send_raw("abc")?;
                Ok(())
            });
        });

        let parts = shim
            .dispatch(CanonicalRequest::new(Method::HEAD, "/users"))
            .await;
        assert_eq!(parts.status, 200);
        assert!(parts.body.is_empty());
        assert!(parts.headers.iter().any(|(n, v)| n == "x-total" && v == "3"));
    }

    #[tokio::test]
    async fn test_matched_but_silent_chain_still_404s() {
        let shim = build_shim(|r| {
            r.get("/quiet", |_req, res| async move {
                res.set_header("x-touched", "yes");
                Ok(())
            });
        });

        let parts = shim
            .dispatch(CanonicalRequest::new(Method::GET, "/quiet"))
            .await;
        assert_eq!(parts.status, 404);
    }

    #[tokio::test]
    async fn test_duplicate_registration_extends_the_chain() {
        let shim = build_shim(|r| {
            r.get("/x", |_req, _res| async { Ok(()) });
            r.get("/x", |_req, res| async move {
                res.send_raw("second registration")?;
                Ok(())
            });
        });

        let parts = shim.dispatch(CanonicalRequest::new(Method::GET, "/x")).await;
        assert_eq!(parts.body.as_ref(), b"second registration");
    }
}
