//! Static file serving as canonical middleware.
//!
//! Runs before routing: a hit sends the file and short-circuits, a miss
//! falls through to the route table. Resolution canonicalizes both root
//! and target and requires the target to stay under the root, so `..`
//! segments cannot escape.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use http::Method;

use crate::{
    config::models::StaticFilesConfig,
    ports::handler::{SharedHandler, handler_fn},
};

pub fn static_handler(config: StaticFilesConfig) -> SharedHandler {
    let config = Arc::new(config);
    handler_fn(move |req, res| {
        let config = config.clone();
        async move {
            if req.method() != Method::GET && req.method() != Method::HEAD {
                return Ok(());
            }
            let Some(rest) = strip_url_prefix(req.path(), &config.url_prefix) else {
                return Ok(());
            };
            let relative = if rest.is_empty() {
                config.index_file.clone()
            } else {
                rest.to_string()
            };
            if let Some(path) = resolve(&config.root, &relative).await {
                match tokio::fs::read(&path).await {
                    Ok(bytes) => {
                        res.set_header("content-type", content_type_for(&relative));
                        res.send_raw(bytes)?;
                    }
                    Err(e) => {
                        tracing::warn!("failed to read static file {}: {e}", path.display());
                    }
                }
            }
            Ok(())
        }
    })
}

/// Path relative to the configured prefix, or `None` when outside it
fn strip_url_prefix<'a>(path: &'a str, url_prefix: &str) -> Option<&'a str> {
    let prefix = url_prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return Some(path.trim_start_matches('/'));
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('/').map(|r| r.trim_end_matches('/'))
    }
}

/// Canonicalize both ends and require the target to stay under the root
async fn resolve(root: &str, relative: &str) -> Option<PathBuf> {
    let full = Path::new(root).join(relative.trim_start_matches('/'));
    let canonical_root = tokio::fs::canonicalize(root).await.ok()?;
    let canonical_path = tokio::fs::canonicalize(&full).await.ok()?;

    if !canonical_path.starts_with(&canonical_root) {
        tracing::warn!(path = relative, "Path traversal attempt detected");
        return None;
    }

    let metadata = tokio::fs::metadata(&canonical_path).await.ok()?;
    metadata.is_file().then_some(canonical_path)
}

fn content_type_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::core::{request::CanonicalRequest, response::CanonicalResponse};

    fn config(root: &str, url_prefix: &str) -> StaticFilesConfig {
        StaticFilesConfig {
            root: root.to_string(),
            url_prefix: url_prefix.to_string(),
            index_file: "index.html".to_string(),
        }
    }

    async fn call(handler: &SharedHandler, method: Method, path: &str) -> CanonicalResponse {
        let req = Arc::new(CanonicalRequest::new(method, path));
        let res = CanonicalResponse::new();
        handler.call(req, res.clone()).await.unwrap();
        res
    }

    #[tokio::test]
    async fn test_serves_file_under_prefix() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("app.css"), "body {}")
            .await
            .unwrap();
        let handler = static_handler(config(dir.path().to_str().unwrap(), "/assets"));

        let res = call(&handler, Method::GET, "/assets/app.css").await;
        let parts = res.finish();
        assert!(parts.sent);
        assert_eq!(parts.body.as_ref(), b"body {}");
        assert!(parts
            .headers
            .iter()
            .any(|(n, v)| n == "content-type" && v == "text/css"));
    }

    #[tokio::test]
    async fn test_miss_falls_through_unsent() {
        let dir = TempDir::new().unwrap();
        let handler = static_handler(config(dir.path().to_str().unwrap(), "/assets"));

        let res = call(&handler, Method::GET, "/assets/missing.css").await;
        assert!(!res.is_sent());

        let res = call(&handler, Method::GET, "/api/users").await;
        assert!(!res.is_sent());
    }

    #[tokio::test]
    async fn test_traversal_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let inner = dir.path().join("public");
        tokio::fs::create_dir(&inner).await.unwrap();
        tokio::fs::write(dir.path().join("secret.txt"), "secret")
            .await
            .unwrap();
        let handler = static_handler(config(inner.to_str().unwrap(), "/assets"));

        let res = call(&handler, Method::GET, "/assets/../secret.txt").await;
        assert!(!res.is_sent());
    }

    #[tokio::test]
    async fn test_prefix_root_serves_index_file() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("index.html"), "<html></html>")
            .await
            .unwrap();
        let handler = static_handler(config(dir.path().to_str().unwrap(), "/site"));

        let res = call(&handler, Method::GET, "/site").await;
        let parts = res.finish();
        assert!(parts.sent);
        assert_eq!(parts.body.as_ref(), b"<html></html>");
    }

    #[tokio::test]
    async fn test_non_get_methods_fall_through() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("index.html"), "x")
            .await
            .unwrap();
        let handler = static_handler(config(dir.path().to_str().unwrap(), "/"));

        let res = call(&handler, Method::POST, "/index.html").await;
        assert!(!res.is_sent());
    }
}
