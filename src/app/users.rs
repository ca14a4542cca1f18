//! Demo user node: a fixed listing, parameterized lookup and a mock
//! creation path journaled through [`capture`].

use futures_util::{FutureExt, future::BoxFuture};
use rand::Rng;
use serde_json::{Value, json};

use crate::routes::{Captured, NodeContext, NodeError, capture};

pub fn build(mut node: NodeContext) -> BoxFuture<'static, Result<NodeContext, NodeError>> {
    async move {
        let respond = node.responder();
        let journal = node.errors().clone();

        node.get("/", move |_req, res| async move {
            respond.send(
                &res,
                200,
                json!([
                    {"id": 1, "name": "Alice", "role": "admin"},
                    {"id": 2, "name": "Bob", "role": "user"},
                    {"id": 3, "name": "Charlie", "role": "guest"},
                ]),
            )
        });

        node.get("/:id", move |req, res| async move {
            match req.param("id").and_then(|id| id.parse::<i64>().ok()) {
                Some(id) => respond.send(
                    &res,
                    200,
                    json!({"id": id, "name": format!("User {id}"), "role": "user"}),
                ),
                None => respond.send(&res, 400, Value::String("Invalid ID".to_string())),
            }
        });

        node.post("/", move |req, res| {
            let journal = journal.clone();
            async move {
                let Some(body) = req.body_json() else {
                    return respond.send(&res, 400, Value::String("Missing body".to_string()));
                };
                let Captured { code, data } = capture(&journal, 201, store_user(body)).await;
                respond.send(&res, code, data)
            }
        });

        Ok(node)
    }
    .boxed()
}

#[derive(Debug, thiserror::Error)]
enum UserError {
    #[error("user payload must be a JSON object")]
    NotAnObject,
}

/// Mock save: a random id, the submitted fields, a creation stamp.
///
/// Submitted fields win over the generated id, matching the create-then
/// -override shape of the listing above.
async fn store_user(body: Value) -> Result<Value, UserError> {
    let Value::Object(fields) = body else {
        return Err(UserError::NotAnObject);
    };

    let mut user = serde_json::Map::new();
    user.insert("id".to_string(), json!(rand::rng().random_range(0..1000)));
    for (key, value) in fields {
        user.insert(key, value);
    }
    user.insert(
        "createdAt".to_string(),
        json!(chrono::Utc::now().to_rfc3339()),
    );

    Ok(json!({
        "message": "User created successfully",
        "user": user,
    }))
}

#[cfg(test)]
mod tests {
    use http::Method;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        adapters::shared::ShimRouter,
        core::request::CanonicalRequest,
        core::response::ResponseParts,
        routes::{ErrorLog, ResponseKind},
    };

    async fn users_shim(dir: &TempDir) -> ShimRouter {
        let log = ErrorLog::open(dir.path().join("users"));
        let node = build(NodeContext::new("users", ResponseKind::Json, log))
            .await
            .unwrap();
        let (routes, middlewares) = node.into_router().flatten();
        ShimRouter::build(routes, middlewares).unwrap()
    }

    fn json_body(parts: &ResponseParts) -> Value {
        serde_json::from_slice(&parts.body).unwrap()
    }

    #[tokio::test]
    async fn test_listing_returns_three_users() {
        let dir = TempDir::new().unwrap();
        let shim = users_shim(&dir).await;

        let parts = shim.dispatch(CanonicalRequest::new(Method::GET, "/")).await;
        assert_eq!(parts.status, 200);
        let body = json_body(&parts);
        assert_eq!(body.as_array().map(Vec::len), Some(3));
        assert_eq!(body[0]["name"], "Alice");
        assert_eq!(body[2]["role"], "guest");
    }

    #[tokio::test]
    async fn test_lookup_parses_the_id() {
        let dir = TempDir::new().unwrap();
        let shim = users_shim(&dir).await;

        let parts = shim.dispatch(CanonicalRequest::new(Method::GET, "/7")).await;
        assert_eq!(parts.status, 200);
        assert_eq!(json_body(&parts), json!({"id": 7, "name": "User 7", "role": "user"}));

        let parts = shim
            .dispatch(CanonicalRequest::new(Method::GET, "/abc"))
            .await;
        assert_eq!(parts.status, 400);
        let body = json_body(&parts);
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(body["message"], "Invalid ID");
    }

    #[tokio::test]
    async fn test_create_requires_a_body() {
        let dir = TempDir::new().unwrap();
        let shim = users_shim(&dir).await;

        let parts = shim.dispatch(CanonicalRequest::new(Method::POST, "/")).await;
        assert_eq!(parts.status, 400);
        assert_eq!(json_body(&parts)["message"], "Missing body");
    }

    #[tokio::test]
    async fn test_create_echoes_fields_and_stamps() {
        let dir = TempDir::new().unwrap();
        let shim = users_shim(&dir).await;

        let req = CanonicalRequest::new(Method::POST, "/")
            .with_body(r#"{"name":"Dana","role":"admin"}"#);
        let parts = shim.dispatch(req).await;
        assert_eq!(parts.status, 201);

        let body = json_body(&parts);
        assert_eq!(body["message"], "User created successfully");
        assert_eq!(body["user"]["name"], "Dana");
        assert_eq!(body["user"]["role"], "admin");
        assert!(body["user"]["id"].is_number());
        assert!(body["user"]["createdAt"].is_string());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_non_object_body_is_captured_as_500() {
        let dir = TempDir::new().unwrap();
        let shim = users_shim(&dir).await;

        let req = CanonicalRequest::new(Method::POST, "/").with_body("[1,2,3]");
        let parts = shim.dispatch(req).await;
        assert_eq!(parts.status, 500);
        let body = json_body(&parts);
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["message"], "user payload must be a JSON object");
    }
}
