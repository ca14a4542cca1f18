//! Stub API node: every action is answered with a 400 envelope until a
//! real backend replaces it.

use futures_util::{FutureExt, future::BoxFuture};
use http::Method;
use serde_json::Value;

use crate::routes::{NodeContext, NodeError};

pub fn build(mut node: NodeContext) -> BoxFuture<'static, Result<NodeContext, NodeError>> {
    async move {
        let respond = node.responder();
        for method in [Method::GET, Method::POST, Method::DELETE] {
            node.route(method, "/:action", move |req, res| async move {
                let action = req.param("action").unwrap_or_default();
                tracing::warn!("api node has no handler for action '{action}'");
                respond.send(&res, 400, Value::String("unknown request".to_string()))
            });
        }
        Ok(node)
    }
    .boxed()
}
