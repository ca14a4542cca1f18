// Cross-engine behavior checks: every compiled-in engine serves the same
// demo route tree and must answer the same scenario with the same status
// codes and bodies.

use std::{net::TcpListener, sync::mpsc, thread, time::Duration};

use manifold::{AppContext, UniversalAdapter, app, config::AppConfig, ports::EngineId, routes};
use serde_json::{Value, json};

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("probe bind")
        .local_addr()
        .expect("probe addr")
        .port()
}

/// Start one engine on its own port and thread; returns the base URL once
/// the engine reports ready.
fn spawn_engine(engine: EngineId) -> String {
    let port = free_port();
    let state_dir = std::env::temp_dir().join(format!("manifold-parity-{engine}-{port}"));
    let (ready_tx, ready_rx) = mpsc::channel();

    thread::spawn(move || {
        let mut config = AppConfig::default();
        config.engine.name = Some(engine.as_str().to_string());
        config.server.port = port;
        config.server.workers = 2;
        config.handlers.state_dir = state_dir.display().to_string();

        let ctx = AppContext::new(config).expect("runtime");
        let mut adapter = UniversalAdapter::bind(&ctx).expect("bind engine");
        adapter.setup_baseline(ctx.config());
        ctx.block_on(routes::discover(&app::registry(), &ctx, &mut adapter));

        adapter
            .listen(
                port,
                Box::new(move || {
                    let _ = ready_tx.send(());
                }),
            )
            .expect("listen");
    });

    ready_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("engine never became ready");
    format!("http://127.0.0.1:{port}")
}

async fn get_json(client: &reqwest::Client, url: &str) -> (u16, Value) {
    let response = client.get(url).send().await.expect("request");
    let status = response.status().as_u16();
    let body = response.json().await.expect("json body");
    (status, body)
}

async fn assert_demo_scenario(base: &str) {
    let client = reqwest::Client::new();

    // Listing endpoint: raw payload, no envelope on success
    let response = client
        .get(format!("{base}/users"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);
    assert!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"))
    );
    assert!(response.headers().contains_key("x-request-id"));
    let users: Value = response.json().await.expect("json body");
    assert_eq!(users.as_array().map(Vec::len), Some(3));
    assert_eq!(users[0]["name"], "Alice");
    assert_eq!(users[0]["role"], "admin");

    // Path captures parse into typed params
    let (status, user) = get_json(&client, &format!("{base}/users/7")).await;
    assert_eq!(status, 200);
    assert_eq!(user, json!({"id": 7, "name": "User 7", "role": "user"}));

    // Non-numeric ids get an enveloped 400
    let (status, body) = get_json(&client, &format!("{base}/users/abc")).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({"error": "Bad Request", "message": "Invalid ID"}));

    // Creation echoes the payload plus a generated id and timestamp
    let response = client
        .post(format!("{base}/users"))
        .json(&json!({"name": "Dana", "role": "admin"}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.expect("json body");
    assert_eq!(created["message"], "User created successfully");
    assert_eq!(created["user"]["name"], "Dana");
    assert_eq!(created["user"]["role"], "admin");
    assert!(created["user"]["id"].is_number());
    assert!(created["user"]["createdAt"].is_string());

    // Missing body is a client error, not a crash
    let response = client
        .post(format!("{base}/users"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body, json!({"error": "Bad Request", "message": "Missing body"}));

    // Stub nodes answer every registered action the same way
    let (status, body) = get_json(&client, &format!("{base}/api/ping")).await;
    assert_eq!(status, 400);
    assert_eq!(
        body,
        json!({"error": "Bad Request", "message": "unknown request"})
    );

    let response = client
        .patch(format!("{base}/db/replicate"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 400);

    // Unknown paths and unregistered methods fall through to the same 404
    let (status, body) = get_json(&client, &format!("{base}/nope")).await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({"message": "Route not found"}));

    let response = client
        .delete(format!("{base}/users"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body, json!({"message": "Route not found"}));

    // HEAD mirrors GET minus the body
    let response = client
        .head(format!("{base}/users"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);
    let bytes = response.bytes().await.expect("body");
    assert!(bytes.is_empty());
}

#[cfg(feature = "engine-axum")]
#[tokio::test(flavor = "multi_thread")]
async fn test_axum_serves_demo_scenario() {
    let base = spawn_engine(EngineId::Axum);
    assert_demo_scenario(&base).await;
}

#[cfg(feature = "engine-actix")]
#[tokio::test(flavor = "multi_thread")]
async fn test_actix_serves_demo_scenario() {
    let base = spawn_engine(EngineId::ActixWeb);
    assert_demo_scenario(&base).await;
}

#[cfg(feature = "engine-hyper")]
#[tokio::test(flavor = "multi_thread")]
async fn test_hyper_serves_demo_scenario() {
    let base = spawn_engine(EngineId::Hyper);
    assert_demo_scenario(&base).await;
}

#[cfg(feature = "engine-rouille")]
#[tokio::test(flavor = "multi_thread")]
async fn test_rouille_serves_demo_scenario() {
    let base = spawn_engine(EngineId::Rouille);
    assert_demo_scenario(&base).await;
}

#[cfg(feature = "engine-tiny-http")]
#[tokio::test(flavor = "multi_thread")]
async fn test_tiny_http_serves_demo_scenario() {
    let base = spawn_engine(EngineId::TinyHttp);
    assert_demo_scenario(&base).await;
}
