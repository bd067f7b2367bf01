//! End-to-end tests of the HTTP surface against a stub upstream.
//!
//! Runs the same scenarios on the in-memory and the SQLite backend.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use courier_core::app::{AppBuilder, serve};
use courier_core::config::{BackendConfig, SqliteConfig};
use rstest::rstest;
use serde_json::{Value, json};
use tokio::sync::oneshot;

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/hello", get(|| async { "hello world" }))
        .route("/teapot", get(|| async { (StatusCode::IM_A_TEAPOT, "short and stout") }))
        .route("/submit", post(|body: String| async move { body.to_uppercase() }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

struct Server {
    base: String,
    _shutdown: oneshot::Sender<()>,
}

async fn spawn_relay(backend: BackendConfig) -> Server {
    let relay = Arc::new(AppBuilder::new().backend(backend).build().await.unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        serve(listener, relay, async move {
            let _ = rx.await;
        })
        .await
        .unwrap();
    });
    Server {
        base: format!("http://{addr}"),
        _shutdown: tx,
    }
}

fn backend(name: &str) -> BackendConfig {
    match name {
        "sqlite" => BackendConfig::Sqlite(SqliteConfig::new("sqlite::memory:")),
        _ => BackendConfig::Memory,
    }
}

async fn forward(client: &reqwest::Client, server: &Server, descriptor: Value) -> reqwest::Response {
    client
        .post(format!("{}/", server.base))
        .body(descriptor.to_string())
        .send()
        .await
        .unwrap()
}

async fn history(client: &reqwest::Client, server: &Server, query: &str) -> reqwest::Response {
    client
        .get(format!("{}/history{query}", server.base))
        .send()
        .await
        .unwrap()
}

#[rstest]
#[case::memory("memory")]
#[case::sqlite("sqlite")]
#[tokio::test]
async fn forward_then_list_then_delete(#[case] backend_name: &str) {
    let upstream = spawn_upstream().await;
    let server = spawn_relay(backend(backend_name)).await;
    let client = reqwest::Client::new();

    let res = forward(
        &client,
        &server,
        json!({"method": "GET", "url": format!("http://{upstream}/hello")}),
    )
    .await;
    assert_eq!(res.status(), 200);
    let result: Value = res.json().await.unwrap();
    assert_eq!(result["HttpStatusCode"], 200);
    assert_eq!(result["ContentLength"], "hello world".len());

    let res = forward(
        &client,
        &server,
        json!({
            "method": "POST",
            "url": format!("http://{upstream}/submit"),
            "header": {"X-Trace": ["a", "b"]},
            "body": "shout",
        }),
    )
    .await;
    assert_eq!(res.status(), 200);

    let res = forward(
        &client,
        &server,
        json!({"method": "GET", "url": format!("http://{upstream}/teapot")}),
    )
    .await;
    assert_eq!(res.status(), 200);
    let result: Value = res.json().await.unwrap();
    assert_eq!(result["HttpStatusCode"], 418);

    let list: Vec<Value> = history(&client, &server, "").await.json().await.unwrap();
    assert_eq!(list.len(), 3);
    let urls: Vec<&str> = list
        .iter()
        .map(|r| r["Element"]["Request"]["url"].as_str().unwrap())
        .collect();
    assert!(urls[0].ends_with("/hello"));
    assert!(urls[1].ends_with("/submit"));
    assert!(urls[2].ends_with("/teapot"));
    assert_eq!(list[1]["Element"]["Request"]["header"]["X-Trace"], json!(["a", "b"]));
    assert_eq!(list[1]["Element"]["Respond"]["ContentLength"], "SHOUT".len());

    let page: Vec<Value> = history(&client, &server, "?offset=1&limit=1")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["ID"], list[1]["ID"]);

    let id = list[0]["ID"].as_i64().unwrap();
    let res = client
        .delete(format!("{}/?id={id}", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let after: Vec<Value> = history(&client, &server, "").await.json().await.unwrap();
    assert_eq!(after.len(), 2);
    assert!(after.iter().all(|r| r["ID"].as_i64() != Some(id)));

    // 存在しない ID の削除はエラーにならない
    let res = client
        .delete(format!("{}/?id={id}", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn null_header_and_body_are_accepted() {
    let upstream = spawn_upstream().await;
    let server = spawn_relay(BackendConfig::Memory).await;
    let client = reqwest::Client::new();

    let res = forward(
        &client,
        &server,
        json!({
            "method": "GET",
            "url": format!("http://{upstream}/hello"),
            "header": null,
            "body": null,
        }),
    )
    .await;
    assert_eq!(res.status(), 200);

    let list: Vec<Value> = history(&client, &server, "").await.json().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["Element"]["Request"]["header"], json!({}));
    assert_eq!(list[0]["Element"]["Request"]["body"], "");
}

#[rstest]
#[case::malformed_json("{not json")]
#[case::unsupported_method(r#"{"method": "PATCH", "url": "http://127.0.0.1:1/"}"#)]
#[case::post_without_body(r#"{"method": "POST", "url": "http://127.0.0.1:1/"}"#)]
#[tokio::test]
async fn bad_descriptors_are_rejected(#[case] body: &str) {
    let server = spawn_relay(BackendConfig::Memory).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/", server.base))
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let list: Vec<Value> = history(&client, &server, "").await.json().await.unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn unreachable_upstream_is_503() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let server = spawn_relay(BackendConfig::Memory).await;
    let client = reqwest::Client::new();
    let res = forward(
        &client,
        &server,
        json!({"method": "GET", "url": format!("http://{dead}/")}),
    )
    .await;
    assert_eq!(res.status(), 503);
}

#[rstest]
#[case::malformed_id("/?id=abc")]
#[case::missing_id("/")]
#[tokio::test]
async fn bad_delete_ids_are_rejected(#[case] path: &str) {
    let server = spawn_relay(BackendConfig::Memory).await;
    let res = reqwest::Client::new()
        .delete(format!("{}{path}", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[rstest]
#[case::offset_beyond_size("?offset=5")]
#[case::malformed_offset("?offset=x")]
#[case::malformed_limit("?limit=-3")]
#[tokio::test]
async fn bad_history_queries_are_rejected(#[case] query: &str) {
    let server = spawn_relay(BackendConfig::Memory).await;
    let res = history(&reqwest::Client::new(), &server, query).await;
    assert_eq!(res.status(), 400);
}
