// crates/sqlgate-server/tests/http.rs
// ============================================================================
// Module: HTTP End-to-End Tests
// Description: Drives a live server over loopback with reqwest.
// Purpose: Validate routes, status codes, and bodies as a client sees them.
// Dependencies: sqlgate-server, sqlgate-config, reqwest, tokio
// ============================================================================
//! ## Overview
//! Each test binds a server to `127.0.0.1:0` and talks to it the way the
//! client SDK does: plain SQL bodies for raw calls, JSON binding objects for
//! named calls, and JSON parsing of every 200 body.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::time::Duration;
use std::time::Instant;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::WWW_AUTHENTICATE;
use serde_json::Value;
use serde_json::json;
use sqlgate_config::SqlGateConfig;
use sqlgate_server::GatewayServer;
use sqlgate_server::ServerHooks;
use tokio::net::TcpListener;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const ADMIN: &str = "admin";

async fn spawn(config: SqlGateConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let server = GatewayServer::with_hooks(config, ServerHooks::silent()).expect("server");
    tokio::spawn(async move {
        let _ = server.serve_with_listener(listener).await;
    });
    format!("http://{addr}/v0/acme/main")
}

async fn raw(client: &Client, base: &str, sql: &str) -> (u16, String) {
    let response = client
        .post(format!("{base}/raw"))
        .bearer_auth(ADMIN)
        .body(sql.to_string())
        .send()
        .await
        .expect("send");
    (response.status().as_u16(), response.text().await.expect("text"))
}

async fn put_policy(client: &Client, base: &str, policy: &Value) -> (u16, String) {
    let response = client
        .put(format!("{base}/policy"))
        .bearer_auth(ADMIN)
        .header(CONTENT_TYPE, "application/json")
        .body(policy.to_string())
        .send()
        .await
        .expect("send");
    (response.status().as_u16(), response.text().await.expect("text"))
}

async fn named(
    client: &Client,
    base: &str,
    query: bool,
    name: &str,
    bindings: &Value,
) -> (u16, String) {
    let url = format!("{base}/named/{name}");
    let request = if query { client.get(url) } else { client.post(url) };
    let response = request
        .header(CONTENT_TYPE, "application/json")
        .body(bindings.to_string())
        .send()
        .await
        .expect("send");
    (response.status().as_u16(), response.text().await.expect("text"))
}

fn person_policy() -> Value {
    json!({
        "queries": [
            {"name": "get_person", "rawSql": "SELECT name FROM person WHERE id = :id"}
        ],
        "mutations": [
            {"name": "add_person", "rawSql": "INSERT INTO person (id, name) VALUES (:id, :name)"}
        ]
    })
}

async fn person_server(config: SqlGateConfig) -> (Client, String) {
    let client = Client::new();
    let base = spawn(config).await;
    let (status, _) =
        raw(&client, &base, "CREATE TABLE person (id TEXT PRIMARY KEY, name TEXT NOT NULL)").await;
    assert_eq!(status, 200);
    let (status, body) = put_policy(&client, &base, &person_policy()).await;
    assert_eq!(status, 200, "{body}");
    (client, base)
}

fn parse(body: &str) -> Value {
    serde_json::from_str(body).expect("json body")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn person_directory_over_http() {
    let (client, base) = person_server(SqlGateConfig::default()).await;

    let (status, body) = named(
        &client,
        &base,
        false,
        "add_person",
        &json!({":id": "alice", ":name": "Alice Accountant"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(parse(&body), Value::Null);

    let (status, body) = named(&client, &base, true, "get_person", &json!({":id": "alice"})).await;
    assert_eq!(status, 200);
    assert_eq!(parse(&body), json!([{"name": "Alice Accountant"}]));

    let (status, body) = named(&client, &base, true, "get_person", &json!({":id": "bob"})).await;
    assert_eq!(status, 200);
    assert_eq!(parse(&body), json!([]));

    let response = client
        .get(format!("{base}/policy"))
        .bearer_auth(ADMIN)
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 200);
    let policy = parse(&response.text().await.expect("text"));
    assert_eq!(policy["version"], json!(1));
    assert_eq!(policy["queries"][0]["name"], json!("get_person"));
    assert_eq!(policy["mutations"][0]["rawSql"], person_policy()["mutations"][0]["rawSql"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn named_query_reads_bindings_from_the_query_string() {
    let (client, base) = person_server(SqlGateConfig::default()).await;
    raw(&client, &base, "INSERT INTO person VALUES ('alice', 'Alice Accountant')").await;
    let response = client
        .get(format!("{base}/named/get_person?id=alice"))
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(parse(&response.text().await.expect("text")), json!([{"name": "Alice Accountant"}]));
}

#[tokio::test(flavor = "multi_thread")]
async fn admin_routes_reject_missing_and_wrong_tokens() {
    let client = Client::new();
    let base = spawn(SqlGateConfig::default()).await;

    let response =
        client.post(format!("{base}/raw")).body("SELECT 1").send().await.expect("send");
    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(response.headers().get(WWW_AUTHENTICATE).expect("challenge"), "Bearer");

    let response = client
        .put(format!("{base}/policy"))
        .bearer_auth("not-the-token")
        .body(person_policy().to_string())
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 401);
    assert!(response.text().await.expect("text").starts_with("unauthorized:"));
}

#[tokio::test(flavor = "multi_thread")]
async fn client_tokens_gate_named_routes() {
    let mut config = SqlGateConfig::default();
    config.server.auth.client_tokens = vec!["reader".to_string()];
    let (client, base) = person_server(config).await;

    let (status, _) = named(&client, &base, true, "get_person", &json!({"id": "alice"})).await;
    assert_eq!(status, 401);

    let response = client
        .get(format!("{base}/named/get_person"))
        .bearer_auth("reader")
        .body(json!({"id": "alice"}).to_string())
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn named_failures_map_to_client_errors() {
    let (client, base) = person_server(SqlGateConfig::default()).await;

    let (status, body) = named(&client, &base, true, "no_such", &json!({})).await;
    assert_eq!(status, 404);
    assert!(body.contains("no_such"));

    let (status, body) = named(&client, &base, true, "add_person", &json!({})).await;
    assert_eq!(status, 404, "mutations are not callable as queries: {body}");

    let (status, body) = named(&client, &base, false, "add_person", &json!({"id": "x"})).await;
    assert_eq!(status, 400);
    assert!(body.starts_with("missing parameter"), "{body}");

    let (status, _) = named(&client, &base, true, "get_person", &json!({"id": true})).await;
    assert_eq!(status, 400);
}

#[tokio::test(flavor = "multi_thread")]
async fn raw_sql_errors_carry_the_engine_message() {
    let client = Client::new();
    let base = spawn(SqlGateConfig::default()).await;

    let (status, body) = raw(&client, &base, "SELECT * FROM missing_table").await;
    assert_eq!(status, 400);
    assert!(body.contains("no such table"), "{body}");

    let (status, body) = raw(&client, &base, "SELECT 1; SELECT 2").await;
    assert_eq!(status, 400);
    assert!(body.starts_with("malformed statement"), "{body}");

    let (status, body) = raw(&client, &base, "SELECT :x AS x").await;
    assert_eq!(status, 400);
    assert!(body.starts_with("missing parameter"), "{body}");
}

#[tokio::test(flavor = "multi_thread")]
async fn raw_json_envelope_binds_parameters() {
    let client = Client::new();
    let base = spawn(SqlGateConfig::default()).await;
    let response = client
        .get(format!("{base}/raw"))
        .bearer_auth(ADMIN)
        .header(CONTENT_TYPE, "application/json")
        .body(json!({"sql": "SELECT :a + 1 AS b", "params": {":a": 41}}).to_string())
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(parse(&response.text().await.expect("text")), json!([{"b": 42}]));
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_expected_version_conflicts() {
    let (client, base) = person_server(SqlGateConfig::default()).await;
    let mut policy = person_policy();
    policy["expectedVersion"] = json!(0);
    let (status, body) = put_policy(&client, &base, &policy).await;
    assert_eq!(status, 409, "{body}");

    policy["expectedVersion"] = json!(1);
    let (status, _) = put_policy(&client, &base, &policy).await;
    assert_eq!(status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_bodies_are_refused() {
    let mut config = SqlGateConfig::default();
    config.server.max_body_bytes = 64;
    let client = Client::new();
    let base = spawn(config).await;
    let sql = format!("SELECT '{}' AS padding", "x".repeat(256));
    let (status, _) = raw(&client, &base, &sql).await;
    assert_eq!(status, 413);
}

#[tokio::test(flavor = "multi_thread")]
async fn runaway_statements_time_out_and_free_the_tenant() {
    let mut config = SqlGateConfig::default();
    config.server.limits.request_timeout_ms = 200;
    let client = Client::new();
    let base = spawn(config).await;

    let started = Instant::now();
    let (status, body) = raw(
        &client,
        &base,
        "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c",
    )
    .await;
    assert_eq!(status, 504, "{body}");
    assert!(started.elapsed() < Duration::from_secs(10));

    let (status, body) = raw(&client, &base, "SELECT 1 AS one").await;
    assert_eq!(status, 200);
    assert_eq!(parse(&body), json!([{"one": 1}]));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_tenant_ids_are_rejected() {
    let client = Client::new();
    let base = spawn(SqlGateConfig::default()).await;
    let bad = base.replace("/acme/", "/1acme/");
    let (status, body) = raw(&client, &bad, "SELECT 1").await;
    assert_eq!(status, 400);
    assert!(body.contains("project id"), "{body}");
}
