// crates/sqlgate-server/src/server/tests.rs
// ============================================================================
// Module: SQL Gate Server Unit Tests
// Description: Unit tests for request parsing, status mapping, and hooks.
// Purpose: Validate the request pipeline by calling handlers directly.
// Dependencies: sqlgate-server
// ============================================================================

//! ## Overview
//! Calls route handlers with hand-built extractors against an in-memory
//! gateway and checks the rendered response together with the metric and
//! audit events each request emits.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::body::Bytes;
use axum::body::to_bytes;
use axum::extract::ConnectInfo;
use axum::extract::Path as RoutePath;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::WWW_AUTHENTICATE;
use axum::response::Response;
use serde_json::json;
use sqlgate_config::SqlGateConfig;
use sqlgate_core::GatewayError;
use sqlgate_core::IdentifierError;
use sqlgate_core::Namespace;

use super::*;
use crate::audit::GatewayAuditEvent;
use crate::auth::AuthAuditEvent;
use crate::auth::AuthAuditSink;
use crate::telemetry::GatewayMetricEvent;
use crate::telemetry::GatewayMetrics;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

#[derive(Default)]
struct TestMetrics {
    requests: Mutex<Vec<GatewayMetricEvent>>,
    latencies: Mutex<Vec<Duration>>,
}

impl GatewayMetrics for TestMetrics {
    fn record_request(&self, event: GatewayMetricEvent) {
        self.requests.lock().unwrap().push(event);
    }

    fn record_latency(&self, _event: GatewayMetricEvent, latency: Duration) {
        self.latencies.lock().unwrap().push(latency);
    }
}

#[derive(Default)]
struct TestAudit {
    events: Mutex<Vec<GatewayAuditEvent>>,
}

impl GatewayAuditSink for TestAudit {
    fn record(&self, event: &GatewayAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Default)]
struct TestAuthAudit {
    events: Mutex<Vec<AuthAuditEvent>>,
}

impl AuthAuditSink for TestAuthAudit {
    fn record(&self, event: &AuthAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct Harness {
    server: GatewayServer,
    metrics: Arc<TestMetrics>,
    audit: Arc<TestAudit>,
    auth_audit: Arc<TestAuthAudit>,
}

impl Harness {
    fn new(config: SqlGateConfig) -> Self {
        let metrics = Arc::new(TestMetrics::default());
        let audit = Arc::new(TestAudit::default());
        let auth_audit = Arc::new(TestAuthAudit::default());
        let hooks = ServerHooks {
            metrics: Arc::clone(&metrics) as Arc<dyn GatewayMetrics>,
            audit: Arc::clone(&audit) as Arc<dyn GatewayAuditSink>,
            auth_audit: Arc::clone(&auth_audit) as Arc<dyn AuthAuditSink>,
        };
        let server = GatewayServer::with_hooks(config, hooks).expect("server");
        Self {
            server,
            metrics,
            audit,
            auth_audit,
        }
    }

    fn state(&self) -> State<Arc<ServerState>> {
        State(Arc::clone(&self.server.state))
    }
}

fn peer() -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000)))
}

fn tenant_path() -> RoutePath<(String, String)> {
    RoutePath(("acme".to_string(), "main".to_string()))
}

fn named_path(name: &str) -> RoutePath<(String, String, String)> {
    RoutePath(("acme".to_string(), "main".to_string(), name.to_string()))
}

fn headers(token: Option<&str>, json: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
    }
    if json {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    headers
}

fn body(text: &str) -> Result<Bytes, BytesRejection> {
    Ok(Bytes::from(text.to_string()))
}

async fn read(response: Response) -> (StatusCode, HeaderMap, String) {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, headers, String::from_utf8(bytes.to_vec()).expect("utf8"))
}

async fn admin_raw(harness: &Harness, sql: &str) -> (StatusCode, HeaderMap, String) {
    read(raw(harness.state(), peer(), tenant_path(), headers(Some("admin"), false), body(sql)).await)
        .await
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn every_gateway_error_has_one_status() {
    let cases = [
        (
            GatewayError::InvalidIdentifier(IdentifierError::Project {
                value: "9x".to_string(),
                reason: "must start with a letter",
            }),
            StatusCode::BAD_REQUEST,
        ),
        (GatewayError::MalformedStatement("x".to_string()), StatusCode::BAD_REQUEST),
        (GatewayError::InvalidPolicy("x".to_string()), StatusCode::BAD_REQUEST),
        (GatewayError::MissingParameter("id".to_string()), StatusCode::BAD_REQUEST),
        (GatewayError::InvalidParameter("id".to_string()), StatusCode::BAD_REQUEST),
        (GatewayError::Engine("x".to_string()), StatusCode::BAD_REQUEST),
        (
            GatewayError::UnknownStatement {
                namespace: Namespace::Query,
                name: "x".to_string(),
            },
            StatusCode::NOT_FOUND,
        ),
        (
            GatewayError::PolicyConflict {
                expected: 1,
                actual: 2,
            },
            StatusCode::CONFLICT,
        ),
        (
            GatewayError::TenantLimit {
                max: 1,
            },
            StatusCode::TOO_MANY_REQUESTS,
        ),
        (GatewayError::Busy("x".to_string()), StatusCode::SERVICE_UNAVAILABLE),
        (GatewayError::Timeout, StatusCode::GATEWAY_TIMEOUT),
        (GatewayError::Internal("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
        assert_eq!(status_for(&err), status, "{err:?}");
    }
}

#[test]
fn raw_body_is_plain_text_unless_json() {
    let (sql, bindings) = parse_raw_body(b"SELECT 1", false).unwrap();
    assert_eq!(sql, "SELECT 1");
    assert!(bindings.is_empty());

    let (sql, bindings) =
        parse_raw_body(br#"{"sql": "SELECT :a AS a", "params": {"a": 1}}"#, true).unwrap();
    assert_eq!(sql, "SELECT :a AS a");
    assert_eq!(bindings.len(), 1);

    assert!(matches!(
        parse_raw_body(br#"{"query": "SELECT 1"}"#, true),
        Err(GatewayError::MalformedStatement(_))
    ));
    assert!(matches!(parse_raw_body(&[0xff, 0xfe], false), Err(GatewayError::MalformedStatement(_))));
}

#[test]
fn json_bindings_must_be_an_object() {
    assert!(parse_json_bindings(b"").unwrap().is_empty());
    assert!(parse_json_bindings(b"  \n").unwrap().is_empty());
    assert_eq!(parse_json_bindings(br#"{":id": "alice"}"#).unwrap().len(), 1);
    assert!(matches!(parse_json_bindings(b"[1]"), Err(GatewayError::InvalidParameter(_))));
    assert!(matches!(parse_json_bindings(b"{"), Err(GatewayError::InvalidParameter(_))));
}

#[test]
fn json_content_type_ignores_parameters() {
    let mut headers = HeaderMap::new();
    assert!(!is_json_content(&headers));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("Application/JSON; charset=utf-8"));
    assert!(is_json_content(&headers));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    assert!(!is_json_content(&headers));
}

#[test]
fn policy_body_errors_are_invalid_policy() {
    assert!(matches!(parse_policy_request(b"nope"), Err(GatewayError::InvalidPolicy(_))));
    assert!(matches!(
        parse_policy_request(br#"{"queries": [], "extra": 1}"#),
        Err(GatewayError::InvalidPolicy(_))
    ));
    let request = parse_policy_request(br#"{"expectedVersion": 3}"#).unwrap();
    assert_eq!(request.expected_version, Some(3));
}

#[tokio::test]
async fn unauthorized_admin_call_touches_nothing() {
    let harness = Harness::new(SqlGateConfig::default());
    let response = raw(
        harness.state(),
        peer(),
        tenant_path(),
        headers(Some("wrong"), false),
        body("CREATE TABLE t (x)"),
    )
    .await;
    let (status, headers, text) = read(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers.get(WWW_AUTHENTICATE).unwrap(), "Bearer");
    assert_eq!(text, "unauthorized: invalid bearer token");
    assert!(harness.server.gateway().registry().is_empty());

    let auth_events = harness.auth_audit.events.lock().unwrap();
    assert_eq!(auth_events.len(), 1);
    assert_eq!(auth_events[0].decision, "deny");
    let events = harness.audit.events.lock().unwrap();
    assert_eq!(events[0].error_kind, Some("unauthorized"));
    assert_eq!(events[0].status, 401);
}

#[tokio::test]
async fn named_round_trip_records_hooks() {
    let harness = Harness::new(SqlGateConfig::default());
    let (status, _, text) =
        admin_raw(&harness, "CREATE TABLE person (id TEXT PRIMARY KEY, name TEXT)").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "null");

    let policy = json!({
        "queries": [{"name": "get_person", "rawSql": "SELECT name FROM person WHERE id = :id"}],
        "mutations": [{"name": "add_person", "rawSql": "INSERT INTO person VALUES (:id, :name)"}]
    });
    let response = put_policy(
        harness.state(),
        peer(),
        tenant_path(),
        headers(Some("admin"), true),
        body(&policy.to_string()),
    )
    .await;
    assert_eq!(read(response).await.0, StatusCode::OK);

    let response = named_mutation(
        harness.state(),
        peer(),
        named_path("add_person"),
        headers(None, true),
        body(r#"{":id": "alice", ":name": "Alice Accountant"}"#),
    )
    .await;
    let (status, headers, text) = read(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "null");
    assert!(headers.get(REQUEST_ID_HEADER).is_some());

    let response = named_query(
        harness.state(),
        peer(),
        named_path("get_person"),
        HeaderMap::new(),
        Ok(Query(vec![("id".to_string(), "alice".to_string())])),
        Ok(Bytes::new()),
    )
    .await;
    let (status, _, text) = read(response).await;
    assert_eq!(status, StatusCode::OK);
    let rows: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(rows, json!([{"name": "Alice Accountant"}]));

    let requests = harness.metrics.requests.lock().unwrap();
    assert_eq!(requests.len(), 4);
    assert!(requests.iter().all(|event| event.outcome == Outcome::Ok));
    assert_eq!(harness.metrics.latencies.lock().unwrap().len(), 4);
    let events = harness.audit.events.lock().unwrap();
    assert_eq!(events[3].statement.as_deref(), Some("get_person"));
    assert_eq!(events[3].tenant, "acme/main");
}

#[tokio::test]
async fn invalid_tenant_path_is_rejected() {
    let harness = Harness::new(SqlGateConfig::default());
    let response = get_policy(
        harness.state(),
        peer(),
        RoutePath(("9acme".to_string(), "main".to_string())),
        headers(Some("admin"), false),
        Ok(Bytes::new()),
    )
    .await;
    let (status, _, _) = read(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(harness.server.gateway().registry().is_empty());
    let events = harness.audit.events.lock().unwrap();
    assert_eq!(events[0].error_kind, Some("invalid_identifier"));
}

#[tokio::test]
async fn exhausted_admission_returns_busy() {
    let mut config = SqlGateConfig::default();
    config.server.limits.max_inflight = 1;
    let harness = Harness::new(config);
    let held = Arc::clone(&harness.server.state.inflight).try_acquire_owned().unwrap();
    let (status, _, text) = admin_raw(&harness, "SELECT 1").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(text.starts_with("busy:"));
    drop(held);
    let (status, _, _) = admin_raw(&harness, "SELECT 1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn oversized_body_is_rejected_before_auth() {
    let mut config = SqlGateConfig::default();
    config.server.max_body_bytes = 8;
    let harness = Harness::new(config);
    let (status, _, _) = admin_raw(&harness, "SELECT 1 AS long_column_name").await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(harness.auth_audit.events.lock().unwrap().is_empty());
}

#[test]
fn disabled_audit_yields_silent_hooks() {
    let config = sqlgate_config::ServerAuditConfig {
        enabled: false,
        path: None,
    };
    assert!(ServerHooks::from_audit_config(&config).is_ok());
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-dir").join("audit.jsonl");
    let config = sqlgate_config::ServerAuditConfig {
        enabled: true,
        path: Some(missing.display().to_string()),
    };
    assert!(matches!(ServerHooks::from_audit_config(&config), Err(ServerError::Init(_))));
}

#[test]
fn auth_failures_render_as_unauthorized() {
    let failure = Failure::from(AuthError::Unauthenticated("missing authorization".to_string()));
    assert_eq!(failure.status, StatusCode::UNAUTHORIZED);
    assert_eq!(failure.kind, "unauthorized");
    assert_eq!(failure.message, "unauthorized: missing authorization");
}
