// crates/sqlgate-server/src/server.rs
// ============================================================================
// Module: SQL Gate HTTP Server
// Description: axum routes for policy, raw, and named statement calls.
// Purpose: Admit, authorize, and dispatch HTTP requests to the gateway.
// Dependencies: axum, sqlgate-config, sqlgate-core, sqlgate-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! [`GatewayServer`] owns the [`Gateway`] and serves the `/v0` HTTP surface.
//! Every request runs the same pipeline: body size check, admission against
//! `max_inflight`, bearer authorization, tenant path validation, then the
//! gateway call on the blocking pool under the request timeout. When the
//! timeout fires the call's cancel token is triggered so the engine
//! abandons the statement. Success bodies are JSON; failures are plain
//! text carrying the error message.
//!
//! Security posture: request bodies, query strings and path segments are
//! untrusted. SQL text and binding values never reach audit output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::extract::rejection::QueryRejection;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::WWW_AUTHENTICATE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use serde::Deserialize;
use sqlgate_config::ServerAuditConfig;
use sqlgate_config::SqlGateConfig;
use sqlgate_core::Bindings;
use sqlgate_core::CallOptions;
use sqlgate_core::Gateway;
use sqlgate_core::GatewayConfig;
use sqlgate_core::GatewayError;
use sqlgate_core::SetPolicyRequest;
use sqlgate_core::TenantKey;
use sqlgate_store_sqlite::SqliteEngine;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::audit::FileGatewayAuditSink;
use crate::audit::GatewayAuditEvent;
use crate::audit::GatewayAuditEventParams;
use crate::audit::GatewayAuditSink;
use crate::audit::NoopGatewayAuditSink;
use crate::audit::StderrGatewayAuditSink;
use crate::auth::AuthAuditEvent;
use crate::auth::AuthAuditSink;
use crate::auth::AuthError;
use crate::auth::NoopAuditSink;
use crate::auth::RequestContext;
use crate::auth::Role;
use crate::auth::RouteAuthz;
use crate::auth::StderrAuditSink;
use crate::auth::TokenAuthz;
use crate::telemetry::GatewayMetricEvent;
use crate::telemetry::GatewayMetrics;
use crate::telemetry::NoopMetrics;
use crate::telemetry::Outcome;
use crate::telemetry::RouteClass;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Response header carrying the server-assigned request id.
pub const REQUEST_ID_HEADER: &str = "x-sqlgate-request-id";
/// Body returned for successful calls without rows.
const NULL_BODY: &[u8] = b"null";
/// Content type of success bodies.
const JSON_CONTENT_TYPE: &str = "application/json";
/// Content type of error bodies.
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
/// Longest tenant label copied into audit events.
const MAX_AUDIT_TENANT_CHARS: usize = 128;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server lifecycle errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is unusable.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization failed.
    #[error("init error: {0}")]
    Init(String),
    /// Listener or connection failure.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Hooks
// ============================================================================

/// Observability hooks shared by every request.
#[derive(Clone)]
pub struct ServerHooks {
    /// Request counters and latency.
    pub metrics: Arc<dyn GatewayMetrics>,
    /// Per-request audit events.
    pub audit: Arc<dyn GatewayAuditSink>,
    /// Authorization decisions.
    pub auth_audit: Arc<dyn AuthAuditSink>,
}

impl ServerHooks {
    /// Hooks that discard everything.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            metrics: Arc::new(NoopMetrics),
            audit: Arc::new(NoopGatewayAuditSink),
            auth_audit: Arc::new(NoopAuditSink),
        }
    }

    /// Builds audit sinks from the `[server.audit]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Init`] when the audit file cannot be opened.
    pub fn from_audit_config(config: &ServerAuditConfig) -> Result<Self, ServerError> {
        if !config.enabled {
            return Ok(Self::silent());
        }
        let audit: Arc<dyn GatewayAuditSink> = match &config.path {
            Some(path) => Arc::new(
                FileGatewayAuditSink::new(Path::new(path))
                    .map_err(|err| ServerError::Init(format!("audit log {path}: {err}")))?,
            ),
            None => Arc::new(StderrGatewayAuditSink),
        };
        Ok(Self {
            metrics: Arc::new(NoopMetrics),
            audit,
            auth_audit: Arc::new(StderrAuditSink),
        })
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Shared request state.
struct ServerState {
    /// Execution gateway.
    gateway: Gateway,
    /// Route authorization.
    authz: Box<dyn RouteAuthz>,
    /// Admission permits.
    inflight: Arc<Semaphore>,
    /// Per-request timeout.
    request_timeout: Duration,
    /// Maximum request body size.
    max_body_bytes: usize,
    /// Observability hooks.
    hooks: ServerHooks,
    /// Request id counter.
    next_request_id: AtomicU64,
}

/// HTTP server over one gateway.
pub struct GatewayServer {
    /// Validated configuration.
    config: SqlGateConfig,
    /// Shared request state.
    state: Arc<ServerState>,
}

impl GatewayServer {
    /// Builds a server with audit sinks taken from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the storage engine or audit sink cannot
    /// be initialized.
    pub fn from_config(config: SqlGateConfig) -> Result<Self, ServerError> {
        let hooks = ServerHooks::from_audit_config(&config.server.audit)?;
        Self::with_hooks(config, hooks)
    }

    /// Builds a server with caller-provided hooks.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the storage engine cannot be initialized.
    pub fn with_hooks(config: SqlGateConfig, hooks: ServerHooks) -> Result<Self, ServerError> {
        let engine_config =
            config.storage.engine_config().map_err(|err| ServerError::Config(err.to_string()))?;
        let engine = SqliteEngine::new(engine_config)
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let gateway = Gateway::new(
            Arc::new(engine),
            GatewayConfig {
                max_tenants: config.tenants.max_tenants,
            },
        );
        let state = Arc::new(ServerState {
            gateway,
            authz: Box::new(TokenAuthz::from_config(&config.server.auth)),
            inflight: Arc::new(Semaphore::new(config.server.limits.max_inflight)),
            request_timeout: Duration::from_millis(config.server.limits.request_timeout_ms),
            max_body_bytes: config.server.max_body_bytes,
            hooks,
            next_request_id: AtomicU64::new(1),
        });
        Ok(Self {
            config,
            state,
        })
    }

    /// Returns the gateway served by this server.
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.state.gateway
    }

    /// Returns the router with all routes and the body limit applied.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/v0/{project_id}/{database_id}/policy", get(get_policy).put(put_policy))
            .route("/v0/{project_id}/{database_id}/raw", get(raw).post(raw))
            .route(
                "/v0/{project_id}/{database_id}/named/{name}",
                get(named_query).post(named_mutation),
            )
            .layer(DefaultBodyLimit::max(self.state.max_body_bytes))
            .with_state(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        if self.config.server.auth.uses_default_admin_token() {
            emit_default_token_warning(addr);
        }
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("bind {addr}: {err}")))?;
        self.serve_with_listener(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when serving fails.
    pub async fn serve_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|err| ServerError::Transport(err.to_string()))
    }
}

/// Warns that the reference admin token is still configured.
fn emit_default_token_warning(addr: SocketAddr) {
    let _ = writeln!(
        std::io::stderr(),
        "sqlgate: WARNING: serving on {addr} with the default admin token; set \
         server.auth.admin_tokens before exposing this server"
    );
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Raw JSON envelope.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEnvelope {
    /// SQL text.
    sql: String,
    /// Placeholder bindings.
    #[serde(default)]
    params: serde_json::Map<String, serde_json::Value>,
}

/// `GET /v0/{p}/{d}/policy`.
async fn get_policy(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    axum::extract::Path((project_id, database_id)): axum::extract::Path<(String, String)>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let call = RouteCall::new(RouteClass::PolicyGet, peer, &headers, project_id, database_id, None);
    dispatch(state, call, body, |gateway, key, _options, _body| {
        let snapshot = gateway.policy(key)?;
        to_json(&snapshot)
    })
    .await
}

/// `PUT /v0/{p}/{d}/policy`.
async fn put_policy(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    axum::extract::Path((project_id, database_id)): axum::extract::Path<(String, String)>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let call = RouteCall::new(RouteClass::PolicyPut, peer, &headers, project_id, database_id, None);
    dispatch(state, call, body, |gateway, key, options, body| {
        let request = parse_policy_request(&body)?;
        gateway.set_policy(key, request, options)?;
        Ok(NULL_BODY.to_vec())
    })
    .await
}

/// `GET|POST /v0/{p}/{d}/raw`.
async fn raw(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    axum::extract::Path((project_id, database_id)): axum::extract::Path<(String, String)>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let envelope = is_json_content(&headers);
    let call = RouteCall::new(RouteClass::Raw, peer, &headers, project_id, database_id, None);
    dispatch(state, call, body, move |gateway, key, options, body| {
        let (sql, bindings) = parse_raw_body(&body, envelope)?;
        let output = gateway.execute_raw(key, &sql, &bindings, options)?;
        to_json(&output)
    })
    .await
}

/// `GET /v0/{p}/{d}/named/{name}`.
async fn named_query(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    axum::extract::Path((project_id, database_id, name)): axum::extract::Path<(
        String,
        String,
        String,
    )>,
    headers: HeaderMap,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let pairs = query.map(|Query(pairs)| pairs).map_err(|err| err.body_text());
    let call = RouteCall::new(
        RouteClass::Query,
        peer,
        &headers,
        project_id,
        database_id,
        Some(name.clone()),
    );
    dispatch(state, call, body, move |gateway, key, options, body| {
        let bindings = if body.is_empty() {
            let pairs = pairs.map_err(GatewayError::InvalidParameter)?;
            Bindings::from_query_pairs(pairs)
        } else {
            parse_json_bindings(&body)?
        };
        let rows = gateway.query(key, &name, &bindings, options)?;
        to_json(&rows)
    })
    .await
}

/// `POST /v0/{p}/{d}/named/{name}`.
async fn named_mutation(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    axum::extract::Path((project_id, database_id, name)): axum::extract::Path<(
        String,
        String,
        String,
    )>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let call = RouteCall::new(
        RouteClass::Mutation,
        peer,
        &headers,
        project_id,
        database_id,
        Some(name.clone()),
    );
    dispatch(state, call, body, move |gateway, key, options, body| {
        let bindings = parse_json_bindings(&body)?;
        gateway.mutate(key, &name, &bindings, options)?;
        Ok(NULL_BODY.to_vec())
    })
    .await
}

// ============================================================================
// SECTION: Request Pipeline
// ============================================================================

/// Request metadata captured before dispatch.
struct RouteCall {
    /// Route class.
    route: RouteClass,
    /// Peer address.
    peer: SocketAddr,
    /// Authorization header.
    auth_header: Option<String>,
    /// Raw project path segment.
    project_id: String,
    /// Raw database path segment.
    database_id: String,
    /// Statement name for named routes.
    statement: Option<String>,
}

impl RouteCall {
    /// Captures the route, peer and credentials of one request.
    fn new(
        route: RouteClass,
        peer: SocketAddr,
        headers: &HeaderMap,
        project_id: String,
        database_id: String,
        statement: Option<String>,
    ) -> Self {
        let auth_header =
            headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
        Self {
            route,
            peer,
            auth_header,
            project_id,
            database_id,
            statement,
        }
    }

    /// Role the route requires.
    const fn role(&self) -> Role {
        match self.route {
            RouteClass::PolicyGet | RouteClass::PolicyPut | RouteClass::Raw => Role::Admin,
            RouteClass::Query | RouteClass::Mutation => Role::Client,
        }
    }

    /// Tenant label for audit output.
    fn tenant_label(&self) -> String {
        format!("{}/{}", self.project_id, self.database_id)
            .chars()
            .take(MAX_AUDIT_TENANT_CHARS)
            .collect()
    }
}

/// Failed request, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Failure {
    /// HTTP status.
    status: StatusCode,
    /// Stable error label.
    kind: &'static str,
    /// Response body text.
    message: String,
}

impl Failure {
    /// Body exceeded the configured limit.
    fn payload_too_large() -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            kind: "payload_too_large",
            message: "request body too large".to_string(),
        }
    }
}

impl From<GatewayError> for Failure {
    fn from(err: GatewayError) -> Self {
        Self {
            status: status_for(&err),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<AuthError> for Failure {
    fn from(err: AuthError) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            kind: "unauthorized",
            message: err.to_string(),
        }
    }
}

impl From<BytesRejection> for Failure {
    fn from(rejection: BytesRejection) -> Self {
        let status = rejection.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::payload_too_large();
        }
        Self {
            status,
            kind: "invalid_body",
            message: rejection.body_text(),
        }
    }
}

/// Maps a gateway error to its HTTP status.
const fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::InvalidIdentifier(_)
        | GatewayError::MalformedStatement(_)
        | GatewayError::InvalidPolicy(_)
        | GatewayError::MissingParameter(_)
        | GatewayError::InvalidParameter(_)
        | GatewayError::Engine(_) => StatusCode::BAD_REQUEST,
        GatewayError::UnknownStatement {
            ..
        } => StatusCode::NOT_FOUND,
        GatewayError::PolicyConflict {
            ..
        } => StatusCode::CONFLICT,
        GatewayError::TenantLimit {
            ..
        } => StatusCode::TOO_MANY_REQUESTS,
        GatewayError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Runs one request through the pipeline and records its outcome.
async fn dispatch<F>(
    state: Arc<ServerState>,
    call: RouteCall,
    body: Result<Bytes, BytesRejection>,
    work: F,
) -> Response
where
    F: FnOnce(&Gateway, &TenantKey, &CallOptions, Bytes) -> Result<Vec<u8>, GatewayError>
        + Send
        + 'static,
{
    let started = Instant::now();
    let request_id = format!("req-{}", state.next_request_id.fetch_add(1, Ordering::Relaxed));
    let request_bytes = body.as_ref().map_or(0, Bytes::len);
    let result = run(&state, &call, &request_id, body, work).await;
    let response_bytes = match &result {
        Ok(payload) => payload.len(),
        Err(failure) => failure.message.len(),
    };
    let (status, outcome, error_kind) = match &result {
        Ok(_) => (StatusCode::OK, Outcome::Ok, None),
        Err(failure) => (failure.status, Outcome::Error, Some(failure.kind)),
    };
    let event = GatewayMetricEvent {
        route: call.route,
        outcome,
        status: status.as_u16(),
        error_kind,
        request_bytes,
        response_bytes,
    };
    let latency = started.elapsed();
    state.hooks.metrics.record_request(event);
    state.hooks.metrics.record_latency(event, latency);
    state.hooks.audit.record(&GatewayAuditEvent::new(GatewayAuditEventParams {
        request_id: request_id.clone(),
        peer_ip: Some(call.peer.ip().to_string()),
        route: call.route,
        tenant: call.tenant_label(),
        statement: call.statement.clone(),
        outcome,
        status: status.as_u16(),
        error_kind,
        request_bytes,
        response_bytes,
        latency_ms: latency.as_millis(),
    }));
    render(result, &request_id)
}

/// Admission, authorization, tenant validation, and timed execution.
async fn run<F>(
    state: &Arc<ServerState>,
    call: &RouteCall,
    request_id: &str,
    body: Result<Bytes, BytesRejection>,
    work: F,
) -> Result<Vec<u8>, Failure>
where
    F: FnOnce(&Gateway, &TenantKey, &CallOptions, Bytes) -> Result<Vec<u8>, GatewayError>
        + Send
        + 'static,
{
    let body = body?;
    if body.len() > state.max_body_bytes {
        return Err(Failure::payload_too_large());
    }
    let permit = Arc::clone(&state.inflight)
        .try_acquire_owned()
        .map_err(|_| GatewayError::Busy("too many requests in flight".to_string()))?;

    let ctx = RequestContext {
        peer_ip: Some(call.peer.ip()),
        auth_header: call.auth_header.clone(),
        request_id: Some(request_id.to_string()),
    };
    let role = call.role();
    match state.authz.authorize(&ctx, role) {
        Ok(auth) => state.hooks.auth_audit.record(&AuthAuditEvent::allowed(&ctx, &auth)),
        Err(err) => {
            state.hooks.auth_audit.record(&AuthAuditEvent::denied(&ctx, role, &err));
            return Err(err.into());
        }
    }

    let key = TenantKey::parse(&call.project_id, &call.database_id).map_err(GatewayError::from)?;
    let options = CallOptions::with_timeout(state.request_timeout);
    let cancel = options.cancel.clone();
    let worker = Arc::clone(state);
    let mut task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        work(&worker.gateway, &key, &options, body)
    });
    let joined = match tokio::time::timeout(state.request_timeout, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            if cancel.cancel() {
                return Err(GatewayError::Timeout.into());
            }
            // The work passed its commit point; its outcome stands.
            task.await
        }
    };
    match joined {
        Ok(result) => result.map_err(Failure::from),
        Err(err) => Err(GatewayError::Internal(format!("request worker failed: {err}")).into()),
    }
}

/// Renders a pipeline result as an HTTP response.
fn render(result: Result<Vec<u8>, Failure>, request_id: &str) -> Response {
    let mut response = match result {
        Ok(payload) => {
            (StatusCode::OK, [(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))], payload)
                .into_response()
        }
        Err(failure) => {
            let mut response = (
                failure.status,
                [(CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE))],
                failure.message,
            )
                .into_response();
            if failure.status == StatusCode::UNAUTHORIZED {
                response.headers_mut().insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            response
        }
    };
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

// ============================================================================
// SECTION: Body Parsing
// ============================================================================

/// Serializes a success payload.
fn to_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, GatewayError> {
    serde_json::to_vec(value).map_err(|err| GatewayError::Internal(format!("encode response: {err}")))
}

/// Returns true when the request declares a JSON body.
fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
}

/// Decodes a policy replacement body.
fn parse_policy_request(body: &[u8]) -> Result<SetPolicyRequest, GatewayError> {
    serde_json::from_slice(body)
        .map_err(|err| GatewayError::InvalidPolicy(format!("invalid policy document: {err}")))
}

/// Decodes a raw body into SQL text and bindings.
fn parse_raw_body(body: &[u8], envelope: bool) -> Result<(String, Bindings), GatewayError> {
    if envelope {
        let parsed: RawEnvelope = serde_json::from_slice(body).map_err(|err| {
            GatewayError::MalformedStatement(format!("invalid raw envelope: {err}"))
        })?;
        return Ok((parsed.sql, Bindings::from_json_object(parsed.params)));
    }
    let sql = std::str::from_utf8(body)
        .map_err(|_| GatewayError::MalformedStatement("sql text is not valid utf-8".to_string()))?;
    Ok((sql.to_string(), Bindings::new()))
}

/// Decodes a JSON object of bindings; an empty body means no bindings.
fn parse_json_bindings(body: &[u8]) -> Result<Bindings, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Bindings::new());
    }
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(object)) => Ok(Bindings::from_json_object(object)),
        Ok(_) => Err(GatewayError::InvalidParameter("bindings must be a JSON object".to_string())),
        Err(err) => Err(GatewayError::InvalidParameter(format!("invalid bindings: {err}"))),
    }
}

#[cfg(test)]
mod tests;
