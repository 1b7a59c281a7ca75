// crates/sqlgate-server/src/audit.rs
// ============================================================================
// Module: Gateway Audit Logging
// Description: Structured audit events for gateway request handling.
// Purpose: Emit redacted audit logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! One [`GatewayAuditEvent`] is emitted per HTTP request. Events carry the
//! tenant, route, statement name, outcome, and sizes; they never carry SQL
//! text, binding values, or tokens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::telemetry::Outcome;
use crate::telemetry::RouteClass;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Gateway request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Server-assigned request identifier.
    pub request_id: String,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Route classification.
    pub route: RouteClass,
    /// Tenant in `project/database` form, as requested.
    pub tenant: String,
    /// Statement name for named routes.
    pub statement: Option<String>,
    /// Request outcome.
    pub outcome: Outcome,
    /// HTTP status code.
    pub status: u16,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
    /// Handling latency in milliseconds.
    pub latency_ms: u128,
}

/// Inputs required to construct an audit event.
pub struct GatewayAuditEventParams {
    /// Server-assigned request identifier.
    pub request_id: String,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Route classification.
    pub route: RouteClass,
    /// Tenant label.
    pub tenant: String,
    /// Statement name for named routes.
    pub statement: Option<String>,
    /// Request outcome.
    pub outcome: Outcome,
    /// HTTP status code.
    pub status: u16,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
    /// Handling latency in milliseconds.
    pub latency_ms: u128,
}

impl GatewayAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: GatewayAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "gateway_request",
            timestamp_ms,
            request_id: params.request_id,
            peer_ip: params.peer_ip,
            route: params.route,
            tenant: params.tenant,
            statement: params.statement,
            outcome: params.outcome,
            status: params.status,
            error_kind: params.error_kind,
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
            latency_ms: params.latency_ms,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for gateway request events.
pub trait GatewayAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &GatewayAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrGatewayAuditSink;

impl GatewayAuditSink for StderrGatewayAuditSink {
    fn record(&self, event: &GatewayAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileGatewayAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileGatewayAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl GatewayAuditSink for FileGatewayAuditSink {
    fn record(&self, event: &GatewayAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopGatewayAuditSink;

impl GatewayAuditSink for NoopGatewayAuditSink {
    fn record(&self, _event: &GatewayAuditEvent) {}
}
