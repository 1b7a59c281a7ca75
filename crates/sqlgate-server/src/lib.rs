// crates/sqlgate-server/src/lib.rs
// ============================================================================
// Module: SQL Gate Server Library
// Description: HTTP surface for the SQL Gate execution gateway.
// Purpose: Expose policy, raw, and named routes with auth and admission.
// Dependencies: axum, sqlgate-config, sqlgate-core, sqlgate-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! `sqlgate-server` binds the execution gateway to HTTP. Requests pass the
//! auth guard, then admission control, then run on the blocking pool under
//! a per-request timeout that cancels the engine call when it fires.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod server;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileGatewayAuditSink;
pub use audit::GatewayAuditEvent;
pub use audit::GatewayAuditSink;
pub use audit::NoopGatewayAuditSink;
pub use audit::StderrGatewayAuditSink;
pub use auth::AuthAuditSink;
pub use auth::NoopAuditSink;
pub use auth::Role;
pub use auth::StderrAuditSink;
pub use server::GatewayServer;
pub use server::ServerError;
pub use server::ServerHooks;
pub use telemetry::GATEWAY_LATENCY_BUCKETS_MS;
pub use telemetry::GatewayMetrics;
pub use telemetry::NoopMetrics;
