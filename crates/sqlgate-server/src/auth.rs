// crates/sqlgate-server/src/auth.rs
// ============================================================================
// Module: Auth Guard
// Description: Bearer-token authentication for admin and client routes.
// Purpose: Decide the caller's role before any tenant or policy access.
// Dependencies: serde, sha2, sqlgate-config, subtle
// ============================================================================

//! ## Overview
//! Every route declares the [`Role`] it requires. Admin routes (`/policy`,
//! `/raw`) need a configured admin token. Client routes (`/named`) are open
//! unless client tokens are configured, in which case a client or admin
//! token is required. Tokens are compared in constant time and only their
//! SHA-256 fingerprint is ever logged. Every decision emits an
//! [`AuthAuditEvent`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::IpAddr;

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use sqlgate_config::ServerAuthConfig;
use subtle::Choice;
use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted authorization header size.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Roles and Context
// ============================================================================

/// Role a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Policy management and raw SQL.
    Admin,
    /// Named statement invocation.
    Client,
}

impl Role {
    /// Returns a stable label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Client => "client",
        }
    }
}

/// Per-request context used for auth decisions.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// Authorization header value.
    pub auth_header: Option<String>,
    /// Server-assigned request identifier.
    pub request_id: Option<String>,
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Role granted.
    pub role: Role,
    /// SHA-256 fingerprint of the presented token, if any.
    pub token_fingerprint: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Missing or invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthenticated(String),
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Route authorization interface.
pub trait RouteAuthz: Send + Sync {
    /// Authorizes a request for `role`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the caller lacks the role.
    fn authorize(&self, ctx: &RequestContext, role: Role) -> Result<AuthContext, AuthError>;
}

/// Audit sink for auth decisions.
pub trait AuthAuditSink: Send + Sync {
    /// Record an auth audit event.
    fn record(&self, event: &AuthAuditEvent);
}

// ============================================================================
// SECTION: Token Policy
// ============================================================================

/// Static token lists from configuration.
pub struct TokenAuthz {
    /// Tokens granting admin.
    admin_tokens: Vec<String>,
    /// Tokens granting client; empty means client routes are open.
    client_tokens: Vec<String>,
}

impl TokenAuthz {
    /// Builds the policy from server auth configuration.
    #[must_use]
    pub fn from_config(config: &ServerAuthConfig) -> Self {
        Self {
            admin_tokens: config.admin_tokens.clone(),
            client_tokens: config.client_tokens.clone(),
        }
    }
}

impl RouteAuthz for TokenAuthz {
    fn authorize(&self, ctx: &RequestContext, role: Role) -> Result<AuthContext, AuthError> {
        if role == Role::Client && self.client_tokens.is_empty() {
            return Ok(AuthContext {
                role,
                token_fingerprint: None,
            });
        }
        let token = parse_bearer_token(ctx.auth_header.as_deref())?;
        let admin = matches_any(&token, &self.admin_tokens);
        let allowed = match role {
            Role::Admin => admin,
            Role::Client => admin || matches_any(&token, &self.client_tokens),
        };
        if !allowed {
            return Err(AuthError::Unauthenticated("invalid bearer token".to_string()));
        }
        Ok(AuthContext {
            role,
            token_fingerprint: Some(token_fingerprint(&token)),
        })
    }
}

/// Returns true when `token` equals any candidate, scanning all of them.
fn matches_any(token: &str, candidates: &[String]) -> bool {
    let mut found = Choice::from(0);
    for candidate in candidates {
        found |= token.as_bytes().ct_eq(candidate.as_bytes());
    }
    found.into()
}

/// Returns the lowercase hex SHA-256 of a token.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

/// Hex digits.
const HEX: &[u8; 16] = b"0123456789abcdef";

/// Extracts the token from an `authorization: Bearer <token>` header.
///
/// # Errors
///
/// Returns [`AuthError::Unauthenticated`] when the header is missing,
/// oversized, or not a bearer credential.
pub fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header = auth_header
        .ok_or_else(|| AuthError::Unauthenticated("missing authorization".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let (scheme, token) = header.trim().split_once(' ').unwrap_or((header.trim(), ""));
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Auth audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Decision outcome.
    pub decision: &'static str,
    /// Role requested.
    pub role: Role,
    /// Caller IP address (if available).
    pub peer_ip: Option<String>,
    /// Bearer token fingerprint (sha256).
    pub token_fingerprint: Option<String>,
    /// Failure reason (for deny events).
    pub reason: Option<String>,
    /// Request identifier.
    pub request_id: Option<String>,
}

impl AuthAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(ctx: &RequestContext, auth: &AuthContext) -> Self {
        Self {
            event: "sqlgate_authz",
            decision: "allow",
            role: auth.role,
            peer_ip: ctx.peer_ip.map(|ip| ip.to_string()),
            token_fingerprint: auth.token_fingerprint.clone(),
            reason: None,
            request_id: ctx.request_id.clone(),
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(ctx: &RequestContext, role: Role, error: &AuthError) -> Self {
        Self {
            event: "sqlgate_authz",
            decision: "deny",
            role,
            peer_ip: ctx.peer_ip.map(|ip| ip.to_string()),
            token_fingerprint: None,
            reason: Some(error.to_string()),
            request_id: ctx.request_id.clone(),
        }
    }
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuthAuditSink for StderrAuditSink {
    fn record(&self, event: &AuthAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuthAuditSink for NoopAuditSink {
    fn record(&self, _event: &AuthAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "Test assertions use expect for concise failure messages."
    )]

    use super::*;

    fn authz(client_tokens: &[&str]) -> TokenAuthz {
        TokenAuthz::from_config(&ServerAuthConfig {
            admin_tokens: vec!["admin".to_string(), "root-2".to_string()],
            client_tokens: client_tokens.iter().map(ToString::to_string).collect(),
        })
    }

    fn ctx(header: Option<&str>) -> RequestContext {
        RequestContext {
            auth_header: header.map(str::to_string),
            ..RequestContext::default()
        }
    }

    #[test]
    fn admin_routes_require_an_admin_token() {
        let authz = authz(&[]);
        assert!(authz.authorize(&ctx(Some("Bearer admin")), Role::Admin).is_ok());
        assert!(authz.authorize(&ctx(Some("bearer root-2")), Role::Admin).is_ok());
        assert!(authz.authorize(&ctx(Some("Bearer nope")), Role::Admin).is_err());
        assert!(authz.authorize(&ctx(None), Role::Admin).is_err());
        assert!(authz.authorize(&ctx(Some("Basic admin")), Role::Admin).is_err());
    }

    #[test]
    fn client_routes_are_open_without_client_tokens() {
        let auth = authz(&[]).authorize(&ctx(None), Role::Client).unwrap();
        assert_eq!(auth.token_fingerprint, None);
    }

    #[test]
    fn configured_client_tokens_gate_client_routes() {
        let authz = authz(&["reader"]);
        assert!(authz.authorize(&ctx(None), Role::Client).is_err());
        assert!(authz.authorize(&ctx(Some("Bearer reader")), Role::Client).is_ok());
        assert!(authz.authorize(&ctx(Some("Bearer admin")), Role::Client).is_ok());
        assert!(authz.authorize(&ctx(Some("Bearer reader")), Role::Admin).is_err());
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            token_fingerprint("admin"),
            "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918"
        );
        let auth = authz(&[]).authorize(&ctx(Some("Bearer admin")), Role::Admin).unwrap();
        assert_eq!(auth.token_fingerprint.as_deref(), Some(token_fingerprint("admin").as_str()));
    }

    #[test]
    fn bearer_parsing_rejects_malformed_headers() {
        assert!(parse_bearer_token(Some("Bearer")).is_err());
        assert!(parse_bearer_token(Some("Bearer   ")).is_err());
        assert_eq!(parse_bearer_token(Some("  Bearer  tok ")).unwrap(), "tok");
        let huge = format!("Bearer {}", "a".repeat(MAX_AUTH_HEADER_BYTES));
        assert!(parse_bearer_token(Some(&huge)).is_err());
    }
}
