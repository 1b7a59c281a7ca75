// crates/sqlgate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the `config example` command.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `sqlgate.toml`. Every key is shown with its default
//! except storage, which selects the durable sqlite backend.

/// Returns a canonical example `sqlgate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:9000"
max_body_bytes = 1048576

[server.limits]
max_inflight = 256
request_timeout_ms = 30000

[server.auth]
admin_tokens = ["change-me"]
# client_tokens = ["client-token"]

[server.audit]
enabled = true
# path = "sqlgate-audit.jsonl"

[storage]
type = "sqlite"
data_dir = "sqlgate-data"
busy_timeout_ms = 5000
journal_mode = "wal"
sync_mode = "full"
pool_size = 4

[tenants]
max_tenants = 1024
"#,
    )
}
