// crates/sqlgate-config/src/config.rs
// ============================================================================
// Module: SQL Gate Configuration
// Description: Configuration loading and validation for the SQL Gate server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, sqlgate-store-sqlite, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `SQLGATE_CONFIG`, then
//! `./sqlgate.toml`; when none of these names an existing file the built-in
//! defaults apply. An explicitly named file that does not exist is an error.
//! Invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use sqlgate_store_sqlite::SqliteEngineConfig;
use sqlgate_store_sqlite::SqliteJournalMode;
use sqlgate_store_sqlite::SqliteLocation;
use sqlgate_store_sqlite::SqliteSyncMode;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "sqlgate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SQLGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:9000";
/// Reference admin token accepted when none is configured.
pub const DEFAULT_ADMIN_TOKEN: &str = "admin";
/// Maximum number of configured tokens per role.
pub(crate) const MAX_AUTH_TOKENS: usize = 64;
/// Maximum length of a configured token.
pub(crate) const MAX_AUTH_TOKEN_LENGTH: usize = 256;
/// Default maximum inflight requests.
pub(crate) const DEFAULT_MAX_INFLIGHT: usize = 256;
/// Default per-request timeout in milliseconds.
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Minimum per-request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 10;
/// Maximum per-request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 600_000;
/// Maximum busy timeout in milliseconds.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;
/// Default number of connections per tenant database.
pub(crate) const DEFAULT_POOL_SIZE: usize = 4;
/// Maximum number of connections per tenant database.
pub(crate) const MAX_POOL_SIZE: usize = 64;
/// Default tenant quota.
pub(crate) const DEFAULT_MAX_TENANTS: usize = 1024;
/// Maximum tenant quota.
pub(crate) const MAX_MAX_TENANTS: usize = 1_000_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// SQL Gate server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqlGateConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Tenant storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Tenant registry configuration.
    #[serde(default)]
    pub tenants: TenantsConfig,
}

impl SqlGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(resolved) = resolve_path(path)? else {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        };
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.storage.validate()?;
        self.tenants.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Admission and timeout limits.
    #[serde(default)]
    pub limits: ServerLimitsConfig,
    /// Bearer token configuration.
    #[serde(default)]
    pub auth: ServerAuthConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            limits: ServerLimitsConfig::default(),
            auth: ServerAuthConfig::default(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.limits.validate()?;
        self.auth.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// Admission and timeout limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerLimitsConfig {
    /// Maximum concurrently admitted requests.
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServerLimitsConfig {
    fn default() -> Self {
        Self {
            max_inflight: default_max_inflight(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ServerLimitsConfig {
    /// Validates request limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_inflight == 0 {
            return Err(ConfigError::Invalid("max_inflight must be greater than zero".to_string()));
        }
        if !(MIN_REQUEST_TIMEOUT_MS ..= MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms)
        {
            return Err(ConfigError::Invalid(format!(
                "request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}",
            )));
        }
        Ok(())
    }
}

/// Bearer token configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuthConfig {
    /// Tokens granting the admin role.
    #[serde(default = "default_admin_tokens")]
    pub admin_tokens: Vec<String>,
    /// Tokens granting the client role; empty leaves named routes open.
    #[serde(default)]
    pub client_tokens: Vec<String>,
}

impl Default for ServerAuthConfig {
    fn default() -> Self {
        Self {
            admin_tokens: default_admin_tokens(),
            client_tokens: Vec::new(),
        }
    }
}

impl ServerAuthConfig {
    /// Returns true when the reference `admin` token is accepted.
    #[must_use]
    pub fn uses_default_admin_token(&self) -> bool {
        self.admin_tokens.iter().any(|token| token == DEFAULT_ADMIN_TOKEN)
    }

    /// Validates token lists.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_tokens.is_empty() {
            return Err(ConfigError::Invalid("auth.admin_tokens must not be empty".to_string()));
        }
        validate_tokens("auth.admin_tokens", &self.admin_tokens)?;
        validate_tokens("auth.client_tokens", &self.client_tokens)?;
        Ok(())
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when absent.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// Private in-memory `SQLite` database per tenant.
    #[default]
    Memory,
    /// One `SQLite` file per tenant under `data_dir`.
    Sqlite,
}

/// Tenant storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend type.
    #[serde(rename = "type", default)]
    pub storage_type: StorageType,
    /// Data directory for the sqlite backend.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Connections per tenant database (sqlite backend only).
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Memory,
            data_dir: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            pool_size: default_pool_size(),
        }
    }
}

impl StorageConfig {
    /// Builds the engine configuration for this storage section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the sqlite backend lacks a
    /// data directory.
    pub fn engine_config(&self) -> Result<SqliteEngineConfig, ConfigError> {
        let (location, pool_size) = match self.storage_type {
            StorageType::Memory => (SqliteLocation::Memory, 1),
            StorageType::Sqlite => {
                let dir = self.data_dir.clone().ok_or_else(|| {
                    ConfigError::Invalid("storage.data_dir required for sqlite".to_string())
                })?;
                (SqliteLocation::Directory(dir), self.pool_size)
            }
        };
        Ok(SqliteEngineConfig {
            location,
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
            pool_size,
        })
    }

    /// Validates storage configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "storage.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        if self.pool_size == 0 || self.pool_size > MAX_POOL_SIZE {
            return Err(ConfigError::Invalid(format!(
                "storage.pool_size must be between 1 and {MAX_POOL_SIZE}"
            )));
        }
        match (self.storage_type, &self.data_dir) {
            (StorageType::Sqlite, None) => Err(ConfigError::Invalid(
                "storage.data_dir required for sqlite".to_string(),
            )),
            (StorageType::Sqlite, Some(dir)) => {
                validate_path_string("storage.data_dir", &dir.to_string_lossy())
            }
            (StorageType::Memory, Some(_)) => Err(ConfigError::Invalid(
                "storage.data_dir only valid for sqlite".to_string(),
            )),
            (StorageType::Memory, None) => Ok(()),
        }
    }
}

/// Tenant registry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantsConfig {
    /// Maximum number of tenants created per process.
    #[serde(default = "default_max_tenants")]
    pub max_tenants: usize,
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            max_tenants: default_max_tenants(),
        }
    }
}

impl TenantsConfig {
    /// Validates tenant limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tenants == 0 || self.max_tenants > MAX_MAX_TENANTS {
            return Err(ConfigError::Invalid(format!(
                "tenants.max_tenants must be between 1 and {MAX_MAX_TENANTS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller, environment, or default file.
///
/// Returns `None` when no path was given and the default file is absent.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default.is_file().then_some(default))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a token list.
fn validate_tokens(field: &str, tokens: &[String]) -> Result<(), ConfigError> {
    if tokens.len() > MAX_AUTH_TOKENS {
        return Err(ConfigError::Invalid(format!("too many {field} entries")));
    }
    for token in tokens {
        if token.is_empty() {
            return Err(ConfigError::Invalid(format!("{field} entry must be non-empty")));
        }
        if token.len() > MAX_AUTH_TOKEN_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} entry too long")));
        }
        if token.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "{field} entry must not contain whitespace"
            )));
        }
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size in bytes.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default maximum inflight requests.
pub(crate) const fn default_max_inflight() -> usize {
    DEFAULT_MAX_INFLIGHT
}

/// Default per-request timeout.
pub(crate) const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Default admin tokens.
fn default_admin_tokens() -> Vec<String> {
    vec![DEFAULT_ADMIN_TOKEN.to_string()]
}

/// Default audit logging toggle.
pub(crate) const fn default_audit_enabled() -> bool {
    true
}

/// Default busy timeout in milliseconds.
pub(crate) const fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Default pool size.
pub(crate) const fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

/// Default tenant quota.
pub(crate) const fn default_max_tenants() -> usize {
    DEFAULT_MAX_TENANTS
}

// ============================================================================
// SECTION: Tests
// ============================================================================
