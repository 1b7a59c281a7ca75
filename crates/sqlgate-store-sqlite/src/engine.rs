// crates/sqlgate-store-sqlite/src/engine.rs
// ============================================================================
// Module: SQLite Storage Engine
// Description: Engine configuration and per-tenant database placement.
// Purpose: Open isolated SQLite sessions for gateway tenants.
// Dependencies: rusqlite, serde, sqlgate-core, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteEngine`] implements [`StorageEngine`]. In memory mode every tenant
//! receives a private in-memory database on one connection. In directory
//! mode a tenant lives at `<data_dir>/<project>/<database>.sqlite3` and gets
//! a pool of connections opened with the configured journal and sync modes.
//! Tenant path segments are already validated identifiers, so they cannot
//! escape the data directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use sqlgate_core::EngineError;
use sqlgate_core::EngineSession;
use sqlgate_core::StorageEngine;
use sqlgate_core::TenantKey;
use thiserror::Error;

use crate::session::SqliteSession;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default connections per tenant in directory mode.
pub const DEFAULT_POOL_SIZE: usize = 4;
/// Maximum connections per tenant.
pub const MAX_POOL_SIZE: usize = 64;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// File extension for tenant databases.
const DATABASE_EXTENSION: &str = "sqlite3";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode; readers do not block the writer.
    #[default]
    Wal,
    /// Rollback journal, deleted after each transaction.
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Where tenant databases live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteLocation {
    /// Private in-memory database per tenant; lost on exit.
    Memory,
    /// One database file per tenant under this directory.
    Directory(PathBuf),
}

/// Configuration for [`SqliteEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteEngineConfig {
    /// Database placement.
    pub location: SqliteLocation,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
    /// Journal mode for file databases.
    pub journal_mode: SqliteJournalMode,
    /// Sync mode for file databases.
    pub sync_mode: SqliteSyncMode,
    /// Connections per tenant in directory mode.
    pub pool_size: usize,
}

impl SqliteEngineConfig {
    /// In-memory configuration with defaults.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            location: SqliteLocation::Memory,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            pool_size: 1,
        }
    }

    /// Directory configuration with defaults.
    #[must_use]
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            location: SqliteLocation::Directory(path.into()),
            pool_size: DEFAULT_POOL_SIZE,
            ..Self::memory()
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` engine errors.
#[derive(Debug, Error)]
pub enum SqliteEngineError {
    /// File-system error.
    #[error("sqlite engine io error: {0}")]
    Io(String),
    /// `SQLite` error.
    #[error("sqlite engine db error: {0}")]
    Db(String),
    /// Stored data is corrupt.
    #[error("sqlite engine corruption: {0}")]
    Corrupt(String),
    /// Schema version mismatch.
    #[error("sqlite engine version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid configuration or path.
    #[error("sqlite engine invalid config: {0}")]
    Invalid(String),
}

impl From<SqliteEngineError> for EngineError {
    fn from(error: SqliteEngineError) -> Self {
        match error {
            SqliteEngineError::Io(_) | SqliteEngineError::Db(_) | SqliteEngineError::Invalid(_) => {
                Self::Io(error.to_string())
            }
            SqliteEngineError::Corrupt(_) | SqliteEngineError::VersionMismatch(_) => {
                Self::Corrupt(error.to_string())
            }
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// `SQLite`-backed storage engine.
#[derive(Debug, Clone)]
pub struct SqliteEngine {
    /// Engine configuration.
    config: SqliteEngineConfig,
}

impl SqliteEngine {
    /// Creates an engine, creating the data directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteEngineError::Invalid`] for an out-of-range pool size
    /// or unusable data directory.
    pub fn new(config: SqliteEngineConfig) -> Result<Self, SqliteEngineError> {
        if config.pool_size == 0 || config.pool_size > MAX_POOL_SIZE {
            return Err(SqliteEngineError::Invalid(format!(
                "pool_size must be between 1 and {MAX_POOL_SIZE}"
            )));
        }
        if let SqliteLocation::Directory(dir) = &config.location {
            validate_path(dir)?;
            if dir.exists() && !dir.is_dir() {
                return Err(SqliteEngineError::Invalid(
                    "data_dir must be a directory, not a file".to_string(),
                ));
            }
            std::fs::create_dir_all(dir).map_err(|err| SqliteEngineError::Io(err.to_string()))?;
        }
        Ok(Self {
            config,
        })
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteEngineConfig {
        &self.config
    }

    /// Returns the database file for a tenant in directory mode.
    #[must_use]
    pub fn tenant_path(&self, tenant: &TenantKey) -> Option<PathBuf> {
        match &self.config.location {
            SqliteLocation::Memory => None,
            SqliteLocation::Directory(dir) => Some(
                dir.join(tenant.project_id().as_str())
                    .join(format!("{}.{DATABASE_EXTENSION}", tenant.database_id())),
            ),
        }
    }

    /// Opens the session for a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteEngineError`] when the database cannot be opened or
    /// initialized.
    pub fn open_session(&self, tenant: &TenantKey) -> Result<SqliteSession, SqliteEngineError> {
        match self.tenant_path(tenant) {
            None => SqliteSession::open_memory(tenant.clone(), &self.config),
            Some(path) => {
                validate_path(&path)?;
                if path.is_dir() {
                    return Err(SqliteEngineError::Invalid(
                        "tenant database path must be a file, not a directory".to_string(),
                    ));
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|err| SqliteEngineError::Io(err.to_string()))?;
                }
                SqliteSession::open_file(tenant.clone(), &path, &self.config)
            }
        }
    }
}

impl StorageEngine for SqliteEngine {
    fn open(&self, tenant: &TenantKey) -> Result<Arc<dyn EngineSession>, EngineError> {
        let session = self.open_session(tenant)?;
        Ok(Arc::new(session))
    }
}

/// Validates path length limits.
fn validate_path(path: &Path) -> Result<(), SqliteEngineError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteEngineError::Invalid("path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteEngineError::Invalid(
                "path contains an overlong component".to_string(),
            ));
        }
    }
    Ok(())
}
