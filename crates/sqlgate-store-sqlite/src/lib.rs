// crates/sqlgate-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQL Gate SQLite Engine
// Description: StorageEngine backend giving each tenant its own SQLite database.
// Purpose: Execute gateway statements with pooling, cancellation, and durability.
// Dependencies: sqlgate-core, r2d2, r2d2_sqlite, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides the SQLite-backed [`StorageEngine`] used by the
//! gateway. Each tenant maps to an isolated database: a private in-memory
//! database in memory mode, or `<data_dir>/<project>/<database>.sqlite3` in
//! directory mode. Sessions pool connections through `r2d2`, bind every
//! value as a SQLite parameter, abort running statements through the
//! connection interrupt handle, and persist the tenant policy in reserved
//! tables.
//!
//! Security posture: SQL text comes from administrators or the tenant's
//! policy; binding values are untrusted and are never spliced into SQL.
//!
//! [`StorageEngine`]: sqlgate_core::StorageEngine

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod engine;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::SqliteEngine;
pub use engine::SqliteEngineConfig;
pub use engine::SqliteEngineError;
pub use engine::SqliteJournalMode;
pub use engine::SqliteLocation;
pub use engine::SqliteSyncMode;
pub use session::POLICY_TABLE;
pub use session::SqliteSession;
