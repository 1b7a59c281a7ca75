// crates/sqlgate-config/src/lib.rs
// ============================================================================
// Module: SQL Gate Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for sqlgate.toml semantics.
// Dependencies: serde, sqlgate-store-sqlite, toml
// ============================================================================

//! ## Overview
//! `sqlgate-config` defines the configuration model for the SQL Gate server.
//! Loading is strict and fails closed: unknown keys, oversized files, and
//! out-of-range limits are rejected before a server is built.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
