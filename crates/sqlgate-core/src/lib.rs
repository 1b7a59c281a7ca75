// crates/sqlgate-core/src/lib.rs
// ============================================================================
// Module: SQL Gate Core Library
// Description: Public API surface for the SQL Gate core.
// Purpose: Expose statement compilation, tenant routing, and gateway execution.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! SQL Gate core turns a per-tenant policy of named SQL templates into a
//! validated, atomically swappable registry and executes statements against a
//! pluggable storage engine. Transports (HTTP, CLI) live in sibling crates and
//! only talk to the [`Gateway`].
//!
//! Security posture: SQL text and bindings are untrusted input. Bindings are
//! always passed to the engine as bound parameters, never spliced into SQL.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CancelGuard;
pub use interfaces::CancelToken;
pub use interfaces::EngineError;
pub use interfaces::EngineSession;
pub use interfaces::ExecuteRequest;
pub use interfaces::StorageEngine;
pub use interfaces::StorePolicyRequest;
pub use interfaces::StoredPolicy;
pub use runtime::CallOptions;
pub use runtime::Gateway;
pub use runtime::GatewayConfig;
pub use runtime::GatewayError;
pub use runtime::GatewayOutput;
pub use runtime::PolicySnapshot;
pub use runtime::PolicyStore;
pub use runtime::PolicyStoreError;
pub use runtime::RegistryError;
pub use runtime::Tenant;
pub use runtime::TenantRegistry;
