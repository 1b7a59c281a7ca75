// crates/sqlgate-core/src/runtime/mod.rs
// ============================================================================
// Module: SQL Gate Runtime
// Description: Tenant registry, policy store, and execution gateway.
// Purpose: Route calls to isolated tenants and execute policy statements.
// Dependencies: crate::{core, interfaces}, arc-swap
// ============================================================================

//! ## Overview
//! Runtime modules hold all shared mutable state in the gateway: the tenant
//! map and one policy pointer per tenant. Every transport calls into the
//! same [`Gateway`] so HTTP and in-process callers observe identical rules.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod gateway;
pub mod policy_store;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use gateway::CallOptions;
pub use gateway::Gateway;
pub use gateway::GatewayConfig;
pub use gateway::GatewayError;
pub use gateway::GatewayOutput;
pub use gateway::PolicySnapshot;
pub use policy_store::PolicyStore;
pub use policy_store::PolicyStoreError;
pub use registry::RegistryError;
pub use registry::Tenant;
pub use registry::TenantRegistry;
