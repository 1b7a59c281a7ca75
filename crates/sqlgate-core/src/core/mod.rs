// crates/sqlgate-core/src/core/mod.rs
// ============================================================================
// Module: SQL Gate Core Types
// Description: Identifiers, compiled statements, values, and policies.
// Purpose: Group the pure data model shared by the runtime and engines.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Pure types with no I/O. Everything here is deterministic and safe to share
//! across threads once constructed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod policy;
pub mod statement;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::DatabaseId;
pub use identifiers::IdentifierError;
pub use identifiers::MAX_STATEMENT_NAME_LENGTH;
pub use identifiers::MAX_TENANT_ID_LENGTH;
pub use identifiers::ProjectId;
pub use identifiers::StatementName;
pub use identifiers::TenantKey;
pub use policy::MAX_POLICY_STATEMENTS;
pub use policy::Namespace;
pub use policy::Policy;
pub use policy::PolicyDocument;
pub use policy::PolicyError;
pub use policy::SetPolicyRequest;
pub use policy::StatementEntry;
pub use statement::CompileError;
pub use statement::CompiledStatement;
pub use statement::MAX_PLACEHOLDERS;
pub use statement::MAX_STATEMENT_BYTES;
pub use statement::StatementShape;
pub use statement::compile;
pub use value::BindingError;
pub use value::BoundParameter;
pub use value::Bindings;
pub use value::RowSet;
pub use value::ScalarValue;
pub use value::SqlValue;
pub use value::StatementOutput;
