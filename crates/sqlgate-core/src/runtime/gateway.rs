// crates/sqlgate-core/src/runtime/gateway.rs
// ============================================================================
// Module: SQL Gate Execution Gateway
// Description: Policy administration, raw execution, and named dispatch.
// Purpose: Single entry point shared by every transport.
// Dependencies: crate::{core, interfaces, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! [`Gateway`] exposes the five operations of the service. Named calls take
//! one policy snapshot, resolve the statement and its bindings against it,
//! and execute once; a concurrent policy replacement cannot change what an
//! in-flight call runs. Raw calls compile the submitted SQL on every call.
//! Authorization happens in the transport before any of these methods run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::core::BindingError;
use crate::core::Bindings;
use crate::core::CompileError;
use crate::core::CompiledStatement;
use crate::core::IdentifierError;
use crate::core::Namespace;
use crate::core::PolicyDocument;
use crate::core::PolicyError;
use crate::core::RowSet;
use crate::core::SetPolicyRequest;
use crate::core::StatementOutput;
use crate::core::TenantKey;
use crate::core::compile;
use crate::interfaces::CancelToken;
use crate::interfaces::EngineError;
use crate::interfaces::ExecuteRequest;
use crate::interfaces::StorageEngine;
use crate::interfaces::StorePolicyRequest;
use crate::runtime::policy_store::PolicyStoreError;
use crate::runtime::registry::RegistryError;
use crate::runtime::registry::Tenant;
use crate::runtime::registry::TenantRegistry;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway failures. Each variant maps to one transport status.
///
/// Credential failures are not listed: transports reject them before any
/// gateway method runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Tenant path component is invalid.
    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),
    /// SQL text failed to compile.
    #[error("malformed statement: {0}")]
    MalformedStatement(String),
    /// Policy document is invalid for reasons other than SQL syntax.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
    /// No statement with that name in the namespace.
    #[error("unknown {namespace} statement: {name}")]
    UnknownStatement {
        /// Namespace searched.
        namespace: Namespace,
        /// Requested name.
        name: String,
    },
    /// A declared placeholder has no binding.
    #[error("missing parameter: {0}")]
    MissingParameter(String),
    /// A binding value cannot be bound.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Expected policy version is stale.
    #[error("policy version conflict: expected {expected}, current {actual}")]
    PolicyConflict {
        /// Version the caller expected.
        expected: u64,
        /// Version that is current.
        actual: u64,
    },
    /// Tenant quota exhausted.
    #[error("tenant limit reached ({max} tenants)")]
    TenantLimit {
        /// Configured quota.
        max: usize,
    },
    /// Capacity or lock contention; retry later.
    #[error("busy: {0}")]
    Busy(String),
    /// Deadline passed or the call was cancelled.
    #[error("statement timed out")]
    Timeout,
    /// Engine rejected the statement.
    #[error("engine error: {0}")]
    Engine(String),
    /// Unexpected server-side failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns a stable label for audit and telemetry.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::MalformedStatement(_) => "malformed_statement",
            Self::InvalidPolicy(_) => "invalid_policy",
            Self::UnknownStatement {
                ..
            } => "unknown_statement",
            Self::MissingParameter(_) => "missing_parameter",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::PolicyConflict {
                ..
            } => "policy_conflict",
            Self::TenantLimit {
                ..
            } => "tenant_limit",
            Self::Busy(_) => "busy",
            Self::Timeout => "timeout",
            Self::Engine(_) => "engine_error",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<CompileError> for GatewayError {
    fn from(err: CompileError) -> Self {
        Self::MalformedStatement(err.to_string())
    }
}

impl From<BindingError> for GatewayError {
    fn from(err: BindingError) -> Self {
        match err {
            BindingError::Missing(name) => Self::MissingParameter(name),
            BindingError::Invalid {
                ..
            } => Self::InvalidParameter(err.to_string()),
        }
    }
}

impl From<EngineError> for GatewayError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Rejected(message) => Self::Engine(message),
            EngineError::Busy(message) => Self::Busy(message),
            EngineError::Cancelled => Self::Timeout,
            EngineError::Io(_) | EngineError::Corrupt(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<PolicyStoreError> for GatewayError {
    fn from(err: PolicyStoreError) -> Self {
        match err {
            PolicyStoreError::Policy(PolicyError::Malformed {
                ..
            }) => Self::MalformedStatement(err.to_string()),
            PolicyStoreError::Policy(_) => Self::InvalidPolicy(err.to_string()),
            PolicyStoreError::Conflict {
                expected,
                actual,
            } => Self::PolicyConflict {
                expected,
                actual,
            },
            PolicyStoreError::Persist(engine) => engine.into(),
            PolicyStoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::TenantLimit {
                max,
            } => Self::TenantLimit {
                max,
            },
            RegistryError::Engine(engine) => engine.into(),
            RegistryError::StoredPolicy {
                ..
            }
            | RegistryError::Internal(_) => Self::Internal(err.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Gateway configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Maximum number of tenants the registry will create.
    pub max_tenants: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_tenants: 1024,
        }
    }
}

/// Per-call deadline and cancellation.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Latest instant at which work may start.
    pub deadline: Option<Instant>,
    /// Cancellation signal forwarded to the engine.
    pub cancel: CancelToken,
}

impl CallOptions {
    /// Creates options whose deadline is `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancel: CancelToken::new(),
        }
    }

    /// Returns true once the deadline passed or the call was cancelled.
    fn expired(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|at| Instant::now() >= at)
    }

    /// Fails once the deadline passed or the call was cancelled.
    fn check(&self) -> Result<(), GatewayError> {
        if self.expired() {
            return Err(GatewayError::Timeout);
        }
        Ok(())
    }
}

/// Policy as returned to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySnapshot {
    /// Current version.
    pub version: u64,
    /// Current statements.
    #[serde(flatten)]
    pub document: PolicyDocument,
}

/// Result of a raw call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GatewayOutput {
    /// Statement produced result columns.
    Rows(RowSet),
    /// Statement produced none; serializes as `null`.
    Empty,
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Execution gateway over a tenant registry.
pub struct Gateway {
    /// Tenant registry.
    registry: TenantRegistry,
}

impl Gateway {
    /// Creates a gateway backed by `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn StorageEngine>, config: GatewayConfig) -> Self {
        Self {
            registry: TenantRegistry::new(engine, config.max_tenants),
        }
    }

    /// Returns the tenant registry.
    #[must_use]
    pub const fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    /// Replaces a tenant's policy and returns the new version.
    ///
    /// The deadline is re-checked under the policy writer lock, and the
    /// replacement claims `options.cancel` before it becomes irreversible,
    /// so a call that reports [`GatewayError::Timeout`] changed nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedStatement`] or
    /// [`GatewayError::InvalidPolicy`] for a bad document,
    /// [`GatewayError::PolicyConflict`] for a stale expected version,
    /// [`GatewayError::Timeout`], and registry or engine errors. The current
    /// policy is unchanged on error.
    pub fn set_policy(
        &self,
        key: &TenantKey,
        request: SetPolicyRequest,
        options: &CallOptions,
    ) -> Result<u64, GatewayError> {
        options.check()?;
        let tenant = self.registry.resolve(key)?;
        let (document, expected_version) = request.into_parts();
        let session = tenant.session();
        let policy = tenant.policy().replace(&document, expected_version, |stored| {
            if options.expired() {
                return Err(EngineError::Cancelled);
            }
            session.store_policy(StorePolicyRequest {
                policy: stored,
                deadline: options.deadline,
                cancel: &options.cancel,
            })?;
            options.cancel.commit()
        })?;
        Ok(policy.version())
    }

    /// Returns a tenant's current policy.
    ///
    /// # Errors
    ///
    /// Returns registry errors.
    pub fn policy(&self, key: &TenantKey) -> Result<PolicySnapshot, GatewayError> {
        let tenant = self.registry.resolve(key)?;
        let policy = tenant.policy().current();
        Ok(PolicySnapshot {
            version: policy.version(),
            document: policy.to_document(),
        })
    }

    /// Compiles and executes arbitrary SQL.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedStatement`], binding errors for
    /// placeholders in the SQL, and engine errors.
    pub fn execute_raw(
        &self,
        key: &TenantKey,
        sql: &str,
        bindings: &Bindings,
        options: &CallOptions,
    ) -> Result<GatewayOutput, GatewayError> {
        let tenant = self.registry.resolve(key)?;
        let statement = compile(sql)?;
        match execute(&tenant, &statement, bindings, options)? {
            StatementOutput::Rows(rows) => Ok(GatewayOutput::Rows(rows)),
            StatementOutput::Done {
                ..
            } => Ok(GatewayOutput::Empty),
        }
    }

    /// Executes a named query and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownStatement`],
    /// [`GatewayError::MissingParameter`], and engine errors.
    pub fn query(
        &self,
        key: &TenantKey,
        name: &str,
        bindings: &Bindings,
        options: &CallOptions,
    ) -> Result<RowSet, GatewayError> {
        match self.named(key, Namespace::Query, name, bindings, options)? {
            StatementOutput::Rows(rows) => Ok(rows),
            StatementOutput::Done {
                ..
            } => Ok(RowSet::default()),
        }
    }

    /// Executes a named mutation, discarding any rows.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownStatement`],
    /// [`GatewayError::MissingParameter`], and engine errors.
    pub fn mutate(
        &self,
        key: &TenantKey,
        name: &str,
        bindings: &Bindings,
        options: &CallOptions,
    ) -> Result<(), GatewayError> {
        self.named(key, Namespace::Mutation, name, bindings, options)?;
        Ok(())
    }

    /// Resolves a named statement against one snapshot and runs it.
    fn named(
        &self,
        key: &TenantKey,
        namespace: Namespace,
        name: &str,
        bindings: &Bindings,
        options: &CallOptions,
    ) -> Result<StatementOutput, GatewayError> {
        let tenant = self.registry.resolve(key)?;
        let snapshot = tenant.policy().current();
        let statement = snapshot.lookup(namespace, name).ok_or_else(|| {
            GatewayError::UnknownStatement {
                namespace,
                name: name.to_string(),
            }
        })?;
        execute(&tenant, statement, bindings, options)
    }
}

/// Binds and executes one compiled statement.
fn execute(
    tenant: &Tenant,
    statement: &CompiledStatement,
    bindings: &Bindings,
    options: &CallOptions,
) -> Result<StatementOutput, GatewayError> {
    let params = bindings.resolve(statement)?;
    options.check()?;
    let output = tenant.session().execute(ExecuteRequest {
        sql: statement.sql(),
        params: &params,
        deadline: options.deadline,
        cancel: &options.cancel,
    })?;
    Ok(output)
}
