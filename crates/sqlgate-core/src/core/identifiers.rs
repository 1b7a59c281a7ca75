// crates/sqlgate-core/src/core/identifiers.rs
// ============================================================================
// Module: SQL Gate Identifiers
// Description: Validated identifiers for tenants and policy statements.
// Purpose: Keep path-derived names safe for routing and on-disk layout.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Tenants are addressed by a `(project_id, database_id)` pair taken from the
//! request path, and both components double as file-system path segments for
//! durable engines. Validation is therefore strict: ASCII only, alphabetic
//! first character, bounded length. Statement names follow SQL identifier
//! rules so they can never collide with path syntax.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum length of a project or database identifier.
pub const MAX_TENANT_ID_LENGTH: usize = 32;
/// Maximum length of a statement name.
pub const MAX_STATEMENT_NAME_LENGTH: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Project identifier is not a valid tenant component.
    #[error("invalid project id `{value}`: {reason}")]
    Project {
        /// Rejected input.
        value: String,
        /// Validation failure.
        reason: &'static str,
    },
    /// Database identifier is not a valid tenant component.
    #[error("invalid database id `{value}`: {reason}")]
    Database {
        /// Rejected input.
        value: String,
        /// Validation failure.
        reason: &'static str,
    },
    /// Statement name is not a valid SQL-style identifier.
    #[error("invalid statement name `{value}`: {reason}")]
    StatementName {
        /// Rejected input.
        value: String,
        /// Validation failure.
        reason: &'static str,
    },
}

// ============================================================================
// SECTION: Tenant Identifiers
// ============================================================================

/// Project component of a tenant key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Parses and validates a project identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Project`] when the value is not a valid
    /// tenant component.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        validate_tenant_component(value).map_err(|reason| IdentifierError::Project {
            value: truncate_for_error(value),
            reason,
        })?;
        Ok(Self(value.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Database component of a tenant key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DatabaseId(String);

impl DatabaseId {
    /// Parses and validates a database identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Database`] when the value is not a valid
    /// tenant component.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        validate_tenant_component(value).map_err(|reason| IdentifierError::Database {
            value: truncate_for_error(value),
            reason,
        })?;
        Ok(Self(value.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies one isolated database: a `(project_id, database_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantKey {
    /// Project component.
    project_id: ProjectId,
    /// Database component.
    database_id: DatabaseId,
}

impl TenantKey {
    /// Builds a tenant key from validated components.
    #[must_use]
    pub const fn new(project_id: ProjectId, database_id: DatabaseId) -> Self {
        Self {
            project_id,
            database_id,
        }
    }

    /// Parses both components of a tenant key.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] for the first invalid component.
    pub fn parse(project_id: &str, database_id: &str) -> Result<Self, IdentifierError> {
        Ok(Self::new(ProjectId::parse(project_id)?, DatabaseId::parse(database_id)?))
    }

    /// Returns the project component.
    #[must_use]
    pub const fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// Returns the database component.
    #[must_use]
    pub const fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.database_id)
    }
}

// ============================================================================
// SECTION: Statement Names
// ============================================================================

/// Name of a policy statement: `[A-Za-z_][A-Za-z0-9_]*`, at most 64 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatementName(String);

impl StatementName {
    /// Parses and validates a statement name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::StatementName`] when the name is invalid.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        validate_statement_name(value).map_err(|reason| IdentifierError::StatementName {
            value: truncate_for_error(value),
            reason,
        })?;
        Ok(Self(value.to_string()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for StatementName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StatementName {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_statement_name(&value).map_err(|reason| IdentifierError::StatementName {
            value: truncate_for_error(&value),
            reason,
        })?;
        Ok(Self(value))
    }
}

impl From<StatementName> for String {
    fn from(value: StatementName) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a project or database identifier.
fn validate_tenant_component(value: &str) -> Result<(), &'static str> {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err("must not be empty");
    };
    if value.len() > MAX_TENANT_ID_LENGTH {
        return Err("exceeds 32 characters");
    }
    if !first.is_ascii_alphabetic() {
        return Err("must start with an ASCII letter");
    }
    if !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-') {
        return Err("may only contain ASCII letters, digits, '_' or '-'");
    }
    Ok(())
}

/// Validates a statement name.
fn validate_statement_name(value: &str) -> Result<(), &'static str> {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err("must not be empty");
    };
    if value.len() > MAX_STATEMENT_NAME_LENGTH {
        return Err("exceeds 64 characters");
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err("must start with an ASCII letter or '_'");
    }
    if !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err("may only contain ASCII letters, digits or '_'");
    }
    Ok(())
}

/// Bounds rejected input echoed back in error messages.
fn truncate_for_error(value: &str) -> String {
    /// Longest echoed prefix, in bytes.
    const LIMIT: usize = 80;
    if value.len() <= LIMIT {
        return value.to_string();
    }
    let mut end = LIMIT;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &value[.. end])
}

// ============================================================================
// SECTION: Tests
// ============================================================================
