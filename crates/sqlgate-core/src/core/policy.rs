// crates/sqlgate-core/src/core/policy.rs
// ============================================================================
// Module: SQL Gate Policy Model
// Description: Wire documents and compiled, immutable policy snapshots.
// Purpose: Validate a whole policy up front so it can be published atomically.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`PolicyDocument`] is what administrators submit: two lists of
//! `{name, rawSql}` entries. [`Policy::compile`] validates every entry
//! (name syntax, uniqueness, SQL compilation, statement shape) and produces
//! an immutable snapshot. Nothing is partially applied: the first failure
//! aborts the whole compile.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::StatementName;
use crate::core::statement::CompileError;
use crate::core::statement::CompiledStatement;
use crate::core::statement::compile;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum number of statements per namespace.
pub const MAX_POLICY_STATEMENTS: usize = 1024;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// One named SQL template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatementEntry {
    /// Statement name.
    pub name: String,
    /// SQL template text.
    #[serde(alias = "raw_sql")]
    pub raw_sql: String,
}

impl StatementEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(name: impl Into<String>, raw_sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_sql: raw_sql.into(),
        }
    }
}

/// Policy as submitted or returned over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyDocument {
    /// Read statements, invoked through the query path.
    #[serde(default)]
    pub queries: Vec<StatementEntry>,
    /// Write statements, invoked through the mutation path.
    #[serde(default)]
    pub mutations: Vec<StatementEntry>,
}

/// Body of a policy replacement request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetPolicyRequest {
    /// Read statements.
    #[serde(default)]
    pub queries: Vec<StatementEntry>,
    /// Write statements.
    #[serde(default)]
    pub mutations: Vec<StatementEntry>,
    /// Version the caller expects to replace; absent means last writer wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl SetPolicyRequest {
    /// Splits the request into its document and expected version.
    #[must_use]
    pub fn into_parts(self) -> (PolicyDocument, Option<u64>) {
        (
            PolicyDocument {
                queries: self.queries,
                mutations: self.mutations,
            },
            self.expected_version,
        )
    }
}

impl From<PolicyDocument> for SetPolicyRequest {
    fn from(document: PolicyDocument) -> Self {
        Self {
            queries: document.queries,
            mutations: document.mutations,
            expected_version: None,
        }
    }
}

// ============================================================================
// SECTION: Namespaces
// ============================================================================

/// The two independent statement namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Row-returning statements.
    Query,
    /// State-changing statements.
    Mutation,
}

impl Namespace {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy validation failures. Any error rejects the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A statement's SQL did not compile.
    #[error("{namespace} `{name}`: {source}")]
    Malformed {
        /// Namespace of the entry.
        namespace: Namespace,
        /// Entry name.
        name: String,
        /// Compiler failure.
        source: CompileError,
    },
    /// An entry name is not a valid statement name.
    #[error("{namespace} entry: {source}")]
    InvalidName {
        /// Namespace of the entry.
        namespace: Namespace,
        /// Validation failure.
        source: IdentifierError,
    },
    /// A name appears twice in one namespace.
    #[error("duplicate {namespace} name `{name}`")]
    DuplicateName {
        /// Namespace of the entries.
        namespace: Namespace,
        /// Repeated name.
        name: String,
    },
    /// The statement's leading keyword does not fit its namespace.
    #[error("{namespace} `{name}` cannot start with {keyword}")]
    ShapeMismatch {
        /// Namespace of the entry.
        namespace: Namespace,
        /// Entry name.
        name: String,
        /// Leading keyword that was rejected.
        keyword: String,
    },
    /// A namespace holds too many statements.
    #[error("{namespace} count exceeds {max}")]
    TooManyStatements {
        /// Namespace that overflowed.
        namespace: Namespace,
        /// Configured limit.
        max: usize,
    },
}

// ============================================================================
// SECTION: Compiled Policy
// ============================================================================

/// Compiled statements keyed by name.
type StatementMap = BTreeMap<StatementName, Arc<CompiledStatement>>;

/// Immutable policy snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    /// Monotonic version; 0 is the initial empty policy.
    version: u64,
    /// Query namespace.
    queries: StatementMap,
    /// Mutation namespace.
    mutations: StatementMap,
}

impl Policy {
    /// Returns the empty version-0 policy every tenant starts with.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compiles a document into a snapshot with the given version.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] for the first invalid entry.
    pub fn compile(document: &PolicyDocument, version: u64) -> Result<Self, PolicyError> {
        Ok(Self {
            version,
            queries: compile_namespace(Namespace::Query, &document.queries)?,
            mutations: compile_namespace(Namespace::Mutation, &document.mutations)?,
        })
    }

    /// Returns the same statements under a new version.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Returns the policy version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Looks up a statement by namespace and name.
    #[must_use]
    pub fn lookup(&self, namespace: Namespace, name: &str) -> Option<&Arc<CompiledStatement>> {
        self.namespace(namespace).get(name)
    }

    /// Returns the number of statements in a namespace.
    #[must_use]
    pub fn len(&self, namespace: Namespace) -> usize {
        self.namespace(namespace).len()
    }

    /// Returns true when both namespaces are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.mutations.is_empty()
    }

    /// Renders the policy back into wire form, names sorted.
    #[must_use]
    pub fn to_document(&self) -> PolicyDocument {
        let render = |map: &StatementMap| {
            map.iter()
                .map(|(name, statement)| StatementEntry::new(name.as_str(), statement.sql()))
                .collect()
        };
        PolicyDocument {
            queries: render(&self.queries),
            mutations: render(&self.mutations),
        }
    }

    /// Returns the map for one namespace.
    const fn namespace(&self, namespace: Namespace) -> &StatementMap {
        match namespace {
            Namespace::Query => &self.queries,
            Namespace::Mutation => &self.mutations,
        }
    }
}

/// Compiles one namespace's entries.
fn compile_namespace(
    namespace: Namespace,
    entries: &[StatementEntry],
) -> Result<StatementMap, PolicyError> {
    if entries.len() > MAX_POLICY_STATEMENTS {
        return Err(PolicyError::TooManyStatements {
            namespace,
            max: MAX_POLICY_STATEMENTS,
        });
    }
    let mut map = StatementMap::new();
    for entry in entries {
        let name = StatementName::parse(&entry.name).map_err(|source| PolicyError::InvalidName {
            namespace,
            source,
        })?;
        if map.contains_key(&name) {
            return Err(PolicyError::DuplicateName {
                namespace,
                name: entry.name.clone(),
            });
        }
        let statement = compile(&entry.raw_sql).map_err(|source| PolicyError::Malformed {
            namespace,
            name: entry.name.clone(),
            source,
        })?;
        let shape = statement.shape();
        let fits = match namespace {
            Namespace::Query => shape.allows_query(),
            Namespace::Mutation => shape.allows_mutation(),
        };
        if !fits {
            return Err(PolicyError::ShapeMismatch {
                namespace,
                name: entry.name.clone(),
                keyword: statement.keyword().unwrap_or_default().to_string(),
            });
        }
        map.insert(name, Arc::new(statement));
    }
    Ok(map)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
