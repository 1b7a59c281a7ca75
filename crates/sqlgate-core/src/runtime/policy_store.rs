// crates/sqlgate-core/src/runtime/policy_store.rs
// ============================================================================
// Module: SQL Gate Policy Store
// Description: Per-tenant current policy with atomic whole-policy replacement.
// Purpose: Give readers a lock-free snapshot while writers swap policies.
// Dependencies: crate::{core, interfaces}, arc-swap
// ============================================================================

//! ## Overview
//! The current [`Policy`] lives behind an [`ArcSwap`]. Readers load an
//! `Arc<Policy>` without locking and keep it for the rest of their call, so a
//! concurrent replacement never changes the statement they resolved.
//! Writers are serialized by a mutex that readers never touch. A replacement
//! compiles the full document, checks the optional expected version,
//! persists, and only then swaps the pointer. Any failure leaves the current
//! policy untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::core::Policy;
use crate::core::PolicyDocument;
use crate::core::PolicyError;
use crate::interfaces::EngineError;
use crate::interfaces::StoredPolicy;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy replacement failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyStoreError {
    /// The submitted document is invalid.
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// The caller's expected version is stale.
    #[error("policy version conflict: expected {expected}, current {actual}")]
    Conflict {
        /// Version the caller expected.
        expected: u64,
        /// Version that is current.
        actual: u64,
    },
    /// Persisting the policy failed.
    #[error("policy persist failed: {0}")]
    Persist(EngineError),
    /// The writer lock is poisoned or the version space is exhausted.
    #[error("policy store error: {0}")]
    Internal(String),
}

// ============================================================================
// SECTION: Policy Store
// ============================================================================

/// Current policy for one tenant.
pub struct PolicyStore {
    /// Published snapshot.
    current: ArcSwap<Policy>,
    /// Serializes writers.
    writer: Mutex<()>,
}

impl PolicyStore {
    /// Creates a store publishing `initial`.
    #[must_use]
    pub fn new(initial: Policy) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            writer: Mutex::new(()),
        }
    }

    /// Returns the snapshot visible now. Never blocks.
    #[must_use]
    pub fn current(&self) -> Arc<Policy> {
        self.current.load_full()
    }

    /// Replaces the whole policy.
    ///
    /// `persist` runs after validation and before publication; its failure
    /// aborts the replacement.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyStoreError`] when the document is invalid, the
    /// expected version does not match, or persistence fails.
    pub fn replace<F>(
        &self,
        document: &PolicyDocument,
        expected_version: Option<u64>,
        persist: F,
    ) -> Result<Arc<Policy>, PolicyStoreError>
    where
        F: FnOnce(&StoredPolicy) -> Result<(), EngineError>,
    {
        let compiled = Policy::compile(document, 0)?;
        let _writer = self
            .writer
            .lock()
            .map_err(|_| PolicyStoreError::Internal("policy writer mutex poisoned".to_string()))?;
        let actual = self.current.load().version();
        if let Some(expected) = expected_version
            && expected != actual
        {
            return Err(PolicyStoreError::Conflict {
                expected,
                actual,
            });
        }
        let version = actual
            .checked_add(1)
            .ok_or_else(|| PolicyStoreError::Internal("policy version overflow".to_string()))?;
        let next = Arc::new(compiled.with_version(version));
        persist(&StoredPolicy {
            version,
            document: next.to_document(),
        })
        .map_err(PolicyStoreError::Persist)?;
        self.current.store(Arc::clone(&next));
        Ok(next)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "Test assertions use expect for concise failure messages."
    )]

    use std::thread;

    use super::*;
    use crate::core::Namespace;
    use crate::core::StatementEntry;

    fn document(sql: &str) -> PolicyDocument {
        PolicyDocument {
            queries: vec![StatementEntry::new("q", sql)],
            mutations: Vec::new(),
        }
    }

    fn no_persist(_: &StoredPolicy) -> Result<(), EngineError> {
        Ok(())
    }

    #[test]
    fn replace_bumps_version_and_publishes() {
        let store = PolicyStore::new(Policy::empty());
        assert_eq!(store.current().version(), 0);
        let next = store.replace(&document("SELECT 1"), None, no_persist).unwrap();
        assert_eq!(next.version(), 1);
        assert_eq!(store.current().version(), 1);
        assert!(store.current().lookup(Namespace::Query, "q").is_some());
    }

    #[test]
    fn invalid_document_leaves_policy_unchanged() {
        let store = PolicyStore::new(Policy::empty());
        store.replace(&document("SELECT 1"), None, no_persist).unwrap();
        let before = store.current();
        let err = store.replace(&document("SELECT ?"), None, no_persist).expect_err("malformed");
        assert!(matches!(err, PolicyStoreError::Policy(PolicyError::Malformed { .. })));
        assert!(Arc::ptr_eq(&before, &store.current()));
    }

    #[test]
    fn persist_failure_leaves_policy_unchanged() {
        let store = PolicyStore::new(Policy::empty());
        let err = store
            .replace(&document("SELECT 1"), None, |_| Err(EngineError::Io("disk full".to_string())))
            .expect_err("persist");
        assert!(matches!(err, PolicyStoreError::Persist(_)));
        assert_eq!(store.current().version(), 0);
        assert!(store.current().is_empty());
    }

    #[test]
    fn persist_sees_next_version_and_document() {
        let store = PolicyStore::new(Policy::empty());
        let mut seen = None;
        store
            .replace(&document("SELECT 1"), None, |stored| {
                seen = Some(stored.clone());
                Ok(())
            })
            .unwrap();
        let stored = seen.expect("persist called");
        assert_eq!(stored.version, 1);
        assert_eq!(stored.document, document("SELECT 1"));
    }

    #[test]
    fn expected_version_must_match() {
        let store = PolicyStore::new(Policy::empty());
        store.replace(&document("SELECT 1"), Some(0), no_persist).unwrap();
        let err =
            store.replace(&document("SELECT 2"), Some(0), no_persist).expect_err("stale version");
        assert_eq!(
            err,
            PolicyStoreError::Conflict {
                expected: 0,
                actual: 1
            }
        );
        store.replace(&document("SELECT 2"), Some(1), no_persist).unwrap();
        assert_eq!(store.current().version(), 2);
    }

    #[test]
    fn identical_replacement_keeps_statements() {
        let store = PolicyStore::new(Policy::empty());
        store.replace(&document("SELECT 1"), None, no_persist).unwrap();
        let first = store.current().to_document();
        store.replace(&document("SELECT 1"), None, no_persist).unwrap();
        assert_eq!(store.current().to_document(), first);
        assert_eq!(store.current().version(), 2);
    }

    #[test]
    fn snapshots_survive_replacement() {
        let store = PolicyStore::new(Policy::empty());
        store.replace(&document("SELECT 'old'"), None, no_persist).unwrap();
        let snapshot = store.current();
        store.replace(&document("SELECT 'new'"), None, no_persist).unwrap();
        let old = snapshot.lookup(Namespace::Query, "q").unwrap();
        assert_eq!(old.sql(), "SELECT 'old'");
    }

    #[test]
    fn concurrent_writers_each_get_a_distinct_version() {
        let store = Arc::new(PolicyStore::new(Policy::empty()));
        let handles: Vec<_> = (0 .. 8)
            .map(|index| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .replace(&document(&format!("SELECT {index}")), None, no_persist)
                        .unwrap()
                        .version()
                })
            })
            .collect();
        let mut versions: Vec<u64> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
        versions.sort_unstable();
        assert_eq!(versions, (1 ..= 8).collect::<Vec<_>>());
        assert_eq!(store.current().version(), 8);
    }
}
