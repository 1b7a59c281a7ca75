// crates/sqlgate-core/src/interfaces/mod.rs
// ============================================================================
// Module: SQL Gate Interfaces
// Description: Backend-agnostic storage engine traits and cancellation.
// Purpose: Define the contract between the gateway and SQL engines.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! A [`StorageEngine`] opens one [`EngineSession`] per tenant. Sessions must
//! tolerate concurrent use (pooled or serialized internally) and run exactly
//! one statement per [`EngineSession::execute`] call. Sessions may also
//! persist the tenant's policy so it survives restarts.
//!
//! Cancellation is cooperative: the caller hands the engine a
//! [`CancelToken`], and the engine arms it with a hook that aborts the
//! statement in progress. A token is settled exactly once: either the
//! caller cancels it, or the engine claims it with [`CancelToken::commit`]
//! just before an irreversible write. A caller whose cancel loses that race
//! must wait for the outcome instead of reporting a timeout.
//!
//! Security posture: engines receive SQL text that the gateway compiled and
//! values as separate bound parameters; they must never interpolate values
//! into SQL.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::time::Instant;

use thiserror::Error;

use crate::core::BoundParameter;
use crate::core::PolicyDocument;
use crate::core::StatementOutput;
use crate::core::TenantKey;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Storage engine failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Engine rejected the statement (syntax, constraint, type).
    #[error("{0}")]
    Rejected(String),
    /// Engine resources are exhausted or locked.
    #[error("engine busy: {0}")]
    Busy(String),
    /// Statement was cancelled or ran past its deadline.
    #[error("statement cancelled before completion")]
    Cancelled,
    /// Engine storage failure.
    #[error("engine io error: {0}")]
    Io(String),
    /// Stored data is unreadable.
    #[error("engine data corrupt: {0}")]
    Corrupt(String),
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Hook invoked when a token is cancelled.
type CancelHook = Box<dyn Fn() + Send + Sync>;

/// Token is neither cancelled nor committed.
const PHASE_ACTIVE: u8 = 0;
/// Caller cancelled the token.
const PHASE_CANCELLED: u8 = 1;
/// Engine passed its commit point.
const PHASE_COMMITTED: u8 = 2;

/// Shared cancellation state.
struct CancelState {
    /// One of the `PHASE_*` values.
    phase: AtomicU8,
    /// Abort hook for the statement currently running, if any.
    hook: Mutex<Option<CancelHook>>,
}

/// Cooperative cancellation signal shared between a caller and an engine.
#[derive(Clone)]
pub struct CancelToken {
    /// Shared state.
    state: Arc<CancelState>,
}

impl CancelToken {
    /// Creates an un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(CancelState {
                phase: AtomicU8::new(PHASE_ACTIVE),
                hook: Mutex::new(None),
            }),
        }
    }

    /// Cancels the token and fires the armed hook, if any.
    ///
    /// Returns false when the engine already committed, in which case the
    /// work completes and its result stands.
    pub fn cancel(&self) -> bool {
        match self.state.phase.compare_exchange(
            PHASE_ACTIVE,
            PHASE_CANCELLED,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                if let Ok(guard) = self.state.hook.lock()
                    && let Some(hook) = guard.as_ref()
                {
                    hook();
                }
                true
            }
            Err(phase) => phase == PHASE_CANCELLED,
        }
    }

    /// Returns true once a [`CancelToken::cancel`] call took effect.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.phase.load(Ordering::SeqCst) == PHASE_CANCELLED
    }

    /// Claims the commit point; later cancels are refused. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] when the token was cancelled first.
    pub fn commit(&self) -> Result<(), EngineError> {
        match self.state.phase.compare_exchange(
            PHASE_ACTIVE,
            PHASE_COMMITTED,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) | Err(PHASE_COMMITTED) => Ok(()),
            Err(_) => Err(EngineError::Cancelled),
        }
    }

    /// Arms the token with an abort hook for the duration of the guard.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] when the token was already
    /// cancelled, in which case the hook is not kept.
    pub fn arm<F>(&self, hook: F) -> Result<CancelGuard<'_>, EngineError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        {
            let mut slot = self
                .state
                .hook
                .lock()
                .map_err(|_| EngineError::Io("cancel hook mutex poisoned".to_string()))?;
            *slot = Some(Box::new(hook));
        }
        let guard = CancelGuard {
            token: self,
        };
        if self.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(guard)
    }

    /// Returns an error when the token is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] after cancellation.
    pub fn check(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken").field("cancelled", &self.is_cancelled()).finish()
    }
}

/// Disarms the token's hook when dropped.
pub struct CancelGuard<'a> {
    /// Token being armed.
    token: &'a CancelToken,
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.token.state.hook.lock() {
            *slot = None;
        }
    }
}

// ============================================================================
// SECTION: Engine Contract
// ============================================================================

/// One statement execution.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteRequest<'a> {
    /// Compiled SQL text.
    pub sql: &'a str,
    /// Values for every placeholder, in declaration order.
    pub params: &'a [BoundParameter],
    /// Latest instant at which the engine should start work.
    pub deadline: Option<Instant>,
    /// Cancellation signal.
    pub cancel: &'a CancelToken,
}

/// One policy write.
#[derive(Debug, Clone, Copy)]
pub struct StorePolicyRequest<'a> {
    /// Policy to persist.
    pub policy: &'a StoredPolicy,
    /// Latest instant at which the engine should start work.
    pub deadline: Option<Instant>,
    /// Cancellation signal.
    pub cancel: &'a CancelToken,
}

/// Policy as persisted by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPolicy {
    /// Policy version.
    pub version: u64,
    /// Policy statements.
    pub document: PolicyDocument,
}

/// Opens per-tenant sessions.
pub trait StorageEngine: Send + Sync {
    /// Opens the session backing a tenant. Called at most once per tenant.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the session cannot be created.
    fn open(&self, tenant: &TenantKey) -> Result<Arc<dyn EngineSession>, EngineError>;
}

/// A tenant's isolated database session.
pub trait EngineSession: Send + Sync {
    /// Executes one statement.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the statement fails or is cancelled.
    fn execute(&self, request: ExecuteRequest<'_>) -> Result<StatementOutput, EngineError>;

    /// Loads the persisted policy, if the session stores one.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when stored data cannot be read.
    fn load_policy(&self) -> Result<Option<StoredPolicy>, EngineError> {
        Ok(None)
    }

    /// Persists a policy before it becomes current.
    ///
    /// Implementations that write durably must call
    /// [`CancelToken::commit`] immediately before their irreversible step
    /// and abandon the write if it fails.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the policy cannot be written, the
    /// deadline passes, or the call is cancelled.
    fn store_policy(&self, _request: StorePolicyRequest<'_>) -> Result<(), EngineError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
