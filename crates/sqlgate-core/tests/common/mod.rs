// crates/sqlgate-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Fixtures
// Description: In-process recording engine for gateway and registry tests.
// Purpose: Observe exactly what the gateway hands to a storage engine.
// Dependencies: sqlgate-core
// ============================================================================

//! ## Overview
//! [`RecordingEngine`] opens one [`RecordingSession`] per tenant and counts
//! opens. Sessions record every execute call and answer deterministically:
//! read-shaped SQL returns a single row echoing the SQL text and bound
//! values; anything else reports one changed row. SQL containing `sleep`
//! blocks until cancelled, as does a policy write while `stall_persist` is
//! set.

#![allow(dead_code, reason = "Shared fixtures are not used by every test binary.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test fixtures use expect for concise failure messages."
)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use sqlgate_core::BoundParameter;
use sqlgate_core::CancelToken;
use sqlgate_core::EngineError;
use sqlgate_core::EngineSession;
use sqlgate_core::ExecuteRequest;
use sqlgate_core::PolicyDocument;
use sqlgate_core::RowSet;
use sqlgate_core::ScalarValue;
use sqlgate_core::SqlValue;
use sqlgate_core::StatementEntry;
use sqlgate_core::StatementOutput;
use sqlgate_core::StorageEngine;
use sqlgate_core::StorePolicyRequest;
use sqlgate_core::StoredPolicy;
use sqlgate_core::TenantKey;

/// One recorded execute call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// SQL text handed to the engine.
    pub sql: String,
    /// Bound parameters in order.
    pub params: Vec<BoundParameter>,
}

/// Session that records calls and keeps a stored policy in memory.
#[derive(Default)]
pub struct RecordingSession {
    /// Calls in arrival order.
    pub calls: Mutex<Vec<RecordedCall>>,
    /// Last stored policy.
    pub stored: Mutex<Option<StoredPolicy>>,
    /// When set, `store_policy` fails.
    pub fail_persist: AtomicBool,
    /// When set, `store_policy` blocks until its call is cancelled.
    pub stall_persist: AtomicBool,
    /// When set, `execute` rejects every statement.
    pub reject: AtomicBool,
}

impl RecordingSession {
    /// Returns a copy of the recorded calls.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl EngineSession for RecordingSession {
    fn execute(&self, request: ExecuteRequest<'_>) -> Result<StatementOutput, EngineError> {
        self.calls.lock().unwrap().push(RecordedCall {
            sql: request.sql.to_string(),
            params: request.params.to_vec(),
        });
        if self.reject.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected("no such table: person".to_string()));
        }
        if request.sql.to_ascii_lowercase().contains("sleep") {
            return Err(wait_for_cancel(request.cancel));
        }
        let upper = request.sql.trim_start().to_ascii_uppercase();
        if upper.starts_with("SELECT") || upper.starts_with("WITH") {
            let mut columns = vec!["sql".to_string()];
            let mut values = vec![SqlValue::Text(request.sql.to_string())];
            for param in request.params {
                columns.push(param.name.clone());
                values.push(match &param.value {
                    ScalarValue::Integer(value) => SqlValue::Integer(*value),
                    ScalarValue::Real(value) => SqlValue::Real(*value),
                    ScalarValue::Text(value) => SqlValue::Text(value.clone()),
                });
            }
            let mut rows = RowSet::new(columns);
            rows.push(values);
            return Ok(StatementOutput::Rows(rows));
        }
        Ok(StatementOutput::Done {
            changes: 1,
        })
    }

    fn load_policy(&self) -> Result<Option<StoredPolicy>, EngineError> {
        Ok(self.stored.lock().unwrap().clone())
    }

    fn store_policy(&self, request: StorePolicyRequest<'_>) -> Result<(), EngineError> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(EngineError::Io("disk full".to_string()));
        }
        if self.stall_persist.load(Ordering::SeqCst) {
            return Err(wait_for_cancel(request.cancel));
        }
        request.cancel.commit()?;
        *self.stored.lock().unwrap() = Some(request.policy.clone());
        Ok(())
    }
}

/// Blocks until `cancel` fires; gives up after five seconds.
fn wait_for_cancel(cancel: &CancelToken) -> EngineError {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    let armed = cancel.arm(move || flag.store(true, Ordering::SeqCst));
    if let Err(err) = armed {
        return err;
    }
    let started = Instant::now();
    while !interrupted.load(Ordering::SeqCst) {
        if started.elapsed() > Duration::from_secs(5) {
            return EngineError::Io("fixture never cancelled".to_string());
        }
        thread::sleep(Duration::from_millis(2));
    }
    EngineError::Cancelled
}

/// Engine that hands out recording sessions.
#[derive(Default)]
pub struct RecordingEngine {
    /// Number of `open` calls.
    pub opens: AtomicUsize,
    /// Sessions by tenant display form.
    pub sessions: Mutex<HashMap<String, Arc<RecordingSession>>>,
    /// Policies pre-seeded into sessions on open.
    pub seeded: Mutex<HashMap<String, StoredPolicy>>,
    /// Remaining opens that should fail.
    pub failing_opens: AtomicUsize,
    /// Delay inside `open`, to widen race windows.
    pub open_delay: Option<Duration>,
}

impl RecordingEngine {
    /// Creates an engine with an artificial open delay.
    pub fn with_open_delay(delay: Duration) -> Self {
        Self {
            open_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Returns the session opened for `tenant`.
    pub fn session(&self, tenant: &TenantKey) -> Arc<RecordingSession> {
        Arc::clone(self.sessions.lock().unwrap().get(&tenant.to_string()).expect("session opened"))
    }

    /// Seeds a stored policy returned by the next open of `tenant`.
    pub fn seed(&self, tenant: &TenantKey, policy: StoredPolicy) {
        self.seeded.lock().unwrap().insert(tenant.to_string(), policy);
    }
}

impl StorageEngine for RecordingEngine {
    fn open(&self, tenant: &TenantKey) -> Result<Arc<dyn EngineSession>, EngineError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.open_delay {
            thread::sleep(delay);
        }
        let fail = self
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if fail {
            return Err(EngineError::Io("cannot open tenant database".to_string()));
        }
        let session = Arc::new(RecordingSession::default());
        if let Some(seeded) = self.seeded.lock().unwrap().remove(&tenant.to_string()) {
            *session.stored.lock().unwrap() = Some(seeded);
        }
        self.sessions.lock().unwrap().insert(tenant.to_string(), Arc::clone(&session));
        Ok(session)
    }
}

/// Parses a tenant key, panicking on invalid input.
pub fn tenant(project: &str, database: &str) -> TenantKey {
    TenantKey::parse(project, database).expect("valid tenant key")
}

/// The person directory policy used across tests.
pub fn people_policy() -> PolicyDocument {
    PolicyDocument {
        queries: vec![StatementEntry::new("get_person", "SELECT name FROM person WHERE id = :id")],
        mutations: vec![StatementEntry::new(
            "add_person",
            "INSERT INTO person (id, name) VALUES (:id, :name)",
        )],
    }
}
