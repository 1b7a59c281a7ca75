// crates/sqlgate-store-sqlite/src/session.rs
// ============================================================================
// Module: SQLite Tenant Session
// Description: Statement execution and policy persistence for one tenant.
// Purpose: Implement EngineSession over an r2d2 pool of rusqlite connections.
// Dependencies: r2d2, r2d2_sqlite, rusqlite, sqlgate-core
// ============================================================================

//! ## Overview
//! Connections come from an `r2d2` pool sized by `pool_size` (one for a
//! private in-memory database). Pragmas are applied as the pool opens each
//! connection, and checkout waits no longer than the caller's deadline.
//! Every execute call prepares the SQL, binds each value by `:name`, and
//! either collects rows (statements with result columns) or runs to
//! completion. While the statement runs the caller's [`CancelToken`] is
//! armed with the connection's interrupt handle, so a timeout aborts the
//! statement and no partial rows escape.
//!
//! The tenant policy is kept in two reserved tables inside the tenant
//! database and rewritten in a single transaction on every replacement. The
//! write claims the cancel token just before `COMMIT`; a write cancelled
//! earlier rolls back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::time::Duration;
use std::time::Instant;

use r2d2::CustomizeConnection;
use r2d2::ManageConnection;
use r2d2::Pool;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::ToSql;
use rusqlite::params;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use sqlgate_core::BoundParameter;
use sqlgate_core::CancelToken;
use sqlgate_core::EngineError;
use sqlgate_core::EngineSession;
use sqlgate_core::ExecuteRequest;
use sqlgate_core::Namespace;
use sqlgate_core::PolicyDocument;
use sqlgate_core::RowSet;
use sqlgate_core::ScalarValue;
use sqlgate_core::SqlValue;
use sqlgate_core::StatementEntry;
use sqlgate_core::StatementOutput;
use sqlgate_core::StorePolicyRequest;
use sqlgate_core::StoredPolicy;
use sqlgate_core::TenantKey;

use crate::engine::SqliteEngineConfig;
use crate::engine::SqliteEngineError;
use crate::engine::SqliteSyncMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version of the reserved tables.
const SCHEMA_VERSION: i64 = 1;
/// Reserved table holding policy statements.
pub const POLICY_TABLE: &str = "__sqlgate_policy__";
/// Reserved table holding schema and policy versions.
const META_TABLE: &str = "__sqlgate_meta__";

// ============================================================================
// SECTION: Session
// ============================================================================

/// Pooled connection to a tenant database.
type TenantConnection = PooledConnection<SqliteConnectionManager>;

/// One tenant's database.
pub struct SqliteSession {
    /// Tenant served by this session.
    tenant: TenantKey,
    /// Connection pool.
    pool: Pool<SqliteConnectionManager>,
    /// Busy timeout, reused as the policy checkout deadline.
    busy_timeout: Duration,
}

impl SqliteSession {
    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteEngineError`] when the database cannot be initialized.
    pub fn open_memory(
        tenant: TenantKey,
        config: &SqliteEngineConfig,
    ) -> Result<Self, SqliteEngineError> {
        // Each in-memory connection is its own database, so the pool holds
        // exactly one and never recycles it.
        let pool = build_pool(SqliteConnectionManager::memory(), config, 1, false)?;
        let mut connection = pool.get().map_err(|err| SqliteEngineError::Db(err.to_string()))?;
        initialize_schema(&mut connection)?;
        drop(connection);
        Ok(Self {
            tenant,
            pool,
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        })
    }

    /// Opens a file database with `config.pool_size` connections.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteEngineError`] when the database cannot be opened or
    /// initialized.
    pub fn open_file(
        tenant: TenantKey,
        path: &Path,
        config: &SqliteEngineConfig,
    ) -> Result<Self, SqliteEngineError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let manager = SqliteConnectionManager::file(path).with_flags(flags);
        // Opened outside the pool so a bad path fails now instead of after
        // the pool's connection timeout.
        let mut first = manager.connect().map_err(|err| SqliteEngineError::Db(err.to_string()))?;
        ConnectionPragmas::from_config(config)
            .on_acquire(&mut first)
            .map_err(|err| SqliteEngineError::Db(err.to_string()))?;
        first
            .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
            .map_err(|err| SqliteEngineError::Db(err.to_string()))?;
        initialize_schema(&mut first)?;
        drop(first);
        Ok(Self {
            tenant,
            pool: build_pool(manager, config, config.pool_size, true)?,
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        })
    }

    /// Returns the tenant this session serves.
    #[must_use]
    pub const fn tenant(&self) -> &TenantKey {
        &self.tenant
    }

    /// Returns the maximum number of pooled connections.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        usize::try_from(self.pool.max_size()).unwrap_or(usize::MAX)
    }

    /// Returns the number of idle pooled connections.
    #[must_use]
    pub fn idle_connections(&self) -> usize {
        usize::try_from(self.pool.state().idle_connections).unwrap_or(usize::MAX)
    }

    /// Deadline used for policy reads.
    fn policy_deadline(&self) -> Option<Instant> {
        Instant::now().checked_add(self.busy_timeout)
    }

    /// Takes a pooled connection, waiting no later than `deadline`.
    fn checkout(
        &self,
        deadline: Option<Instant>,
        cancel: &CancelToken,
    ) -> Result<TenantConnection, EngineError> {
        cancel.check()?;
        let Some(deadline) = deadline else {
            return self.pool.get().map_err(|err| EngineError::Busy(err.to_string()));
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(EngineError::Cancelled);
        }
        self.pool.get_timeout(remaining).map_err(|_| EngineError::Cancelled)
    }
}

impl EngineSession for SqliteSession {
    fn execute(&self, request: ExecuteRequest<'_>) -> Result<StatementOutput, EngineError> {
        let connection = self.checkout(request.deadline, request.cancel)?;
        let interrupt = connection.get_interrupt_handle();
        let _armed = request.cancel.arm(move || interrupt.interrupt())?;
        run_statement(&connection, request.sql, request.params)
            .map_err(|err| classify(&err, request.cancel))
    }

    fn load_policy(&self) -> Result<Option<StoredPolicy>, EngineError> {
        let connection = self.checkout(self.policy_deadline(), &CancelToken::new())?;
        read_policy(&connection).map_err(EngineError::from)
    }

    fn store_policy(&self, request: StorePolicyRequest<'_>) -> Result<(), EngineError> {
        let mut connection = self.checkout(request.deadline, request.cancel)?;
        let interrupt = connection.get_interrupt_handle();
        let _armed = request.cancel.arm(move || interrupt.interrupt())?;
        write_policy(&mut connection, request.policy, request.cancel)
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Borrowed scalar bound as a `SQLite` parameter.
struct BoundValue<'a>(&'a ScalarValue);

impl ToSql for BoundValue<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            ScalarValue::Integer(value) => ToSqlOutput::Borrowed(ValueRef::Integer(*value)),
            ScalarValue::Real(value) => ToSqlOutput::Borrowed(ValueRef::Real(*value)),
            ScalarValue::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
        })
    }
}

/// Prepares, binds, and runs one statement.
fn run_statement(
    connection: &Connection,
    sql: &str,
    params: &[BoundParameter],
) -> Result<StatementOutput, rusqlite::Error> {
    let mut statement = connection.prepare(sql)?;
    let mut bound = 0;
    for param in params {
        let placeholder = format!(":{}", param.name);
        if let Some(index) = statement.parameter_index(&placeholder)? {
            statement.raw_bind_parameter(index, BoundValue(&param.value))?;
            bound += 1;
        }
    }
    if bound != statement.parameter_count() {
        return Err(rusqlite::Error::InvalidParameterCount(bound, statement.parameter_count()));
    }
    let columns: Vec<String> =
        statement.column_names().into_iter().map(ToString::to_string).collect();
    if columns.is_empty() {
        let changes = statement.raw_execute()?;
        return Ok(StatementOutput::Done {
            changes: u64::try_from(changes).unwrap_or(u64::MAX),
        });
    }
    let width = columns.len();
    let mut output = RowSet::new(columns);
    let mut rows = statement.raw_query();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for index in 0 .. width {
            values.push(read_value(row.get_ref(index)?));
        }
        output.push(values);
    }
    Ok(StatementOutput::Rows(output))
}

/// Converts a column value into the engine-neutral form.
fn read_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(value) => SqlValue::Integer(value),
        ValueRef::Real(value) => SqlValue::Real(value),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    }
}

/// Maps a `SQLite` failure onto the engine error contract.
fn classify(err: &rusqlite::Error, cancel: &CancelToken) -> EngineError {
    if cancel.is_cancelled() {
        return EngineError::Cancelled;
    }
    let rusqlite::Error::SqliteFailure(failure, _) = err else {
        return EngineError::Rejected(err.to_string());
    };
    match failure.code {
        ErrorCode::OperationInterrupted => EngineError::Cancelled,
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => EngineError::Busy(err.to_string()),
        ErrorCode::SystemIoFailure
        | ErrorCode::DiskFull
        | ErrorCode::CannotOpen
        | ErrorCode::PermissionDenied
        | ErrorCode::FileLockingProtocolFailed
        | ErrorCode::OutOfMemory => EngineError::Io(err.to_string()),
        ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => {
            EngineError::Corrupt(err.to_string())
        }
        _ => EngineError::Rejected(err.to_string()),
    }
}

// ============================================================================
// SECTION: Connections
// ============================================================================

/// Pragmas applied to every connection the pool opens.
#[derive(Debug, Clone, Copy)]
struct ConnectionPragmas {
    /// `PRAGMA synchronous` value.
    sync_mode: SqliteSyncMode,
    /// Lock wait before `SQLITE_BUSY`.
    busy_timeout: Duration,
}

impl ConnectionPragmas {
    /// Pragmas for `config`.
    fn from_config(config: &SqliteEngineConfig) -> Self {
        Self {
            sync_mode: config.sync_mode,
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        }
    }
}

impl CustomizeConnection<Connection, rusqlite::Error> for ConnectionPragmas {
    fn on_acquire(&self, connection: &mut Connection) -> Result<(), rusqlite::Error> {
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;
        connection
            .execute_batch(&format!("PRAGMA synchronous = {};", self.sync_mode.pragma_value()))?;
        connection.busy_timeout(self.busy_timeout)
    }
}

/// Builds a pool that keeps its connections for the life of the session.
fn build_pool(
    manager: SqliteConnectionManager,
    config: &SqliteEngineConfig,
    size: usize,
    test_on_check_out: bool,
) -> Result<Pool<SqliteConnectionManager>, SqliteEngineError> {
    let max_size = u32::try_from(size)
        .map_err(|_| SqliteEngineError::Invalid("pool_size out of range".to_string()))?;
    Pool::builder()
        .max_size(max_size)
        .idle_timeout(None)
        .max_lifetime(None)
        .test_on_check_out(test_on_check_out)
        .connection_timeout(Duration::from_millis(config.busy_timeout_ms.max(1)))
        .connection_customizer(Box::new(ConnectionPragmas::from_config(config)))
        .build(manager)
        .map_err(|err| SqliteEngineError::Db(err.to_string()))
}

// ============================================================================
// SECTION: Policy Persistence
// ============================================================================

/// Creates the reserved tables, or validates their version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteEngineError> {
    let tx = connection.transaction().map_err(|err| SqliteEngineError::Db(err.to_string()))?;
    create_reserved_tables(&tx).map_err(|err| SqliteEngineError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row(&format!("SELECT schema_version FROM {META_TABLE} LIMIT 1"), params![], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|err| SqliteEngineError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute(
                &format!("INSERT INTO {META_TABLE} (schema_version, policy_version) VALUES (?1, 0)"),
                params![SCHEMA_VERSION],
            )
            .map_err(|err| SqliteEngineError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteEngineError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteEngineError::Db(err.to_string()))?;
    Ok(())
}

/// Creates the reserved tables if absent.
fn create_reserved_tables(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {META_TABLE} (
            schema_version INTEGER NOT NULL,
            policy_version INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS {POLICY_TABLE} (
            namespace TEXT NOT NULL CHECK (namespace IN ('query', 'mutation')),
            name TEXT NOT NULL,
            raw_sql TEXT NOT NULL,
            PRIMARY KEY (namespace, name)
        );"
    ))
}

/// Reads the persisted policy; `None` when none was ever stored.
fn read_policy(connection: &Connection) -> Result<Option<StoredPolicy>, SqliteEngineError> {
    let version: Option<i64> = connection
        .query_row(&format!("SELECT policy_version FROM {META_TABLE} LIMIT 1"), params![], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|err| SqliteEngineError::Db(err.to_string()))?;
    let version = match version {
        None | Some(0) => return Ok(None),
        Some(value) => u64::try_from(value).map_err(|_| {
            SqliteEngineError::Corrupt(format!("negative policy version {value}"))
        })?,
    };
    let mut statement = connection
        .prepare(&format!("SELECT namespace, name, raw_sql FROM {POLICY_TABLE} ORDER BY name"))
        .map_err(|err| SqliteEngineError::Db(err.to_string()))?;
    let rows = statement
        .query_map(params![], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })
        .map_err(|err| SqliteEngineError::Db(err.to_string()))?;
    let mut document = PolicyDocument::default();
    for row in rows {
        let (namespace, name, raw_sql) = row.map_err(|err| SqliteEngineError::Db(err.to_string()))?;
        let entry = StatementEntry::new(name, raw_sql);
        match namespace.as_str() {
            "query" => document.queries.push(entry),
            "mutation" => document.mutations.push(entry),
            other => {
                return Err(SqliteEngineError::Corrupt(format!(
                    "unknown policy namespace `{other}`"
                )));
            }
        }
    }
    Ok(Some(StoredPolicy {
        version,
        document,
    }))
}

/// Replaces the persisted policy in one transaction.
fn write_policy(
    connection: &mut Connection,
    policy: &StoredPolicy,
    cancel: &CancelToken,
) -> Result<(), EngineError> {
    let version = i64::try_from(policy.version)
        .map_err(|_| EngineError::Io("policy version out of range".to_string()))?;
    let tx = connection.transaction().map_err(|err| classify(&err, cancel))?;
    stage_policy(&tx, policy, version).map_err(|err| classify(&err, cancel))?;
    cancel.commit()?;
    tx.commit().map_err(|err| classify(&err, cancel))
}

/// Writes the policy rows and version inside an open transaction.
fn stage_policy(connection: &Connection, policy: &StoredPolicy, version: i64) -> rusqlite::Result<()> {
    create_reserved_tables(connection)?;
    connection.execute(&format!("DELETE FROM {POLICY_TABLE}"), params![])?;
    {
        let mut insert = connection.prepare(&format!(
            "INSERT INTO {POLICY_TABLE} (namespace, name, raw_sql) VALUES (?1, ?2, ?3)"
        ))?;
        let entries = policy
            .document
            .queries
            .iter()
            .map(|entry| (Namespace::Query, entry))
            .chain(policy.document.mutations.iter().map(|entry| (Namespace::Mutation, entry)));
        for (namespace, entry) in entries {
            insert.execute(params![namespace.as_str(), entry.name, entry.raw_sql])?;
        }
    }
    let updated =
        connection.execute(&format!("UPDATE {META_TABLE} SET policy_version = ?1"), params![version])?;
    if updated == 0 {
        connection.execute(
            &format!("INSERT INTO {META_TABLE} (schema_version, policy_version) VALUES (?1, ?2)"),
            params![SCHEMA_VERSION, version],
        )?;
    }
    Ok(())
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

    use super::*;

    fn session() -> SqliteSession {
        let tenant = TenantKey::parse("acme", "main").unwrap();
        SqliteSession::open_memory(tenant, &SqliteEngineConfig::memory()).unwrap()
    }

    fn run(session: &SqliteSession, sql: &str, params: &[BoundParameter]) -> StatementOutput {
        let cancel = CancelToken::new();
        session
            .execute(ExecuteRequest {
                sql,
                params,
                deadline: None,
                cancel: &cancel,
            })
            .unwrap()
    }

    fn store(session: &SqliteSession, policy: &StoredPolicy) -> Result<(), EngineError> {
        let cancel = CancelToken::new();
        session.store_policy(StorePolicyRequest {
            policy,
            deadline: None,
            cancel: &cancel,
        })
    }

    fn text(name: &str, value: &str) -> BoundParameter {
        BoundParameter {
            name: name.to_string(),
            value: ScalarValue::Text(value.to_string()),
        }
    }

    #[test]
    fn statements_without_columns_report_changes() {
        let session = session();
        run(&session, "CREATE TABLE t (id TEXT, n REAL)", &[]);
        let output = run(&session, "INSERT INTO t VALUES (:id, 1.5)", &[text("id", "a")]);
        assert_eq!(
            output,
            StatementOutput::Done {
                changes: 1
            }
        );
    }

    #[test]
    fn rows_keep_column_order_and_types() {
        let session = session();
        let output = run(&session, "SELECT 1 AS b, 'x' AS a, NULL AS n, 2.5 AS r, x'0102' AS blob", &[]);
        let StatementOutput::Rows(rows) = output else {
            unreachable!("select returns rows");
        };
        assert_eq!(rows.columns(), ["b", "a", "n", "r", "blob"]);
        assert_eq!(
            rows.rows()[0],
            vec![
                SqlValue::Integer(1),
                SqlValue::Text("x".to_string()),
                SqlValue::Null,
                SqlValue::Real(2.5),
                SqlValue::Blob(vec![1, 2])
            ]
        );
    }

    #[test]
    fn values_are_bound_not_spliced() {
        let session = session();
        run(&session, "CREATE TABLE t (v TEXT)", &[]);
        let hostile = "x'); DROP TABLE t; --";
        run(&session, "INSERT INTO t (v) VALUES (:v)", &[text("v", hostile)]);
        let StatementOutput::Rows(rows) = run(&session, "SELECT v FROM t", &[]) else {
            unreachable!("select returns rows");
        };
        assert_eq!(rows.rows()[0], vec![SqlValue::Text(hostile.to_string())]);
    }

    #[test]
    fn unbound_parameters_are_rejected() {
        let session = session();
        let cancel = CancelToken::new();
        let err = session
            .execute(ExecuteRequest {
                sql: "SELECT :a, :b",
                params: &[text("a", "1")],
                deadline: None,
                cancel: &cancel,
            })
            .expect_err("unbound");
        assert!(matches!(err, EngineError::Rejected(_)));
    }

    #[test]
    fn engine_errors_carry_the_sqlite_message() {
        let session = session();
        let cancel = CancelToken::new();
        let err = session
            .execute(ExecuteRequest {
                sql: "SELECT * FROM missing",
                params: &[],
                deadline: None,
                cancel: &cancel,
            })
            .expect_err("no such table");
        match err {
            EngineError::Rejected(message) => assert!(message.contains("no such table")),
            other => unreachable!("unexpected error {other}"),
        }
    }

    #[test]
    fn policy_round_trips_through_reserved_tables() {
        let session = session();
        assert_eq!(session.load_policy().unwrap(), None);
        let stored = StoredPolicy {
            version: 3,
            document: PolicyDocument {
                queries: vec![StatementEntry::new("get", "SELECT 1")],
                mutations: vec![StatementEntry::new("put", "DELETE FROM t")],
            },
        };
        store(&session, &stored).unwrap();
        assert_eq!(session.load_policy().unwrap(), Some(stored));
    }

    #[test]
    fn policy_tables_are_recreated_if_dropped() {
        let session = session();
        run(&session, &format!("DROP TABLE {POLICY_TABLE}"), &[]);
        let stored = StoredPolicy {
            version: 1,
            document: PolicyDocument::default(),
        };
        store(&session, &stored).unwrap();
        assert_eq!(session.load_policy().unwrap(), Some(stored));
    }

    #[test]
    fn cancelled_policy_write_keeps_the_stored_policy() {
        let session = session();
        let first = StoredPolicy {
            version: 1,
            document: PolicyDocument {
                queries: vec![StatementEntry::new("get", "SELECT 1")],
                mutations: Vec::new(),
            },
        };
        store(&session, &first).unwrap();
        let second = StoredPolicy {
            version: 2,
            document: PolicyDocument::default(),
        };
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = session
            .store_policy(StorePolicyRequest {
                policy: &second,
                deadline: None,
                cancel: &cancel,
            })
            .expect_err("cancelled");
        assert_eq!(err, EngineError::Cancelled);
        let expired = CancelToken::new();
        let err = session
            .store_policy(StorePolicyRequest {
                policy: &second,
                deadline: Some(Instant::now()),
                cancel: &expired,
            })
            .expect_err("expired");
        assert_eq!(err, EngineError::Cancelled);
        assert_eq!(session.load_policy().unwrap(), Some(first));
    }

    #[test]
    fn successful_policy_write_claims_the_token() {
        let session = session();
        let cancel = CancelToken::new();
        let stored = StoredPolicy {
            version: 1,
            document: PolicyDocument::default(),
        };
        session
            .store_policy(StorePolicyRequest {
                policy: &stored,
                deadline: None,
                cancel: &cancel,
            })
            .unwrap();
        assert!(!cancel.cancel());
        assert_eq!(session.load_policy().unwrap(), Some(stored));
    }

    #[test]
    fn checkout_gives_up_at_the_deadline() {
        let session = session();
        let cancel = CancelToken::new();
        let held = session.checkout(None, &cancel).unwrap();
        assert_eq!(session.idle_connections(), 0);
        let started = Instant::now();
        let err = session
            .execute(ExecuteRequest {
                sql: "SELECT 1",
                params: &[],
                deadline: Instant::now().checked_add(Duration::from_millis(30)),
                cancel: &cancel,
            })
            .expect_err("pool exhausted");
        assert_eq!(err, EngineError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(held);
        assert_eq!(session.idle_connections(), 1);
        run(&session, "SELECT 1", &[]);
    }

    #[test]
    fn pooled_connections_carry_session_pragmas() {
        let session = session();
        let StatementOutput::Rows(rows) = run(&session, "PRAGMA foreign_keys", &[]) else {
            unreachable!("pragma returns rows");
        };
        assert_eq!(rows.rows()[0], vec![SqlValue::Integer(1)]);
    }
}
