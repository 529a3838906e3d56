//! SQLite session: staged writes over one connection.
//!
//! # Responsibility
//! - Stage entity writes as parameterized SQL and flush them in order.
//! - Serve typed reads and criteria queries from the same connection.
//!
//! # Invariants
//! - A flush runs inside its own SQLite transaction, or inside a savepoint
//!   when an explicit transaction is open, so a failing batch leaves no
//!   partial writes.
//! - A flushed batch is dropped from the queue even when it fails.
//! - Update/delete statements touching no row fail with `NotFound`.

use super::criteria::Criteria;
use super::transaction::SqliteTransaction;
use crate::config::SqliteConfig;
use crate::db::{open_db, Migration};
use crate::entity::{entity_name, EntityId, SqlEntity};
use crate::error::{RepoError, RepoResult};
use crate::unit_of_work::{EntitySession, FlushMode, SessionFactory, UnitOfWork};
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

/// Opens SQLite sessions against one database file.
#[derive(Debug, Clone)]
pub struct SqliteSessionFactory {
    config: SqliteConfig,
    migrations: &'static [Migration],
}

impl SqliteSessionFactory {
    /// Creates the factory and brings the database schema up to date.
    pub fn new(config: SqliteConfig, migrations: &'static [Migration]) -> RepoResult<Self> {
        drop(open_db(&config.path, migrations)?);
        Ok(Self { config, migrations })
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }
}

impl SessionFactory for SqliteSessionFactory {
    type Session = SqliteUnitOfWork;

    fn open_session(&self) -> RepoResult<SqliteUnitOfWork> {
        let conn = open_db(&self.config.path, self.migrations)?;
        Ok(SqliteUnitOfWork::from_connection(
            conn,
            self.config.flush_mode,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Insert,
    Update,
    Delete,
}

impl WriteKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug)]
struct PendingWrite {
    kind: WriteKind,
    entity: &'static str,
    id: String,
    sql: String,
    values: Vec<Value>,
}

struct SessionState {
    id: Uuid,
    conn: Connection,
    flush_mode: FlushMode,
    pending: RefCell<Vec<PendingWrite>>,
    in_transaction: Cell<bool>,
}

impl SessionState {
    fn flush(&self) -> RepoResult<()> {
        let batch = std::mem::take(&mut *self.pending.borrow_mut());
        if batch.is_empty() {
            return Ok(());
        }

        let started_at = Instant::now();
        let result = if self.in_transaction.get() {
            execute_in_savepoint(&self.conn, &batch)
        } else {
            self.conn
                .unchecked_transaction()
                .map_err(RepoError::from)
                .and_then(|tx| {
                    execute_writes(&tx, &batch)?;
                    tx.commit()?;
                    Ok(())
                })
        };

        match &result {
            Ok(()) => debug!(
                "event=flush module=uow backend=sqlite status=ok session_id={} writes={} duration_ms={}",
                self.id,
                batch.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=flush module=uow backend=sqlite status=error session_id={} writes={} duration_ms={} error={}",
                self.id,
                batch.len(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        // Flush failures cannot be returned from here; `flush` already logged them.
        let _ = self.flush();
        info!(
            "event=session_close module=uow backend=sqlite status=ok session_id={}",
            self.id
        );
    }
}

/// Runs `batch` inside an open transaction, undoing the whole batch on error.
fn execute_in_savepoint(conn: &Connection, batch: &[PendingWrite]) -> RepoResult<()> {
    conn.execute_batch("SAVEPOINT flush_batch;")?;
    match execute_writes(conn, batch) {
        Ok(()) => {
            conn.execute_batch("RELEASE flush_batch;")?;
            Ok(())
        }
        Err(err) => {
            conn.execute_batch("ROLLBACK TO flush_batch; RELEASE flush_batch;")?;
            Err(err)
        }
    }
}

fn execute_writes(conn: &Connection, batch: &[PendingWrite]) -> RepoResult<()> {
    for write in batch {
        let changed = conn.execute(&write.sql, params_from_iter(write.values.iter()))?;
        if changed == 0 && write.kind != WriteKind::Insert {
            return Err(RepoError::NotFound {
                entity: write.entity,
                id: write.id.clone(),
            });
        }
    }
    Ok(())
}

/// Handle to one SQLite session.
///
/// Clones share the connection and the staged writes. Staged writes are
/// flushed when the last clone is dropped.
#[derive(Clone)]
pub struct SqliteUnitOfWork {
    state: Rc<SessionState>,
}

impl SqliteUnitOfWork {
    /// Wraps an already migrated connection into a session.
    pub fn from_connection(conn: Connection, flush_mode: FlushMode) -> Self {
        let id = Uuid::new_v4();
        info!(
            "event=session_open module=uow backend=sqlite status=ok session_id={} flush_mode={:?}",
            id, flush_mode
        );
        Self {
            state: Rc::new(SessionState {
                id,
                conn,
                flush_mode,
                pending: RefCell::new(Vec::new()),
                in_transaction: Cell::new(false),
            }),
        }
    }

    /// Starts a criteria query over entity `E`.
    pub fn create_criteria<E: SqlEntity>(&self) -> Criteria<E> {
        Criteria::new(self.clone())
    }

    pub(crate) fn query_entities<E: SqlEntity>(
        &self,
        sql: &str,
        values: &[Value],
    ) -> RepoResult<Vec<E>> {
        self.prepare_read()?;

        let mut stmt = self.state.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(values.iter()))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }
        Ok(entities)
    }

    pub(crate) fn commit_transaction(&self) -> RepoResult<()> {
        self.state.flush()?;
        self.state.conn.execute_batch("COMMIT;")?;
        self.state.in_transaction.set(false);
        info!(
            "event=tx_commit module=uow backend=sqlite status=ok session_id={}",
            self.state.id
        );
        Ok(())
    }

    pub(crate) fn rollback_transaction(&self) -> RepoResult<()> {
        let discarded = std::mem::take(&mut *self.state.pending.borrow_mut()).len();
        if !self.state.in_transaction.get() {
            return Ok(());
        }

        let result = self.state.conn.execute_batch("ROLLBACK;");
        self.state.in_transaction.set(false);
        match &result {
            Ok(()) => info!(
                "event=tx_rollback module=uow backend=sqlite status=ok session_id={} discarded_writes={}",
                self.state.id, discarded
            ),
            Err(err) => error!(
                "event=tx_rollback module=uow backend=sqlite status=error session_id={} error={}",
                self.state.id, err
            ),
        }
        Ok(result?)
    }

    fn prepare_read(&self) -> RepoResult<()> {
        match self.state.flush_mode {
            FlushMode::Auto => self.state.flush(),
            FlushMode::Explicit => Ok(()),
        }
    }

    fn stage<E: SqlEntity>(&self, kind: WriteKind, entity: &E) -> RepoResult<()> {
        let mapping = E::mapping();
        mapping.validate()?;

        let (sql, values) = match kind {
            WriteKind::Insert => (mapping.insert_sql(), entity.to_values()),
            WriteKind::Update => (mapping.update_sql(), entity.to_values()),
            WriteKind::Delete => (mapping.delete_sql(), vec![entity.id().to_sql_value()]),
        };

        debug!(
            "event=stage module=uow backend=sqlite session_id={} action={} entity={}",
            self.state.id,
            kind.as_str(),
            entity_name::<E>()
        );
        self.state.pending.borrow_mut().push(PendingWrite {
            kind,
            entity: entity_name::<E>(),
            id: entity.id().to_string(),
            sql,
            values,
        });
        Ok(())
    }
}

impl UnitOfWork for SqliteUnitOfWork {
    type Transaction = SqliteTransaction;

    fn begin_transaction(&self) -> RepoResult<SqliteTransaction> {
        if self.state.in_transaction.get() {
            return Err(RepoError::Transaction(
                "a transaction is already active on this session".to_string(),
            ));
        }

        self.state.flush()?;
        self.state.conn.execute_batch("BEGIN;")?;
        self.state.in_transaction.set(true);
        info!(
            "event=tx_begin module=uow backend=sqlite status=ok session_id={}",
            self.state.id
        );
        Ok(SqliteTransaction::new(self.clone()))
    }

    fn flush(&self) -> RepoResult<()> {
        self.state.flush()
    }

    fn has_pending_changes(&self) -> bool {
        !self.state.pending.borrow().is_empty()
    }

    fn flush_mode(&self) -> FlushMode {
        self.state.flush_mode
    }

    fn session_id(&self) -> Uuid {
        self.state.id
    }
}

impl<E: SqlEntity> EntitySession<E> for SqliteUnitOfWork {
    fn insert(&self, entity: &E) -> RepoResult<()> {
        self.stage(WriteKind::Insert, entity)
    }

    fn update(&self, entity: &E) -> RepoResult<()> {
        self.stage(WriteKind::Update, entity)
    }

    fn delete(&self, entity: &E) -> RepoResult<()> {
        self.stage(WriteKind::Delete, entity)
    }

    fn get_by_id(&self, id: &E::Id) -> RepoResult<Option<E>> {
        let mapping = E::mapping();
        mapping.validate()?;
        let mut found =
            self.query_entities::<E>(&mapping.select_by_id_sql(), &[id.to_sql_value()])?;
        Ok(found.pop())
    }

    fn get_all(&self) -> RepoResult<Vec<E>> {
        let mapping = E::mapping();
        mapping.validate()?;
        self.query_entities::<E>(&mapping.select_sql(), &[])
    }
}
