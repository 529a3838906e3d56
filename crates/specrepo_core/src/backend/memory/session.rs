//! In-memory session over a store shared by one factory.
//!
//! # Responsibility
//! - Stage entity writes as replayable changes and flush them atomically.
//! - Keep transaction work private until commit.
//!
//! # Invariants
//! - A flush either applies the whole batch or leaves the target untouched.
//! - While a transaction is active, flushes land in a private working copy
//!   and a journal; commit replays the journal onto the shared store.
//! - Reads during a transaction see the working copy.

use super::queryable::Queryable;
use super::store::{apply_changes, Change, MemoryStore};
use super::transaction::MemoryTransaction;
use crate::config::MemoryConfig;
use crate::entity::{entity_name, Entity};
use crate::error::{RepoError, RepoResult};
use crate::unit_of_work::{EntitySession, FlushMode, SessionFactory, UnitOfWork};
use log::{debug, error, info};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use uuid::Uuid;

/// Opens sessions sharing one in-process store.
///
/// Clones of the factory share the store as well.
#[derive(Clone)]
pub struct MemorySessionFactory {
    store: Arc<Mutex<MemoryStore>>,
    config: MemoryConfig,
}

impl MemorySessionFactory {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(MemoryStore::default())),
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }
}

impl SessionFactory for MemorySessionFactory {
    type Session = MemoryUnitOfWork;

    fn open_session(&self) -> RepoResult<MemoryUnitOfWork> {
        Ok(MemoryUnitOfWork::new(
            Arc::clone(&self.store),
            self.config.flush_mode,
        ))
    }
}

struct TxScope {
    working: MemoryStore,
    journal: Vec<Change>,
    started_at: Instant,
}

struct SessionState {
    id: Uuid,
    store: Arc<Mutex<MemoryStore>>,
    flush_mode: FlushMode,
    pending: RefCell<Vec<Change>>,
    tx: RefCell<Option<TxScope>>,
}

impl SessionState {
    fn lock(&self) -> RepoResult<MutexGuard<'_, MemoryStore>> {
        self.store.lock().map_err(|_| RepoError::StorePoisoned)
    }

    fn flush(&self) -> RepoResult<()> {
        let batch = std::mem::take(&mut *self.pending.borrow_mut());
        if batch.is_empty() {
            return Ok(());
        }

        let started_at = Instant::now();
        let result = self.apply_batch(&batch);
        match &result {
            Ok(()) => debug!(
                "event=flush module=uow backend=memory status=ok session_id={} writes={} duration_ms={}",
                self.id,
                batch.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=flush module=uow backend=memory status=error session_id={} writes={} error={}",
                self.id,
                batch.len(),
                err
            ),
        }
        result
    }

    fn apply_batch(&self, batch: &[Change]) -> RepoResult<()> {
        if let Some(scope) = self.tx.borrow_mut().as_mut() {
            scope.working = apply_changes(&scope.working, batch)?;
            scope.journal.extend(batch.iter().cloned());
            return Ok(());
        }

        let mut store = self.lock()?;
        *store = apply_changes(&store, batch)?;
        Ok(())
    }

    fn read<T>(&self, read: impl FnOnce(&MemoryStore) -> T) -> RepoResult<T> {
        if self.flush_mode == FlushMode::Auto {
            self.flush()?;
        }

        if let Some(scope) = self.tx.borrow().as_ref() {
            return Ok(read(&scope.working));
        }
        let store = self.lock()?;
        Ok(read(&store))
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        // Flush failures cannot be returned from here; `flush` already logged them.
        let _ = self.flush();
        info!(
            "event=session_close module=uow backend=memory status=ok session_id={}",
            self.id
        );
    }
}

/// Handle to one in-memory session.
///
/// Clones share staged changes and transaction state. Staged changes are
/// flushed when the last clone is dropped.
#[derive(Clone)]
pub struct MemoryUnitOfWork {
    state: Rc<SessionState>,
}

impl MemoryUnitOfWork {
    fn new(store: Arc<Mutex<MemoryStore>>, flush_mode: FlushMode) -> Self {
        let id = Uuid::new_v4();
        info!(
            "event=session_open module=uow backend=memory status=ok session_id={} flush_mode={:?}",
            id, flush_mode
        );
        Self {
            state: Rc::new(SessionState {
                id,
                store,
                flush_mode,
                pending: RefCell::new(Vec::new()),
                tx: RefCell::new(None),
            }),
        }
    }

    /// Lazy sequence over every stored `E`, read at evaluation time.
    pub fn query<E: Entity + Send>(&self) -> Queryable<E> {
        let session = self.clone();
        Queryable::from_source(move || session.state.read(|store| store.all::<E>()))
    }

    pub(crate) fn commit_transaction(&self) -> RepoResult<()> {
        self.state.flush()?;

        let scope = self.state.tx.borrow_mut().take().ok_or_else(|| {
            RepoError::Transaction("no transaction is active on this session".to_string())
        })?;
        let mut store = self.state.lock()?;
        *store = apply_changes(&store, &scope.journal)?;
        info!(
            "event=tx_commit module=uow backend=memory status=ok session_id={} changes={} duration_ms={}",
            self.state.id,
            scope.journal.len(),
            scope.started_at.elapsed().as_millis()
        );
        Ok(())
    }

    pub(crate) fn rollback_transaction(&self) -> RepoResult<()> {
        let discarded = std::mem::take(&mut *self.state.pending.borrow_mut()).len();
        if let Some(scope) = self.state.tx.borrow_mut().take() {
            info!(
                "event=tx_rollback module=uow backend=memory status=ok session_id={} discarded_changes={}",
                self.state.id,
                discarded + scope.journal.len()
            );
        }
        Ok(())
    }

    fn stage<E: Entity>(&self, action: &str, change: Change) {
        debug!(
            "event=stage module=uow backend=memory session_id={} action={} entity={}",
            self.state.id,
            action,
            entity_name::<E>()
        );
        self.state.pending.borrow_mut().push(change);
    }
}

impl UnitOfWork for MemoryUnitOfWork {
    type Transaction = MemoryTransaction;

    fn begin_transaction(&self) -> RepoResult<MemoryTransaction> {
        if self.state.tx.borrow().is_some() {
            return Err(RepoError::Transaction(
                "a transaction is already active on this session".to_string(),
            ));
        }

        self.state.flush()?;
        let working = MemoryStore::clone(&*self.state.lock()?);
        *self.state.tx.borrow_mut() = Some(TxScope {
            working,
            journal: Vec::new(),
            started_at: Instant::now(),
        });
        info!(
            "event=tx_begin module=uow backend=memory status=ok session_id={}",
            self.state.id
        );
        Ok(MemoryTransaction::new(self.clone()))
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

impl<E: Entity + Send> EntitySession<E> for MemoryUnitOfWork {
    fn insert(&self, entity: &E) -> RepoResult<()> {
        let entity = entity.clone();
        self.stage::<E>(
            "insert",
            Rc::new(move |store: &mut MemoryStore| store.insert(entity.clone())),
        );
        Ok(())
    }

    fn update(&self, entity: &E) -> RepoResult<()> {
        let entity = entity.clone();
        self.stage::<E>(
            "update",
            Rc::new(move |store: &mut MemoryStore| store.update(entity.clone())),
        );
        Ok(())
    }

    fn delete(&self, entity: &E) -> RepoResult<()> {
        let id = entity.id();
        self.stage::<E>(
            "delete",
            Rc::new(move |store: &mut MemoryStore| store.remove::<E>(&id)),
        );
        Ok(())
    }

    fn get_by_id(&self, id: &E::Id) -> RepoResult<Option<E>> {
        self.state.read(|store| store.find::<E>(id))
    }

    fn get_all(&self) -> RepoResult<Vec<E>> {
        self.state.read(|store| store.all::<E>())
    }
}
