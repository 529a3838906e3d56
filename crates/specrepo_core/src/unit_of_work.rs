//! Unit-of-work (session) contracts.
//!
//! # Responsibility
//! - Define the persistence conversation repositories forward to.
//! - Define transaction and factory seams implemented by each backend.
//!
//! # Invariants
//! - Writes are staged by the session and reach storage only on flush.
//! - Staged writes are flushed when the last session handle is dropped.
//! - Dropping an uncommitted transaction rolls back writes staged after
//!   `begin_transaction`.
//! - Handles are not meant to cross threads; one session per thread.

use crate::entity::Entity;
use crate::error::RepoResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// When staged writes are pushed to storage ahead of reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Flush before every read, so the session reads its own writes.
    Auto,
    /// Only `flush`, commit and session end push writes.
    Explicit,
}

/// Explicit transaction scoped to one session.
pub trait Transaction {
    /// Flushes staged writes and makes them durable.
    fn commit(self) -> RepoResult<()>;

    /// Discards everything done since the transaction began.
    fn rollback(self) -> RepoResult<()>;

    fn is_active(&self) -> bool;
}

/// One persistence conversation.
///
/// Implementations are cheap handles; clones share the same session.
pub trait UnitOfWork: Clone + 'static {
    type Transaction: Transaction;

    /// Starts a transaction after flushing writes staged so far.
    fn begin_transaction(&self) -> RepoResult<Self::Transaction>;

    /// Pushes staged writes to storage in staging order.
    fn flush(&self) -> RepoResult<()>;

    fn has_pending_changes(&self) -> bool;

    fn flush_mode(&self) -> FlushMode;

    /// Identifier used to correlate log events of this session.
    fn session_id(&self) -> Uuid;
}

/// Typed operations a session supports for entity `E`.
pub trait EntitySession<E: Entity>: UnitOfWork {
    fn insert(&self, entity: &E) -> RepoResult<()>;
    fn update(&self, entity: &E) -> RepoResult<()>;
    fn delete(&self, entity: &E) -> RepoResult<()>;
    fn get_by_id(&self, id: &E::Id) -> RepoResult<Option<E>>;
    fn get_all(&self) -> RepoResult<Vec<E>>;
}

/// Produces sessions from backend configuration.
pub trait SessionFactory {
    type Session: UnitOfWork;

    fn open_session(&self) -> RepoResult<Self::Session>;
}
