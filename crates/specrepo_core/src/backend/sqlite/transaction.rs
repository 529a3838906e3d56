use super::session::SqliteUnitOfWork;
use crate::error::RepoResult;
use crate::unit_of_work::{Transaction, UnitOfWork};
use log::{error, warn};

/// Explicit transaction on a SQLite session.
///
/// Dropping it without `commit` rolls back and discards staged writes.
pub struct SqliteTransaction {
    session: SqliteUnitOfWork,
    finished: bool,
}

impl SqliteTransaction {
    pub(crate) fn new(session: SqliteUnitOfWork) -> Self {
        Self {
            session,
            finished: false,
        }
    }
}

impl Transaction for SqliteTransaction {
    fn commit(mut self) -> RepoResult<()> {
        self.session.commit_transaction()?;
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self) -> RepoResult<()> {
        self.finished = true;
        self.session.rollback_transaction()
    }

    fn is_active(&self) -> bool {
        !self.finished
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(
            "event=tx_abandon module=uow backend=sqlite status=rollback session_id={}",
            self.session.session_id()
        );
        if let Err(err) = self.session.rollback_transaction() {
            error!(
                "event=tx_abandon module=uow backend=sqlite status=error session_id={} error={}",
                self.session.session_id(),
                err
            );
        }
    }
}
