use super::session::MemoryUnitOfWork;
use crate::error::RepoResult;
use crate::unit_of_work::{Transaction, UnitOfWork};
use log::{error, warn};

/// Explicit transaction on an in-memory session.
///
/// Nothing reaches the shared store before `commit`; dropping the
/// transaction discards its working copy and staged changes.
pub struct MemoryTransaction {
    session: MemoryUnitOfWork,
    finished: bool,
}

impl MemoryTransaction {
    pub(crate) fn new(session: MemoryUnitOfWork) -> Self {
        Self {
            session,
            finished: false,
        }
    }
}

impl Transaction for MemoryTransaction {
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

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(
            "event=tx_abandon module=uow backend=memory status=rollback session_id={}",
            self.session.session_id()
        );
        if let Err(err) = self.session.rollback_transaction() {
            error!(
                "event=tx_abandon module=uow backend=memory status=error session_id={} error={}",
                self.session.session_id(),
                err
            );
        }
    }
}
