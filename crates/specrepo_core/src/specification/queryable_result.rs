use super::SpecificationResult;
use crate::backend::memory::Queryable;
use crate::error::RepoResult;

/// Result handle over an immutable lazy sequence.
///
/// `take` rebinds the handle to a narrower sequence; the sequence it
/// was created from is never modified.
pub struct QueryableSpecificationResult<E> {
    queryable: Queryable<E>,
}

impl<E: 'static> QueryableSpecificationResult<E> {
    pub fn new(queryable: Queryable<E>) -> Self {
        Self { queryable }
    }
}

impl<E: 'static> SpecificationResult<E> for QueryableSpecificationResult<E> {
    fn take(&mut self, count: usize) -> &mut dyn SpecificationResult<E> {
        self.queryable = self.queryable.take(count);
        self
    }

    fn to_list(&self) -> RepoResult<Vec<E>> {
        self.queryable.to_list()
    }

    fn single(&self) -> RepoResult<E> {
        self.queryable.single()
    }
}
