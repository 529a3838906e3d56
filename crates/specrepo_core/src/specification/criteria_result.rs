use super::SpecificationResult;
use crate::backend::sqlite::Criteria;
use crate::entity::SqlEntity;
use crate::error::{CardinalityError, RepoResult};

/// Result handle over a mutable criteria query.
///
/// `take` narrows the wrapped criteria in place.
pub struct CriteriaSpecificationResult<E> {
    criteria: Criteria<E>,
}

impl<E: SqlEntity> CriteriaSpecificationResult<E> {
    pub fn new(criteria: Criteria<E>) -> Self {
        Self { criteria }
    }
}

impl<E: SqlEntity> SpecificationResult<E> for CriteriaSpecificationResult<E> {
    fn take(&mut self, count: usize) -> &mut dyn SpecificationResult<E> {
        let bound = self
            .criteria
            .max_results()
            .map_or(count, |current| current.min(count));
        self.criteria.set_max_results(bound);
        self
    }

    fn to_list(&self) -> RepoResult<Vec<E>> {
        self.criteria.list()
    }

    fn single(&self) -> RepoResult<E> {
        self.criteria
            .unique_result()?
            .ok_or_else(|| CardinalityError::NoMatch.into())
    }
}
