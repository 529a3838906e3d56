//! Specification pattern contracts.
//!
//! # Responsibility
//! - Define the domain-named query builder bound to one session.
//! - Define the result contract both query styles adapt to.
//!
//! # Invariants
//! - Callers holding only `SpecificationResult` cannot tell the criteria
//!   variant from the queryable variant.
//! - Terminal calls (`to_list`, `single`) re-execute; nothing is cached.
//! - `single` fails with `Cardinality` on zero as well as on many matches.

mod criteria_result;
mod queryable_result;

pub use criteria_result::CriteriaSpecificationResult;
pub use queryable_result::QueryableSpecificationResult;

use crate::entity::Entity;
use crate::error::RepoResult;
use crate::unit_of_work::UnitOfWork;

/// Executable query handle produced by `Specification::to_result`.
pub trait SpecificationResult<E> {
    /// Narrows the result to at most `count` entities before execution.
    ///
    /// Repeated calls keep the smallest bound. Which entities survive is
    /// backend-defined unless the specification imposed an order.
    fn take(&mut self, count: usize) -> &mut dyn SpecificationResult<E>;

    /// Executes the query; an empty list is not an error.
    fn to_list(&self) -> RepoResult<Vec<E>>;

    /// Executes the query expecting exactly one entity.
    fn single(&self) -> RepoResult<E>;
}

/// Domain-oriented query over entity `E`.
///
/// Concrete specifications add fluent filter methods that consume and
/// return `Self`.
pub trait Specification<E: Entity> {
    type UnitOfWork: UnitOfWork;

    /// Binds the specification to a session; allowed exactly once.
    fn initialize(&mut self, unit_of_work: Self::UnitOfWork) -> RepoResult<()>;

    /// Returns a fresh result handle reflecting the filters added so far.
    ///
    /// Handles returned by separate calls do not share state.
    fn to_result(&self) -> RepoResult<Box<dyn SpecificationResult<E>>>;
}
