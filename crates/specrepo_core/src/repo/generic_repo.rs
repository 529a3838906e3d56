//! Generic repository over a unit of work.
//!
//! # Responsibility
//! - Expose CRUD for one entity type by forwarding to a bound session.
//! - Resolve and initialize specifications for domain queries.
//!
//! # Invariants
//! - A repository is bound to one session handle and one locator for life.
//! - Session and locator errors are returned unchanged.
//! - Nothing here flushes; persistence timing belongs to the session.

use crate::entity::Entity;
use crate::error::{RepoError, RepoResult};
use crate::locator::{SpecificationLocator, SpecificationRegistry};
use crate::specification::Specification;
use crate::unit_of_work::EntitySession;
use std::marker::PhantomData;
use std::sync::Arc;

/// Repository interface for entity `E`.
pub trait Repository<E: Entity> {
    type UnitOfWork: EntitySession<E>;

    fn insert(&self, entity: &E) -> RepoResult<()>;
    fn update(&self, entity: &E) -> RepoResult<()>;
    fn delete(&self, entity: &E) -> RepoResult<()>;
    fn get_by_id(&self, id: &E::Id) -> RepoResult<Option<E>>;
    fn get_all(&self) -> RepoResult<Vec<E>>;

    /// Resolves specification `S`, bound to this repository's session.
    fn specify<S>(&self) -> RepoResult<S>
    where
        S: Specification<E, UnitOfWork = Self::UnitOfWork> + 'static;
}

/// Repository forwarding every call to a session handle.
pub struct GenericRepository<E, U, L = SpecificationRegistry> {
    unit_of_work: U,
    locator: Arc<L>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, U, L> GenericRepository<E, U, L>
where
    E: Entity,
    U: EntitySession<E>,
    L: SpecificationLocator,
{
    pub fn new(unit_of_work: U, locator: Arc<L>) -> Self {
        Self {
            unit_of_work,
            locator,
            _entity: PhantomData,
        }
    }

    /// Builds a repository from possibly absent collaborators.
    ///
    /// # Errors
    /// - `InvalidArgument` naming the first missing collaborator; the
    ///   locator is checked before the unit of work.
    pub fn try_new(unit_of_work: Option<U>, locator: Option<Arc<L>>) -> RepoResult<Self> {
        let locator = locator.ok_or(RepoError::InvalidArgument("specification_locator"))?;
        let unit_of_work = unit_of_work.ok_or(RepoError::InvalidArgument("unit_of_work"))?;
        Ok(Self::new(unit_of_work, locator))
    }

    pub fn unit_of_work(&self) -> &U {
        &self.unit_of_work
    }

    pub fn locator(&self) -> &Arc<L> {
        &self.locator
    }
}

impl<E, U, L> Repository<E> for GenericRepository<E, U, L>
where
    E: Entity,
    U: EntitySession<E>,
    L: SpecificationLocator,
{
    type UnitOfWork = U;

    fn insert(&self, entity: &E) -> RepoResult<()> {
        self.unit_of_work.insert(entity)
    }

    fn update(&self, entity: &E) -> RepoResult<()> {
        self.unit_of_work.update(entity)
    }

    fn delete(&self, entity: &E) -> RepoResult<()> {
        self.unit_of_work.delete(entity)
    }

    fn get_by_id(&self, id: &E::Id) -> RepoResult<Option<E>> {
        self.unit_of_work.get_by_id(id)
    }

    fn get_all(&self) -> RepoResult<Vec<E>> {
        self.unit_of_work.get_all()
    }

    fn specify<S>(&self) -> RepoResult<S>
    where
        S: Specification<E, UnitOfWork = Self::UnitOfWork> + 'static,
    {
        let mut specification = self.locator.resolve::<S, E>()?;
        specification.initialize(self.unit_of_work.clone())?;
        Ok(specification)
    }
}
