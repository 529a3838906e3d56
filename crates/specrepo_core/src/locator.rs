//! Specification resolution.
//!
//! # Responsibility
//! - Map a (specification type, entity type) pair to a factory.
//! - Hand out fresh, uninitialized specification instances.
//!
//! # Invariants
//! - At most one factory per pair; re-registration is rejected.
//! - Resolution never initializes; the repository does that.

use crate::entity::{entity_name, Entity};
use crate::error::{RepoError, RepoResult};
use crate::specification::Specification;
use log::debug;
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Resolves specification implementations for an entity type.
pub trait SpecificationLocator {
    fn resolve<S, E>(&self) -> RepoResult<S>
    where
        S: Specification<E> + 'static,
        E: Entity;
}

type SpecificationFactory<S> = Box<dyn Fn() -> S + Send + Sync>;

/// Explicit registry of specification factories.
#[derive(Default)]
pub struct SpecificationRegistry {
    factories: HashMap<(TypeId, TypeId), Box<dyn Any + Send + Sync>>,
}

impl SpecificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` as the source of `S` for entity `E`.
    pub fn register<S, E, F>(&mut self, factory: F) -> RepoResult<()>
    where
        S: Specification<E> + 'static,
        E: Entity,
        F: Fn() -> S + Send + Sync + 'static,
    {
        let key = (TypeId::of::<S>(), TypeId::of::<E>());
        if self.factories.contains_key(&key) {
            return Err(RepoError::DuplicateSpecification {
                specification: entity_name::<S>(),
                entity: entity_name::<E>(),
            });
        }

        let factory: SpecificationFactory<S> = Box::new(factory);
        self.factories.insert(key, Box::new(factory));
        debug!(
            "event=spec_register module=locator status=ok specification={} entity={}",
            entity_name::<S>(),
            entity_name::<E>()
        );
        Ok(())
    }

    /// Registers `S::default` as the factory of `S`.
    pub fn register_default<S, E>(&mut self) -> RepoResult<()>
    where
        S: Specification<E> + Default + 'static,
        E: Entity,
    {
        self.register::<S, E, _>(S::default)
    }

    pub fn contains<S, E>(&self) -> bool
    where
        S: Specification<E> + 'static,
        E: Entity,
    {
        self.factories
            .contains_key(&(TypeId::of::<S>(), TypeId::of::<E>()))
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl SpecificationLocator for SpecificationRegistry {
    fn resolve<S, E>(&self) -> RepoResult<S>
    where
        S: Specification<E> + 'static,
        E: Entity,
    {
        let factory = self
            .factories
            .get(&(TypeId::of::<S>(), TypeId::of::<E>()))
            .and_then(|factory| factory.downcast_ref::<SpecificationFactory<S>>())
            .ok_or(RepoError::SpecificationNotRegistered {
                specification: entity_name::<S>(),
                entity: entity_name::<E>(),
            })?;
        Ok(factory())
    }
}
