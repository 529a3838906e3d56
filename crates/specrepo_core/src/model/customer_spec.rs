//! Customer specifications for both session backends.
//!
//! # Responsibility
//! - Offer domain-named customer filters behind one fluent trait.
//! - Translate the same filters into criteria (SQLite) or a lazy
//!   sequence (memory).
//!
//! # Invariants
//! - Filters only accumulate; `to_result` rebuilds the query from them,
//!   so every result handle is independent.
//! - A specification is bound to exactly one session.

use super::customer::Customer;
use crate::backend::memory::MemoryUnitOfWork;
use crate::backend::sqlite::{Criteria, Order, Restriction, SqliteUnitOfWork};
use crate::error::{RepoError, RepoResult};
use crate::locator::SpecificationRegistry;
use crate::repo::GenericRepository;
use crate::specification::{
    CriteriaSpecificationResult, QueryableSpecificationResult, Specification,
    SpecificationResult,
};

/// Repository specialised to customers.
pub type CustomerRepository<U, L = SpecificationRegistry> = GenericRepository<Customer, U, L>;

/// One refinement recorded by a customer specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerClause {
    AgeEquals(u32),
    NameEquals(String),
    OlderThan(u32),
    OrderByName,
}

/// Fluent customer queries shared by every backend.
pub trait CustomerSpecification: Specification<Customer> + Sized {
    fn refine(self, clause: CustomerClause) -> Self;

    fn with_age(self, age: u32) -> Self {
        self.refine(CustomerClause::AgeEquals(age))
    }

    fn with_name(self, name: impl Into<String>) -> Self {
        self.refine(CustomerClause::NameEquals(name.into()))
    }

    /// Customers strictly older than `age`.
    fn older_than(self, age: u32) -> Self {
        self.refine(CustomerClause::OlderThan(age))
    }

    fn order_by_name(self) -> Self {
        self.refine(CustomerClause::OrderByName)
    }
}

/// Customer specification over SQLite criteria.
#[derive(Default)]
pub struct CustomerCriteriaSpecification {
    session: Option<SqliteUnitOfWork>,
    clauses: Vec<CustomerClause>,
}

impl CustomerCriteriaSpecification {
    fn build_criteria(&self) -> RepoResult<Criteria<Customer>> {
        let session = self
            .session
            .as_ref()
            .ok_or(RepoError::NotInitialized("CustomerCriteriaSpecification"))?;

        let mut criteria = session.create_criteria::<Customer>();
        for clause in &self.clauses {
            match clause {
                CustomerClause::AgeEquals(age) => {
                    criteria.add(Restriction::eq("age", i64::from(*age)));
                }
                CustomerClause::NameEquals(name) => {
                    criteria.add(Restriction::eq("name", name.clone()));
                }
                CustomerClause::OlderThan(age) => {
                    criteria.add(Restriction::gt("age", i64::from(*age)));
                }
                CustomerClause::OrderByName => {
                    criteria.add_order(Order::asc("name"));
                }
            }
        }
        Ok(criteria)
    }
}

impl Specification<Customer> for CustomerCriteriaSpecification {
    type UnitOfWork = SqliteUnitOfWork;

    fn initialize(&mut self, unit_of_work: SqliteUnitOfWork) -> RepoResult<()> {
        if self.session.is_some() {
            return Err(RepoError::AlreadyInitialized(
                "CustomerCriteriaSpecification",
            ));
        }
        self.session = Some(unit_of_work);
        Ok(())
    }

    fn to_result(&self) -> RepoResult<Box<dyn SpecificationResult<Customer>>> {
        Ok(Box::new(CriteriaSpecificationResult::new(
            self.build_criteria()?,
        )))
    }
}

impl CustomerSpecification for CustomerCriteriaSpecification {
    fn refine(mut self, clause: CustomerClause) -> Self {
        self.clauses.push(clause);
        self
    }
}

/// Customer specification over the in-memory lazy sequence.
#[derive(Default)]
pub struct CustomerQueryableSpecification {
    session: Option<MemoryUnitOfWork>,
    clauses: Vec<CustomerClause>,
}

impl Specification<Customer> for CustomerQueryableSpecification {
    type UnitOfWork = MemoryUnitOfWork;

    fn initialize(&mut self, unit_of_work: MemoryUnitOfWork) -> RepoResult<()> {
        if self.session.is_some() {
            return Err(RepoError::AlreadyInitialized(
                "CustomerQueryableSpecification",
            ));
        }
        self.session = Some(unit_of_work);
        Ok(())
    }

    fn to_result(&self) -> RepoResult<Box<dyn SpecificationResult<Customer>>> {
        let session = self
            .session
            .as_ref()
            .ok_or(RepoError::NotInitialized("CustomerQueryableSpecification"))?;

        let mut customers = session.query::<Customer>();
        for clause in &self.clauses {
            customers = match clause.clone() {
                CustomerClause::AgeEquals(age) => customers.filter(move |c| c.age == age),
                CustomerClause::NameEquals(name) => customers.filter(move |c| c.name == name),
                CustomerClause::OlderThan(age) => customers.filter(move |c| c.age > age),
                CustomerClause::OrderByName => customers.order_by(|c| c.name.clone()),
            };
        }
        Ok(Box::new(QueryableSpecificationResult::new(customers)))
    }
}

impl CustomerSpecification for CustomerQueryableSpecification {
    fn refine(mut self, clause: CustomerClause) -> Self {
        self.clauses.push(clause);
        self
    }
}

/// Registers both customer specifications with their default factories.
pub fn register_customer_specifications(registry: &mut SpecificationRegistry) -> RepoResult<()> {
    registry.register_default::<CustomerCriteriaSpecification, Customer>()?;
    registry.register_default::<CustomerQueryableSpecification, Customer>()?;
    Ok(())
}
