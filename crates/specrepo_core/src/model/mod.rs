//! Sample customer domain.
//!
//! # Responsibility
//! - Provide a concrete entity, schema and specifications wired into the
//!   generic repository.
//!
//! # Invariants
//! - Every customer is identified by a stable `CustomerId`.
//! - Both backends answer the same `CustomerSpecification` calls.

pub mod customer;
pub mod customer_spec;

pub use customer::{Customer, CustomerId, CUSTOMER_MIGRATIONS};
pub use customer_spec::{
    register_customer_specifications, CustomerClause, CustomerCriteriaSpecification,
    CustomerQueryableSpecification, CustomerRepository, CustomerSpecification,
};
