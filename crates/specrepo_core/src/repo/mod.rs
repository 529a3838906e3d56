//! Repository layer.
//!
//! # Responsibility
//! - Give domain code backend-agnostic CRUD and specification access.
//! - Keep session, transaction and query details behind the session traits.
//!
//! # Invariants
//! - Repositories validate only their own constructor arguments.
//! - Repository calls never catch or translate backend errors.

pub mod generic_repo;

pub use generic_repo::{GenericRepository, Repository};
