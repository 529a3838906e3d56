//! Queryable-style session backend over an in-process store.
//!
//! # Responsibility
//! - Keep entities of every type in a store shared by a factory's sessions.
//! - Expose immutable lazy `Queryable` sequences for specification queries.
//!
//! # Invariants
//! - Stored entities are owned copies; callers never alias stored values.
//! - Default flush mode is `Explicit`: reads see only flushed changes.

mod queryable;
mod session;
mod store;
mod transaction;

pub use queryable::Queryable;
pub use session::{MemorySessionFactory, MemoryUnitOfWork};
pub use transaction::MemoryTransaction;
