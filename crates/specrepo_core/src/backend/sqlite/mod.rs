//! Criteria-style session backend on SQLite.
//!
//! # Responsibility
//! - Persist mapped entities through staged, parameterized SQL.
//! - Expose mutable `Criteria` handles for specification queries.
//!
//! # Invariants
//! - One connection per session; sessions of a factory share a database file.
//! - Default flush mode is `Auto`: reads see the session's own writes.

mod criteria;
mod session;
mod transaction;

pub use criteria::{Comparison, Criteria, Order, Restriction};
pub use session::{SqliteSessionFactory, SqliteUnitOfWork};
pub use transaction::SqliteTransaction;
