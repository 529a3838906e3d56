//! Session backends implementing the unit-of-work contracts.
//!
//! - `sqlite`: criteria-style queries over a SQLite database.
//! - `memory`: queryable-style lazy sequences over an in-process store.

pub mod memory;
pub mod sqlite;
