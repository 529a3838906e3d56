//! Entity contracts shared by repositories and session backends.
//!
//! # Responsibility
//! - Describe what a persistable entity exposes: a stable key.
//! - Describe how the SQLite backend maps an entity onto one table.
//!
//! # Invariants
//! - Mapping identifiers are validated before they are formatted into SQL.
//! - `SqlEntity::to_values` yields values in `EntityMapping::columns` order.

use crate::error::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::Row;
use std::fmt::{Debug, Display};
use uuid::Uuid;

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
});

/// Primary key of an entity.
pub trait EntityId: Clone + Debug + Display + PartialEq + 'static {
    /// Value bound into SQL statements for this key.
    fn to_sql_value(&self) -> Value;
}

impl EntityId for Uuid {
    fn to_sql_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl EntityId for i64 {
    fn to_sql_value(&self) -> Value {
        Value::Integer(*self)
    }
}

impl EntityId for String {
    fn to_sql_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

/// Domain object managed through a repository.
///
/// Instances returned by sessions are always owned copies; mutating them has
/// no effect until they are passed back through `update`.
pub trait Entity: Clone + 'static {
    type Id: EntityId;

    fn id(&self) -> Self::Id;
}

/// Table layout of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityMapping {
    pub table: &'static str,
    pub id_column: &'static str,
    /// All mapped columns, id column included.
    pub columns: &'static [&'static str],
}

impl EntityMapping {
    /// Checks identifiers and column layout.
    pub fn validate(&self) -> RepoResult<()> {
        ensure_identifier(self.table)?;
        if self.columns.is_empty() {
            return Err(RepoError::InvalidMapping(format!(
                "table `{}` maps no columns",
                self.table
            )));
        }
        for column in self.columns {
            ensure_identifier(column)?;
        }
        if self.id_index().is_none() {
            return Err(RepoError::InvalidMapping(format!(
                "id column `{}` is not mapped on table `{}`",
                self.id_column, self.table
            )));
        }
        Ok(())
    }

    /// Returns whether `column` belongs to this mapping.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|candidate| *candidate == column)
    }

    pub fn select_sql(&self) -> String {
        format!("SELECT {} FROM {}", self.columns.join(", "), self.table)
    }

    pub fn select_by_id_sql(&self) -> String {
        format!("{} WHERE {} = ?1", self.select_sql(), self.id_column)
    }

    pub fn insert_sql(&self) -> String {
        let placeholders = (1..=self.columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            placeholders
        )
    }

    /// Update statement binding the same value list as `insert_sql`.
    pub fn update_sql(&self) -> String {
        let assignments = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| **column != self.id_column)
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let id_position = self.id_index().map_or(1, |index| index + 1);
        format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            self.table, assignments, self.id_column, id_position
        )
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE {} = ?1", self.table, self.id_column)
    }

    fn id_index(&self) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| *column == self.id_column)
    }
}

/// Entity that the SQLite backend can persist.
pub trait SqlEntity: Entity {
    fn mapping() -> &'static EntityMapping;

    /// Column values in `mapping().columns` order.
    fn to_values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// Rejects anything that is not a plain SQL identifier.
pub(crate) fn ensure_identifier(name: &str) -> RepoResult<()> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(RepoError::InvalidMapping(format!(
            "`{name}` is not a valid SQL identifier"
        )))
    }
}

/// Short type name used in log lines and error messages.
pub(crate) fn entity_name<E: 'static>() -> &'static str {
    let full = std::any::type_name::<E>();
    full.rsplit("::").next().unwrap_or(full)
}
