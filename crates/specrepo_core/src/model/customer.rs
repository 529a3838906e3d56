//! Customer entity.
//!
//! # Responsibility
//! - Define the sample aggregate used by the customer repository.
//! - Map it onto the `customers` table.
//!
//! # Invariants
//! - `id` is generated once and never reused.
//! - `age` is never negative; the schema enforces it as well.

use crate::db::Migration;
use crate::entity::{Entity, EntityMapping, SqlEntity};
use crate::error::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CustomerId = Uuid;

/// Schema steps for the `customers` table.
pub const CUSTOMER_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("migrations/0001_customers.sql"),
}];

static CUSTOMER_MAPPING: EntityMapping = EntityMapping {
    table: "customers",
    id_column: "id",
    columns: &["id", "name", "age"],
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub age: u32,
}

impl Customer {
    /// Creates a customer with a freshly generated id.
    pub fn new(name: impl Into<String>, age: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            age,
        }
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> CustomerId {
        self.id
    }
}

impl SqlEntity for Customer {
    fn mapping() -> &'static EntityMapping {
        &CUSTOMER_MAPPING
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.to_string()),
            Value::Text(self.name.clone()),
            Value::Integer(i64::from(self.age)),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let age: i64 = row.get(2)?;

        let id = Uuid::parse_str(&id)
            .map_err(|err| RepoError::InvalidData(format!("invalid customer id `{id}`: {err}")))?;
        let age = u32::try_from(age)
            .map_err(|_| RepoError::InvalidData(format!("invalid customer age `{age}`")))?;

        Ok(Self { id, name, age })
    }
}

#[cfg(test)]
mod tests {
    use super::{Customer, CUSTOMER_MIGRATIONS};
    use crate::db::migrations::latest_version;
    use crate::entity::{Entity, SqlEntity};
    use rusqlite::types::Value;

    #[test]
    fn mapping_is_valid_and_matches_values() {
        let customer = Customer::new("Ada", 36);
        let mapping = Customer::mapping();

        mapping.validate().unwrap();
        assert_eq!(customer.to_values().len(), mapping.columns.len());
        assert_eq!(customer.to_values()[0], Value::Text(customer.id().to_string()));
    }

    #[test]
    fn new_customers_get_distinct_ids() {
        assert_ne!(Customer::new("a", 1).id, Customer::new("a", 1).id);
    }

    #[test]
    fn migrations_end_at_version_one() {
        assert_eq!(latest_version(CUSTOMER_MIGRATIONS), 1);
    }
}
