//! Repository error taxonomy.
//!
//! # Responsibility
//! - Give every layer (repository, specification, session) one error type.
//! - Keep backend failures intact so callers decide about rollback.
//!
//! # Invariants
//! - `Cardinality` is the only error `single()` raises for zero or many rows.
//! - Backend errors are wrapped, never translated into other variants.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Why a `single()` call did not produce exactly one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalityError {
    /// The query matched no entity.
    NoMatch,
    /// The query matched more than one entity.
    MultipleMatches,
}

impl Display for CardinalityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMatch => write!(f, "sequence contains no matching element"),
            Self::MultipleMatches => write!(f, "sequence contains more than one matching element"),
        }
    }
}

impl Error for CardinalityError {}

/// Error returned by repositories, specifications and sessions.
#[derive(Debug)]
pub enum RepoError {
    InvalidArgument(&'static str),
    SpecificationNotRegistered {
        specification: &'static str,
        entity: &'static str,
    },
    DuplicateSpecification {
        specification: &'static str,
        entity: &'static str,
    },
    NotInitialized(&'static str),
    AlreadyInitialized(&'static str),
    Cardinality(CardinalityError),
    NotFound {
        entity: &'static str,
        id: String,
    },
    DuplicateKey {
        entity: &'static str,
        id: String,
    },
    InvalidMapping(String),
    InvalidData(String),
    Transaction(String),
    StorePoisoned,
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(name) => write!(f, "argument `{name}` can not be absent"),
            Self::SpecificationNotRegistered {
                specification,
                entity,
            } => write!(
                f,
                "no specification `{specification}` registered for entity `{entity}`"
            ),
            Self::DuplicateSpecification {
                specification,
                entity,
            } => write!(
                f,
                "specification `{specification}` already registered for entity `{entity}`"
            ),
            Self::NotInitialized(name) => {
                write!(f, "specification `{name}` used before initialization")
            }
            Self::AlreadyInitialized(name) => {
                write!(f, "specification `{name}` is already initialized")
            }
            Self::Cardinality(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::DuplicateKey { entity, id } => write!(f, "{entity} already exists: {id}"),
            Self::InvalidMapping(message) => write!(f, "invalid entity mapping: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Transaction(message) => write!(f, "transaction error: {message}"),
            Self::StorePoisoned => write!(f, "in-memory store lock is poisoned"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Cardinality(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CardinalityError> for RepoError {
    fn from(value: CardinalityError) -> Self {
        Self::Cardinality(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{CardinalityError, RepoError};
    use std::error::Error;

    #[test]
    fn cardinality_error_is_exposed_as_source() {
        let err = RepoError::from(CardinalityError::NoMatch);
        let source = err.source().expect("cardinality should be the source");
        assert_eq!(source.to_string(), CardinalityError::NoMatch.to_string());
    }

    #[test]
    fn not_registered_message_names_both_types() {
        let err = RepoError::SpecificationNotRegistered {
            specification: "CustomerSpec",
            entity: "Customer",
        };
        let message = err.to_string();
        assert!(message.contains("CustomerSpec"));
        assert!(message.contains("Customer"));
    }
}
