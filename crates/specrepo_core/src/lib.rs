//! Generic repository and specification pattern over pluggable sessions.
//! Domain code talks to `Repository` and `Specification`; backends supply
//! the unit of work and the query style.

pub mod backend;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod locator;
pub mod logging;
pub mod model;
pub mod repo;
pub mod specification;
pub mod unit_of_work;

pub use backend::memory::{MemorySessionFactory, MemoryTransaction, MemoryUnitOfWork, Queryable};
pub use backend::sqlite::{
    Comparison, Criteria, Order, Restriction, SqliteSessionFactory, SqliteTransaction,
    SqliteUnitOfWork,
};
pub use config::{BackendConfig, ConfigError, LoggingConfig, MemoryConfig, RepoConfig, SqliteConfig};
pub use entity::{Entity, EntityId, EntityMapping, SqlEntity};
pub use error::{CardinalityError, RepoError, RepoResult};
pub use locator::{SpecificationLocator, SpecificationRegistry};
pub use logging::{default_log_level, init_logging, logging_status};
pub use repo::{GenericRepository, Repository};
pub use specification::{
    CriteriaSpecificationResult, QueryableSpecificationResult, Specification, SpecificationResult,
};
pub use unit_of_work::{EntitySession, FlushMode, SessionFactory, Transaction, UnitOfWork};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
