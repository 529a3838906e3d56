//! Mutable criteria query over one mapped entity.
//!
//! # Responsibility
//! - Accumulate restrictions, ordering and paging on a query handle.
//! - Translate them into parameterized SQL at execution time.
//!
//! # Invariants
//! - Column names must belong to the entity mapping; values are always bound.
//! - Every `list`/`unique_result` call re-executes against the session.

use super::session::SqliteUnitOfWork;
use crate::entity::{EntityMapping, SqlEntity};
use crate::error::{CardinalityError, RepoError, RepoResult};
use rusqlite::types::Value;
use std::marker::PhantomData;

/// Binary comparison used by a restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl Comparison {
    fn operator(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RestrictionKind {
    Compare(Comparison, Value),
    IsNull,
    IsNotNull,
}

/// One `WHERE` condition on a mapped column.
#[derive(Debug, Clone, PartialEq)]
pub struct Restriction {
    column: String,
    kind: RestrictionKind,
}

impl Restriction {
    pub fn compare(column: impl Into<String>, comparison: Comparison, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            kind: RestrictionKind::Compare(comparison, value.into()),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Ne, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Ge, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Le, value)
    }

    /// SQL `LIKE`; `%` and `_` keep their wildcard meaning.
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Comparison::Like, Value::Text(pattern.into()))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            kind: RestrictionKind::IsNull,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            kind: RestrictionKind::IsNotNull,
        }
    }
}

/// `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    column: String,
    descending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Criteria query bound to a SQLite session.
///
/// Cloning yields an independent query with the same state.
#[derive(Clone)]
pub struct Criteria<E> {
    session: SqliteUnitOfWork,
    restrictions: Vec<Restriction>,
    orders: Vec<Order>,
    max_results: Option<usize>,
    first_result: usize,
    _entity: PhantomData<fn() -> E>,
}

impl<E: SqlEntity> Criteria<E> {
    pub(crate) fn new(session: SqliteUnitOfWork) -> Self {
        Self {
            session,
            restrictions: Vec::new(),
            orders: Vec::new(),
            max_results: None,
            first_result: 0,
            _entity: PhantomData,
        }
    }

    pub fn add(&mut self, restriction: Restriction) -> &mut Self {
        self.restrictions.push(restriction);
        self
    }

    pub fn add_order(&mut self, order: Order) -> &mut Self {
        self.orders.push(order);
        self
    }

    /// Replaces the row limit.
    pub fn set_max_results(&mut self, max_results: usize) -> &mut Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn set_first_result(&mut self, first_result: usize) -> &mut Self {
        self.first_result = first_result;
        self
    }

    pub fn max_results(&self) -> Option<usize> {
        self.max_results
    }

    pub fn first_result(&self) -> usize {
        self.first_result
    }

    /// Executes the query and returns every matching entity.
    pub fn list(&self) -> RepoResult<Vec<E>> {
        let (sql, values) = self.build_sql(self.max_results)?;
        self.session.query_entities(&sql, &values)
    }

    /// Executes the query expecting at most one entity.
    ///
    /// Returns `None` when nothing matches and
    /// `Cardinality(MultipleMatches)` when more than one row does.
    pub fn unique_result(&self) -> RepoResult<Option<E>> {
        let probe = self.max_results.map_or(2, |max| max.min(2));
        let (sql, values) = self.build_sql(Some(probe))?;
        let mut found = self.session.query_entities::<E>(&sql, &values)?;
        match found.len() {
            0 | 1 => Ok(found.pop()),
            _ => Err(CardinalityError::MultipleMatches.into()),
        }
    }

    fn build_sql(&self, limit: Option<usize>) -> RepoResult<(String, Vec<Value>)> {
        let mapping = E::mapping();
        mapping.validate()?;

        let mut sql = format!("{} WHERE 1 = 1", mapping.select_sql());
        let mut bind_values = Vec::new();

        for restriction in &self.restrictions {
            let column = mapped_column(mapping, &restriction.column)?;
            match &restriction.kind {
                RestrictionKind::Compare(comparison, value) => {
                    sql.push_str(&format!(" AND {column} {} ?", comparison.operator()));
                    bind_values.push(value.clone());
                }
                RestrictionKind::IsNull => sql.push_str(&format!(" AND {column} IS NULL")),
                RestrictionKind::IsNotNull => {
                    sql.push_str(&format!(" AND {column} IS NOT NULL"))
                }
            }
        }

        if !self.orders.is_empty() {
            let terms = self
                .orders
                .iter()
                .map(|order| {
                    let column = mapped_column(mapping, &order.column)?;
                    let direction = if order.descending { "DESC" } else { "ASC" };
                    Ok(format!("{column} {direction}"))
                })
                .collect::<RepoResult<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(to_sql_int(limit)));
            if self.first_result > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(to_sql_int(self.first_result)));
            }
        } else if self.first_result > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(to_sql_int(self.first_result)));
        }

        Ok((sql, bind_values))
    }
}

fn mapped_column<'c>(mapping: &EntityMapping, column: &'c str) -> RepoResult<&'c str> {
    if mapping.has_column(column) {
        return Ok(column);
    }
    Err(RepoError::InvalidMapping(format!(
        "column `{column}` is not mapped on table `{}`",
        mapping.table
    )))
}

fn to_sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
