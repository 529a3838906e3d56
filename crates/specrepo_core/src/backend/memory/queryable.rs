//! Immutable, lazily evaluated query sequence.
//!
//! # Responsibility
//! - Compose filter/order/paging operators without touching data.
//! - Evaluate the composed pipeline against a fresh source read on demand.
//!
//! # Invariants
//! - Combinators never mutate `self`; they return a new sequence.
//! - Operators run in the order they were added.
//! - Each materialization re-reads the source.

use crate::error::{CardinalityError, RepoResult};
use std::cmp::Ordering;
use std::rc::Rc;

type Source<E> = Rc<dyn Fn() -> RepoResult<Vec<E>>>;

enum Operator<E> {
    Filter(Rc<dyn Fn(&E) -> bool>),
    Sort(Rc<dyn Fn(&E, &E) -> Ordering>),
    Skip(usize),
    Take(usize),
}

impl<E> Clone for Operator<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Filter(predicate) => Self::Filter(Rc::clone(predicate)),
            Self::Sort(compare) => Self::Sort(Rc::clone(compare)),
            Self::Skip(count) => Self::Skip(*count),
            Self::Take(count) => Self::Take(*count),
        }
    }
}

/// Lazy sequence of entities.
pub struct Queryable<E> {
    source: Source<E>,
    operators: Vec<Operator<E>>,
}

impl<E> Clone for Queryable<E> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
            operators: self.operators.clone(),
        }
    }
}

impl<E: 'static> Queryable<E> {
    /// Builds a sequence whose items come from `source` at evaluation time.
    pub fn from_source(source: impl Fn() -> RepoResult<Vec<E>> + 'static) -> Self {
        Self {
            source: Rc::new(source),
            operators: Vec::new(),
        }
    }

    /// Sequence over a fixed set of items.
    pub fn from_vec(items: Vec<E>) -> Self
    where
        E: Clone,
    {
        Self::from_source(move || Ok(items.clone()))
    }

    pub fn filter(&self, predicate: impl Fn(&E) -> bool + 'static) -> Self {
        self.with(Operator::Filter(Rc::new(predicate)))
    }

    /// Stable sort by `key`; a later `order_by` becomes the primary order.
    pub fn order_by<K: Ord + 'static>(&self, key: impl Fn(&E) -> K + 'static) -> Self {
        self.with(Operator::Sort(Rc::new(move |left: &E, right: &E| {
            key(left).cmp(&key(right))
        })))
    }

    pub fn order_by_descending<K: Ord + 'static>(
        &self,
        key: impl Fn(&E) -> K + 'static,
    ) -> Self {
        self.with(Operator::Sort(Rc::new(move |left: &E, right: &E| {
            key(right).cmp(&key(left))
        })))
    }

    pub fn skip(&self, count: usize) -> Self {
        self.with(Operator::Skip(count))
    }

    pub fn take(&self, count: usize) -> Self {
        self.with(Operator::Take(count))
    }

    pub fn to_list(&self) -> RepoResult<Vec<E>> {
        let mut items = (self.source)()?;
        for operator in &self.operators {
            match operator {
                Operator::Filter(predicate) => items.retain(|item| predicate(item)),
                Operator::Sort(compare) => items.sort_by(|left, right| compare(left, right)),
                Operator::Skip(count) => {
                    let skipped = (*count).min(items.len());
                    items.drain(..skipped);
                }
                Operator::Take(count) => items.truncate(*count),
            }
        }
        Ok(items)
    }

    pub fn count(&self) -> RepoResult<usize> {
        Ok(self.to_list()?.len())
    }

    /// Returns the only item, or a cardinality error.
    pub fn single(&self) -> RepoResult<E> {
        let mut items = self.take(2).to_list()?;
        match items.len() {
            0 => Err(CardinalityError::NoMatch.into()),
            1 => Ok(items.remove(0)),
            _ => Err(CardinalityError::MultipleMatches.into()),
        }
    }

    fn with(&self, operator: Operator<E>) -> Self {
        let mut next = self.clone();
        next.operators.push(operator);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::Queryable;
    use crate::error::{CardinalityError, RepoError};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn combinators_leave_the_original_sequence_untouched() {
        let numbers = Queryable::from_vec(vec![5, 3, 8, 1]);
        let narrowed = numbers.filter(|n| *n > 2).order_by(|n| *n).take(2);

        assert_eq!(narrowed.to_list().unwrap(), vec![3, 5]);
        assert_eq!(numbers.to_list().unwrap(), vec![5, 3, 8, 1]);
    }

    #[test]
    fn operators_apply_in_call_order() {
        let numbers = Queryable::from_vec(vec![4, 1, 3, 2]);

        let take_then_sort = numbers.take(2).order_by(|n| *n);
        let sort_then_take = numbers.order_by(|n| *n).take(2);

        assert_eq!(take_then_sort.to_list().unwrap(), vec![1, 4]);
        assert_eq!(sort_then_take.to_list().unwrap(), vec![1, 2]);
        assert_eq!(
            numbers.order_by_descending(|n| *n).skip(1).to_list().unwrap(),
            vec![3, 2, 1]
        );
    }

    #[test]
    fn evaluation_is_deferred_and_repeated() {
        let reads = Rc::new(Cell::new(0));
        let counter = Rc::clone(&reads);
        let sequence = Queryable::from_source(move || {
            counter.set(counter.get() + 1);
            Ok(vec!["a", "b"])
        })
        .filter(|item| *item == "a");

        assert_eq!(reads.get(), 0);
        sequence.to_list().unwrap();
        sequence.to_list().unwrap();
        assert_eq!(reads.get(), 2);
    }

    #[test]
    fn single_distinguishes_empty_from_ambiguous() {
        let numbers = Queryable::from_vec(vec![1, 2, 2]);

        assert_eq!(numbers.filter(|n| *n == 1).single().unwrap(), 1);
        assert!(matches!(
            numbers.filter(|n| *n == 9).single(),
            Err(RepoError::Cardinality(CardinalityError::NoMatch))
        ));
        assert!(matches!(
            numbers.filter(|n| *n == 2).single(),
            Err(RepoError::Cardinality(CardinalityError::MultipleMatches))
        ));
    }
}
