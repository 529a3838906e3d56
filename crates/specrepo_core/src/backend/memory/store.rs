//! Type-erased, insertion-ordered entity tables.

use crate::entity::{entity_name, Entity};
use crate::error::{RepoError, RepoResult};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

/// Staged mutation replayed against a store on flush or commit.
pub(crate) type Change = Rc<dyn Fn(&mut MemoryStore) -> RepoResult<()>>;

trait ErasedTable: Send {
    fn clone_table(&self) -> Box<dyn ErasedTable>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Table<E> {
    rows: Vec<E>,
}

impl<E: Entity + Send> ErasedTable for Table<E> {
    fn clone_table(&self) -> Box<dyn ErasedTable> {
        Box::new(Table {
            rows: self.rows.clone(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Process-local storage shared by the sessions of one factory.
#[derive(Default)]
pub(crate) struct MemoryStore {
    tables: HashMap<TypeId, Box<dyn ErasedTable>>,
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            tables: self
                .tables
                .iter()
                .map(|(type_id, table)| (*type_id, table.clone_table()))
                .collect(),
        }
    }
}

impl MemoryStore {
    pub(crate) fn insert<E: Entity + Send>(&mut self, entity: E) -> RepoResult<()> {
        let id = entity.id();
        let rows = self.rows_mut::<E>()?;
        if rows.iter().any(|row| row.id() == id) {
            return Err(RepoError::DuplicateKey {
                entity: entity_name::<E>(),
                id: id.to_string(),
            });
        }
        rows.push(entity);
        Ok(())
    }

    pub(crate) fn update<E: Entity + Send>(&mut self, entity: E) -> RepoResult<()> {
        let id = entity.id();
        let rows = self.rows_mut::<E>()?;
        match rows.iter_mut().find(|row| row.id() == id) {
            Some(row) => {
                *row = entity;
                Ok(())
            }
            None => Err(RepoError::NotFound {
                entity: entity_name::<E>(),
                id: id.to_string(),
            }),
        }
    }

    pub(crate) fn remove<E: Entity + Send>(&mut self, id: &E::Id) -> RepoResult<()> {
        let rows = self.rows_mut::<E>()?;
        match rows.iter().position(|row| row.id() == *id) {
            Some(index) => {
                rows.remove(index);
                Ok(())
            }
            None => Err(RepoError::NotFound {
                entity: entity_name::<E>(),
                id: id.to_string(),
            }),
        }
    }

    pub(crate) fn find<E: Entity + Send>(&self, id: &E::Id) -> Option<E> {
        self.rows::<E>().iter().find(|row| row.id() == *id).cloned()
    }

    pub(crate) fn all<E: Entity + Send>(&self) -> Vec<E> {
        self.rows::<E>().to_vec()
    }

    fn rows<E: Entity + Send>(&self) -> &[E] {
        self.tables
            .get(&TypeId::of::<E>())
            .and_then(|table| table.as_any().downcast_ref::<Table<E>>())
            .map(|table| table.rows.as_slice())
            .unwrap_or(&[])
    }

    fn rows_mut<E: Entity + Send>(&mut self) -> RepoResult<&mut Vec<E>> {
        self.tables
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Table::<E> { rows: Vec::new() }) as Box<dyn ErasedTable>)
            .as_any_mut()
            .downcast_mut::<Table<E>>()
            .map(|table| &mut table.rows)
            .ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "table for `{}` holds another entity type",
                    entity_name::<E>()
                ))
            })
    }
}

/// Applies `changes` to a copy of `base`; `base` is untouched on failure.
pub(crate) fn apply_changes(base: &MemoryStore, changes: &[Change]) -> RepoResult<MemoryStore> {
    let mut next = base.clone();
    for change in changes {
        change(&mut next)?;
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::{apply_changes, Change, MemoryStore};
    use crate::entity::Entity;
    use crate::error::RepoError;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: i64,
        label: &'static str,
    }

    impl Entity for Widget {
        type Id = i64;

        fn id(&self) -> i64 {
            self.id
        }
    }

    #[test]
    fn rows_keep_insertion_order() {
        let mut store = MemoryStore::default();
        store.insert(Widget { id: 2, label: "b" }).unwrap();
        store.insert(Widget { id: 1, label: "a" }).unwrap();

        let labels: Vec<&str> = store.all::<Widget>().iter().map(|w| w.label).collect();
        assert_eq!(labels, vec!["b", "a"]);
    }

    #[test]
    fn duplicate_insert_and_missing_update_are_rejected() {
        let mut store = MemoryStore::default();
        store.insert(Widget { id: 1, label: "a" }).unwrap();

        let duplicate = store.insert(Widget { id: 1, label: "again" }).unwrap_err();
        assert!(matches!(duplicate, RepoError::DuplicateKey { .. }));

        let missing = store.update(Widget { id: 9, label: "x" }).unwrap_err();
        assert!(matches!(missing, RepoError::NotFound { .. }));
        assert!(store.remove::<Widget>(&9).is_err());
    }

    #[test]
    fn failed_batch_leaves_base_untouched() {
        let base = MemoryStore::default();
        let insert: Change =
            Rc::new(|store: &mut MemoryStore| store.insert(Widget { id: 1, label: "a" }));
        let remove_missing: Change =
            Rc::new(|store: &mut MemoryStore| store.remove::<Widget>(&42));
        let changes = vec![insert, remove_missing];

        assert!(apply_changes(&base, &changes).is_err());
        assert!(base.all::<Widget>().is_empty());
        assert!(base.find::<Widget>(&1).is_none());
    }
}
