//! In-memory implementation of `DataAccess`.
//!
//! Records live in a `BTreeMap` keyed by `RecordId`, so iteration order is
//! primary key ascending. Clones share the same store. Lookups accept a
//! numeric key given as text and vice versa, as SQLite does.

use crate::model::changeset::Changeset;
use crate::model::entity::Entity;
use crate::model::value::{FieldValue, Filter, RecordId};
use crate::repo::data_access::{
    check_query_fields, valid_changes, DataAccess, RepoError, RepoResult,
};
use crate::repo::query::{exact_filter, Query};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct Store<E> {
    records: BTreeMap<RecordId, E>,
    next_id: i64,
}

/// Thread-safe in-memory data-access handle.
///
/// Records without a primary key get the next integer id on insert.
#[derive(Debug)]
pub struct MemoryRepository<E> {
    store: Arc<RwLock<Store<E>>>,
}

impl<E> Clone for MemoryRepository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<E: Entity> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store {
                records: BTreeMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> RepoResult<usize> {
        Ok(self.read()?.records.len())
    }

    pub fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.read()?.records.is_empty())
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, Store<E>>> {
        self.store.read().map_err(|_| RepoError::LockPoisoned)
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, Store<E>>> {
        self.store.write().map_err(|_| RepoError::LockPoisoned)
    }
}

impl<E: Entity> DataAccess<E> for MemoryRepository<E> {
    fn insert(&self, changeset: Changeset<E>) -> RepoResult<E> {
        let mut record = valid_changes(changeset)?.apply_changes();
        let mut store = self.write()?;

        let id = match record.id() {
            Some(id) => id,
            None => {
                let generated = store.next_id;
                record
                    .put_field(E::PRIMARY_KEY, FieldValue::Integer(generated))
                    .map_err(|err| {
                        RepoError::InvalidData(format!(
                            "cannot assign generated key to {}.{}: {err}",
                            E::SOURCE,
                            E::PRIMARY_KEY
                        ))
                    })?;
                RecordId::Int(generated)
            }
        };

        if store.records.contains_key(&id) {
            return Err(RepoError::DuplicateKey {
                table: E::SOURCE,
                id,
            });
        }
        if let RecordId::Int(number) = id {
            store.next_id = store.next_id.max(number.saturating_add(1));
        }

        store.records.insert(id, record.clone());
        Ok(record)
    }

    fn get(&self, id: &RecordId) -> RepoResult<Option<E>> {
        let store = self.read()?;
        Ok(resolve_key(&store.records, id).and_then(|key| store.records.get(&key).cloned()))
    }

    fn get_by(&self, filter: &Filter) -> RepoResult<Option<E>> {
        let query = exact_filter(Query::new(), filter);
        check_query_fields::<E>(&query)?;

        let store = self.read()?;
        let mut matches = store
            .records
            .values()
            .filter(|record| query.matches(*record));
        let first = matches.next().cloned();
        let rest = matches.count();
        if rest > 0 {
            return Err(RepoError::MultipleResults {
                table: E::SOURCE,
                count: rest + 1,
            });
        }
        Ok(first)
    }

    fn list(&self, query: &Query) -> RepoResult<Vec<E>> {
        check_query_fields::<E>(query)?;

        let store = self.read()?;
        let matching = store
            .records
            .values()
            .filter(|record| query.matches(*record))
            .skip(query.offset);
        let records: Vec<E> = match query.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        };
        Ok(records)
    }

    fn update(&self, changeset: Changeset<E>) -> RepoResult<E> {
        let changeset = valid_changes(changeset)?;
        let id = changeset.data().id().ok_or(RepoError::MissingPrimaryKey {
            table: E::SOURCE,
        })?;
        if changeset.changes().is_empty() {
            return Ok(changeset.apply_changes());
        }

        let record = changeset.apply_changes();
        let new_id = record.id().ok_or(RepoError::MissingPrimaryKey {
            table: E::SOURCE,
        })?;

        let mut store = self.write()?;
        let Some(stored_id) = resolve_key(&store.records, &id) else {
            return Err(RepoError::Stale { table: E::SOURCE });
        };
        let new_id = if new_id == id { stored_id.clone() } else { new_id };
        if new_id != stored_id && store.records.contains_key(&new_id) {
            return Err(RepoError::DuplicateKey {
                table: E::SOURCE,
                id: new_id,
            });
        }
        store.records.remove(&stored_id);
        store.records.insert(new_id, record.clone());
        Ok(record)
    }

    fn delete(&self, record: &E) -> RepoResult<E> {
        let id = record.id().ok_or(RepoError::MissingPrimaryKey {
            table: E::SOURCE,
        })?;
        let mut store = self.write()?;
        resolve_key(&store.records, &id)
            .and_then(|key| store.records.remove(&key))
            .ok_or(RepoError::Stale { table: E::SOURCE })
    }
}

/// Stored key equal to `id`, trying the numeric/text counterpart on a miss.
fn resolve_key<E>(records: &BTreeMap<RecordId, E>, id: &RecordId) -> Option<RecordId> {
    if records.contains_key(id) {
        return Some(id.clone());
    }
    id.coerced().filter(|key| records.contains_key(key))
}
