//! A keyed table that records every write in a shared change log.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use real_core::storage::{RepositoryError, Result};
use real_core::stream::{ChangeRecord, Entity};

pub(super) type ChangeLog = Arc<Mutex<Vec<ChangeRecord>>>;

#[derive(Debug)]
pub(super) struct Table<V> {
    entity_type: &'static str,
    items: RwLock<BTreeMap<String, V>>,
    changes: ChangeLog,
}

impl<V> Table<V>
where
    V: Clone + Into<Entity>,
{
    pub fn new(entity_type: &'static str, changes: ChangeLog) -> Self {
        Self {
            entity_type,
            items: RwLock::new(BTreeMap::new()),
            changes,
        }
    }

    async fn record(&self, old: Option<V>, new: Option<V>) {
        let record = ChangeRecord::new(old.map(Into::into), new.map(Into::into));
        self.changes.lock().await.push(record);
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.items.read().await.get(key).cloned()
    }

    pub async fn filter(&self, predicate: impl Fn(&V) -> bool) -> Vec<V> {
        self.items
            .read()
            .await
            .values()
            .filter(|v| predicate(v))
            .cloned()
            .collect()
    }

    pub async fn create(&self, key: String, value: &V) -> Result<()> {
        let mut items = self.items.write().await;
        if items.contains_key(&key) {
            return Err(RepositoryError::already_exists(self.entity_type, key));
        }
        items.insert(key, value.clone());
        self.record(None, Some(value.clone())).await;
        Ok(())
    }

    pub async fn put(&self, key: String, value: &V) -> Result<()> {
        let mut items = self.items.write().await;
        let old = items.insert(key, value.clone());
        self.record(old, Some(value.clone())).await;
        Ok(())
    }

    /// Replaces an existing item with `merge(stored)`.
    pub async fn update(&self, key: &str, merge: impl FnOnce(&V) -> V) -> Result<()> {
        let mut items = self.items.write().await;
        let Some(stored) = items.get_mut(key) else {
            return Err(RepositoryError::not_found(self.entity_type, key));
        };
        let old = stored.clone();
        *stored = merge(&old);
        let new = stored.clone();
        self.record(Some(old), Some(new)).await;
        Ok(())
    }

    /// Mutates an item in place. Nothing is written when `f` fails.
    pub async fn modify<R>(
        &self,
        key: &str,
        missing: impl FnOnce() -> RepositoryError,
        f: impl FnOnce(&mut V) -> Result<R>,
    ) -> Result<R> {
        let mut items = self.items.write().await;
        let Some(stored) = items.get_mut(key) else {
            return Err(missing());
        };
        let old = stored.clone();
        let mut new = old.clone();
        let result = f(&mut new)?;
        *stored = new.clone();
        self.record(Some(old), Some(new)).await;
        Ok(result)
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        if self.remove(key).await {
            Ok(())
        } else {
            Err(RepositoryError::not_found(self.entity_type, key))
        }
    }

    /// Removes the item if present, reporting whether it was.
    pub async fn remove(&self, key: &str) -> bool {
        let mut items = self.items.write().await;
        match items.remove(key) {
            Some(old) => {
                self.record(Some(old), None).await;
                true
            }
            None => false,
        }
    }

    pub fn not_found(&self, key: &str) -> RepositoryError {
        RepositoryError::not_found(self.entity_type, key)
    }

    pub fn condition_failed(&self, key: &str, condition: String) -> RepositoryError {
        RepositoryError::condition_failed(self.entity_type, key, condition)
    }
}

pub(super) fn increment(field: &mut u64) -> u64 {
    *field += 1;
    *field
}

/// Decrements a counter, refusing to go below zero.
pub(super) fn decrement<V>(
    table: &Table<V>,
    key: &str,
    attribute: &str,
    field: &mut u64,
) -> Result<u64>
where
    V: Clone + Into<Entity>,
{
    if *field == 0 {
        return Err(table.condition_failed(key, format!("{attribute} > 0")));
    }
    *field -= 1;
    Ok(*field)
}
