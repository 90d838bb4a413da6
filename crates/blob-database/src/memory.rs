//! In-memory key-value store for testing and ephemeral use.
//!
//! [`InMemoryKeyValueStore`] keeps every table in a `HashMap` protected by a
//! `RwLock`. Conditional inserts run under the write lock, so they are atomic
//! with respect to every other writer.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::attributes::Attributes;
use crate::error::{DatabaseError, DatabaseResult};
use crate::traits::{IndexQuery, ItemKey, KeyValueStore};

type Table = BTreeMap<String, Attributes>;

/// An in-memory implementation of [`KeyValueStore`].
///
/// Data is lost when the store is dropped. [`set_unavailable`] makes every
/// call fail, which lets tests exercise upstream failures.
///
/// [`set_unavailable`]: InMemoryKeyValueStore::set_unavailable
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    tables: RwLock<HashMap<String, Table>>,
    unavailable: AtomicBool,
}

impl InMemoryKeyValueStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`DatabaseError::Backend`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(table).map_or(0, Table::len))
            .unwrap_or(0)
    }

    /// Write a raw row, bypassing item validation. Used to plant malformed
    /// records in tests.
    pub fn insert_raw(&self, table: &str, key: &str, item: Attributes) -> DatabaseResult<()> {
        let mut tables = self.write_tables()?;
        tables
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), item);
        Ok(())
    }

    fn check_available(&self) -> DatabaseResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Backend("store unavailable".into()));
        }
        Ok(())
    }

    fn read_tables(
        &self,
    ) -> DatabaseResult<std::sync::RwLockReadGuard<'_, HashMap<String, Table>>> {
        self.check_available()?;
        self.tables
            .read()
            .map_err(|e| DatabaseError::Backend(format!("lock poisoned: {e}")))
    }

    fn write_tables(
        &self,
    ) -> DatabaseResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Table>>> {
        self.check_available()?;
        self.tables
            .write()
            .map_err(|e| DatabaseError::Backend(format!("lock poisoned: {e}")))
    }
}

fn key_matches(item: &Attributes, key: ItemKey<'_>) -> DatabaseResult<()> {
    match item.get(key.attribute).and_then(|v| v.as_str()) {
        Some(value) if value == key.value => Ok(()),
        _ => Err(DatabaseError::Backend(format!(
            "item does not carry key attribute {}={}",
            key.attribute, key.value
        ))),
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get_item(&self, table: &str, key: ItemKey<'_>) -> DatabaseResult<Option<Attributes>> {
        let tables = self.read_tables()?;
        Ok(tables.get(table).and_then(|t| t.get(key.value)).cloned())
    }

    async fn put_item(&self, table: &str, key: ItemKey<'_>, item: Attributes) -> DatabaseResult<()> {
        key_matches(&item, key)?;
        let mut tables = self.write_tables()?;
        tables
            .entry(table.to_string())
            .or_default()
            .insert(key.value.to_string(), item);
        Ok(())
    }

    async fn put_item_if_absent(
        &self,
        table: &str,
        key: ItemKey<'_>,
        item: Attributes,
    ) -> DatabaseResult<bool> {
        key_matches(&item, key)?;
        let mut tables = self.write_tables()?;
        let rows = tables.entry(table.to_string()).or_default();
        if rows.contains_key(key.value) {
            return Ok(false);
        }
        rows.insert(key.value.to_string(), item);
        Ok(true)
    }

    async fn delete_item(&self, table: &str, key: ItemKey<'_>) -> DatabaseResult<()> {
        let mut tables = self.write_tables()?;
        if let Some(rows) = tables.get_mut(table) {
            rows.remove(key.value);
        }
        Ok(())
    }

    async fn query_index(&self, table: &str, query: IndexQuery<'_>) -> DatabaseResult<Vec<Attributes>> {
        let tables = self.read_tables()?;
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .values()
            .filter(|row| row.get(query.attribute).and_then(|v| v.as_str()) == Some(query.value))
            .cloned()
            .collect())
    }

    async fn scan(&self, table: &str) -> DatabaseResult<Vec<Attributes>> {
        let tables = self.read_tables()?;
        Ok(tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }
}
