//! [`DatabaseManager`]: typed operations over the metadata tables.

use std::sync::Arc;

use tracing::debug;

use crate::blob_item::BlobItem;
use crate::error::{DatabaseError, DatabaseResult};
use crate::item::{Item, TableNames};
use crate::reverse_index_item::{ReverseIndexItem, CONTENT_HASH_INDEX};
use crate::traits::{IndexQuery, ItemKey, KeyValueStore};

/// Typed facade over a [`KeyValueStore`].
///
/// Cheap to clone; clones share the same store handle.
#[derive(Clone)]
pub struct DatabaseManager {
    store: Arc<dyn KeyValueStore>,
    tables: TableNames,
}

impl DatabaseManager {
    pub fn new(store: Arc<dyn KeyValueStore>, tables: TableNames) -> Self {
        Self { store, tables }
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Validate and unconditionally write an item, replacing any existing
    /// row with the same key.
    pub async fn put<T: Item>(&self, item: &T) -> DatabaseResult<()> {
        item.validate()?;
        let table = self.tables.table_for(T::KIND);
        debug!(table, key = item.key(), "put item");
        self.store
            .put_item(table, ItemKey::new(T::PRIMARY_KEY, item.key()), item.to_attributes())
            .await
    }

    /// Validate and write an item only if its key is not taken yet.
    ///
    /// Returns `Ok(false)` when another writer got there first.
    pub async fn create<T: Item>(&self, item: &T) -> DatabaseResult<bool> {
        item.validate()?;
        let table = self.tables.table_for(T::KIND);
        let created = self
            .store
            .put_item_if_absent(
                table,
                ItemKey::new(T::PRIMARY_KEY, item.key()),
                item.to_attributes(),
            )
            .await?;
        debug!(table, key = item.key(), created, "conditional put item");
        Ok(created)
    }

    /// Point lookup. A malformed stored record is an error, never a partial
    /// item.
    pub async fn find<T: Item>(&self, key: &str) -> DatabaseResult<Option<T>> {
        if key.is_empty() {
            return Err(DatabaseError::Invalid {
                item: T::KIND.name(),
                reason: "empty key".into(),
            });
        }
        let table = self.tables.table_for(T::KIND);
        match self.store.get_item(table, ItemKey::new(T::PRIMARY_KEY, key)).await? {
            Some(attributes) => T::from_attributes(&attributes).map(Some),
            None => {
                debug!(table, key, "no item found");
                Ok(None)
            }
        }
    }

    /// Point delete. Removing an absent key is not an error.
    pub async fn remove<T: Item>(&self, key: &str) -> DatabaseResult<()> {
        let table = self.tables.table_for(T::KIND);
        debug!(table, key, "remove item");
        self.store
            .delete_item(table, ItemKey::new(T::PRIMARY_KEY, key))
            .await
    }

    pub async fn find_blob_item(&self, content_hash: &str) -> DatabaseResult<Option<BlobItem>> {
        self.find::<BlobItem>(content_hash).await
    }

    pub async fn find_reverse_index_item(
        &self,
        reverse_index: &str,
    ) -> DatabaseResult<Option<ReverseIndexItem>> {
        self.find::<ReverseIndexItem>(reverse_index).await
    }

    /// Record a blob for a content hash unless one already exists.
    ///
    /// Returns `Ok(false)` if the hash was already recorded; the existing row
    /// is left untouched.
    pub async fn create_blob_item(&self, item: &BlobItem) -> DatabaseResult<bool> {
        self.create(item).await
    }

    /// Bind a reverse index to a content hash.
    ///
    /// Fails with [`DatabaseError::AlreadyExists`] if the reverse index is
    /// already bound; the existing binding is left unchanged. The existence
    /// check and the write happen in one conditional insert.
    pub async fn put_reverse_index(&self, item: &ReverseIndexItem) -> DatabaseResult<()> {
        if self.create(item).await? {
            Ok(())
        } else {
            Err(DatabaseError::AlreadyExists {
                item: ReverseIndexItem::KIND.name(),
                key: item.reverse_index().to_string(),
            })
        }
    }

    /// Every reverse index currently pointing at `content_hash`, in
    /// store-defined order.
    pub async fn query_by_hash(&self, content_hash: &str) -> DatabaseResult<Vec<ReverseIndexItem>> {
        let table = self.tables.table_for(ReverseIndexItem::KIND);
        let rows = self
            .store
            .query_index(
                table,
                IndexQuery {
                    index_name: CONTENT_HASH_INDEX,
                    attribute: ReverseIndexItem::FIELD_CONTENT_HASH,
                    value: content_hash,
                },
            )
            .await?;
        rows.iter().map(ReverseIndexItem::from_attributes).collect()
    }

    /// Content hashes of every recorded blob.
    ///
    /// Full-table scan: cost grows with the table and it carries no latency
    /// expectations. Meant for maintenance tooling, not request paths.
    pub async fn scan_all_blob_hashes(&self) -> DatabaseResult<Vec<String>> {
        let table = self.tables.table_for(BlobItem::KIND);
        let rows = self.store.scan(table).await?;
        rows.iter()
            .map(|row| BlobItem::from_attributes(row).map(|item| item.content_hash().to_string()))
            .collect()
    }
}

impl std::fmt::Debug for DatabaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("tables", &self.tables)
            .finish()
    }
}
