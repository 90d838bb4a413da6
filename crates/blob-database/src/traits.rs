//! The [`KeyValueStore`] trait: the metadata store collaborator.
//!
//! Any backend (DynamoDB, an embedded database, the in-memory store) that
//! can provide point reads and writes, conditional inserts, a secondary-index
//! equality query and a full scan per table implements this trait.

use async_trait::async_trait;

use crate::attributes::Attributes;
use crate::error::DatabaseResult;

/// Primary key of a row: attribute name and value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemKey<'a> {
    pub attribute: &'a str,
    pub value: &'a str,
}

impl<'a> ItemKey<'a> {
    pub fn new(attribute: &'a str, value: &'a str) -> Self {
        Self { attribute, value }
    }
}

/// Equality query against a secondary index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexQuery<'a> {
    pub index_name: &'a str,
    pub attribute: &'a str,
    pub value: &'a str,
}

/// Key-value/document store holding the metadata tables.
///
/// Implementations must be thread-safe (`Send + Sync`). Handles are
/// long-lived and shared between concurrent calls.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a row by primary key. Returns `Ok(None)` if absent.
    async fn get_item(&self, table: &str, key: ItemKey<'_>) -> DatabaseResult<Option<Attributes>>;

    /// Unconditionally write a row, replacing any row with the same key.
    async fn put_item(&self, table: &str, key: ItemKey<'_>, item: Attributes) -> DatabaseResult<()>;

    /// Write a row only if no row with the same key exists.
    ///
    /// The check and the write must be atomic with respect to every other
    /// writer. Returns `Ok(false)` when a row already existed.
    async fn put_item_if_absent(
        &self,
        table: &str,
        key: ItemKey<'_>,
        item: Attributes,
    ) -> DatabaseResult<bool>;

    /// Delete a row by primary key. Deleting an absent row is not an error.
    async fn delete_item(&self, table: &str, key: ItemKey<'_>) -> DatabaseResult<()>;

    /// Return every row whose indexed attribute equals the query value.
    async fn query_index(&self, table: &str, query: IndexQuery<'_>) -> DatabaseResult<Vec<Attributes>>;

    /// Return every row in the table.
    async fn scan(&self, table: &str) -> DatabaseResult<Vec<Attributes>>;
}
