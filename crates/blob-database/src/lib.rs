//! Metadata store facade for the blob service.
//!
//! Two logical tables back the service:
//!
//! - **blob**: one [`BlobItem`] per distinct content hash, recording where
//!   the bytes live in the object store.
//! - **reverse index**: one [`ReverseIndexItem`] per caller-chosen logical
//!   reference, pointing at a content hash. Many references may share a hash;
//!   this is how deduplication works.
//!
//! # Modules
//!
//! - [`error`]: Error types for metadata operations
//! - [`attributes`]: Attribute maps, the persisted shape of a record
//! - [`item`]: The [`Item`] trait and table naming
//! - [`traits`]: The [`KeyValueStore`] collaborator interface
//! - [`memory`]: In-memory [`InMemoryKeyValueStore`] for tests
//! - [`manager`]: [`DatabaseManager`], the typed facade used by the pipelines

pub mod attributes;
pub mod blob_item;
pub mod error;
pub mod item;
pub mod manager;
pub mod memory;
pub mod reverse_index_item;
pub mod traits;

pub use attributes::{AttributeValue, Attributes};
pub use blob_item::BlobItem;
pub use error::{DatabaseError, DatabaseResult};
pub use item::{Item, ItemKind, TableNames};
pub use manager::DatabaseManager;
pub use memory::InMemoryKeyValueStore;
pub use reverse_index_item::{ReverseIndexItem, CONTENT_HASH_INDEX};
pub use traits::{IndexQuery, ItemKey, KeyValueStore};
