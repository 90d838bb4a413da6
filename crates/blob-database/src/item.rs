//! The [`Item`] trait implemented by every persisted record type.

use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;
use crate::error::DatabaseResult;

/// Which logical table an item lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Blob,
    ReverseIndex,
}

impl ItemKind {
    /// Human-readable name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blob => "blob item",
            Self::ReverseIndex => "reverse index",
        }
    }
}

/// Physical table names for each logical table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub blob: String,
    pub reverse_index: String,
}

impl TableNames {
    /// The physical table backing `kind`.
    pub fn table_for(&self, kind: ItemKind) -> &str {
        match kind {
            ItemKind::Blob => &self.blob,
            ItemKind::ReverseIndex => &self.reverse_index,
        }
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            blob: "blob-service-blob".into(),
            reverse_index: "blob-service-reverse-index".into(),
        }
    }
}

/// A record that can be stored in the metadata store.
///
/// Each implementor names its table, its primary-key attribute, and knows how
/// to validate itself and convert to and from an attribute map.
/// [`from_attributes`](Item::from_attributes) must fail with
/// [`DatabaseError::Corrupt`](crate::DatabaseError::Corrupt) rather than
/// return a partially populated value.
pub trait Item: Sized + Send + Sync {
    /// The logical table this item belongs to.
    const KIND: ItemKind;

    /// Name of the primary-key attribute.
    const PRIMARY_KEY: &'static str;

    /// Value of the primary key.
    fn key(&self) -> &str;

    /// Check the item's invariants.
    fn validate(&self) -> DatabaseResult<()>;

    /// Serialize into an attribute map, primary key included.
    fn to_attributes(&self) -> Attributes;

    /// Deserialize and validate a stored record.
    fn from_attributes(attributes: &Attributes) -> DatabaseResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_names() {
        let tables = TableNames::default();
        assert_eq!(tables.table_for(ItemKind::Blob), "blob-service-blob");
        assert_eq!(
            tables.table_for(ItemKind::ReverseIndex),
            "blob-service-reverse-index"
        );
    }

    #[test]
    fn kind_names() {
        assert_eq!(ItemKind::Blob.name(), "blob item");
        assert_eq!(ItemKind::ReverseIndex.name(), "reverse index");
    }
}
