use crate::attributes::{require_string, Attributes, AttributeValue};
use crate::error::{DatabaseError, DatabaseResult};
use crate::item::{Item, ItemKind};

/// Secondary index on the reverse-index table, keyed by content hash.
pub const CONTENT_HASH_INDEX: &str = "contentHash-index";

/// A caller-chosen logical reference pointing at a content hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReverseIndexItem {
    reverse_index: String,
    content_hash: String,
}

impl ReverseIndexItem {
    pub const FIELD_REVERSE_INDEX: &'static str = "reverseIndex";
    pub const FIELD_CONTENT_HASH: &'static str = "contentHash";

    pub fn new(
        reverse_index: impl Into<String>,
        content_hash: impl Into<String>,
    ) -> DatabaseResult<Self> {
        let item = Self {
            reverse_index: reverse_index.into(),
            content_hash: content_hash.into(),
        };
        item.validate()?;
        Ok(item)
    }

    pub fn reverse_index(&self) -> &str {
        &self.reverse_index
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }
}

impl Item for ReverseIndexItem {
    const KIND: ItemKind = ItemKind::ReverseIndex;
    const PRIMARY_KEY: &'static str = Self::FIELD_REVERSE_INDEX;

    fn key(&self) -> &str {
        &self.reverse_index
    }

    fn validate(&self) -> DatabaseResult<()> {
        let reason = if self.reverse_index.is_empty() {
            "reverse index empty"
        } else if self.content_hash.is_empty() {
            "content hash empty"
        } else {
            return Ok(());
        };
        Err(DatabaseError::Invalid {
            item: Self::KIND.name(),
            reason: reason.into(),
        })
    }

    fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(
            Self::FIELD_REVERSE_INDEX.into(),
            AttributeValue::from(self.reverse_index.as_str()),
        );
        attributes.insert(
            Self::FIELD_CONTENT_HASH.into(),
            AttributeValue::from(self.content_hash.as_str()),
        );
        attributes
    }

    fn from_attributes(attributes: &Attributes) -> DatabaseResult<Self> {
        let item_name = Self::KIND.name();
        let reverse_index = require_string(attributes, Self::FIELD_REVERSE_INDEX, item_name)?;
        let content_hash = require_string(attributes, Self::FIELD_CONTENT_HASH, item_name)?;
        Self::new(reverse_index, content_hash).map_err(|e| DatabaseError::Corrupt {
            item: item_name,
            reason: e.to_string(),
        })
    }
}
