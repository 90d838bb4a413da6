use blob_types::ContentLocation;

use crate::attributes::{require_number, require_string, Attributes, AttributeValue};
use crate::error::{DatabaseError, DatabaseResult};
use crate::item::{Item, ItemKind};

/// One physical blob: content hash → storage location.
///
/// Created once per distinct content hash and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobItem {
    content_hash: String,
    location: ContentLocation,
    created: i64,
}

impl BlobItem {
    pub const FIELD_CONTENT_HASH: &'static str = "contentHash";
    pub const FIELD_S3_PATH: &'static str = "s3Path";
    pub const FIELD_CREATED: &'static str = "created";

    /// Create a validated blob item. `created` is milliseconds since epoch.
    pub fn new(
        content_hash: impl Into<String>,
        location: ContentLocation,
        created: i64,
    ) -> DatabaseResult<Self> {
        let item = Self {
            content_hash: content_hash.into(),
            location,
            created,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn location(&self) -> &ContentLocation {
        &self.location
    }

    pub fn created(&self) -> i64 {
        self.created
    }
}

impl Item for BlobItem {
    const KIND: ItemKind = ItemKind::Blob;
    const PRIMARY_KEY: &'static str = Self::FIELD_CONTENT_HASH;

    fn key(&self) -> &str {
        &self.content_hash
    }

    fn validate(&self) -> DatabaseResult<()> {
        if self.content_hash.is_empty() {
            return Err(DatabaseError::Invalid {
                item: Self::KIND.name(),
                reason: "content hash empty".into(),
            });
        }
        // ContentLocation cannot be built with an empty container or object.
        Ok(())
    }

    fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(
            Self::FIELD_CONTENT_HASH.into(),
            AttributeValue::from(self.content_hash.as_str()),
        );
        attributes.insert(
            Self::FIELD_S3_PATH.into(),
            AttributeValue::from(self.location.full_path()),
        );
        attributes.insert(Self::FIELD_CREATED.into(), AttributeValue::from(self.created));
        attributes
    }

    fn from_attributes(attributes: &Attributes) -> DatabaseResult<Self> {
        let item_name = Self::KIND.name();
        let content_hash = require_string(attributes, Self::FIELD_CONTENT_HASH, item_name)?;
        let path = require_string(attributes, Self::FIELD_S3_PATH, item_name)?;
        let location = ContentLocation::parse(&path).map_err(|e| DatabaseError::Corrupt {
            item: item_name,
            reason: e.to_string(),
        })?;
        let created = require_number(attributes, Self::FIELD_CREATED, item_name)?;
        Self::new(content_hash, location, created).map_err(|e| DatabaseError::Corrupt {
            item: item_name,
            reason: e.to_string(),
        })
    }
}
