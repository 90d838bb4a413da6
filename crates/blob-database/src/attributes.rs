//! Attribute maps: the shape in which records are persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, DatabaseResult};

/// A single typed attribute value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String attribute.
    S(String),
    /// Integer attribute.
    N(i64),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            Self::N(_) => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::N(value)
    }
}

/// Attribute name → value map for one record.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Read a required string attribute.
pub(crate) fn require_string(
    attributes: &Attributes,
    name: &str,
    item: &'static str,
) -> DatabaseResult<String> {
    match attributes.get(name) {
        Some(AttributeValue::S(s)) => Ok(s.clone()),
        Some(AttributeValue::N(_)) => Err(DatabaseError::Corrupt {
            item,
            reason: format!("attribute {name} is not a string"),
        }),
        None => Err(DatabaseError::Corrupt {
            item,
            reason: format!("missing attribute {name}"),
        }),
    }
}

/// Read a required integer attribute.
///
/// Older rows stored numbers as decimal strings; those are accepted too.
pub(crate) fn require_number(
    attributes: &Attributes,
    name: &str,
    item: &'static str,
) -> DatabaseResult<i64> {
    match attributes.get(name) {
        Some(AttributeValue::N(n)) => Ok(*n),
        Some(AttributeValue::S(s)) => s.parse().map_err(|_| DatabaseError::Corrupt {
            item,
            reason: format!("attribute {name} is not a number: {s:?}"),
        }),
        None => Err(DatabaseError::Corrupt {
            item,
            reason: format!("missing attribute {name}"),
        }),
    }
}
