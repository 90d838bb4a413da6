use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Separator between the container and object name in the canonical form.
pub const LOCATION_SEPARATOR: char = '/';

/// Where a blob's bytes live in the object store.
///
/// A location is a container (bucket) name plus an object name. Its canonical
/// string form is `"<container>/<object>"`, which is also how it is persisted
/// inside a blob record. Both parts are non-empty and neither contains the
/// separator, so the canonical form always parses back to the same value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentLocation {
    container: String,
    object: String,
}

impl ContentLocation {
    /// Create a location from its two parts.
    pub fn new(container: impl Into<String>, object: impl Into<String>) -> Result<Self, TypeError> {
        let container = container.into();
        let object = object.into();
        let joined = format!("{container}{LOCATION_SEPARATOR}{object}");
        if container.contains(LOCATION_SEPARATOR) || object.contains(LOCATION_SEPARATOR) {
            return Err(TypeError::InvalidDelimiters(joined));
        }
        if container.is_empty() {
            return Err(TypeError::EmptyContainer(joined));
        }
        if object.is_empty() {
            return Err(TypeError::EmptyObject(joined));
        }
        Ok(Self { container, object })
    }

    /// Parse the canonical `"container/object"` form.
    ///
    /// Exactly one separator is required; `"bucketonly"` and
    /// `"bucket/name/extra"` are both rejected.
    pub fn parse(full_path: &str) -> Result<Self, TypeError> {
        if full_path.matches(LOCATION_SEPARATOR).count() != 1 {
            return Err(TypeError::InvalidDelimiters(full_path.to_string()));
        }
        let (container, object) = full_path
            .split_once(LOCATION_SEPARATOR)
            .ok_or_else(|| TypeError::InvalidDelimiters(full_path.to_string()))?;
        Self::new(container, object)
    }

    /// The container (bucket) name.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// The object name within the container.
    pub fn object(&self) -> &str {
        &self.object
    }

    /// The canonical `"container/object"` string.
    pub fn full_path(&self) -> String {
        self.to_string()
    }
}

impl fmt::Debug for ContentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentLocation({self})")
    }
}

impl fmt::Display for ContentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{LOCATION_SEPARATOR}{}", self.container, self.object)
    }
}

impl FromStr for ContentLocation {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentLocation {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentLocation> for String {
    fn from(location: ContentLocation) -> Self {
        location.to_string()
    }
}
