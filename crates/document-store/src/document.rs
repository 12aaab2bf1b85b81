use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version number of a stored document, used for optimistic concurrency control.
///
/// A document that does not exist is at version 0. The first write produces
/// version 1 and every later write increments by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a document that does not exist yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version assigned by the first write.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A stored document together with its storage metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Collection the document belongs to (e.g. "products", "carts").
    pub collection: String,

    /// Key of the document, unique within its collection.
    pub id: String,

    /// Version of the document after its latest write.
    pub version: Version,

    /// When the document was first written.
    pub created_at: DateTime<Utc>,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,

    /// The document body as JSON.
    pub body: serde_json::Value,
}

impl Document {
    /// Deserializes the body into a typed value.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }

    /// Returns true if every `(field, value)` pair matches a top-level body field.
    pub fn matches_fields(&self, fields: &serde_json::Map<String, serde_json::Value>) -> bool {
        fields
            .iter()
            .all(|(field, expected)| self.body.get(field) == Some(expected))
    }
}
