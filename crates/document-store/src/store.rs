use std::collections::HashSet;

use async_trait::async_trait;

use crate::{Document, DocumentQuery, DocumentStoreError, Result, Version};

/// Options controlling the version check of a single write.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Expected current version of the document for optimistic concurrency control.
    /// If None, no version check is performed (use with caution).
    pub expected_version: Option<Version>,
}

impl WriteOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the document to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the document to not exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// A single write inside a commit batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Inserts or replaces a document body.
    Upsert {
        collection: String,
        id: String,
        body: serde_json::Value,
        options: WriteOptions,
    },
    /// Deletes a document.
    Delete {
        collection: String,
        id: String,
        options: WriteOptions,
    },
}

impl WriteOp {
    /// Creates an upsert of a serializable body.
    pub fn upsert<T: serde::Serialize>(
        collection: impl Into<String>,
        id: impl Into<String>,
        body: &T,
        options: WriteOptions,
    ) -> std::result::Result<Self, serde_json::Error> {
        Ok(WriteOp::Upsert {
            collection: collection.into(),
            id: id.into(),
            body: serde_json::to_value(body)?,
            options,
        })
    }

    /// Creates a delete.
    pub fn delete(
        collection: impl Into<String>,
        id: impl Into<String>,
        options: WriteOptions,
    ) -> Self {
        WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
            options,
        }
    }

    /// Returns the collection targeted by this write.
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Upsert { collection, .. } | WriteOp::Delete { collection, .. } => collection,
        }
    }

    /// Returns the document key targeted by this write.
    pub fn id(&self) -> &str {
        match self {
            WriteOp::Upsert { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }

    /// Returns the version check of this write.
    pub fn options(&self) -> WriteOptions {
        match self {
            WriteOp::Upsert { options, .. } | WriteOp::Delete { options, .. } => *options,
        }
    }

    /// Returns the conflict error for this write given the stored version.
    pub(crate) fn conflict(&self, expected: Version, actual: Version) -> DocumentStoreError {
        DocumentStoreError::ConcurrencyConflict {
            collection: self.collection().to_string(),
            id: self.id().to_string(),
            expected,
            actual,
        }
    }
}

/// Core trait for document store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads a single document, returning None if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Applies a batch of writes atomically - either all succeed or none do.
    ///
    /// Each write whose options carry an expected version fails the whole
    /// batch with `ConcurrencyConflict` if the stored version differs.
    ///
    /// Returns the new version of each written document in batch order
    /// (deleted documents report `Version::initial()`).
    async fn commit(&self, writes: Vec<WriteOp>) -> Result<Vec<Version>>;

    /// Retrieves documents matching a query.
    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Writes a single document body.
    async fn put(
        &self,
        collection: &str,
        id: &str,
        body: serde_json::Value,
        options: WriteOptions,
    ) -> Result<Version> {
        let versions = self
            .commit(vec![WriteOp::Upsert {
                collection: collection.to_string(),
                id: id.to_string(),
                body,
                options,
            }])
            .await?;
        Ok(versions.first().copied().unwrap_or_default())
    }

    /// Deletes a single document. Returns false if it did not exist.
    async fn remove(&self, collection: &str, id: &str, options: WriteOptions) -> Result<bool> {
        if self.get(collection, id).await?.is_none() {
            return Ok(false);
        }
        self.commit(vec![WriteOp::delete(collection, id, options)])
            .await?;
        Ok(true)
    }

    /// Checks if a document exists.
    async fn exists(&self, collection: &str, id: &str) -> Result<bool> {
        Ok(self.get(collection, id).await?.is_some())
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

/// Validates a write batch before committing.
pub fn validate_batch(writes: &[WriteOp]) -> Result<()> {
    if writes.is_empty() {
        return Err(DocumentStoreError::InvalidBatch(
            "Cannot commit an empty write batch".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(writes.len());
    for write in writes {
        if !seen.insert((write.collection(), write.id())) {
            return Err(DocumentStoreError::InvalidBatch(format!(
                "Document {}/{} appears more than once in the batch",
                write.collection(),
                write.id()
            )));
        }
    }

    Ok(())
}
