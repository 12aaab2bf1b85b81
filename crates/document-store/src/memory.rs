use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Document, DocumentQuery, Result, Version,
    store::{DocumentStore, WriteOp, validate_batch},
};

type Key = (String, String);

/// In-memory document store implementation for testing and local runs.
///
/// This implementation keeps all documents in memory and provides
/// the same interface as the PostgreSQL implementation. A commit holds the
/// write lock for the whole batch, which makes it atomic.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<Key, Document>>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of documents stored.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Clears all documents.
    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let store = self.documents.read().await;
        Ok(store
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> Result<Vec<Version>> {
        validate_batch(&writes)?;

        let mut store = self.documents.write().await;

        // Check every version before touching anything
        for write in &writes {
            let key = (write.collection().to_string(), write.id().to_string());
            let actual = store
                .get(&key)
                .map(|doc| doc.version)
                .unwrap_or(Version::initial());

            if let Some(expected) = write.options().expected_version
                && actual != expected
            {
                metrics::counter!("document_store_conflicts_total").increment(1);
                return Err(write.conflict(expected, actual));
            }
        }

        let now = Utc::now();
        let mut versions = Vec::with_capacity(writes.len());

        for write in writes {
            match write {
                WriteOp::Upsert {
                    collection,
                    id,
                    body,
                    ..
                } => {
                    let key = (collection.clone(), id.clone());
                    let (version, created_at) = match store.get(&key) {
                        Some(existing) => (existing.version.next(), existing.created_at),
                        None => (Version::first(), now),
                    };
                    store.insert(
                        key,
                        Document {
                            collection,
                            id,
                            version,
                            created_at,
                            updated_at: now,
                            body,
                        },
                    );
                    versions.push(version);
                }
                WriteOp::Delete { collection, id, .. } => {
                    store.remove(&(collection, id));
                    versions.push(Version::initial());
                }
            }
        }

        Ok(versions)
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let store = self.documents.read().await;
        let mut documents: Vec<_> = store
            .values()
            .filter(|doc| {
                doc.collection == query.collection && doc.matches_fields(&query.fields)
            })
            .cloned()
            .collect();

        // Sort by creation time then key for a stable order
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        if query.newest_first {
            documents.reverse();
        }

        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }

        Ok(documents)
    }
}
