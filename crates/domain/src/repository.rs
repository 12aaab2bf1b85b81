//! Versioned record persistence.

use std::marker::PhantomData;

use document_store::{
    Document, DocumentQuery, DocumentStore, DocumentStoreExt, Version, WriteOp, WriteOptions,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DomainError, Result};

/// Default number of attempts made by [`Repository::update`] when
/// concurrent writers keep bumping the version.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// A type persisted as one document in a named collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection holding records of this type.
    const COLLECTION: &'static str;

    /// Human-readable entity name used in error messages.
    const ENTITY: &'static str;

    /// Returns the document key of this record.
    fn key(&self) -> String;

    /// Builds an upsert of this record for a commit batch.
    fn write_op(&self, options: WriteOptions) -> Result<WriteOp> {
        Ok(WriteOp::upsert(
            Self::COLLECTION,
            self.key(),
            self,
            options,
        )?)
    }
}

/// A record together with the version it was read at.
#[derive(Debug, Clone)]
pub struct Stored<R> {
    pub record: R,
    pub version: Version,
}

impl<R: Record> Stored<R> {
    /// Decodes a stored document.
    pub fn from_document(document: Document) -> Result<Self> {
        Ok(Self {
            record: document.decode()?,
            version: document.version,
        })
    }

    /// Options that only succeed if nobody wrote the record since it was read.
    pub fn expect_unchanged(&self) -> WriteOptions {
        WriteOptions::expect_version(self.version)
    }
}

/// Repository for loading and saving records with optimistic concurrency.
///
/// The repository is responsible for:
/// 1. Loading the record and remembering its version
/// 2. Running a mutation against the loaded state
/// 3. Writing the result only if the version is still current
/// 4. Re-running the mutation on a fresh read when it is not
pub struct Repository<S, R>
where
    S: DocumentStore,
    R: Record,
{
    store: S,
    max_attempts: usize,
    _phantom: PhantomData<fn() -> R>,
}

impl<S, R> Clone for Repository<S, R>
where
    S: DocumentStore + Clone,
    R: Record,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            max_attempts: self.max_attempts,
            _phantom: PhantomData,
        }
    }
}

impl<S, R> Repository<S, R>
where
    S: DocumentStore,
    R: Record,
{
    /// Creates a new repository over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            _phantom: PhantomData,
        }
    }

    /// Sets how many times a conflicting update is attempted.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads a record, returning None if it doesn't exist.
    pub async fn get(&self, key: &str) -> Result<Option<Stored<R>>> {
        self.store
            .get(R::COLLECTION, key)
            .await?
            .map(Stored::from_document)
            .transpose()
    }

    /// Loads a record, failing with `NotFound` if it doesn't exist.
    pub async fn require(&self, key: &str) -> Result<Stored<R>> {
        self.get(key)
            .await?
            .ok_or_else(|| DomainError::not_found(R::ENTITY, key))
    }

    /// Inserts a new record, failing with `AlreadyExists` if the key is taken.
    pub async fn insert(&self, record: R) -> Result<Stored<R>> {
        let key = record.key();
        let body = serde_json::to_value(&record)?;
        match self
            .store
            .put(R::COLLECTION, &key, body, WriteOptions::expect_new())
            .await
        {
            Ok(version) => Ok(Stored { record, version }),
            Err(e) if e.is_conflict() => Err(DomainError::AlreadyExists {
                entity: R::ENTITY,
                id: key,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads, mutates and writes back a record under a version check.
    ///
    /// The mutation receives the current record (None if absent) and returns
    /// the record to store. If another writer got in between the read and the
    /// write, the mutation runs again on the fresh state. Errors returned by
    /// the mutation abort the update without writing anything.
    pub async fn update<F>(&self, key: &str, mut mutate: F) -> Result<Stored<R>>
    where
        F: FnMut(Option<R>) -> Result<R> + Send,
    {
        for attempt in 1..=self.max_attempts {
            let current = self.get(key).await?;
            let expected = current
                .as_ref()
                .map(|stored| stored.version)
                .unwrap_or(Version::initial());

            let record = mutate(current.map(|stored| stored.record))?;
            let body = serde_json::to_value(&record)?;

            match self
                .store
                .put(
                    R::COLLECTION,
                    key,
                    body,
                    WriteOptions::expect_version(expected),
                )
                .await
            {
                Ok(version) => return Ok(Stored { record, version }),
                Err(e) if e.is_conflict() => {
                    metrics::counter!("repository_update_retries_total", "collection" => R::COLLECTION)
                        .increment(1);
                    tracing::debug!(
                        collection = R::COLLECTION,
                        key,
                        attempt,
                        "version conflict, retrying update"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DomainError::Contention {
            entity: R::ENTITY,
            id: key.to_string(),
        })
    }

    /// Deletes a record. Returns false if it did not exist.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self
            .store
            .remove(R::COLLECTION, key, WriteOptions::new())
            .await?)
    }

    /// Starts a query over this record's collection.
    pub fn query(&self) -> DocumentQuery {
        DocumentQuery::collection(R::COLLECTION)
    }

    /// Runs a query and decodes every matching record.
    pub async fn find(&self, query: DocumentQuery) -> Result<Vec<Stored<R>>> {
        self.store
            .query(query)
            .await?
            .into_iter()
            .map(Stored::from_document)
            .collect()
    }

    /// Runs a query and returns the records without versions.
    pub async fn find_records(&self, query: DocumentQuery) -> Result<Vec<R>> {
        Ok(self
            .find(query)
            .await?
            .into_iter()
            .map(|stored| stored.record)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::InMemoryDocumentStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        value: i32,
    }

    impl Record for Counter {
        const COLLECTION: &'static str = "counters";
        const ENTITY: &'static str = "Counter";

        fn key(&self) -> String {
            self.name.clone()
        }
    }

    fn counter(name: &str, value: i32) -> Counter {
        Counter {
            name: name.to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo: Repository<_, Counter> = Repository::new(InMemoryDocumentStore::new());

        let stored = repo.insert(counter("a", 1)).await.unwrap();
        assert_eq!(stored.version, Version::first());

        let loaded = repo.require("a").await.unwrap();
        assert_eq!(loaded.record, counter("a", 1));
    }

    #[tokio::test]
    async fn test_insert_duplicate_fails() {
        let repo: Repository<_, Counter> = Repository::new(InMemoryDocumentStore::new());
        repo.insert(counter("a", 1)).await.unwrap();

        let result = repo.insert(counter("a", 2)).await;
        assert!(matches!(result, Err(DomainError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_require_missing_is_not_found() {
        let repo: Repository<_, Counter> = Repository::new(InMemoryDocumentStore::new());
        let result = repo.require("nope").await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound {
                entity: "Counter",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_update_creates_then_modifies() {
        let repo: Repository<_, Counter> = Repository::new(InMemoryDocumentStore::new());

        let created = repo
            .update("a", |current| {
                assert!(current.is_none());
                Ok(counter("a", 1))
            })
            .await
            .unwrap();
        assert_eq!(created.version, Version::first());

        let updated = repo
            .update("a", |current| {
                let mut c = current.unwrap();
                c.value += 1;
                Ok(c)
            })
            .await
            .unwrap();
        assert_eq!(updated.version, Version::new(2));
        assert_eq!(updated.record.value, 2);
    }

    #[tokio::test]
    async fn test_update_error_writes_nothing() {
        let store = InMemoryDocumentStore::new();
        let repo: Repository<_, Counter> = Repository::new(store.clone());

        let result = repo
            .update("a", |_| Err(DomainError::InvalidInput("nope".into())))
            .await;

        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
        assert_eq!(store.document_count().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_updates_lose_nothing() {
        let repo: Repository<_, Counter> =
            Repository::new(InMemoryDocumentStore::new()).with_max_attempts(100);
        repo.insert(counter("a", 0)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.update("a", |current| {
                    let mut c = current.unwrap();
                    c.value += 1;
                    Ok(c)
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let loaded = repo.require("a").await.unwrap();
        assert_eq!(loaded.record.value, 20);
        assert_eq!(loaded.version, Version::new(21));
    }

    #[tokio::test]
    async fn test_find_and_delete() {
        let repo: Repository<_, Counter> = Repository::new(InMemoryDocumentStore::new());
        repo.insert(counter("a", 1)).await.unwrap();
        repo.insert(counter("b", 2)).await.unwrap();

        let found = repo
            .find_records(repo.query().field_eq("value", 2))
            .await
            .unwrap();
        assert_eq!(found, vec![counter("b", 2)]);

        assert!(repo.delete("a").await.unwrap());
        assert!(!repo.delete("a").await.unwrap());
        assert_eq!(repo.find(repo.query()).await.unwrap().len(), 1);
    }
}
