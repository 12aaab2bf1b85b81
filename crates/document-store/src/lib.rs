//! Versioned JSON document store.
//!
//! Every document carries a [`Version`] that increments on each write. Writes
//! name the version they expect to replace, so a stale read-modify-write is
//! rejected with [`DocumentStoreError::ConcurrencyConflict`] instead of
//! silently overwriting a concurrent update. A batch of writes passed to
//! [`DocumentStore::commit`] is applied atomically: all or nothing.

pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use document::{Document, Version};
pub use error::{DocumentStoreError, Result};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::DocumentQuery;
pub use store::{DocumentStore, DocumentStoreExt, WriteOp, WriteOptions};
