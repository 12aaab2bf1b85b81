use async_trait::async_trait;
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};

use crate::{
    Document, DocumentQuery, DocumentStoreError, Result, Version,
    store::{DocumentStore, WriteOp, validate_batch},
};

/// PostgreSQL-backed document store implementation.
///
/// Documents live in a single `documents` table keyed by
/// `(collection, id)` with a JSONB body.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            collection: row.try_get("collection")?,
            id: row.try_get("id")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            body: row.try_get("body")?,
        })
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT collection, id, version, created_at, updated_at, body
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    #[tracing::instrument(skip(self, writes), fields(writes = writes.len()))]
    async fn commit(&self, writes: Vec<WriteOp>) -> Result<Vec<Version>> {
        validate_batch(&writes)?;

        // Lock rows in key order so two overlapping batches cannot deadlock
        let mut order: Vec<usize> = (0..writes.len()).collect();
        order.sort_by(|&a, &b| {
            (writes[a].collection(), writes[a].id()).cmp(&(writes[b].collection(), writes[b].id()))
        });

        let mut tx = self.pool.begin().await?;
        let mut versions = vec![Version::initial(); writes.len()];

        for index in order {
            let write = &writes[index];

            let current: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
            )
            .bind(write.collection())
            .bind(write.id())
            .fetch_optional(&mut *tx)
            .await?;
            let actual = current.map(Version::new).unwrap_or(Version::initial());

            if let Some(expected) = write.options().expected_version
                && actual != expected
            {
                metrics::counter!("document_store_conflicts_total").increment(1);
                return Err(write.conflict(expected, actual));
            }

            match write {
                WriteOp::Upsert {
                    collection,
                    id,
                    body,
                    options,
                } => {
                    let next = actual.next();
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, version, created_at, updated_at, body)
                        VALUES ($1, $2, $3, NOW(), NOW(), $4)
                        ON CONFLICT (collection, id) DO UPDATE SET
                            version = EXCLUDED.version,
                            updated_at = EXCLUDED.updated_at,
                            body = EXCLUDED.body
                        "#,
                    )
                    .bind(collection)
                    .bind(id)
                    .bind(next.as_i64())
                    .bind(body)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        // A concurrent insert of a brand new key races past FOR UPDATE
                        if let sqlx::Error::Database(ref db_err) = e
                            && db_err.constraint() == Some("documents_pkey")
                        {
                            return DocumentStoreError::ConcurrencyConflict {
                                collection: collection.clone(),
                                id: id.clone(),
                                expected: options.expected_version.unwrap_or(actual),
                                actual: next,
                            };
                        }
                        DocumentStoreError::Database(e)
                    })?;
                    versions[index] = next;
                }
                WriteOp::Delete { collection, id, .. } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(collection)
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(versions)
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let mut sql = String::from(
            "SELECT collection, id, version, created_at, updated_at, body FROM documents WHERE collection = $1",
        );
        let mut param_count = 1;

        // Build dynamic query
        if !query.fields.is_empty() {
            param_count += 1;
            sql.push_str(&format!(" AND body @> ${param_count}"));
        }

        if query.newest_first {
            sql.push_str(" ORDER BY created_at DESC, id DESC");
        } else {
            sql.push_str(" ORDER BY created_at ASC, id ASC");
        }

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }

        // Build and execute query with parameters
        let mut sqlx_query = sqlx::query(&sql).bind(&query.collection);

        if !query.fields.is_empty() {
            sqlx_query = sqlx_query.bind(serde_json::Value::Object(query.fields.clone()));
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }
}
