//! Document store over SQLite.
//!
//! Every collection shares the `documents` table. Scans return documents in
//! insertion order, which the ranking code relies on for stable ties.

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::errors::AppError;

/// Collection holding catalog records.
pub const TANKS: &str = "tanks";
/// Collection holding pending changes.
pub const PENDING_CHANGES: &str = "pending_changes";

/// A stored document and its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Map<String, Value>,
}

/// Scan predicate, evaluated inside SQLite.
#[derive(Debug, Clone)]
pub enum Filter {
    All,
    /// Top-level string field equals the value.
    FieldEq(String, String),
}

impl Filter {
    pub fn field_eq(field: &str, value: &str) -> Self {
        Filter::FieldEq(field.to_string(), value.to_string())
    }
}

/// Record store shared by the catalog service and the moderation workflow.
#[derive(Clone)]
pub struct DocumentStore {
    pub(super) pool: SqlitePool,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a document and return its new id.
    pub async fn insert(&self, collection: &str, body: &Map<String, Value>) -> Result<String, AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_document(&mut conn, collection, body).await
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        let mut conn = self.pool.acquire().await?;
        get_document(&mut conn, collection, id).await
    }

    pub async fn scan(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, AppError> {
        let rows = match filter {
            Filter::All => {
                sqlx::query(
                    "SELECT id, body FROM documents WHERE collection = ? ORDER BY rowid",
                )
                .bind(collection)
                .fetch_all(&self.pool)
                .await?
            }
            Filter::FieldEq(field, value) => {
                sqlx::query(
                    "SELECT id, body FROM documents WHERE collection = ? AND json_extract(body, ?) = ? ORDER BY rowid",
                )
                .bind(collection)
                .bind(json_path(field))
                .bind(value)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(document_from_row).collect()
    }

    /// Full-document replace. Returns the number of modified documents.
    pub async fn replace(
        &self,
        collection: &str,
        id: &str,
        body: &Map<String, Value>,
    ) -> Result<u64, AppError> {
        let mut conn = self.pool.acquire().await?;
        replace_document(&mut conn, collection, id, body, None).await
    }

    /// Returns the number of deleted documents.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<u64, AppError> {
        let mut conn = self.pool.acquire().await?;
        delete_document(&mut conn, collection, id).await
    }

    pub async fn count(&self, collection: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Start a transaction spanning several documents.
    pub async fn begin(&self) -> Result<StoreTransaction, AppError> {
        Ok(StoreTransaction {
            tx: self.pool.begin().await?,
        })
    }

    /// Start a transaction that holds the write lock from its first statement.
    ///
    /// Reads inside it observe every write committed before it began, so a
    /// read-check-write sequence cannot race another writer.
    pub async fn begin_immediate(&self) -> Result<StoreTransaction, AppError> {
        Ok(StoreTransaction {
            tx: self.pool.begin_with("BEGIN IMMEDIATE").await?,
        })
    }
}

/// Multi-document write scope. Dropping it without `commit` rolls everything back.
pub struct StoreTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl StoreTransaction {
    pub async fn insert(&mut self, collection: &str, body: &Map<String, Value>) -> Result<String, AppError> {
        insert_document(&mut self.tx, collection, body).await
    }

    pub async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        get_document(&mut self.tx, collection, id).await
    }

    pub async fn replace(
        &mut self,
        collection: &str,
        id: &str,
        body: &Map<String, Value>,
    ) -> Result<u64, AppError> {
        replace_document(&mut self.tx, collection, id, body, None).await
    }

    /// Compare-and-swap: replace only while `field` still equals `expected`.
    pub async fn replace_if(
        &mut self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &str,
        body: &Map<String, Value>,
    ) -> Result<u64, AppError> {
        replace_document(&mut self.tx, collection, id, body, Some((field, expected))).await
    }

    pub async fn delete(&mut self, collection: &str, id: &str) -> Result<u64, AppError> {
        delete_document(&mut self.tx, collection, id).await
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

fn document_from_row(row: &SqliteRow) -> Result<Document, AppError> {
    let id: String = row.get("id");
    let body: String = row.get("body");
    let body = serde_json::from_str(&body)
        .map_err(|e| AppError::Internal(format!("Corrupt document {}: {}", id, e)))?;
    Ok(Document { id, body })
}

async fn insert_document(
    conn: &mut SqliteConnection,
    collection: &str,
    body: &Map<String, Value>,
) -> Result<String, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query("INSERT INTO documents (collection, id, body, created_at) VALUES (?, ?, ?, ?)")
        .bind(collection)
        .bind(&id)
        .bind(serde_json::to_string(body)?)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

    Ok(id)
}

async fn get_document(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
) -> Result<Option<Document>, AppError> {
    let row = sqlx::query("SELECT id, body FROM documents WHERE collection = ? AND id = ?")
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(document_from_row).transpose()
}

async fn replace_document(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
    body: &Map<String, Value>,
    guard: Option<(&str, &str)>,
) -> Result<u64, AppError> {
    let body = serde_json::to_string(body)?;

    let result = match guard {
        None => {
            sqlx::query("UPDATE documents SET body = ? WHERE collection = ? AND id = ?")
                .bind(&body)
                .bind(collection)
                .bind(id)
                .execute(&mut *conn)
                .await?
        }
        Some((field, expected)) => {
            sqlx::query(
                "UPDATE documents SET body = ? WHERE collection = ? AND id = ? AND json_extract(body, ?) = ?",
            )
            .bind(&body)
            .bind(collection)
            .bind(id)
            .bind(json_path(field))
            .bind(expected)
            .execute(&mut *conn)
            .await?
        }
    };

    Ok(result.rows_affected())
}

async fn delete_document(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
        .bind(collection)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
