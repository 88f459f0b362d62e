//! Actor persistence: identity records and their API keys.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::DocumentStore;
use crate::errors::AppError;
use crate::models::{Actor, IssuedActor};

/// Fixed id of the actor configured through `WT_ADMIN_KEY`.
pub const BOOTSTRAP_ACTOR_ID: &str = "bootstrap-admin";

impl DocumentStore {
    /// Register a new actor with a freshly generated key.
    pub async fn create_actor(&self, label: &str, privileged: bool) -> Result<IssuedActor, AppError> {
        let existing = sqlx::query("SELECT id FROM actors WHERE label = ?")
            .bind(label)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Label '{}' is already in use",
                label
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let api_key = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO actors (id, label, privileged, api_key, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(label)
        .bind(privileged as i32)
        .bind(&api_key)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(IssuedActor {
            actor: Actor {
                id,
                label: label.to_string(),
                privileged,
            },
            api_key,
        })
    }

    /// Install or refresh the configured privileged actor.
    ///
    /// Fails with `InvalidInput` when another actor already owns `label`.
    pub async fn upsert_bootstrap_actor(&self, label: &str, api_key: &str) -> Result<Actor, AppError> {
        let taken = sqlx::query("SELECT id FROM actors WHERE label = ? AND id != ?")
            .bind(label)
            .bind(BOOTSTRAP_ACTOR_ID)
            .fetch_optional(&self.pool)
            .await?;
        if taken.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Admin label '{}' belongs to another actor; set a different WT_ADMIN_LABEL",
                label
            )));
        }

        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO actors (id, label, privileged, api_key, created_at) VALUES (?, ?, 1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET label = excluded.label, privileged = 1, api_key = excluded.api_key
            "#,
        )
        .bind(BOOTSTRAP_ACTOR_ID)
        .bind(label)
        .bind(api_key)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Actor {
            id: BOOTSTRAP_ACTOR_ID.to_string(),
            label: label.to_string(),
            privileged: true,
        })
    }

    /// All actors with their keys, for credential matching.
    pub async fn actor_credentials(&self) -> Result<Vec<(Actor, String)>, AppError> {
        let rows = sqlx::query("SELECT id, label, privileged, api_key FROM actors ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| (actor_from_row(row), row.get("api_key")))
            .collect())
    }
}

fn actor_from_row(row: &SqliteRow) -> Actor {
    Actor {
        id: row.get("id"),
        label: row.get("label"),
        privileged: row.get::<i32, _>("privileged") != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_actor_issues_distinct_keys() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(init_database(&dir.path().join("a.sqlite")).await.unwrap());

        let first = store.create_actor("driver@example.com", false).await.unwrap();
        let second = store.create_actor("gunner@example.com", true).await.unwrap();
        assert_ne!(first.api_key, second.api_key);
        assert!(!first.actor.privileged);
        assert!(second.actor.privileged);

        let duplicate = store.create_actor("driver@example.com", false).await;
        assert!(matches!(duplicate, Err(AppError::InvalidInput(_))));

        let credentials = store.actor_credentials().await.unwrap();
        assert_eq!(credentials.len(), 2);
    }

    #[tokio::test]
    async fn test_bootstrap_actor_upsert_rotates_key() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(init_database(&dir.path().join("a.sqlite")).await.unwrap());

        store.upsert_bootstrap_actor("admin", "old-key").await.unwrap();
        let actor = store.upsert_bootstrap_actor("admin", "new-key").await.unwrap();
        assert!(actor.privileged);

        let credentials = store.actor_credentials().await.unwrap();
        assert_eq!(credentials.len(), 1);
        assert_eq!(credentials[0].1, "new-key");
        assert_eq!(credentials[0].0.id, BOOTSTRAP_ACTOR_ID);
    }

    #[tokio::test]
    async fn test_bootstrap_label_taken_by_other_actor() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(init_database(&dir.path().join("a.sqlite")).await.unwrap());

        store.create_actor("admin", false).await.unwrap();
        let result = store.upsert_bootstrap_actor("admin", "key").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        // Other labels still work
        store.upsert_bootstrap_actor("root", "key").await.unwrap();
        assert_eq!(store.actor_credentials().await.unwrap().len(), 2);
    }
}
