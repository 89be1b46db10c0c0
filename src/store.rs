//! Persistence of named JSON documents and of post content.
//!
//! Two backends: `MemoryStore` (tests and single-process runs without a
//! database) and `PgStore` (PostgreSQL through sqlx).

use crate::defaults::ConfigStore;
use crate::model::{
    AdminNotice, SettingsDocument, StyleDocument, NOTICE_DOCUMENT, SETTINGS_DOCUMENT,
    STYLE_DOCUMENT,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::Row;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document {name} is not valid JSON: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode document {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store lock poisoned")]
    Poisoned,

    #[error("post {0} not found")]
    PostNotFound(i64),
}

/// A stored post: its id and block markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub content: String,
}

/// Key/value store for the settings, style and notice documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read_document(&self, name: &str) -> Result<Option<Value>, StoreError>;

    async fn write_document(&self, name: &str, value: &Value) -> Result<(), StoreError>;

    /// Deleting an absent document is not an error.
    async fn delete_document(&self, name: &str) -> Result<(), StoreError>;
}

/// Access to post markup, used when uninstalling.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError>;

    async fn update_post(&self, id: i64, content: &str) -> Result<(), StoreError>;
}

// ==================== Typed document access ====================

/// Persisted settings document, or the defaults when it is absent or
/// unreadable.
pub async fn load_settings(
    store: &dyn DocumentStore,
    defaults: &ConfigStore,
) -> Result<SettingsDocument, StoreError> {
    match store.read_document(SETTINGS_DOCUMENT).await? {
        Some(value) => match serde_json::from_value::<SettingsDocument>(value) {
            Ok(mut settings) if !settings.content.is_empty() => {
                settings.repair_active_language();
                Ok(settings)
            }
            Ok(_) => {
                warn!("Stored settings have no languages, using defaults");
                Ok(defaults.options_default())
            }
            Err(e) => {
                warn!("Stored settings are malformed ({}), using defaults", e);
                Ok(defaults.options_default())
            }
        },
        None => Ok(defaults.options_default()),
    }
}

pub async fn save_settings(
    store: &dyn DocumentStore,
    settings: &SettingsDocument,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(settings).map_err(|source| StoreError::Encode {
        name: SETTINGS_DOCUMENT.to_string(),
        source,
    })?;
    store.write_document(SETTINGS_DOCUMENT, &value).await
}

/// Persisted style document, or the defaults when it is absent or unreadable.
pub async fn load_styles(
    store: &dyn DocumentStore,
    defaults: &ConfigStore,
) -> Result<StyleDocument, StoreError> {
    match store.read_document(STYLE_DOCUMENT).await? {
        Some(value) => Ok(serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("Stored styles are malformed ({}), using defaults", e);
            defaults.styles_default()
        })),
        None => Ok(defaults.styles_default()),
    }
}

pub async fn save_styles(
    store: &dyn DocumentStore,
    styles: &StyleDocument,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(styles).map_err(|source| StoreError::Encode {
        name: STYLE_DOCUMENT.to_string(),
        source,
    })?;
    store.write_document(STYLE_DOCUMENT, &value).await
}

pub async fn save_notice(
    store: &dyn DocumentStore,
    notice: &AdminNotice,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(notice).map_err(|source| StoreError::Encode {
        name: NOTICE_DOCUMENT.to_string(),
        source,
    })?;
    store.write_document(NOTICE_DOCUMENT, &value).await
}

/// Read and delete the pending admin notice. Expired notices are discarded.
pub async fn take_notice(store: &dyn DocumentStore) -> Result<Option<AdminNotice>, StoreError> {
    let Some(value) = store.read_document(NOTICE_DOCUMENT).await? else {
        return Ok(None);
    };
    store.delete_document(NOTICE_DOCUMENT).await?;

    match serde_json::from_value::<AdminNotice>(value) {
        Ok(notice) if notice.expires_at > Utc::now() => Ok(Some(notice)),
        Ok(_) => {
            debug!("Admin notice expired before it was shown");
            Ok(None)
        }
        Err(e) => {
            warn!("Discarding malformed admin notice: {}", e);
            Ok(None)
        }
    }
}

// ==================== In-memory backend ====================

#[derive(Debug, Default)]
struct MemoryState {
    documents: BTreeMap<String, String>,
    posts: BTreeMap<i64, String>,
}

/// Store kept in process memory. Documents are held as serialized JSON so
/// reads see exactly what a database round trip would return.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a post, replacing any existing post with the same id.
    pub fn insert_post(&self, id: i64, content: impl Into<String>) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        state.posts.insert(id, content.into());
        Ok(())
    }

    pub fn post(&self, id: i64) -> Option<String> {
        self.state.lock().ok()?.posts.get(&id).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read_document(&self, name: &str) -> Result<Option<Value>, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        state
            .documents
            .get(name)
            .map(|body| {
                serde_json::from_str(body).map_err(|source| StoreError::Corrupt {
                    name: name.to_string(),
                    source,
                })
            })
            .transpose()
    }

    async fn write_document(&self, name: &str, value: &Value) -> Result<(), StoreError> {
        let body = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            name: name.to_string(),
            source,
        })?;
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        state.documents.insert(name.to_string(), body);
        Ok(())
    }

    async fn delete_document(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        state.documents.remove(name);
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for MemoryStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(state
            .posts
            .iter()
            .map(|(id, content)| Post {
                id: *id,
                content: content.clone(),
            })
            .collect())
    }

    async fn update_post(&self, id: i64, content: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        match state.posts.get_mut(&id) {
            Some(existing) => {
                *existing = content.to_string();
                Ok(())
            }
            None => Err(StoreError::PostNotFound(id)),
        }
    }
}

// ==================== PostgreSQL backend ====================

#[derive(Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    /// Connect and create the tables if they do not exist yet.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Connected to PostgreSQL document store");
        Ok(store)
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS agcn_documents (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS posts (
                id BIGSERIAL PRIMARY KEY,
                post_content TEXT NOT NULL DEFAULT ''
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn read_document(&self, name: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT body FROM agcn_documents WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let body: String = row.get("body");
            serde_json::from_str(&body).map_err(|source| StoreError::Corrupt {
                name: name.to_string(),
                source,
            })
        })
        .transpose()
    }

    async fn write_document(&self, name: &str, value: &Value) -> Result<(), StoreError> {
        let body = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            name: name.to_string(),
            source,
        })?;

        sqlx::query(
            "INSERT INTO agcn_documents (name, body, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (name) DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()",
        )
        .bind(name)
        .bind(body)
        .execute(&self.pool)
        .await?;

        debug!("Wrote document {}", name);
        Ok(())
    }

    async fn delete_document(&self, name: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM agcn_documents WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for PgStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let rows = sqlx::query("SELECT id, post_content FROM posts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Post {
                id: row.get("id"),
                content: row.get("post_content"),
            })
            .collect())
    }

    async fn update_post(&self, id: i64, content: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE posts SET post_content = $1 WHERE id = $2")
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::PostNotFound(id));
        }
        Ok(())
    }
}
