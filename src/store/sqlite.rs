/*!
SQLite-backed content store.

Durable implementation of the [`ContentStore`] contract over `sqlx`. The
workflow document (actions + edges) is stored as a JSON column; content rows
map one column per field.

## Behavior

- Schema is bootstrapped on connect (`CREATE TABLE IF NOT EXISTS ...`), so a
  fresh database file is usable immediately.
- `update_content` performs a read-modify-write inside a transaction: the
  patch is merged in memory and all mutable columns written back. This is
  deliberately last-write-wins; the persistence contract has no optimistic
  locking.
- The trigger column is named `trigger_event` because `trigger` is reserved
  in SQLite.
*/

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use super::{ContentStore, Result, StoreError};
use crate::content::{ContentItem, ContentPatch, ContentStatus};
use crate::types::EventName;
use crate::workflow::{ActionNode, Edge, WorkflowDefinition};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS workflows (
    id            TEXT PRIMARY KEY,
    trigger_event TEXT NOT NULL,
    enabled       INTEGER NOT NULL DEFAULT 1,
    document      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS content_items (
    id                            TEXT PRIMARY KEY,
    title                         TEXT NOT NULL,
    subtitle                      TEXT,
    markdown                      TEXT NOT NULL,
    markdown_ai_revision          TEXT,
    ai_publishing_recommendations TEXT,
    status                        TEXT NOT NULL,
    created_at                    TEXT NOT NULL,
    published_at                  TEXT
);
"#;

/// JSON shape of the `workflows.document` column.
#[derive(serde::Serialize, serde::Deserialize)]
struct WorkflowDocument {
    actions: Vec<ActionNode>,
    edges: Vec<Edge>,
}

/// Content store persisted in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to (and if needed create) the database at `path`, running the
    /// schema bootstrap.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool (the schema must already exist).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_content(row: &SqliteRow) -> Result<ContentItem> {
        let status_raw: String = row.try_get("status")?;
        let status = ContentStatus::parse(&status_raw).ok_or_else(|| {
            StoreError::Serde(serde::de::Error::custom(format!(
                "unknown content status {status_raw:?}"
            )))
        })?;
        Ok(ContentItem {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            subtitle: row.try_get("subtitle")?,
            markdown: row.try_get("markdown")?,
            markdown_ai_revision: row.try_get("markdown_ai_revision")?,
            ai_publishing_recommendations: row.try_get("ai_publishing_recommendations")?,
            status,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            published_at: row.try_get::<Option<DateTime<Utc>>, _>("published_at")?,
        })
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    #[instrument(skip(self))]
    async fn load_workflow(&self, trigger: EventName) -> Result<Option<WorkflowDefinition>> {
        let row = sqlx::query(
            "SELECT id, trigger_event, document FROM workflows \
             WHERE trigger_event = ?1 AND enabled = 1 LIMIT 1",
        )
        .bind(trigger.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let document: WorkflowDocument = serde_json::from_str(&row.try_get::<String, _>("document")?)?;
        Ok(Some(WorkflowDefinition {
            id: row.try_get("id")?,
            trigger,
            enabled: true,
            actions: document.actions,
            edges: document.edges,
        }))
    }

    #[instrument(skip_all, fields(workflow_id = %definition.id))]
    async fn save_workflow(&self, definition: &WorkflowDefinition) -> Result<()> {
        let document = serde_json::to_string(&WorkflowDocument {
            actions: definition.actions.clone(),
            edges: definition.edges.clone(),
        })?;
        sqlx::query(
            "INSERT INTO workflows (id, trigger_event, enabled, document) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET \
                 trigger_event = excluded.trigger_event, \
                 enabled = excluded.enabled, \
                 document = excluded.document",
        )
        .bind(&definition.id)
        .bind(definition.trigger.as_str())
        .bind(definition.enabled)
        .bind(document)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_content(&self, id: &str) -> Result<ContentItem> {
        let row = sqlx::query("SELECT * FROM content_items WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::ContentNotFound { id: id.to_string() })?;
        Self::row_to_content(&row)
    }

    #[instrument(skip_all, fields(content_id = %item.id))]
    async fn save_content(&self, item: &ContentItem) -> Result<()> {
        sqlx::query(
            "INSERT INTO content_items \
                 (id, title, subtitle, markdown, markdown_ai_revision, \
                  ai_publishing_recommendations, status, created_at, published_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(id) DO UPDATE SET \
                 title = excluded.title, \
                 subtitle = excluded.subtitle, \
                 markdown = excluded.markdown, \
                 markdown_ai_revision = excluded.markdown_ai_revision, \
                 ai_publishing_recommendations = excluded.ai_publishing_recommendations, \
                 status = excluded.status, \
                 created_at = excluded.created_at, \
                 published_at = excluded.published_at",
        )
        .bind(&item.id)
        .bind(&item.title)
        .bind(&item.subtitle)
        .bind(&item.markdown)
        .bind(&item.markdown_ai_revision)
        .bind(&item.ai_publishing_recommendations)
        .bind(item.status.as_str())
        .bind(item.created_at)
        .bind(item.published_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(content_id = id))]
    async fn update_content(&self, id: &str, patch: &ContentPatch) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM content_items WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::ContentNotFound { id: id.to_string() })?;
        let mut item = Self::row_to_content(&row)?;
        patch.apply_to(&mut item);

        sqlx::query(
            "UPDATE content_items SET \
                 markdown = ?2, \
                 markdown_ai_revision = ?3, \
                 ai_publishing_recommendations = ?4, \
                 status = ?5 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(&item.markdown)
        .bind(&item.markdown_ai_revision)
        .bind(&item.ai_publishing_recommendations)
        .bind(item.status.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
