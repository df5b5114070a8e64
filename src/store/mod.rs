//! Persistence adapter: the narrow read/write contract between the engine
//! and storage.
//!
//! The engine touches storage through exactly three operations: load the
//! enabled workflow definition for a trigger, load a content item, and apply
//! a partial update to a content item. Updates are field merges with
//! last-write-wins semantics; there is no optimistic locking.
//!
//! [`MemoryStore`] is the volatile implementation used in tests and
//! single-process deployments. A durable SQLite implementation lives in
//! [`sqlite`] behind the `sqlite` feature.

#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::content::{ContentItem, ContentPatch};
use crate::types::EventName;
use crate::workflow::WorkflowDefinition;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by persistence adapters.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("content item not found: {id}")]
    #[diagnostic(code(copydesk::store::content_not_found))]
    ContentNotFound { id: String },

    #[error("serialization error: {0}")]
    #[diagnostic(code(copydesk::store::serde))]
    Serde(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    #[diagnostic(
        code(copydesk::store::sqlx),
        help("Ensure the SQLite database path is valid and writable.")
    )]
    Sqlx(#[from] sqlx::Error),
}

/// Read/write contract the engine executes its durable steps against.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// The enabled workflow definition for a trigger, if any.
    async fn load_workflow(&self, trigger: EventName) -> Result<Option<WorkflowDefinition>>;

    /// Persist (insert or replace) a workflow definition.
    async fn save_workflow(&self, definition: &WorkflowDefinition) -> Result<()>;

    async fn load_content(&self, id: &str) -> Result<ContentItem>;

    /// Insert or replace a content item wholesale.
    async fn save_content(&self, item: &ContentItem) -> Result<()>;

    /// Merge a partial update into a content item, last-write-wins.
    async fn update_content(&self, id: &str, patch: &ContentPatch) -> Result<()>;
}

/// In-memory store over shared maps. Cloning shares the underlying data.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: std::sync::Arc<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    workflows: RwLock<Vec<WorkflowDefinition>>,
    content: RwLock<FxHashMap<String, ContentItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn load_workflow(&self, trigger: EventName) -> Result<Option<WorkflowDefinition>> {
        let workflows = self.inner.workflows.read().await;
        Ok(workflows
            .iter()
            .find(|wf| wf.enabled && wf.trigger == trigger)
            .cloned())
    }

    async fn save_workflow(&self, definition: &WorkflowDefinition) -> Result<()> {
        let mut workflows = self.inner.workflows.write().await;
        if let Some(existing) = workflows.iter_mut().find(|wf| wf.id == definition.id) {
            *existing = definition.clone();
        } else {
            workflows.push(definition.clone());
        }
        Ok(())
    }

    async fn load_content(&self, id: &str) -> Result<ContentItem> {
        let content = self.inner.content.read().await;
        content
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::ContentNotFound { id: id.to_string() })
    }

    async fn save_content(&self, item: &ContentItem) -> Result<()> {
        let mut content = self.inner.content.write().await;
        content.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn update_content(&self, id: &str, patch: &ContentPatch) -> Result<()> {
        let mut content = self.inner.content.write().await;
        let item = content
            .get_mut(id)
            .ok_or_else(|| StoreError::ContentNotFound { id: id.to_string() })?;
        patch.apply_to(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentStatus;
    use crate::types::ActionKind;

    #[tokio::test]
    async fn disabled_workflows_are_not_loaded() {
        let store = MemoryStore::new();
        let mut wf = WorkflowDefinition::linear(
            "wf",
            EventName::ContentUpdated,
            &[ActionKind::GrammarReview],
        );
        wf.enabled = false;
        store.save_workflow(&wf).await.unwrap();

        assert!(store
            .load_workflow(EventName::ContentUpdated)
            .await
            .unwrap()
            .is_none());

        wf.enabled = true;
        store.save_workflow(&wf).await.unwrap();
        assert!(store
            .load_workflow(EventName::ContentUpdated)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn trigger_filter_applies() {
        let store = MemoryStore::new();
        store
            .save_workflow(&WorkflowDefinition::linear(
                "wf",
                EventName::ContentPublished,
                &[ActionKind::GenerateTweetPost],
            ))
            .await
            .unwrap();

        assert!(store
            .load_workflow(EventName::ContentUpdated)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .load_workflow(EventName::ContentPublished)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryStore::new();
        store
            .save_content(&ContentItem::draft("1", "T", "body"))
            .await
            .unwrap();

        store
            .update_content(
                "1",
                &ContentPatch::new()
                    .revision("staged")
                    .status(ContentStatus::Processing),
            )
            .await
            .unwrap();

        let item = store.load_content("1").await.unwrap();
        assert_eq!(item.markdown, "body");
        assert_eq!(item.markdown_ai_revision.as_deref(), Some("staged"));
        assert_eq!(item.status, ContentStatus::Processing);
    }

    #[tokio::test]
    async fn missing_content_errors() {
        let store = MemoryStore::new();
        let err = store.load_content("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::ContentNotFound { .. }));
    }
}
