//! Durable store behavior against a real SQLite file.
#![cfg(feature = "sqlite")]

use copydesk::content::{ContentItem, ContentPatch, ContentStatus};
use copydesk::store::sqlite::SqliteStore;
use copydesk::store::{ContentStore, StoreError};
use copydesk::types::{ActionKind, EventName};
use copydesk::workflow::WorkflowDefinition;

async fn store_in(dir: &tempfile::TempDir) -> SqliteStore {
    let path = dir.path().join("copydesk.db");
    SqliteStore::connect(path.to_str().unwrap()).await.unwrap()
}

#[tokio::test]
async fn workflow_roundtrip_preserves_actions_and_edges() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir).await;

    let def = WorkflowDefinition::linear(
        "wf-1",
        EventName::ContentUpdated,
        &[ActionKind::GrammarReview, ActionKind::WaitForApproval],
    );
    store.save_workflow(&def).await.unwrap();

    let loaded = store
        .load_workflow(EventName::ContentUpdated)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.id, "wf-1");
    assert_eq!(loaded.actions, def.actions);
    assert_eq!(loaded.edges, def.edges);
}

#[tokio::test]
async fn disabled_workflows_are_filtered() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir).await;

    let mut def = WorkflowDefinition::linear(
        "wf-1",
        EventName::ContentUpdated,
        &[ActionKind::GrammarReview],
    );
    def.enabled = false;
    store.save_workflow(&def).await.unwrap();

    assert!(store
        .load_workflow(EventName::ContentUpdated)
        .await
        .unwrap()
        .is_none());

    // Upsert with enabled flips visibility.
    def.enabled = true;
    store.save_workflow(&def).await.unwrap();
    assert!(store
        .load_workflow(EventName::ContentUpdated)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn content_roundtrip_and_partial_update() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir).await;

    let mut item = ContentItem::draft("7", "Title", "body");
    item.subtitle = Some("Sub".into());
    store.save_content(&item).await.unwrap();

    store
        .update_content(
            "7",
            &ContentPatch::new()
                .revision("staged")
                .status(ContentStatus::NeedsApproval),
        )
        .await
        .unwrap();

    let loaded = store.load_content("7").await.unwrap();
    assert_eq!(loaded.subtitle.as_deref(), Some("Sub"));
    assert_eq!(loaded.markdown, "body");
    assert_eq!(loaded.markdown_ai_revision.as_deref(), Some("staged"));
    assert_eq!(loaded.status, ContentStatus::NeedsApproval);

    // Clear is a real null write, not a keep.
    store
        .update_content(
            "7",
            &ContentPatch::new()
                .clear_revision()
                .status(ContentStatus::Draft),
        )
        .await
        .unwrap();
    let loaded = store.load_content("7").await.unwrap();
    assert_eq!(loaded.markdown_ai_revision, None);
    assert_eq!(loaded.status, ContentStatus::Draft);
}

#[tokio::test]
async fn missing_content_surfaces_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir).await;

    let err = store.load_content("nope").await.unwrap_err();
    assert!(matches!(err, StoreError::ContentNotFound { .. }));

    let err = store
        .update_content("nope", &ContentPatch::new().status(ContentStatus::Draft))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ContentNotFound { .. }));
}

#[tokio::test]
async fn reconnect_sees_persisted_rows() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = store_in(&dir).await;
        store
            .save_content(&ContentItem::draft("7", "Title", "body"))
            .await
            .unwrap();
    }
    let store = store_in(&dir).await;
    let item = store.load_content("7").await.unwrap();
    assert_eq!(item.markdown, "body");
}
