//! Shared fixtures for engine integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use copydesk::completions::{CompletionClient, CompletionOptions, Result as CompletionResult};
use copydesk::content::ContentItem;
use copydesk::engine::{Engine, EngineConfig};
use copydesk::store::{ContentStore, MemoryStore};

/// One recorded completion call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub options: CompletionOptions,
}

/// Completion double that replays scripted outputs in order and records every
/// call. When gated, calls block until [`ScriptedCompletions::open_gate`] (or
/// forever, for cancellation tests).
#[derive(Default)]
pub struct ScriptedCompletions {
    outputs: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<RecordedCall>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedCompletions {
    pub fn with_outputs(outputs: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(outputs.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        })
    }

    /// Block every completion call on a gate. Cancellation tests never open
    /// it; the blocked call is simply dropped when the run is cancelled.
    pub fn gated(self: &Arc<Self>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletions {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> CompletionResult<String> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.calls.lock().unwrap().push(RecordedCall {
            system: system_prompt.to_string(),
            user: user_prompt.to_string(),
            options: options.clone(),
        });
        let next = self.outputs.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| "scripted output".to_string()))
    }
}

/// Engine over a fresh in-memory store and scripted completions, with fast
/// timeouts so suspensions resolve quickly under test.
pub fn test_engine(completions: Arc<ScriptedCompletions>) -> (Engine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(store.clone(), completions).with_config(EngineConfig {
        approval_timeout: Duration::from_millis(200),
        rejection_window: Duration::from_secs(60),
    });
    (engine, store)
}

/// Seed one draft content item.
pub async fn seed_content(store: &MemoryStore, id: &str, markdown: &str) -> ContentItem {
    let item = ContentItem::draft(id, "Test Title", markdown);
    store.save_content(&item).await.unwrap();
    item
}

/// Poll the store until `predicate` holds for the item, panicking after two
/// seconds.
pub async fn wait_for_content<F>(store: &MemoryStore, id: &str, predicate: F) -> ContentItem
where
    F: Fn(&ContentItem) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let item = store.load_content(id).await.unwrap();
        if predicate(&item) {
            return item;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not reached for content {id}: {item:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
