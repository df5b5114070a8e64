//! Lifecycle events and the hub that delivers them to in-flight runs.
//!
//! External callers publish [`WorkflowEvent`]s (save-for-review, publish,
//! approve, reject). Suspended runs wait on the hub for a correlated event;
//! every run also keeps a standing subscription for rejection, which races the
//! main execution path. Delivery is fan-out: every subscriber observes every
//! event, and correlation is by content id.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::types::{ActionKind, EventName};
use crate::workflow::WorkflowDefinition;

/// An event flowing through the system, named and carrying its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub name: EventName,
    pub data: EventData,
}

/// Payload shared by all event variants.
///
/// `revision`/`originating_step` are only populated on internal
/// intermediate-revision events; `workflow` optionally carries an inline
/// definition on `content.updated` (used by previews that bypass storage).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    /// Content item id; the correlation key for waits and cancellation.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originating_step: Option<ActionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowDefinition>,
}

impl WorkflowEvent {
    pub fn new(name: EventName, id: impl Into<String>) -> Self {
        Self {
            name,
            data: EventData {
                id: id.into(),
                ..EventData::default()
            },
        }
    }

    pub fn updated(id: impl Into<String>) -> Self {
        Self::new(EventName::ContentUpdated, id)
    }

    pub fn published(id: impl Into<String>) -> Self {
        Self::new(EventName::ContentPublished, id)
    }

    pub fn approve(id: impl Into<String>) -> Self {
        Self::new(EventName::ApproveSuggestions, id)
    }

    pub fn reject(id: impl Into<String>) -> Self {
        Self::new(EventName::RejectSuggestions, id)
    }

    /// Internal forwarding event produced by a non-final step.
    pub fn intermediate_revision(
        id: impl Into<String>,
        revision: impl Into<String>,
        originating_step: ActionKind,
    ) -> Self {
        Self {
            name: EventName::IntermediateRevision,
            data: EventData {
                id: id.into(),
                revision: Some(revision.into()),
                originating_step: Some(originating_step),
                workflow: None,
            },
        }
    }

    /// Attach an inline workflow definition (`content.updated` only).
    #[must_use]
    pub fn with_workflow(mut self, workflow: WorkflowDefinition) -> Self {
        self.data.workflow = Some(workflow);
        self
    }
}

/// Fan-out delivery of workflow events to concurrent waiters.
///
/// Cloning the hub shares the underlying channel; each [`wait_for`] call takes
/// its own subscription so several suspended runs can observe the same event.
///
/// [`wait_for`]: EventHub::wait_for
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl EventHub {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all current subscribers. Events published with no
    /// subscriber are dropped, matching fire-and-forget send semantics.
    pub fn publish(&self, event: WorkflowEvent) {
        trace!(event = %event.name, id = %event.data.id, "publishing event");
        let _ = self.sender.send(event);
    }

    /// Subscribe to the raw event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Subscribe now and return a future that resolves once an event with the
    /// given name arrives for `content_id`, or `None` when the timeout
    /// elapses. The subscription is live before this returns, so an event
    /// published between the call and the await is still observed.
    ///
    /// Lagged subscribers resubscribe-in-place: missed events are skipped, not
    /// errors, since only the matching event matters to the waiter.
    pub fn watch(
        &self,
        name: EventName,
        content_id: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Option<WorkflowEvent>> + Send + 'static {
        let mut rx = self.subscribe();
        let content_id = content_id.to_string();
        async move {
            let wait = async {
                loop {
                    match rx.recv().await {
                        Ok(event) if event.name == name && event.data.id == content_id => {
                            return Some(event);
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            };
            tokio::time::timeout(timeout, wait).await.ok().flatten()
        }
    }

    /// Wait until an event with the given name arrives for `content_id`, or
    /// the timeout elapses (`None`).
    pub async fn wait_for(
        &self,
        name: EventName,
        content_id: &str,
        timeout: Duration,
    ) -> Option<WorkflowEvent> {
        self.watch(name, content_id, timeout).await
    }
}
