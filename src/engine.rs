//! Run orchestration: event routing, workflow resolution, the action loop,
//! and the standing cancellation watch.
//!
//! [`Engine::handle`] is the single entry point for events. Trigger events
//! (`content.updated`, `content.published`) start a run; coordination events
//! (approve, reject, intermediate revisions) are published to the hub where
//! suspended runs pick them up. A run walks the workflow's actions in declared
//! order while racing a rejection watch: the first `content.reject-suggestions`
//! for the same content id cancels the run, clears the pending revision, and
//! resets the item to draft.
//!
//! The CMS-facing operations (`approve`, `reject`, `send_to_review`,
//! `publish`) live here too, so an HTTP layer stays a thin delegate.

use std::sync::Arc;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::actions::{self, Flow, RunContext};
use crate::completions::{CompletionClient, CompletionError};
use crate::content::{ContentPatch, ContentStatus};
use crate::events::{EventHub, WorkflowEvent};
use crate::notify::{NotificationBus, RunEvent};
use crate::steps::{StepError, StepLog};
use crate::store::{ContentStore, StoreError};
use crate::types::{ActionKind, EventName, RunStatus};

/// Errors surfaced by a workflow run or a CMS operation.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("storage failure: {0}")]
    #[diagnostic(code(copydesk::engine::store))]
    Store(#[from] StoreError),

    #[error("completion failure: {0}")]
    #[diagnostic(
        code(copydesk::engine::completion),
        help("The run can be retried; recorded steps replay without re-calling the provider.")
    )]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Step(#[from] StepError),

    #[error("event {name} does not start a workflow run")]
    #[diagnostic(
        code(copydesk::engine::not_a_trigger),
        help("Only content.updated and content.published start runs; route other events through Engine::handle.")
    )]
    NotATrigger { name: EventName },
}

/// Tunable run timing, resolved from the environment or defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long `wait_for_approval` suspends before giving up.
    pub approval_timeout: Duration,
    /// How long the rejection watch stays armed for a running workflow.
    pub rejection_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            approval_timeout: Duration::from_secs(10 * 60),
            rejection_window: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl EngineConfig {
    /// Resolve from the environment, loading `.env` first if present.
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Some(timeout) = read_secs("COPYDESK_APPROVAL_TIMEOUT_SECS") {
            config.approval_timeout = timeout;
        }
        if let Some(window) = read_secs("COPYDESK_REJECTION_WINDOW_SECS") {
            config.rejection_window = window;
        }
        config
    }
}

fn read_secs(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            warn!(var, raw = %raw, "ignoring unparsable duration override");
            None
        }
    }
}

/// Outcome of one workflow run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub status: RunStatus,
    /// Kinds that executed, in order. Includes actions that no-oped their
    /// publish-trigger guard.
    pub executed: Vec<ActionKind>,
    /// Raw kind strings that could not be resolved to a handler.
    pub skipped: Vec<String>,
}

impl RunReport {
    fn noop(run_id: String) -> Self {
        Self {
            run_id,
            status: RunStatus::Completed,
            executed: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// The workflow execution engine.
///
/// Cheap to share behind an `Arc`; runs borrow the store and completion
/// provider for their duration.
pub struct Engine {
    store: Arc<dyn ContentStore>,
    completions: Arc<dyn CompletionClient>,
    hub: EventHub,
    notifications: Arc<NotificationBus>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(store: Arc<dyn ContentStore>, completions: Arc<dyn CompletionClient>) -> Self {
        Self {
            store,
            completions,
            hub: EventHub::default(),
            notifications: Arc::new(NotificationBus::default()),
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_notifications(mut self, bus: Arc<NotificationBus>) -> Self {
        self.notifications = bus;
        self
    }

    /// The event hub runs wait on. Embedders publish approval/rejection here
    /// (or through [`Engine::handle`]).
    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub fn notifications(&self) -> &NotificationBus {
        &self.notifications
    }

    /// Route an event: triggers start a run, everything else is broadcast to
    /// in-flight runs.
    pub async fn handle(&self, event: WorkflowEvent) -> Result<Option<RunReport>, EngineError> {
        if event.name.is_trigger() {
            self.run(event).await.map(Some)
        } else {
            self.hub.publish(event);
            Ok(None)
        }
    }

    /// Execute the workflow bound to a trigger event, to a terminal status.
    ///
    /// The workflow comes from the event's inline definition when present
    /// (disabled inline definitions no-op), otherwise from the store by
    /// trigger name. A run with no workflow or no actions completes
    /// immediately.
    ///
    /// Runs are not mutually exclusive per content id: a second trigger for
    /// the same item starts a concurrent run, and content writes resolve
    /// last-write-wins through the persistence contract.
    #[instrument(skip_all, fields(event = %event.name, content_id = %event.data.id, run_id = tracing::field::Empty))]
    pub async fn run(&self, mut event: WorkflowEvent) -> Result<RunReport, EngineError> {
        if !event.name.is_trigger() {
            return Err(EngineError::NotATrigger { name: event.name });
        }
        self.notifications.listen();

        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        let content_id = event.data.id.clone();

        let workflow = match event.data.workflow.take() {
            Some(inline) if inline.enabled => Some(inline),
            Some(inline) => {
                info!(workflow_id = %inline.id, "inline workflow disabled");
                None
            }
            None => self.store.load_workflow(event.name).await?,
        };
        let workflow = match workflow {
            Some(workflow) if !workflow.actions.is_empty() => workflow,
            Some(_) | None => {
                info!("no enabled workflow with actions for trigger");
                self.emit(&run_id, &content_id, "terminal", "no workflow configured");
                return Ok(RunReport::noop(run_id));
            }
        };

        self.emit(
            &run_id,
            &content_id,
            "run",
            format!("workflow {} started", workflow.id),
        );

        let steps = StepLog::new(&run_id);
        let mut ctx = RunContext::new(
            &run_id,
            event,
            &workflow,
            &*self.store,
            &*self.completions,
            &self.hub,
            &steps,
            self.config.approval_timeout,
            self.notifications.sender(),
        );

        let status = tokio::select! {
            status = Self::execute_actions(&mut ctx) => status?,
            _ = self.rejection_watch(&content_id) => {
                warn!("rejection received, cancelling run");
                self.store
                    .update_content(
                        &content_id,
                        &ContentPatch::new()
                            .clear_revision()
                            .status(ContentStatus::Draft),
                    )
                    .await?;
                RunStatus::Cancelled
            }
        };

        let (executed, skipped) = ctx.into_outcome();
        self.emit(&run_id, &content_id, "terminal", format!("run {status}"));
        info!(
            %status,
            executed = executed.len(),
            skipped = skipped.len(),
            "run finished"
        );
        Ok(RunReport {
            run_id,
            status,
            executed,
            skipped,
        })
    }

    /// Walk the actions in declared order. Edges only matter for final-step
    /// detection inside handlers, never for ordering.
    async fn execute_actions(ctx: &mut RunContext<'_>) -> Result<RunStatus, EngineError> {
        let workflow = ctx.workflow();
        for (index, node) in workflow.actions.iter().enumerate() {
            let Some(kind) = node.action_kind() else {
                warn!(kind = %node.kind, "unknown action kind, skipping");
                ctx.emit("action", format!("{} skipped (unknown kind)", node.kind));
                ctx.record_skipped(&node.kind);
                continue;
            };
            ctx.set_current(index, kind);
            ctx.emit("action", format!("{kind} started"));
            match actions::resolve(kind).execute(ctx).await? {
                Flow::Continue => ctx.record_executed(kind),
                Flow::Halt(status) => {
                    ctx.record_executed(kind);
                    return Ok(status);
                }
            }
        }
        Ok(RunStatus::Completed)
    }

    /// Resolves when a rejection for `content_id` arrives within the window;
    /// never resolves otherwise, so the main execution path wins the race.
    async fn rejection_watch(&self, content_id: &str) -> WorkflowEvent {
        match self
            .hub
            .wait_for(
                EventName::RejectSuggestions,
                content_id,
                self.config.rejection_window,
            )
            .await
        {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }

    fn emit(&self, run_id: &str, content_id: &str, scope: &str, message: impl Into<String>) {
        let _ = self
            .notifications
            .sender()
            .send(RunEvent::new(run_id, content_id, scope, message));
    }

    /// Approve staged suggestions: promote the pending revision if one exists,
    /// then publish the approval event so a suspended run resumes.
    #[instrument(skip(self))]
    pub async fn approve(&self, content_id: &str) -> Result<(), EngineError> {
        let item = self.store.load_content(content_id).await?;
        if let Some(revision) = item.markdown_ai_revision {
            self.store
                .update_content(
                    content_id,
                    &ContentPatch::new()
                        .markdown(revision)
                        .clear_revision()
                        .clear_recommendations()
                        .status(ContentStatus::Draft),
                )
                .await?;
        }
        self.hub.publish(WorkflowEvent::approve(content_id));
        Ok(())
    }

    /// Reject staged suggestions: discard the pending revision, reset to
    /// draft, and publish the rejection so an in-flight run cancels.
    #[instrument(skip(self))]
    pub async fn reject(&self, content_id: &str) -> Result<(), EngineError> {
        self.store
            .update_content(
                content_id,
                &ContentPatch::new()
                    .clear_revision()
                    .status(ContentStatus::Draft),
            )
            .await?;
        self.hub.publish(WorkflowEvent::reject(content_id));
        Ok(())
    }

    /// Stage new markdown (if provided), mark the item processing, and return
    /// the trigger event to feed to [`Engine::handle`].
    #[instrument(skip(self, markdown))]
    pub async fn send_to_review(
        &self,
        content_id: &str,
        markdown: Option<String>,
    ) -> Result<WorkflowEvent, EngineError> {
        let mut patch = ContentPatch::new()
            .clear_revision()
            .status(ContentStatus::Processing);
        if let Some(markdown) = markdown {
            patch = patch.markdown(markdown);
        }
        self.store.update_content(content_id, &patch).await?;
        Ok(WorkflowEvent::updated(content_id))
    }

    /// Mark the item published and return the publish trigger event.
    #[instrument(skip(self))]
    pub async fn publish(&self, content_id: &str) -> Result<WorkflowEvent, EngineError> {
        let mut item = self.store.load_content(content_id).await?;
        item.status = ContentStatus::Published;
        item.published_at = Some(chrono::Utc::now());
        self.store.save_content(&item).await?;
        Ok(WorkflowEvent::published(content_id))
    }
}
