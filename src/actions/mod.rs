//! Action handlers and the run context they execute in.
//!
//! Each [`ActionKind`] is bound to one handler through [`resolve`], an
//! exhaustive match over unit structs, so the registry is closed at compile
//! time. Handlers never touch storage or the completion provider directly:
//! everything goes through [`RunContext`], which wraps each unit of work in a
//! named durable step and threads the chained working copy between actions.
//!
//! The five editorial actions (ToC, grammar, SEO, code blocks, rewrite) all
//! share one execution shape (guard against publish triggers, load fresh,
//! resolve the working copy, run one completion, persist-or-forward) and
//! implement [`EditorialAction`] instead of spelling that shape out five
//! times. Social generators and the two terminal actions implement
//! [`ActionHandler`] directly.

pub mod approval;
pub mod editorial;
pub mod social;

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::completions::{CompletionClient, CompletionOptions};
use crate::content::{ContentItem, ContentPatch, ContentStatus};
use crate::engine::EngineError;
use crate::events::{EventHub, WorkflowEvent};
use crate::notify::RunEvent;
use crate::registry::InputValues;
use crate::steps::StepLog;
use crate::store::ContentStore;
use crate::types::{ActionKind, EventName, RunStatus};
use crate::workflow::{ActionNode, CompiledWorkflow, WorkflowDefinition};

/// What the engine does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Proceed to the next action in declared order.
    Continue,
    /// Stop the run with the given terminal status (approval timeout).
    Halt(RunStatus),
}

/// One executable workflow action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, ctx: &mut RunContext<'_>) -> Result<Flow, EngineError>;
}

/// Handler for the current action kind. Exhaustive: every kind has exactly
/// one implementation.
pub fn resolve(kind: ActionKind) -> &'static dyn ActionHandler {
    match kind {
        ActionKind::AddToc => &editorial::AddToc,
        ActionKind::GrammarReview => &editorial::GrammarReview,
        ActionKind::SeoOptimization => &editorial::SeoOptimization,
        ActionKind::CodeBlockEnhancement => &editorial::CodeBlockEnhancement,
        ActionKind::AiRewrite => &editorial::AiRewrite,
        ActionKind::GenerateTweetPost => &social::GenerateTweetPost,
        ActionKind::GenerateLinkedinPost => &social::GenerateLinkedinPost,
        ActionKind::ApplyChanges => &approval::ApplyChanges,
        ActionKind::WaitForApproval => &approval::WaitForApproval,
    }
}

/// Separator between appended recommendation blocks.
pub const RECOMMENDATION_SEPARATOR: &str = "\n\n";

/// A prepared completion request.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub options: CompletionOptions,
}

impl Prompt {
    /// The system prompt all text-editing actions share.
    pub const EDITOR_SYSTEM: &'static str = "You are an AI that makes text editing changes.";

    pub fn editing(user: impl Into<String>) -> Self {
        Self {
            system: Self::EDITOR_SYSTEM.to_string(),
            user: user.into(),
            options: CompletionOptions::default(),
        }
    }

    pub fn with_system(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            options: CompletionOptions::default(),
        }
    }

    #[must_use]
    pub fn options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Engine-owned execution facade handlers operate through.
///
/// Owns the run's current event (which is replaced by intermediate-revision
/// events as non-final steps forward their output) and scopes every durable
/// step name by action position so repeated kinds never collide.
pub struct RunContext<'run> {
    run_id: &'run str,
    trigger: EventName,
    event: WorkflowEvent,
    workflow: &'run WorkflowDefinition,
    compiled: CompiledWorkflow<'run>,
    store: &'run dyn ContentStore,
    completions: &'run dyn CompletionClient,
    hub: &'run EventHub,
    steps: &'run StepLog,
    approval_timeout: Duration,
    notify: flume::Sender<RunEvent>,
    current: usize,
    current_kind: ActionKind,
    executed: Vec<ActionKind>,
    skipped: Vec<String>,
}

impl<'run> RunContext<'run> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        run_id: &'run str,
        event: WorkflowEvent,
        workflow: &'run WorkflowDefinition,
        store: &'run dyn ContentStore,
        completions: &'run dyn CompletionClient,
        hub: &'run EventHub,
        steps: &'run StepLog,
        approval_timeout: Duration,
        notify: flume::Sender<RunEvent>,
    ) -> Self {
        Self {
            run_id,
            trigger: event.name,
            event,
            workflow,
            compiled: workflow.compile(),
            store,
            completions,
            hub,
            steps,
            approval_timeout,
            notify,
            current: 0,
            current_kind: ActionKind::ApplyChanges,
            executed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        self.run_id
    }

    pub fn workflow(&self) -> &'run WorkflowDefinition {
        self.workflow
    }

    /// The id of the content item this run operates on.
    pub fn content_id(&self) -> &str {
        &self.event.data.id
    }

    /// Whether this run was started by a publish event. Review-oriented
    /// handlers skip themselves on publish-triggered runs.
    pub fn is_published_trigger(&self) -> bool {
        self.trigger == EventName::ContentPublished
    }

    /// The action currently executing.
    pub fn node(&self) -> &'run ActionNode {
        &self.workflow.actions[self.current]
    }

    /// Kind of the action currently executing.
    pub fn kind(&self) -> ActionKind {
        self.current_kind
    }

    /// Input values of the current action, with schema defaults applied.
    pub fn inputs(&self) -> InputValues<'run> {
        InputValues::resolve(self.node(), self.kind())
    }

    pub(crate) fn set_current(&mut self, index: usize, kind: ActionKind) {
        self.current = index;
        self.current_kind = kind;
    }

    pub(crate) fn record_executed(&mut self, kind: ActionKind) {
        self.executed.push(kind);
    }

    pub(crate) fn record_skipped(&mut self, kind: &str) {
        self.skipped.push(kind.to_string());
    }

    pub(crate) fn into_outcome(self) -> (Vec<ActionKind>, Vec<String>) {
        (self.executed, self.skipped)
    }

    /// Emit a run-progress notification.
    pub fn emit(&self, scope: &str, message: impl Into<String>) {
        let _ = self.notify.send(RunEvent::new(
            self.run_id,
            self.content_id(),
            scope,
            message,
        ));
    }

    fn step_name(&self, name: &str) -> String {
        format!("{:02}:{}:{}", self.current, self.node().kind, name)
    }

    /// Load the content item fresh, as a durable step. Every handler loads at
    /// its own start; steps are idempotent loads, not cached reads.
    pub async fn load_content(&self) -> Result<ContentItem, EngineError> {
        let store = self.store;
        let id = self.content_id().to_string();
        self.steps
            .run(&self.step_name("load-content"), async move {
                store.load_content(&id).await.map_err(EngineError::from)
            })
            .await
    }

    /// The text the current action should operate on: an in-flight
    /// intermediate revision forwarded by the preceding step, else the
    /// stored pending AI revision, else the canonical body.
    pub fn working_copy(&self, item: &ContentItem) -> String {
        if let Some(revision) = &self.event.data.revision {
            return revision.clone();
        }
        item.markdown_ai_revision
            .clone()
            .unwrap_or_else(|| item.markdown.clone())
    }

    /// Run a completion as a durable step.
    pub async fn complete(&self, step: &str, prompt: Prompt) -> Result<String, EngineError> {
        let completions = self.completions;
        self.steps
            .run(&self.step_name(step), async move {
                completions
                    .complete(&prompt.system, &prompt.user, &prompt.options)
                    .await
                    .map_err(EngineError::from)
            })
            .await
    }

    /// Apply a content patch as a durable step.
    pub async fn update_content(
        &self,
        step: &str,
        patch: ContentPatch,
    ) -> Result<(), EngineError> {
        let store = self.store;
        let id = self.content_id().to_string();
        self.steps
            .run(&self.step_name(step), async move {
                store
                    .update_content(&id, &patch)
                    .await
                    .map_err(EngineError::from)
            })
            .await
    }

    /// Persist the revision if the current action is the final step before
    /// approval/completion; otherwise forward it to the next action through
    /// an intermediate-revision event.
    pub async fn persist_or_forward(&mut self, revision: String) -> Result<(), EngineError> {
        let kind = self.kind();
        if self.compiled.is_final_step(&self.node().kind) {
            self.update_content(
                "save-ai-revision",
                ContentPatch::new()
                    .revision(revision)
                    // Stays processing until wait_for_approval flips it.
                    .status(ContentStatus::Processing),
            )
            .await?;
            self.emit("revision", format!("{kind} persisted pending revision"));
        } else {
            let event =
                WorkflowEvent::intermediate_revision(self.content_id(), revision, kind);
            self.hub.publish(event.clone());
            self.event = event;
            self.emit("revision", format!("{kind} forwarded intermediate revision"));
        }
        Ok(())
    }

    /// Append a recommendation block, never overwriting prior blocks.
    pub async fn append_recommendation(
        &self,
        item: &ContentItem,
        heading: &str,
        text: &str,
    ) -> Result<(), EngineError> {
        let addition = format!("{heading}\n{text}");
        let merged = match &item.ai_publishing_recommendations {
            Some(existing) => format!("{existing}{RECOMMENDATION_SEPARATOR}{addition}"),
            None => addition,
        };
        self.update_content(
            "save-ai-recommendations",
            ContentPatch::new().recommendations(merged),
        )
        .await
    }

    /// Promote the pending AI revision to canonical content: clears both
    /// staged fields and rests the item at draft.
    pub async fn promote_revision(
        &self,
        step: &str,
        item: &ContentItem,
    ) -> Result<(), EngineError> {
        let markdown = item
            .markdown_ai_revision
            .clone()
            .unwrap_or_else(|| item.markdown.clone());
        self.update_content(
            step,
            ContentPatch::new()
                .markdown(markdown)
                .clear_revision()
                .clear_recommendations()
                .status(ContentStatus::Draft),
        )
        .await
    }

    /// Subscribe for an approval event for this content id. The returned
    /// future resolves with the event, or `None` when the configured timeout
    /// elapses. The subscription is live before this returns, so callers can
    /// subscribe ahead of the status write that tells the outside world an
    /// approval is expected.
    pub fn approval_watch(
        &self,
    ) -> impl std::future::Future<Output = Option<WorkflowEvent>> + Send + 'static {
        self.hub.watch(
            EventName::ApproveSuggestions,
            self.content_id(),
            self.approval_timeout,
        )
    }
}

/// The shared shape of the five review-composing actions.
///
/// Implementors provide a step name and a prompt; [`run_editorial`] supplies
/// the publish-trigger guard, the fresh load, working-copy resolution, and
/// persist-or-forward. Handlers delegate their `execute` to it.
pub trait EditorialAction: Send + Sync {
    /// Durable step name for the transformation call.
    const STEP: &'static str;

    fn prompt(&self, item: &ContentItem, working_copy: &str, inputs: &InputValues<'_>) -> Prompt;
}

pub(crate) async fn run_editorial<T: EditorialAction>(
    action: &T,
    ctx: &mut RunContext<'_>,
) -> Result<Flow, EngineError> {
    // Review steps do not run for published posts.
    if ctx.is_published_trigger() {
        warn!(kind = %ctx.kind(), "skipping review action on publish trigger");
        ctx.emit("action", format!("{} skipped (publish trigger)", ctx.kind()));
        return Ok(Flow::Continue);
    }

    let item = ctx.load_content().await?;
    let working_copy = ctx.working_copy(&item);
    let prompt = action.prompt(&item, &working_copy, &ctx.inputs());
    let revision = ctx.complete(T::STEP, prompt).await?;
    ctx.persist_or_forward(revision).await?;
    Ok(Flow::Continue)
}
