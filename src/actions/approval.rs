//! Terminal actions: promoting the pending revision, with or without a human
//! gate in between.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{ActionHandler, Flow, RunContext};
use crate::content::{ContentPatch, ContentStatus};
use crate::engine::EngineError;
use crate::types::RunStatus;

/// Promote the pending AI revision immediately, no human in the loop.
pub struct ApplyChanges;

#[async_trait]
impl ActionHandler for ApplyChanges {
    async fn execute(&self, ctx: &mut RunContext<'_>) -> Result<Flow, EngineError> {
        if ctx.is_published_trigger() {
            warn!(kind = %ctx.kind(), "skipping review action on publish trigger");
            ctx.emit("action", "apply_changes skipped (publish trigger)");
            return Ok(Flow::Continue);
        }

        let item = ctx.load_content().await?;
        ctx.promote_revision("apply-ai-revision", &item).await?;
        ctx.emit("revision", "ai revision applied");
        Ok(Flow::Continue)
    }
}

/// Park the content at needs-approval and suspend the run until an approval
/// event for this content id arrives. On approval the revision staged before
/// the wait is promoted; on timeout the run ends and the item stays parked
/// with the revision intact for out-of-band approval.
pub struct WaitForApproval;

#[async_trait]
impl ActionHandler for WaitForApproval {
    async fn execute(&self, ctx: &mut RunContext<'_>) -> Result<Flow, EngineError> {
        if ctx.is_published_trigger() {
            warn!(kind = %ctx.kind(), "skipping review action on publish trigger");
            ctx.emit("action", "wait_for_approval skipped (publish trigger)");
            return Ok(Flow::Continue);
        }

        let item = ctx.load_content().await?;

        // Subscribe before the status write, so an approval sent as soon as
        // the item shows needs-approval cannot slip past the wait.
        let approval = ctx.approval_watch();

        ctx.update_content(
            "update-content-status",
            ContentPatch::new().status(ContentStatus::NeedsApproval),
        )
        .await?;
        ctx.emit("suspend", "awaiting approval");

        match approval.await {
            Some(_) => {
                info!(content_id = %ctx.content_id(), "approval received, promoting revision");
                ctx.promote_revision("apply-ai-revision", &item).await?;
                ctx.emit("revision", "approved revision applied");
                Ok(Flow::Continue)
            }
            None => {
                // The item stays at needs-approval with the revision staged;
                // Engine::approve handles it after the run is gone.
                info!(content_id = %ctx.content_id(), "approval window elapsed");
                ctx.emit("suspend", "approval window elapsed");
                Ok(Flow::Halt(RunStatus::TimedOut))
            }
        }
    }
}
