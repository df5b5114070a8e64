//! Core identifier types for the copydesk workflow engine.
//!
//! This module defines the closed vocabulary the rest of the crate dispatches
//! on: the fixed catalogue of action kinds, the trigger/lifecycle event names,
//! and the terminal status of a run.
//!
//! Stored workflow documents refer to actions by their stable string key
//! (`"grammar_review"`, `"wait_for_approval"`, ...). [`ActionKind::parse`]
//! turns those keys back into the enum; unknown keys yield `None` so that a
//! hand-edited document degrades to a skipped action instead of a crash.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of action kinds the engine knows how to execute.
///
/// Each kind is bound to exactly one handler implementation through
/// [`crate::actions::resolve`]; the mapping is an exhaustive `match`, never a
/// dynamic lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Insert an AI-generated table of contents under the title.
    AddToc,
    /// Grammar and style pass over the working copy.
    GrammarReview,
    /// Search-engine optimization pass.
    SeoOptimization,
    /// Improve code examples embedded in the content.
    CodeBlockEnhancement,
    /// Full rewrite with configurable style, tone, and intensity.
    AiRewrite,
    /// Generate tweet variants promoting the content (appends to
    /// recommendations, never replaces them).
    GenerateTweetPost,
    /// Generate LinkedIn post variants (appends to recommendations).
    GenerateLinkedinPost,
    /// Terminal: promote the pending AI revision without approval.
    ApplyChanges,
    /// Terminal: suspend until an approval event arrives or the timeout fires.
    WaitForApproval,
}

impl ActionKind {
    /// All kinds, in catalogue order. Used by the registry to enumerate
    /// descriptors for editors.
    pub const ALL: [ActionKind; 9] = [
        ActionKind::AddToc,
        ActionKind::GrammarReview,
        ActionKind::WaitForApproval,
        ActionKind::ApplyChanges,
        ActionKind::GenerateLinkedinPost,
        ActionKind::GenerateTweetPost,
        ActionKind::SeoOptimization,
        ActionKind::CodeBlockEnhancement,
        ActionKind::AiRewrite,
    ];

    /// Kinds a workflow must end with for the editor to consider it valid.
    pub const REQUIRED_END_KINDS: [ActionKind; 2] =
        [ActionKind::ApplyChanges, ActionKind::WaitForApproval];

    /// Stable string key used in stored workflow documents and edges.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::AddToc => "add_toc",
            ActionKind::GrammarReview => "grammar_review",
            ActionKind::SeoOptimization => "seo_optimization",
            ActionKind::CodeBlockEnhancement => "code_block_enhancement",
            ActionKind::AiRewrite => "ai_rewrite",
            ActionKind::GenerateTweetPost => "generate_tweet_post",
            ActionKind::GenerateLinkedinPost => "generate_linkedin_post",
            ActionKind::ApplyChanges => "apply_changes",
            ActionKind::WaitForApproval => "wait_for_approval",
        }
    }

    /// Parse a stored string key. Returns `None` for unknown keys so callers
    /// can skip unresolvable actions instead of failing the run.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named lifecycle events the engine consumes or emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    /// Content was sent to review; starts a workflow run.
    #[serde(rename = "content.updated")]
    ContentUpdated,
    /// Content was published; starts a (post-publish) workflow run.
    #[serde(rename = "content.published")]
    ContentPublished,
    /// A human approved the pending AI revision.
    #[serde(rename = "content.approve-suggestions")]
    ApproveSuggestions,
    /// A human rejected the pending AI revision; cancels the run.
    #[serde(rename = "content.reject-suggestions")]
    RejectSuggestions,
    /// Internal only: a non-final step forwarding its revision to the next.
    #[serde(rename = "content.intermediate-revision")]
    IntermediateRevision,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::ContentUpdated => "content.updated",
            EventName::ContentPublished => "content.published",
            EventName::ApproveSuggestions => "content.approve-suggestions",
            EventName::RejectSuggestions => "content.reject-suggestions",
            EventName::IntermediateRevision => "content.intermediate-revision",
        }
    }

    /// Whether this event can start a workflow run.
    pub fn is_trigger(&self) -> bool {
        matches!(
            self,
            EventName::ContentUpdated | EventName::ContentPublished
        )
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// All actions executed (including configuration no-ops).
    Completed,
    /// A rejection event cancelled the run.
    Cancelled,
    /// The approval wait elapsed without an approval event.
    TimedOut,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
