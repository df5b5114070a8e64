//! Content items: the mutable target of every workflow run.
//!
//! A [`ContentItem`] carries three text fields with distinct roles:
//! - `markdown`: the canonical body,
//! - `markdown_ai_revision`: a staged AI edit awaiting approval or auto-apply,
//! - `ai_publishing_recommendations`: append-only promotional suggestions.
//!
//! Workflow handlers never write these fields directly; they go through the
//! engine's durable steps, which apply a [`ContentPatch`] via the persistence
//! adapter. Patches are partial merges with last-write-wins semantics; there
//! is no optimistic locking on content rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Editorial lifecycle status of a content item.
///
/// Transitions are driven only by user actions (save-for-review, publish,
/// approve, reject) and workflow steps (intermediate processing, the
/// pre-approval write, the post-approval commit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    UnderReview,
    Processing,
    NeedsApproval,
    Published,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::UnderReview => "under_review",
            ContentStatus::Processing => "processing",
            ContentStatus::NeedsApproval => "needs_approval",
            ContentStatus::Published => "published",
        }
    }
}

impl ContentStatus {
    /// Parse the stored string form. Inverse of [`ContentStatus::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ContentStatus::Draft),
            "under_review" => Some(ContentStatus::UnderReview),
            "processing" => Some(ContentStatus::Processing),
            "needs_approval" => Some(ContentStatus::NeedsApproval),
            "published" => Some(ContentStatus::Published),
            _ => None,
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blog post or similar editorial document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Canonical body text.
    pub markdown: String,
    /// Staged AI edit; `None` means no revision is pending.
    #[serde(default)]
    pub markdown_ai_revision: Option<String>,
    /// Append-only promotional suggestions (tweets, LinkedIn posts, ...).
    #[serde(default)]
    pub ai_publishing_recommendations: Option<String>,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl ContentItem {
    /// A fresh draft with the given body.
    pub fn draft(id: impl Into<String>, title: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: None,
            markdown: markdown.into(),
            markdown_ai_revision: None,
            ai_publishing_recommendations: None,
            status: ContentStatus::Draft,
            created_at: Utc::now(),
            published_at: None,
        }
    }
}

/// Write intent for a single nullable text column.
///
/// `Option<String>` alone cannot distinguish "leave the field alone" from
/// "clear it", and approval/rejection must be able to clear staged fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum FieldWrite {
    /// Leave the stored value untouched.
    #[default]
    Keep,
    /// Replace the stored value.
    Set(String),
    /// Null the stored value.
    Clear,
}

impl FieldWrite {
    /// Resolve this write against the currently stored value.
    pub fn apply(&self, current: Option<String>) -> Option<String> {
        match self {
            FieldWrite::Keep => current,
            FieldWrite::Set(value) => Some(value.clone()),
            FieldWrite::Clear => None,
        }
    }
}

/// Partial update to a content item.
///
/// Unset fields are left as stored. Applied last-write-wins through
/// [`crate::store::ContentStore::update_content`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default)]
    pub markdown_ai_revision: FieldWrite,
    #[serde(default)]
    pub ai_publishing_recommendations: FieldWrite,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
}

impl ContentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn markdown(mut self, body: impl Into<String>) -> Self {
        self.markdown = Some(body.into());
        self
    }

    #[must_use]
    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.markdown_ai_revision = FieldWrite::Set(revision.into());
        self
    }

    #[must_use]
    pub fn clear_revision(mut self) -> Self {
        self.markdown_ai_revision = FieldWrite::Clear;
        self
    }

    #[must_use]
    pub fn recommendations(mut self, text: impl Into<String>) -> Self {
        self.ai_publishing_recommendations = FieldWrite::Set(text.into());
        self
    }

    #[must_use]
    pub fn clear_recommendations(mut self) -> Self {
        self.ai_publishing_recommendations = FieldWrite::Clear;
        self
    }

    #[must_use]
    pub fn status(mut self, status: ContentStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Merge this patch into an item in place.
    pub fn apply_to(&self, item: &mut ContentItem) {
        if let Some(markdown) = &self.markdown {
            item.markdown = markdown.clone();
        }
        item.markdown_ai_revision = self
            .markdown_ai_revision
            .apply(item.markdown_ai_revision.take());
        item.ai_publishing_recommendations = self
            .ai_publishing_recommendations
            .apply(item.ai_publishing_recommendations.take());
        if let Some(status) = self.status {
            item.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_merges_partially() {
        let mut item = ContentItem::draft("1", "Title", "body");
        item.markdown_ai_revision = Some("staged".into());

        ContentPatch::new()
            .status(ContentStatus::Processing)
            .apply_to(&mut item);

        assert_eq!(item.status, ContentStatus::Processing);
        assert_eq!(item.markdown, "body");
        assert_eq!(item.markdown_ai_revision.as_deref(), Some("staged"));
    }

    #[test]
    fn clear_distinct_from_keep() {
        let mut item = ContentItem::draft("1", "Title", "body");
        item.markdown_ai_revision = Some("staged".into());
        item.ai_publishing_recommendations = Some("tweets".into());

        ContentPatch::new().clear_revision().apply_to(&mut item);

        assert_eq!(item.markdown_ai_revision, None);
        // Untouched field survives the merge.
        assert_eq!(item.ai_publishing_recommendations.as_deref(), Some("tweets"));
    }
}
