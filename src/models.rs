//! Core data models used throughout OpsDesk.
//!
//! These types represent the knowledge items, conversation messages, and
//! retrieval results that flow through the question-answering pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of retrievable institutional knowledge.
///
/// Items are curated through the `ops kb` administrative commands and read
/// as an immutable snapshot by the retrieval engine. The query path never
/// mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    /// Human-readable name, used both for matching and for citation display.
    pub title: String,
    /// Free-form classification tag (e.g. `"manual"`, `"notam"`, `"regulation"`).
    pub category: String,
    /// Plain-text body used for keyword matching and included verbatim in
    /// the generation context.
    pub content: String,
    /// Display-only date stamp.
    pub last_updated: NaiveDate,
    /// Attached binary document, if any (scanned manual page, chart, PDF).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaAttachment>,
    /// SHA-256 of the imported source file, used by `ops kb import` to skip
    /// unchanged files. Empty for manually entered items.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_hash: String,
}

/// Binary payload attached to a [`KnowledgeItem`].
///
/// The MIME type is not optional: a payload of unknown type cannot be
/// forwarded to the generation service, so an attachment without one is
/// unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub mime_type: String,
    /// Base64-encoded file content.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in the assistant transcript.
///
/// Constructed via [`ConversationMessage::user`] and
/// [`ConversationMessage::assistant`] so that citation fields never appear
/// on user messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub role: Role,
    /// Message body. Assistant text may contain light markup (bold spans,
    /// bullet lines).
    pub text: String,
    /// Titles of the knowledge items whose content contributed to the
    /// answer. Always empty for user messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_titles: Vec<String>,
    /// True if the generation service reported live web grounding for this
    /// answer. Always false for user messages.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub web_grounded: bool,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    /// A user turn. Carries no citation metadata.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            text: text.into(),
            source_titles: Vec::new(),
            web_grounded: false,
            created_at: Utc::now(),
        }
    }

    /// An assistant turn with citations and the web-grounding marker.
    pub fn assistant(
        text: impl Into<String>,
        source_titles: Vec<String>,
        web_grounded: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            text: text.into(),
            source_titles,
            web_grounded,
            created_at: Utc::now(),
        }
    }

    /// A fixed assistant notice (greeting, reset acknowledgement, error
    /// reply) with no citations.
    pub fn notice(text: impl Into<String>) -> Self {
        Self::assistant(text, Vec::new(), false)
    }
}

/// Output of one retrieval call. Transient, never persisted.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// Formatted context sections for every matched item, plus the fallback
    /// reference when it was not itself matched.
    pub context_block: String,
    /// Titles of matched items, excluding the fallback reference.
    pub source_titles: Vec<String>,
    /// The matched items themselves, needed to pull media attachments.
    pub matched: Vec<KnowledgeItem>,
}
