//! Transcript persistence.
//!
//! The conversation transcript is an append-only, strictly chronological
//! message list. It lives in memory while the assistant runs and is
//! serialized whole to a [`TranscriptStore`] after every mutation — there
//! is no incremental or append-only storage format.
//!
//! Read failures degrade: an absent or unparsable stored transcript loads
//! as `None` and the caller seeds the fixed greeting. Write failures
//! propagate so the CLI surface can report them.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::models::ConversationMessage;

/// Abstract storage for the ordered transcript.
pub trait TranscriptStore: Send + Sync {
    /// Load the stored transcript. `None` when nothing usable is stored
    /// (missing, empty, or corrupt) — never an error for bad content.
    fn load(&self) -> Result<Option<Vec<ConversationMessage>>>;

    /// Overwrite the stored transcript with the full message list.
    fn save(&self, messages: &[ConversationMessage]) -> Result<()>;

    /// Drop the stored transcript entirely.
    fn clear(&self) -> Result<()>;
}

/// Keep only the most recent `limit` messages. Unbounded transcript growth
/// is the one storage decision the original left open; the cap is applied
/// after load and before every save.
pub fn apply_retention(messages: &mut Vec<ConversationMessage>, limit: usize) {
    if messages.len() > limit {
        let drop = messages.len() - limit;
        messages.drain(..drop);
    }
}

// ============ JSON file store ============

/// File-backed transcript store (`chat_history.json` in the state dir).
pub struct JsonTranscriptStore {
    path: PathBuf,
}

impl JsonTranscriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TranscriptStore for JsonTranscriptStore {
    fn load(&self) -> Result<Option<Vec<ConversationMessage>>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Ok(None),
        };
        // Corrupt history is treated as no history, not a hard error.
        match serde_json::from_str::<Vec<ConversationMessage>>(&content) {
            Ok(messages) if !messages.is_empty() => Ok(Some(messages)),
            _ => Ok(None),
        }
    }

    fn save(&self, messages: &[ConversationMessage]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(messages)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

// ============ In-memory store ============

/// In-memory transcript store for tests and embedding.
#[derive(Default)]
pub struct MemoryTranscriptStore {
    stored: Mutex<Option<Vec<ConversationMessage>>>,
}

impl TranscriptStore for MemoryTranscriptStore {
    fn load(&self) -> Result<Option<Vec<ConversationMessage>>> {
        Ok(self.stored.lock().unwrap().clone())
    }

    fn save(&self, messages: &[ConversationMessage]) -> Result<()> {
        *self.stored.lock().unwrap() = Some(messages.to_vec());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.stored.lock().unwrap() = None;
        Ok(())
    }
}
