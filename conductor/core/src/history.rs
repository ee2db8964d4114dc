//! History Store
//!
//! The ordered message log of a story session plus the truncation policy that
//! keeps it inside the configured word budget.
//!
//! # Layout
//!
//! ```text
//! [0] system     narrator rules, never removed or altered
//! [1] user       synthetic "start the story" message (first to go)
//! [2] assistant  opening passage
//! [3] user       ...alternating turns...
//! ```
//!
//! Truncation always removes index 1 (the oldest non-system message) and
//! never shrinks the log below two messages.

use serde::Serialize;

use crate::error::UndoError;
use crate::messages::{ChatMessage, MessageRole};

/// Ordered conversation log
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct History {
    messages: Vec<ChatMessage>,
}

impl History {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the end of the log
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Shrink the log until its word weight fits `budget`
    ///
    /// Removes the message at index 1 while the summed word count exceeds
    /// `budget` and more than two messages remain. The residual may still be
    /// over budget once only the system prompt and one message are left.
    ///
    /// Returns the number of removed messages.
    pub fn truncate(&mut self, budget: usize) -> usize {
        if self.messages.len() < 2 {
            return 0;
        }

        let mut total = self.total_weight();
        let mut removed = 0;

        while total > budget && self.messages.len() > 2 {
            let dropped = self.messages.remove(1);
            total -= dropped.word_count();
            removed += 1;
        }

        if removed > 0 {
            tracing::debug!(
                removed = removed,
                remaining = self.messages.len(),
                weight = total,
                budget = budget,
                "Truncated story history"
            );
        }

        removed
    }

    /// Replace the content of the trailing assistant message in place
    ///
    /// Returns the previous content.
    ///
    /// # Errors
    ///
    /// [`UndoError::NothingToUndo`] if the last message is not an assistant message.
    pub fn replace_last_assistant(
        &mut self,
        content: impl Into<String>,
    ) -> Result<String, UndoError> {
        match self.messages.last_mut() {
            Some(last) if last.role == MessageRole::Assistant => {
                Ok(std::mem::replace(&mut last.content, content.into()))
            }
            _ => Err(UndoError::NothingToUndo),
        }
    }

    /// Remove and return the trailing assistant message
    ///
    /// # Errors
    ///
    /// [`UndoError::NothingToUndo`] if fewer than two messages are present or
    /// the last message is not an assistant message. The log is unchanged.
    pub fn pop_last(&mut self) -> Result<ChatMessage, UndoError> {
        if self.messages.len() < 2 {
            return Err(UndoError::NothingToUndo);
        }
        match self.messages.last() {
            Some(last) if last.role == MessageRole::Assistant => {
                self.messages.pop().ok_or(UndoError::NothingToUndo)
            }
            _ => Err(UndoError::NothingToUndo),
        }
    }

    /// All messages in order
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The most recent message
    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Summed word weight of every message
    #[must_use]
    pub fn total_weight(&self) -> usize {
        self.messages.iter().map(ChatMessage::word_count).sum()
    }

    /// Pretty JSON rendering for the debug sink
    #[must_use]
    pub fn dump(&self) -> String {
        serde_json::to_string_pretty(&self.messages)
            .unwrap_or_else(|e| format!("<history could not be rendered: {e}>"))
    }
}
