//! Display State Types
//!
//! What the conversation pane shows. The session feeds it through the
//! [`Presentation`] callbacks; the app adds the player's own lines, notices
//! and rewritten passages.

use taleweaver_core::{ErrorKind, History, MessageRole, Presentation};

/// Prefix shown on a hand-rewritten passage
pub const UPDATED_STORY_PREFIX: &str = "(Updated Story): ";

/// Display role for messages
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayRole {
    /// Player dialogue
    Player,
    /// Narrator passage
    Narrator,
    /// Informational notice
    Notice,
    /// Backend failure
    Error,
}

impl From<MessageRole> for DisplayRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Self::Player,
            MessageRole::Assistant => Self::Narrator,
            MessageRole::System => Self::Notice,
        }
    }
}

/// A rendered conversation entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayMessage {
    /// Who this entry belongs to
    pub role: DisplayRole,
    /// Text revealed so far
    pub content: String,
    /// Whether more text is still being revealed
    pub streaming: bool,
}

impl DisplayMessage {
    /// Create a finished entry
    pub fn new(role: DisplayRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            streaming: false,
        }
    }
}

/// Conversation pane contents
#[derive(Debug, Default)]
pub struct DisplayState {
    /// Entries, oldest first
    pub messages: Vec<DisplayMessage>,
}

impl DisplayState {
    /// Create an empty display
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a line the player submitted
    pub fn push_player(&mut self, text: &str) {
        self.messages
            .push(DisplayMessage::new(DisplayRole::Player, text));
    }

    /// Show an informational notice
    pub fn push_notice(&mut self, text: &str) {
        self.messages
            .push(DisplayMessage::new(DisplayRole::Notice, text));
    }

    /// Swap the most recent passage for the player's rewrite
    pub fn replace_last_narration(&mut self, text: &str) {
        let content = format!("{UPDATED_STORY_PREFIX}{text}");
        match self
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.role == DisplayRole::Narrator)
        {
            Some(message) => {
                message.content = content;
                message.streaming = false;
            }
            None => self
                .messages
                .push(DisplayMessage::new(DisplayRole::Narrator, content)),
        }
    }

    /// Whether an entry is still being revealed
    pub fn is_streaming(&self) -> bool {
        self.messages.last().is_some_and(|m| m.streaming)
    }
}

impl Presentation for DisplayState {
    fn on_fragment(&mut self, role: MessageRole, text: &str) {
        let role = DisplayRole::from(role);
        match self.messages.last_mut() {
            Some(last) if last.streaming && last.role == role => last.content.push_str(text),
            _ => self.messages.push(DisplayMessage {
                role,
                content: text.to_string(),
                streaming: true,
            }),
        }
    }

    fn on_turn_complete(&mut self) {
        if let Some(last) = self.messages.last_mut() {
            last.streaming = false;
        }
    }

    fn on_error(&mut self, kind: ErrorKind, detail: &str) {
        // The partial passage was never committed
        if self.is_streaming() {
            self.messages.pop();
        }
        self.messages.push(DisplayMessage::new(
            DisplayRole::Error,
            format!("The story was interrupted ({kind} error): {detail}"),
        ));
    }

    fn on_history_changed(&mut self, history: &History) {
        self.push_notice(&history.dump());
    }
}
