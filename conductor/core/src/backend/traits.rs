//! Chat Backend Traits
//!
//! The session engine talks to a generation backend only through
//! [`ChatBackend`]: send the whole conversation, receive the reply as an
//! ordered stream of content deltas. Implementations own the wire format.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::BackendError;
use crate::messages::ChatMessage;

/// Stream events from a chat backend
///
/// A well-behaved producer sends zero or more `Token`s followed by exactly one
/// `Complete` or `Error`, then closes the channel.
#[derive(Debug)]
pub enum StreamingToken {
    /// A content delta, in emission order
    Token(String),
    /// Response completed successfully
    Complete {
        /// The concatenation of every delta sent for this response
        message: String,
    },
    /// The stream failed; no further tokens follow
    Error(BackendError),
}

/// One chat request: the full history plus sampling settings
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// Model to use (backend-specific identifier)
    pub model: String,
    /// Full ordered conversation, system prompt first
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Context window requested from the backend
    pub context_size: usize,
}

impl ChatRequest {
    /// Create a request for `model` carrying `messages`
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: crate::story::DEFAULT_TEMPERATURE,
            context_size: crate::story::DEFAULT_NUM_TOKENS,
        }
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set context size
    #[must_use]
    pub fn with_context_size(mut self, context_size: usize) -> Self {
        self.context_size = context_size;
        self
    }
}

/// Streaming chat backend
///
/// Implement this trait to drive a session from a different provider or from
/// a scripted source in tests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Get the backend name (e.g., "Ollama")
    fn name(&self) -> &str;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Send a request and get a streaming response
    ///
    /// Each call issues a new request. The returned receiver yields tokens as
    /// they arrive and closes after `Complete` or `Error`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be delivered or the backend
    /// rejected it before streaming began.
    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<StreamingToken>, BackendError>;
}
