//! Ollama Backend Implementation
//!
//! Chat backend for Ollama (local LLM server).
//!
//! # Ollama API
//!
//! - `/api/chat` - Chat completions with message history (streamed as NDJSON)
//! - `/api/tags` - List available models (used as the health probe)

use std::ops::ControlFlow;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use super::decoder::{ChatChunk, ChatStreamDecoder};
use super::traits::{ChatBackend, ChatRequest, StreamingToken};
use crate::config::BackendSettings;
use crate::error::BackendError;

/// Capacity of the token channel between the body reader and the session
const TOKEN_CHANNEL_CAPACITY: usize = 100;

/// Ollama backend client
#[derive(Clone)]
pub struct OllamaBackend {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl OllamaBackend {
    /// Create a backend from resolved connection settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(BackendError::Client)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get chat endpoint URL
    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// Get tags endpoint URL
    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    /// Build the JSON request body
    fn request_body(request: &ChatRequest) -> serde_json::Value {
        serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "stream": true,
            "options": {
                "num_ctx": request.context_size,
                "temperature": request.temperature,
            },
        })
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(self.tags_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %self.tags_url(), error = %e, "Ollama health check failed");
                false
            }
        }
    }

    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<StreamingToken>, BackendError> {
        let url = self.chat_url();
        let body = Self::request_body(request);

        tracing::debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat request"
        );

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Connect {
                url: url.clone(),
                source: e,
            })?;

        // Check for HTTP errors
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let (tx, rx) = mpsc::channel(TOKEN_CHANNEL_CAPACITY);
        let mut stream = response.bytes_stream();

        // Spawn task to process stream
        tokio::spawn(async move {
            let mut decoder = ChatStreamDecoder::new();
            let mut full_response = String::new();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for line in decoder.push(&bytes) {
                            if forward(&tx, line, &mut full_response).await.is_break() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(StreamingToken::Error(BackendError::Transport(e)))
                            .await;
                        return;
                    }
                }
            }

            if let Some(line) = decoder.finish() {
                if forward(&tx, line, &mut full_response).await.is_break() {
                    return;
                }
            }

            // Body ended without a done marker
            let _ = tx
                .send(StreamingToken::Complete {
                    message: full_response,
                })
                .await;
        });

        Ok(rx)
    }
}

/// Forward one decoded line; `Break` once the stream is finished or the
/// receiver has gone away
async fn forward(
    tx: &mpsc::Sender<StreamingToken>,
    line: Result<ChatChunk, BackendError>,
    full_response: &mut String,
) -> ControlFlow<()> {
    let chunk = match line {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::warn!(error = %e, "Chat stream failed");
            let _ = tx.send(StreamingToken::Error(e)).await;
            return ControlFlow::Break(());
        }
    };

    if !chunk.content.is_empty() {
        full_response.push_str(&chunk.content);
        if tx.send(StreamingToken::Token(chunk.content)).await.is_err() {
            // Receiver dropped, stop streaming
            return ControlFlow::Break(());
        }
    }

    if chunk.done {
        let _ = tx
            .send(StreamingToken::Complete {
                message: std::mem::take(full_response),
            })
            .await;
        return ControlFlow::Break(());
    }

    ControlFlow::Continue(())
}
