//! Chat Backend Integration
//!
//! This module provides access to streaming chat backends through a common
//! trait interface.
//!
//! # Available Backends
//!
//! - **Ollama**: Local LLM server (default)
//! - **Scripted**: replays canned replies, for tests ([`test_utils`])
//!
//! # Usage
//!
//! ```ignore
//! use taleweaver_core::backend::{ChatBackend, ChatRequest, OllamaBackend};
//!
//! let backend = OllamaBackend::new(&settings)?;
//! let request = ChatRequest::new("llama2", history.messages().to_vec());
//! let rx = backend.send_streaming(&request).await?;
//! ```

mod decoder;
mod ollama;
pub mod test_utils;
mod traits;

pub use decoder::{ChatChunk, ChatStreamDecoder};
pub use ollama::OllamaBackend;
pub use traits::{ChatBackend, ChatRequest, StreamingToken};
