//! NDJSON decoding for the `/api/chat` stream
//!
//! The body arrives in arbitrary byte chunks. Bytes are buffered until a
//! newline completes a line, and only complete lines are decoded as UTF-8, so
//! a chunk boundary inside a multi-byte character never corrupts text.

use serde::Deserialize;

use crate::error::BackendError;

/// One decoded stream line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatChunk {
    /// Content delta carried by the line (may be empty)
    pub content: String,
    /// Whether the backend marked the response finished
    pub done: bool,
}

#[derive(Deserialize)]
struct WireLine {
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: String,
}

/// Incremental line decoder
#[derive(Debug, Default)]
pub struct ChatStreamDecoder {
    buffer: Vec<u8>,
}

impl ChatStreamDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of body bytes, returning every line it completed
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<ChatChunk, BackendError>> {
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(decoded) = decode_line(&line[..pos]) {
                out.push(decoded);
            }
        }
        out
    }

    /// Decode whatever is left once the body has ended
    pub fn finish(&mut self) -> Option<Result<ChatChunk, BackendError>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

/// Decode one line; blank lines yield nothing
fn decode_line(raw: &[u8]) -> Option<Result<ChatChunk, BackendError>> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text.trim(),
        Err(e) => {
            return Some(Err(BackendError::Malformed {
                line: String::from_utf8_lossy(raw).into_owned(),
                reason: e.to_string(),
            }))
        }
    };
    if text.is_empty() {
        return None;
    }

    let wire: WireLine = match serde_json::from_str(text) {
        Ok(wire) => wire,
        Err(e) => {
            return Some(Err(BackendError::Malformed {
                line: text.to_string(),
                reason: e.to_string(),
            }))
        }
    };

    if let Some(error) = wire.error {
        return Some(Err(BackendError::Remote(error)));
    }

    match wire.message {
        Some(message) => Some(Ok(ChatChunk {
            content: message.content,
            done: wire.done,
        })),
        None if wire.done => Some(Ok(ChatChunk {
            content: String::new(),
            done: true,
        })),
        None => Some(Err(BackendError::Malformed {
            line: text.to_string(),
            reason: "missing message.content".to_string(),
        })),
    }
}
