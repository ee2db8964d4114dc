//! Scripted Backend for Tests
//!
//! A [`ChatBackend`] that replays pre-recorded replies instead of calling a
//! model. Each `send_streaming` call consumes the next script entry and
//! records the request so tests can check exactly what would have been sent.
//!
//! # Usage
//!
//! ```ignore
//! use taleweaver_core::backend::test_utils::ScriptedBackend;
//!
//! let backend = ScriptedBackend::new()
//!     .reply(["Hello", " world"])
//!     .connect_failure()
//!     .stall();
//!
//! // ... drive a session ...
//!
//! assert_eq!(backend.request_count(), 3);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::traits::{ChatBackend, ChatRequest, StreamingToken};
use crate::error::BackendError;

/// One scripted response
#[derive(Clone, Debug)]
pub enum Script {
    /// Stream these fragments, then complete
    Reply(Vec<String>),
    /// Fail before streaming starts
    ConnectFailure,
    /// Stream these fragments, then fail mid-stream
    FailAfter(Vec<String>),
    /// Stream these fragments, then close without a completion marker
    Truncated(Vec<String>),
    /// Never answer, like a backend stuck loading a model
    Stall,
}

#[derive(Debug, Default)]
struct Inner {
    scripts: VecDeque<Script>,
    requests: Vec<ChatRequest>,
}

/// Backend replaying scripted replies
///
/// Clones share state, so a test can keep a handle after moving the backend
/// into a session.
#[derive(Clone, Debug, Default)]
pub struct ScriptedBackend {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedBackend {
    /// Create a backend with an empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply made of `fragments`
    #[must_use]
    pub fn reply<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Script::Reply(fragments.into_iter().map(Into::into).collect()))
    }

    /// Queue a request that cannot be delivered
    #[must_use]
    pub fn connect_failure(self) -> Self {
        self.push(Script::ConnectFailure)
    }

    /// Queue a reply that breaks after `fragments`
    #[must_use]
    pub fn fail_after<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Script::FailAfter(
            fragments.into_iter().map(Into::into).collect(),
        ))
    }

    /// Queue a reply whose channel closes without `Complete`
    #[must_use]
    pub fn truncated<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Script::Truncated(
            fragments.into_iter().map(Into::into).collect(),
        ))
    }

    /// Queue a request the backend never answers
    #[must_use]
    pub fn stall(self) -> Self {
        self.push(Script::Stall)
    }

    /// Queue an arbitrary script entry
    #[must_use]
    pub fn push(self, script: Script) -> Self {
        self.inner.lock().scripts.push_back(script);
        self
    }

    /// Every request received so far
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.inner.lock().requests.clone()
    }

    /// Number of requests received so far
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.inner.lock().requests.len()
    }

    /// Number of script entries not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.inner.lock().scripts.len()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<StreamingToken>, BackendError> {
        let script = {
            let mut inner = self.inner.lock();
            inner.requests.push(request.clone());
            inner.scripts.pop_front()
        };

        // An exhausted script behaves like an empty reply
        let script = script.unwrap_or(Script::Reply(Vec::new()));

        let (fragments, tail) = match script {
            Script::ConnectFailure => {
                return Err(BackendError::Status {
                    status: 503,
                    body: "scripted connect failure".to_string(),
                })
            }
            Script::Stall => return std::future::pending().await,
            Script::Reply(f) => (f, Some(true)),
            Script::FailAfter(f) => (f, Some(false)),
            Script::Truncated(f) => (f, None),
        };

        let (tx, rx) = mpsc::channel(fragments.len() + 1);
        let message: String = fragments.concat();
        for fragment in fragments {
            let _ = tx.try_send(StreamingToken::Token(fragment));
        }
        match tail {
            Some(true) => {
                let _ = tx.try_send(StreamingToken::Complete { message });
            }
            Some(false) => {
                let _ = tx.try_send(StreamingToken::Error(BackendError::Remote(
                    "scripted failure".to_string(),
                )));
            }
            None => {}
        }

        Ok(rx)
    }
}
