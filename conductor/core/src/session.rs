//! Story Session
//!
//! The turn controller: owns the history, runs one turn at a time against the
//! backend and implements the undo/rewrite protocol.
//!
//! # Turn State Machine
//!
//! ```text
//!            dialogue: append user, truncate, stream, commit assistant
//!           ┌──────┐
//!           ▼      │
//!        ┌──────────┐   undo (last is assistant)   ┌──────────────┐
//!   ────►│  Normal  │ ───────────────────────────► │ AwaitingEdit │
//!        └──────────┘ ◄─────────────────────────── └──────────────┘
//!                        any text: append as assistant
//! ```
//!
//! `quit` ends the session from either state; `debug` dumps the history.
//!
//! # Driving a Turn
//!
//! Handling input never waits on the backend. A dialogue turn returns
//! [`TurnOutcome::Streaming`] as soon as the request is issued; the owner then
//! either calls [`Session::poll`] from a frame loop (paced reveal) or awaits
//! [`Session::finish_turn`] (reveal as fast as the backend produces). Both
//! commit the reply the same way: only a completed stream is appended; a
//! failed one leaves no assistant half behind. `quit` is honoured at any
//! point, including while the backend has not answered yet.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::backend::{ChatBackend, ChatRequest, StreamingToken};
use crate::commands::ControlCommand;
use crate::config::SessionConfig;
use crate::error::{BackendError, UndoError};
use crate::history::History;
use crate::messages::{ChatMessage, MessageRole};
use crate::presentation::Presentation;
use crate::reveal::{Clock, RevealConfig, RevealScheduler, SystemClock, TickOutcome};
use crate::story::StoryPrompt;

/// Whether the next input is a prompt or a hand-written replacement
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnState {
    /// Accepting new player input
    #[default]
    Normal,
    /// The last passage was retracted; the next input replaces it
    AwaitingEdit,
}

/// What handling one input did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A request is in flight; drive it with `poll` or `finish_turn`
    Streaming,
    /// The backend failed; the error went to `on_error`
    Failed,
    /// The last passage was retracted
    AwaitingEdit,
    /// The retracted passage was replaced by the input
    Rewritten,
    /// Undo was not possible; history unchanged
    UndoRejected(UndoError),
    /// The history went to `on_history_changed`
    Dumped,
    /// The session has ended
    Quit,
    /// A turn is still streaming or revealing; input ignored
    Busy,
}

type Connecting = BoxFuture<'static, Result<mpsc::Receiver<StreamingToken>, BackendError>>;

/// Where the reply is
enum Reply {
    /// Request issued, backend has not answered yet
    Connecting(Connecting),
    /// Body is being read
    Streaming(mpsc::Receiver<StreamingToken>),
}

/// Reply being received
struct PendingTurn {
    reply: Reply,
    content: String,
}

/// One story session
pub struct Session<B: ChatBackend, C: Clock = SystemClock> {
    backend: Arc<B>,
    config: SessionConfig,
    history: History,
    state: TurnState,
    pending: Option<PendingTurn>,
    scheduler: RevealScheduler<C>,
    started: bool,
    ended: bool,
}

impl<B: ChatBackend + 'static> Session<B, SystemClock> {
    /// Create a session revealing on the wall clock
    pub fn new(backend: B, config: SessionConfig, reveal: RevealConfig) -> Self {
        Self::with_clock(backend, config, reveal, SystemClock::new())
    }
}

impl<B: ChatBackend + 'static, C: Clock> Session<B, C> {
    /// Create a session revealing on a specific clock
    pub fn with_clock(backend: B, config: SessionConfig, reveal: RevealConfig, clock: C) -> Self {
        Self {
            backend: Arc::new(backend),
            config,
            history: History::new(),
            state: TurnState::Normal,
            pending: None,
            scheduler: RevealScheduler::with_clock(reveal, clock),
            started: false,
            ended: false,
        }
    }

    /// Resume from an existing history instead of calling [`Session::start`]
    #[must_use]
    pub fn with_history(mut self, history: History) -> Self {
        self.history = history;
        self.started = true;
        self
    }

    /// Seed the history from the story prompt and stream the opening passage
    pub fn start(&mut self, prompt: &StoryPrompt, ui: &mut dyn Presentation) -> TurnOutcome {
        if self.started {
            tracing::warn!("Session already started");
            return TurnOutcome::Busy;
        }
        self.started = true;

        self.history.append(ChatMessage::system(prompt.system.clone()));
        self.history.append(ChatMessage::user(prompt.opening.clone()));

        tracing::info!(
            model = %self.config.model,
            backend = self.backend.name(),
            word_budget = self.config.word_budget,
            "Starting story session"
        );

        self.request_turn(ui)
    }

    /// Handle one line of player input
    pub fn handle_input(&mut self, input: &str, ui: &mut dyn Presentation) -> TurnOutcome {
        if self.ended {
            return TurnOutcome::Quit;
        }

        match ControlCommand::parse(input) {
            ControlCommand::Quit => self.quit(),
            _ if self.is_busy() => TurnOutcome::Busy,
            ControlCommand::Debug => {
                ui.on_history_changed(&self.history);
                TurnOutcome::Dumped
            }
            ControlCommand::Undo => self.undo(),
            ControlCommand::Dialogue(text) => match self.state {
                TurnState::AwaitingEdit => {
                    self.history.append(ChatMessage::assistant(text));
                    self.state = TurnState::Normal;
                    tracing::debug!(messages = self.history.len(), "Rewrote story passage");
                    TurnOutcome::Rewritten
                }
                TurnState::Normal => {
                    self.history.append(ChatMessage::user(text));
                    self.history.truncate(self.config.word_budget);
                    self.request_turn(ui)
                }
            },
        }
    }

    /// Cooperatively advance the current turn
    ///
    /// Takes every token already received, then gives the reveal scheduler one
    /// tick. Never blocks.
    pub fn poll(&mut self, ui: &mut dyn Presentation) -> TickOutcome {
        self.poll_connecting(ui);

        // First, collect all available tokens to avoid borrow issues
        let tokens: Vec<StreamingToken> = {
            let Some(PendingTurn {
                reply: Reply::Streaming(rx),
                ..
            }) = self.pending.as_mut()
            else {
                return self.scheduler.tick(ui);
            };

            let mut collected = Vec::new();
            loop {
                match rx.try_recv() {
                    Ok(token) => {
                        let is_terminal = matches!(
                            token,
                            StreamingToken::Complete { .. } | StreamingToken::Error(_)
                        );
                        collected.push(token);
                        if is_terminal {
                            break;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        collected.push(StreamingToken::Error(BackendError::StreamClosed));
                        break;
                    }
                }
            }
            collected
        };

        for token in tokens {
            self.apply_token(token, ui);
        }
        self.scheduler.tick(ui)
    }

    /// Receive the rest of the current turn, revealing as tokens arrive
    pub async fn finish_turn(&mut self, ui: &mut dyn Presentation) -> TickOutcome {
        while let Some(pending) = self.pending.as_mut() {
            let token = match &mut pending.reply {
                Reply::Connecting(connecting) => match connecting.await {
                    Ok(rx) => {
                        pending.reply = Reply::Streaming(rx);
                        continue;
                    }
                    Err(e) => StreamingToken::Error(e),
                },
                Reply::Streaming(rx) => rx
                    .recv()
                    .await
                    .unwrap_or(StreamingToken::Error(BackendError::StreamClosed)),
            };
            self.apply_token(token, ui);
            self.scheduler.drain(ui);
        }
        self.scheduler.drain(ui)
    }

    /// Whether a turn is streaming or still being revealed
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some() || self.scheduler.is_busy()
    }

    /// Current turn state
    #[must_use]
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// The committed history
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Session settings
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The backend this session talks to
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether `quit` was received
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    fn request_turn(&mut self, ui: &mut dyn Presentation) -> TurnOutcome {
        let request = ChatRequest::new(self.config.model.clone(), self.history.messages().to_vec())
            .with_temperature(self.config.temperature)
            .with_context_size(self.config.context_size);

        let backend = Arc::clone(&self.backend);
        let mut connecting = async move { backend.send_streaming(&request).await }.boxed();

        // A backend that answers without waiting is taken right away
        let reply = match connecting.as_mut().now_or_never() {
            Some(Ok(rx)) => Reply::Streaming(rx),
            Some(Err(e)) => {
                self.fail(&e, ui);
                return TurnOutcome::Failed;
            }
            None => {
                tracing::debug!(backend = self.backend.name(), "Waiting for backend");
                Reply::Connecting(connecting)
            }
        };

        self.pending = Some(PendingTurn {
            reply,
            content: String::new(),
        });
        self.scheduler.begin_turn(MessageRole::Assistant);
        TurnOutcome::Streaming
    }

    /// Check once, without waiting, whether the backend has answered
    fn poll_connecting(&mut self, ui: &mut dyn Presentation) {
        let Some(PendingTurn {
            reply: Reply::Connecting(connecting),
            ..
        }) = self.pending.as_mut()
        else {
            return;
        };

        match connecting.as_mut().now_or_never() {
            None => {}
            Some(Ok(rx)) => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.reply = Reply::Streaming(rx);
                }
            }
            Some(Err(e)) => self.fail(&e, ui),
        }
    }

    fn apply_token(&mut self, token: StreamingToken, ui: &mut dyn Presentation) {
        match token {
            StreamingToken::Token(text) => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.content.push_str(&text);
                    self.scheduler.push_fragment(&text);
                }
            }
            StreamingToken::Complete { message } => {
                let Some(pending) = self.pending.take() else {
                    return;
                };
                if pending.content != message {
                    tracing::debug!(
                        streamed = pending.content.len(),
                        reported = message.len(),
                        "Completion message differs from streamed text"
                    );
                }
                self.history.append(ChatMessage::assistant(pending.content));
                self.scheduler.end_stream();
                tracing::debug!(
                    messages = self.history.len(),
                    weight = self.history.total_weight(),
                    "Committed story passage"
                );
            }
            StreamingToken::Error(e) => self.fail(&e, ui),
        }
    }

    fn fail(&mut self, error: &BackendError, ui: &mut dyn Presentation) {
        tracing::warn!(
            backend = self.backend.name(),
            kind = %error.kind(),
            error = %error,
            "Turn aborted"
        );
        self.pending = None;
        self.scheduler.abort();
        ui.on_error(error.kind(), &error.to_string());
    }

    fn undo(&mut self) -> TurnOutcome {
        if self.state == TurnState::AwaitingEdit {
            return TurnOutcome::UndoRejected(UndoError::AlreadyEditing);
        }
        match self.history.pop_last() {
            Ok(retracted) => {
                self.state = TurnState::AwaitingEdit;
                tracing::debug!(words = retracted.word_count(), "Retracted story passage");
                TurnOutcome::AwaitingEdit
            }
            Err(e) => TurnOutcome::UndoRejected(e),
        }
    }

    fn quit(&mut self) -> TurnOutcome {
        if self.pending.take().is_some() {
            tracing::debug!("Abandoning in-flight turn");
        }
        self.scheduler.abort();
        self.ended = true;
        tracing::info!(messages = self.history.len(), "Story session ended");
        TurnOutcome::Quit
    }
}
