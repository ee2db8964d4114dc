//! Taleweaver Core - Headless Story Session Engine
//!
//! This crate holds everything a taleweaver front end needs to run an
//! interactive story against a streaming chat backend, completely independent
//! of any UI framework. The line-oriented CLI and the full-screen TUI both
//! drive the same [`Session`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Front Ends                             │
//! │   ┌──────────────────┐            ┌────────────────────────┐  │
//! │   │  CLI (stdin/out) │            │   TUI (ratatui, paced) │  │
//! │   └────────┬─────────┘            └───────────┬────────────┘  │
//! │            │  input lines          Presentation callbacks     │
//! └────────────┼───────────────────────────────────┼──────────────┘
//!              ▼                                   ▲
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TALEWEAVER CORE                         │
//! │  ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌─────────┐ │
//! │  │ Session  │──►│ History  │   │  Reveal    │──►│  UI     │ │
//! │  │ (turns,  │   │ (budget) │   │ Scheduler  │   │ sink    │ │
//! │  │  undo)   │──────────────────►│           │   └─────────┘ │
//! │  └────┬─────┘   └──────────┘   └────────────┘               │
//! │       │ ChatRequest             ▲ StreamingToken             │
//! │       ▼                         │                            │
//! │  ┌──────────────────────────────┴─┐                          │
//! │  │   ChatBackend (Ollama /api/chat)│                          │
//! │  └─────────────────────────────────┘                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use taleweaver_core::{load_config, ConfigOverrides, OllamaBackend, Session};
//!
//! let config = load_config(&story_path, None, &ConfigOverrides::new())?;
//! let backend = OllamaBackend::new(&config.backend)?;
//! let mut session = Session::new(backend, config.session, config.reveal);
//!
//! session.start(&config.story.build_prompt(), &mut ui);
//! session.finish_turn(&mut ui).await;
//!
//! loop {
//!     let line = read_line().await;
//!     if session.handle_input(&line, &mut ui) == TurnOutcome::Streaming {
//!         session.finish_turn(&mut ui).await;
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: Chat backend abstraction and the Ollama client
//! - [`commands`]: Parsing of `quit` / `undo` / `debug` / dialogue
//! - [`config`]: Story, settings file, environment and CLI layering
//! - [`error`]: Error types
//! - [`history`]: Message log and truncation policy
//! - [`messages`]: Chat message type
//! - [`presentation`]: Callbacks front ends implement
//! - [`reveal`]: Timed reveal scheduler and clocks
//! - [`session`]: Turn controller and undo state machine
//! - [`story`]: Story cards and prompt construction
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod messages;
pub mod presentation;
pub mod reveal;
pub mod session;
pub mod story;

// Re-exports for convenience
pub use backend::{ChatBackend, ChatRequest, OllamaBackend, StreamingToken};
pub use commands::ControlCommand;
pub use error::{BackendError, ErrorKind, UndoError};
pub use history::History;
pub use messages::{ChatMessage, MessageRole};
pub use presentation::Presentation;
pub use reveal::{Clock, ManualClock, RevealConfig, RevealScheduler, SystemClock, TickOutcome};
pub use session::{Session, TurnOutcome, TurnState};
pub use story::{StoryCard, StoryPrompt};

// Config exports
pub use config::{
    default_config_path, load_config, BackendSettings, ConfigError, ConfigOverrides,
    ConfigSource, LoadedConfig, SessionConfig,
};
