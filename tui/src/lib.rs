//! Taleweaver TUI - Full-screen story front end
//!
//! This crate renders a taleweaver story session in the terminal: a
//! word-wrapped, scrolling conversation pane with a typewriter reveal of the
//! narrator's text, and an input line that ignores typing while a passage is
//! still appearing.
//!
//! # Architecture
//!
//! - **App**: event loop, key handling, frame rendering
//! - **Display**: conversation contents, fed by the session's presentation callbacks
//! - **Widgets**: borderless, bottom-anchored scrolling text block
//! - **Theme**: story colors

pub mod app;
pub mod display;
pub mod theme;
pub mod widgets;

pub use app::App;
