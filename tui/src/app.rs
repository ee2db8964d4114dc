//! Main Application
//!
//! The App struct manages the TUI lifecycle around one story session:
//! - Event loop (keyboard, mouse, resize)
//! - Session polling, which paces the narrator's text onto the screen
//! - DisplayState for rendering
//!
//! While a passage is streaming or still being revealed, typing is ignored;
//! only scrolling and quitting work. Nothing here waits on the backend, so
//! frames keep drawing and Esc keeps working while the model is loading.

use std::time::{Duration, Instant};

use crossterm::event::{
    Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::{Frame, Terminal};

use taleweaver_core::{ChatBackend, ControlCommand, Session, StoryPrompt, TurnOutcome, TurnState};

use crate::display::{DisplayRole, DisplayState};
use crate::theme::{DIM_GRAY, ERROR_RED, NARRATOR_GREEN, NOTICE_YELLOW, PLAYER_RED};
use crate::widgets::{fit_width, wrap_styled, StyledLine, TextBlock, TextBlockState};

/// Input box height (lines), separator included
const INPUT_HEIGHT: u16 = 4;

/// Prompt while waiting for dialogue
pub const PROMPT: &str = ">> ";

/// Prompt while waiting for a rewritten passage
pub const EDIT_PROMPT: &str = "(update story)>> ";

/// Main application state
pub struct App<B: ChatBackend> {
    // === Core State ===
    /// Is the app still running?
    running: bool,

    // === Session ===
    /// The story session
    session: Session<B>,
    /// Opening prompt, consumed by `start`
    prompt: Option<StoryPrompt>,
    /// Display state fed by the session
    display: DisplayState,

    // === Input State ===
    /// User input buffer
    input_buffer: String,
    /// Conversation scroll state
    scroll: TextBlockState,

    // === Misc State ===
    /// Terminal size
    size: (u16, u16),
}

impl<B: ChatBackend + 'static> App<B> {
    /// Create a new App instance
    pub fn new(session: Session<B>, prompt: StoryPrompt, size: (u16, u16)) -> Self {
        Self {
            running: true,
            session,
            prompt: Some(prompt),
            display: DisplayState::new(),
            input_buffer: String::new(),
            scroll: TextBlockState::default(),
            size,
        }
    }

    /// Main event loop
    pub async fn run<T: Backend>(&mut self, terminal: &mut Terminal<T>) -> anyhow::Result<()> {
        // ~20 FPS is plenty for a typewriter at 150ms per word
        let frame_duration = Duration::from_millis(50);

        // Create async event stream for non-blocking terminal events
        let mut event_stream = EventStream::new();

        // Render initial frame immediately so user sees UI
        self.render(terminal)?;
        self.start();

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                // Check for terminal events - highest priority
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        // Only handle Press events (not Release or Repeat)
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            self.handle_key(key);
                        }
                        Some(Ok(Event::Mouse(mouse))) => self.handle_mouse(mouse),
                        Some(Ok(Event::Resize(w, h))) => self.handle_resize(w, h),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!(error = %e, "Terminal event stream failed");
                            self.running = false;
                        }
                        None => self.running = false,
                    }
                }

                // Frame tick
                _ = tokio::time::sleep(Duration::from_millis(16)) => {}
            }

            // Take streamed tokens and reveal the next word when due
            self.tick();

            self.render(terminal)?;

            // Frame rate limiting
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                tokio::time::sleep(frame_duration - elapsed).await;
            }
        }

        Ok(())
    }

    /// Seed the story and request the opening passage
    pub fn start(&mut self) {
        if let Some(prompt) = self.prompt.take() {
            self.session.start(&prompt, &mut self.display);
        }
    }

    /// Advance the session by one frame
    pub fn tick(&mut self) {
        self.session.poll(&mut self.display);
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            // Quit
            KeyCode::Esc => self.quit(),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit(),

            // Conversation scrolling
            KeyCode::PageUp => self.scroll.scroll_up(self.page_size()),
            KeyCode::PageDown => self.scroll.scroll_down(self.page_size()),

            // Everything else waits until the passage is fully shown
            _ if self.session.is_busy() => {}

            // Submit line
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.input_buffer);
                self.submit(&line);
                self.scroll.scroll_to_bottom();
            }

            // Typing; other control and alt chords are not text
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.input_buffer.push(c);
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }

            _ => {}
        }
    }

    /// Handle mouse input
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll.scroll_up(3),
            MouseEventKind::ScrollDown => self.scroll.scroll_down(3),
            _ => {}
        }
    }

    /// Handle terminal resize
    pub fn handle_resize(&mut self, width: u16, height: u16) {
        self.size = (width, height);
    }

    /// Send one line to the session and reflect the outcome on screen
    fn submit(&mut self, line: &str) {
        // Echo dialogue the way it will be sent; control words stay hidden
        if self.session.state() == TurnState::Normal
            && matches!(ControlCommand::parse(line), ControlCommand::Dialogue(_))
        {
            self.display.push_player(line);
        }

        match self.session.handle_input(line, &mut self.display) {
            TurnOutcome::Quit => self.running = false,
            TurnOutcome::Rewritten => self.display.replace_last_narration(line),
            TurnOutcome::UndoRejected(e) => self.display.push_notice(&e.to_string()),
            TurnOutcome::Streaming
            | TurnOutcome::Failed
            | TurnOutcome::AwaitingEdit
            | TurnOutcome::Dumped
            | TurnOutcome::Busy => {}
        }
    }

    fn quit(&mut self) {
        self.session.handle_input("quit", &mut self.display);
        self.running = false;
    }

    fn page_size(&self) -> usize {
        (self.size.1.saturating_sub(INPUT_HEIGHT + 1) / 2).max(1) as usize
    }

    /// Render the UI
    pub fn render<T: Backend>(&mut self, terminal: &mut Terminal<T>) -> anyhow::Result<()> {
        terminal.draw(|frame| self.draw(frame))?;
        Ok(())
    }

    /// Draw one frame
    pub fn draw(&mut self, frame: &mut Frame) {
        let [conversation, input, status] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.draw_conversation(frame, conversation);
        self.draw_input(frame, input);
        self.draw_status(frame, status);
    }

    /// Render conversation pane
    fn draw_conversation(&mut self, frame: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(1) as usize;
        if width < 10 || area.height < 3 {
            return;
        }

        // Build wrapped lines from display messages
        let mut lines: Vec<StyledLine> = Vec::new();
        for msg in &self.display.messages {
            let style = match msg.role {
                DisplayRole::Player => Style::default().fg(PLAYER_RED),
                DisplayRole::Narrator => Style::default().fg(NARRATOR_GREEN),
                DisplayRole::Notice => Style::default().fg(NOTICE_YELLOW),
                DisplayRole::Error => Style::default().fg(ERROR_RED),
            };

            let content = if msg.streaming {
                format!("{}_", msg.content)
            } else {
                msg.content.clone()
            };
            lines.extend(wrap_styled(&content, width, style));
            lines.push(StyledLine {
                text: String::new(),
                style: Style::default(),
            });
        }

        frame.render_stateful_widget(TextBlock::new(&lines), area, &mut self.scroll);
    }

    /// Render input box
    fn draw_input(&self, frame: &mut Frame, area: Rect) {
        let buf = frame.buffer_mut();
        let separator = "-".repeat(area.width as usize);
        buf.set_string(area.x, area.y, &separator, Style::default().fg(DIM_GRAY));

        let text_height = area.height.saturating_sub(1) as usize;
        let text_width = area.width.saturating_sub(1) as usize;
        if text_width < 5 || text_height < 1 {
            return;
        }

        let busy = self.session.is_busy();
        let cursor = if busy { "" } else { "_" };
        let full_input = format!("{}{}{cursor}", self.prompt_label(), self.input_buffer);
        let style = Style::default().fg(if busy { DIM_GRAY } else { PLAYER_RED });

        // Keep the end of long input visible
        let wrapped = wrap_styled(&full_input, text_width, style);
        let skip = wrapped.len().saturating_sub(text_height);
        for (i, line) in wrapped.iter().skip(skip).enumerate() {
            let y = area.y + 1 + i as u16;
            buf.set_string(area.x, y, fit_width(&line.text, text_width), line.style);
        }
    }

    /// Render status bar
    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let state = if self.session.is_busy() {
            "The narrator is speaking..."
        } else if self.session.state() == TurnState::AwaitingEdit {
            "Rewrite the last passage"
        } else {
            "Your move"
        };

        let scroll_info = if self.scroll.scroll_offset > 0 {
            format!(" [^{} lines - PgDn to scroll]", self.scroll.scroll_offset)
        } else {
            String::new()
        };

        let status = format!(" {state} | undo, debug, quit | Esc to quit{scroll_info}");
        frame.buffer_mut().set_string(
            area.x,
            area.y,
            fit_width(&status, area.width as usize),
            Style::default().fg(DIM_GRAY),
        );
    }

    /// Prompt for the current turn state
    pub fn prompt_label(&self) -> &'static str {
        match self.session.state() {
            TurnState::Normal => PROMPT,
            TurnState::AwaitingEdit => EDIT_PROMPT,
        }
    }

    /// Is the app still running?
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current display contents
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// The story session
    pub fn session(&self) -> &Session<B> {
        &self.session
    }

    /// Text typed so far
    pub fn input(&self) -> &str {
        &self.input_buffer
    }
}
