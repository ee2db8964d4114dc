//! Colored line-oriented presentation
//!
//! Story text is printed in blue as soon as it arrives, notices in red. The
//! player's own typing is shown in green by switching the terminal color
//! before reading a line.

use std::io::Write;

use crossterm::style::{Color, ResetColor, SetForegroundColor, Stylize};
use crossterm::QueueableCommand;
use taleweaver_core::{ErrorKind, History, MessageRole, Presentation, TurnState};

/// Prompt shown while waiting for dialogue
pub const PROMPT: &str = "> ";

/// Prompt shown while waiting for a rewritten passage
pub const EDIT_PROMPT: &str = "(story update)> ";

/// Console sink over any writer (stdout in production)
pub struct Console<W: Write> {
    out: W,
    /// Whether the cursor sits after unterminated story text
    mid_line: bool,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            mid_line: false,
        }
    }

    /// Print the input prompt and switch to the player's color
    pub fn prompt(&mut self, state: TurnState) {
        let prompt = match state {
            TurnState::Normal => PROMPT,
            TurnState::AwaitingEdit => EDIT_PROMPT,
        };
        self.end_line();
        let _ = write!(self.out, "{prompt}");
        let _ = self.out.queue(SetForegroundColor(Color::Green));
        let _ = self.out.flush();
    }

    /// Restore the default color after the player pressed enter
    pub fn input_done(&mut self) {
        let _ = self.out.queue(ResetColor);
        let _ = self.out.flush();
    }

    /// Print a red notice on its own line
    pub fn notice(&mut self, text: &str) {
        self.end_line();
        let _ = writeln!(self.out, "{}", text.red());
        let _ = self.out.flush();
    }

    /// Print a hand-written passage in the story color
    pub fn passage(&mut self, text: &str) {
        self.end_line();
        let _ = writeln!(self.out, "{}", text.blue());
        let _ = self.out.flush();
    }

    fn end_line(&mut self) {
        if self.mid_line {
            let _ = writeln!(self.out);
            self.mid_line = false;
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presentation for Console<W> {
    fn on_fragment(&mut self, role: MessageRole, text: &str) {
        let styled = match role {
            MessageRole::Assistant => text.blue(),
            MessageRole::User => text.green(),
            MessageRole::System => text.dark_grey(),
        };
        let _ = write!(self.out, "{styled}");
        let _ = self.out.flush();
        self.mid_line = !text.ends_with('\n');
    }

    fn on_turn_complete(&mut self) {
        self.end_line();
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }

    fn on_error(&mut self, kind: ErrorKind, detail: &str) {
        self.notice(&format!("The story was interrupted ({kind} error): {detail}"));
    }

    fn on_history_changed(&mut self, history: &History) {
        self.end_line();
        let _ = writeln!(self.out, "{}", history.dump());
        let _ = self.out.flush();
    }
}
