//! Presentation Contract
//!
//! Front ends implement [`Presentation`] to receive revealed story text,
//! turn boundaries and errors. Calls arrive in strict emission order from the
//! single thread driving the session.

use crate::error::ErrorKind;
use crate::history::History;
use crate::messages::MessageRole;

/// Sink for everything the session shows to the player
pub trait Presentation {
    /// One revealed display unit of a streaming turn
    fn on_fragment(&mut self, role: MessageRole, text: &str);

    /// The current assistant turn has been fully revealed
    fn on_turn_complete(&mut self);

    /// A backend or parse failure aborted the current turn
    fn on_error(&mut self, kind: ErrorKind, detail: &str);

    /// Inspection hook, called by the `debug` command
    fn on_history_changed(&mut self, _history: &History) {}
}
