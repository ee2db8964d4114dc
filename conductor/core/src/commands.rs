//! Player commands

/// What a line of player input asks for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// End the session
    Quit,
    /// Retract the last story passage for rewriting
    Undo,
    /// Dump the history to the inspection sink
    Debug,
    /// Anything else, kept verbatim
    Dialogue(String),
}

impl ControlCommand {
    /// Classify one line of input
    ///
    /// Only the line terminator is ignored when matching the control words;
    /// dialogue text is kept exactly as typed.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        match input.trim_end_matches(['\n', '\r']) {
            "quit" => Self::Quit,
            "undo" => Self::Undo,
            "debug" => Self::Debug,
            text => Self::Dialogue(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control_words() {
        assert_eq!(ControlCommand::parse("quit"), ControlCommand::Quit);
        assert_eq!(ControlCommand::parse("undo\n"), ControlCommand::Undo);
        assert_eq!(ControlCommand::parse("debug\r\n"), ControlCommand::Debug);
    }

    #[test]
    fn test_near_misses_are_dialogue() {
        for text in ["Quit", " undo", "debug please", "quit "] {
            assert_eq!(
                ControlCommand::parse(text),
                ControlCommand::Dialogue(text.to_string())
            );
        }
    }

    #[test]
    fn test_dialogue_kept_verbatim() {
        assert_eq!(
            ControlCommand::parse("  I draw my sword.\n"),
            ControlCommand::Dialogue("  I draw my sword.".to_string())
        );
        assert_eq!(
            ControlCommand::parse(""),
            ControlCommand::Dialogue(String::new())
        );
    }
}
