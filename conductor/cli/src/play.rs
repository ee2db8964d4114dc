//! The read-narrate loop
//!
//! Ctrl-C is watched for the whole run, so it ends the story even while the
//! backend is still thinking or the reply is streaming.

use std::io::Write;

use taleweaver_core::{ChatBackend, Session, StoryPrompt, TurnOutcome};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::console::Console;

/// Forward every Ctrl-C for the rest of the process
pub fn watch_interrupts() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).await.is_err() {
                break;
            }
        }
        warn!("Ctrl-C watcher stopped");
    });
    rx
}

/// Read one line without its terminator
///
/// Bytes that are not UTF-8 are replaced rather than rejected. `None` means
/// the input is gone.
async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> Option<String> {
    let mut buf = Vec::new();
    match input.read_until(b'\n', &mut buf).await {
        Ok(0) => None,
        Ok(_) => {
            let line = String::from_utf8_lossy(&buf);
            Some(line.trim_end_matches(['\n', '\r']).to_string())
        }
        Err(e) => {
            warn!(error = %e, "Failed to read input");
            None
        }
    }
}

/// Play the story until `quit`, end of input or Ctrl-C
pub async fn play<B, R, W>(
    session: &mut Session<B>,
    prompt: &StoryPrompt,
    mut input: R,
    console: &mut Console<W>,
    interrupts: &mut mpsc::Receiver<()>,
) where
    B: ChatBackend + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut outcome = session.start(prompt, console);

    loop {
        if outcome == TurnOutcome::Streaming {
            let interrupted = tokio::select! {
                _ = session.finish_turn(console) => false,
                Some(()) = interrupts.recv() => true,
            };
            if interrupted {
                session.handle_input("quit", console);
                break;
            }
        }

        console.prompt(session.state());
        let line = tokio::select! {
            line = read_line(&mut input) => line,
            Some(()) = interrupts.recv() => None,
        };
        console.input_done();

        // End of input or Ctrl-C ends the story like `quit`
        let line = line.unwrap_or_else(|| "quit".to_string());

        outcome = session.handle_input(&line, console);
        match outcome {
            TurnOutcome::AwaitingEdit => console.notice("How would you like to change the story:"),
            TurnOutcome::UndoRejected(e) => console.notice(&e.to_string()),
            TurnOutcome::Rewritten => console.passage(&line),
            TurnOutcome::Quit => break,
            TurnOutcome::Streaming
            | TurnOutcome::Dumped
            | TurnOutcome::Failed
            | TurnOutcome::Busy => {}
        }
    }

    info!(messages = session.history().len(), "Goodbye");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use taleweaver_core::backend::test_utils::ScriptedBackend;
    use taleweaver_core::{RevealConfig, SessionConfig};

    fn session(backend: ScriptedBackend) -> Session<ScriptedBackend> {
        let config = SessionConfig {
            model: "llama2".to_string(),
            word_budget: 4096,
            context_size: 4096,
            temperature: 0.5,
        };
        Session::new(backend, config, RevealConfig::immediate())
    }

    fn prompt() -> StoryPrompt {
        StoryPrompt {
            system: "You narrate.".to_string(),
            opening: "Begin.".to_string(),
        }
    }

    async fn run(backend: ScriptedBackend, input: &[u8]) -> (Session<ScriptedBackend>, String) {
        let mut session = session(backend);
        let mut console = Console::new(Vec::new());
        let (_tx, mut interrupts) = mpsc::channel(1);
        play(&mut session, &prompt(), input, &mut console, &mut interrupts).await;
        let out = String::from_utf8(console.into_inner()).unwrap();
        (session, out)
    }

    #[tokio::test]
    async fn test_interrupt_while_backend_silent() {
        let mut session = session(ScriptedBackend::new().stall());
        let mut console = Console::new(Vec::new());
        let (tx, mut interrupts) = mpsc::channel(1);
        tx.send(()).await.unwrap();

        let finished = tokio::time::timeout(
            Duration::from_secs(2),
            play(&mut session, &prompt(), &b""[..], &mut console, &mut interrupts),
        )
        .await;

        assert!(finished.is_ok());
        assert!(session.is_ended());
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_rewrite_is_printed() {
        let backend = ScriptedBackend::new().reply(["A wolf howls."]);
        let (session, out) = run(backend, b"undo\nA dog barks.\nquit\n").await;

        assert!(out.contains("How would you like to change the story:"));
        assert!(out.contains("A dog barks."));
        assert_eq!(session.history().last().unwrap().content, "A dog barks.");
        assert!(session.is_ended());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_dialogue() {
        let backend = ScriptedBackend::new().reply(["Hi."]).reply(["Ok."]);
        let (session, _) = run(backend.clone(), b"caf\xff\n").await;

        let sent = &backend.requests()[1];
        assert_eq!(sent.messages.last().unwrap().content, "caf\u{FFFD}");
        assert_eq!(session.history().last().unwrap().content, "Ok.");
        assert!(session.is_ended());
    }

    #[tokio::test]
    async fn test_end_of_input_quits() {
        let backend = ScriptedBackend::new().reply(["Hello."]);
        let (session, out) = run(backend.clone(), b"").await;

        assert!(session.is_ended());
        assert!(out.contains("Hello."));
        assert_eq!(backend.request_count(), 1);
    }
}
