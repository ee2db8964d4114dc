//! Taleweaver CLI
//!
//! Line-oriented front end: the narrator's text streams straight to the
//! terminal and the player answers one line at a time.
//!
//! # Usage
//!
//! ```bash
//! taleweaver --story stories/lighthouse.yaml
//!
//! # Different backend or model for this run
//! taleweaver -s stories/lighthouse.yaml --ollama-url http://gpu:11434 --model llama3
//!
//! # With verbose logging (stderr)
//! RUST_LOG=taleweaver_core=debug taleweaver -s stories/lighthouse.yaml
//! ```
//!
//! # Commands
//!
//! - `undo`: retract the last passage and type a replacement
//! - `debug`: print the conversation history as JSON
//! - `quit`: leave the story (Ctrl-C and end of input work too)

mod console;
mod play;

use std::path::PathBuf;

use clap::Parser;
use taleweaver_core::{load_config, ChatBackend, ConfigOverrides, OllamaBackend, RevealConfig, Session};
use tokio::io::BufReader;
use tracing::warn;

use console::Console;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "taleweaver")]
#[command(author, version, about = "Play an interactive story narrated by a local LLM", long_about = None)]
struct Args {
    /// Story file (YAML)
    #[arg(short = 's', long, value_name = "FILE")]
    story: PathBuf,

    /// Settings file (default: $XDG_CONFIG_HOME/taleweaver/config.toml)
    #[arg(short = 'c', long, env = "TALEWEAVER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ollama base URL, e.g. http://localhost:11434
    #[arg(long, value_name = "URL")]
    ollama_url: Option<String>,

    /// Model to narrate with
    #[arg(short = 'm', long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("taleweaver=warn,taleweaver_core=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let mut console = Console::new(std::io::stdout());

    let overrides = ConfigOverrides {
        ollama_url: args.ollama_url,
        model: args.model,
        reveal_interval_ms: None,
    };
    let config = match load_config(&args.story, args.config, &overrides) {
        Ok(config) => config,
        Err(e) => {
            console.notice(&format!("Error: {e}"));
            std::process::exit(1);
        }
    };

    let backend = OllamaBackend::new(&config.backend)?;
    if !backend.health_check().await {
        warn!(url = backend.base_url(), "Ollama is not responding; the first turn may fail");
    }

    let prompt = config.story.build_prompt();
    let mut session = Session::new(backend, config.session, RevealConfig::immediate());
    let mut interrupts = play::watch_interrupts();

    let stdin = BufReader::new(tokio::io::stdin());
    play::play(&mut session, &prompt, stdin, &mut console, &mut interrupts).await;

    Ok(())
}
