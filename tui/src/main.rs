//! Taleweaver TUI Entry Point
//!
//! Usage:
//!   taleweaver-tui --story <FILE> [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>              Settings file
//!       --ollama-url <URL>           Ollama base URL
//!   -m, --model <MODEL>              Model to narrate with
//!       --reveal-interval-ms <MS>    Delay between revealed words
//!
//! Logs go to `$XDG_STATE_HOME/taleweaver/tui.log` when `RUST_LOG` is set.

use std::io;
use std::panic;
use std::path::PathBuf;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taleweaver_core::{load_config, ChatBackend, ConfigOverrides, OllamaBackend, Session};
use taleweaver_tui::App;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "taleweaver-tui")]
#[command(author, version, about = "Play an interactive story in a full-screen terminal UI", long_about = None)]
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

    /// Delay between revealed words in milliseconds
    #[arg(long, value_name = "MS")]
    reveal_interval_ms: Option<u64>,
}

/// Log to a file; the terminal belongs to the UI
fn init_logging() -> anyhow::Result<Option<PathBuf>> {
    if std::env::var_os("RUST_LOG").is_none() {
        return Ok(None);
    }

    let dir = dirs::state_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("taleweaver");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("tui.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    Ok(Some(path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(path) = init_logging()? {
        tracing::info!(path = %path.display(), "Logging to file");
    }

    // Check if we have a TTY before attempting initialization
    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: taleweaver-tui requires a terminal (TTY)");
        eprintln!();
        eprintln!("For piped or scripted play, use the line-oriented `taleweaver` binary.");
        std::process::exit(1);
    }

    let overrides = ConfigOverrides {
        ollama_url: args.ollama_url,
        model: args.model,
        reveal_interval_ms: args.reveal_interval_ms,
    };
    let config = match load_config(&args.story, args.config, &overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\x1b[31mError: {e}\x1b[0m");
            std::process::exit(1);
        }
    };

    let backend = OllamaBackend::new(&config.backend)?;
    if !backend.health_check().await {
        tracing::warn!(url = backend.base_url(), "Ollama is not responding");
    }
    let prompt = config.story.build_prompt();
    let session = Session::new(backend, config.session, config.reveal);

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before printing panic
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    // Run the app
    let size = crossterm::terminal::size()?;
    let mut app = App::new(session, prompt, size);
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Propagate any errors
    result
}
