use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cognichat_core::{Config, ConversationStore};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "cognichat")]
#[command(version, about = "Terminal chat client with a conversation sidebar")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
    /// Delay before the simulated reply, in milliseconds
    #[arg(long)]
    reply_delay_ms: Option<u64>,
    /// Start without the demo conversations
    #[arg(long)]
    empty: bool,
    /// Write logs here instead of the default log file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config_path, loaded) = match cli.config.clone() {
        Some(path) => {
            let loaded = Config::load_from(&path);
            (Some(path), loaded)
        }
        None => (Config::config_path().ok(), Config::load()),
    };
    let (mut config, config_error) = match loaded {
        Ok(config) => (config, None),
        Err(err) => (Config::new(), Some(err)),
    };
    if let Some(delay) = cli.reply_delay_ms {
        config.reply_delay_ms = Some(delay);
    }

    let log_path = match cli.log_file.clone() {
        Some(path) => path,
        None => logging::default_log_path()?,
    };
    logging::init_logging(&log_path, config.log_level())?;

    if let Some(err) = config_error {
        tracing::warn!(error = ?err, "config unreadable, using defaults");
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log = %log_path.display(),
        "starting cognichat"
    );

    let store = if cli.empty {
        ConversationStore::new()
    } else {
        ConversationStore::with_demo_seed()
    };

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(store, &config, events.sender());
    app.config_path = config_path;

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    tracing::info!("cognichat exited");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
