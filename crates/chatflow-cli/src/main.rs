mod cli;
mod completions;
mod config;
mod relay;
mod session;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load();

    // Configure logging: always write to file (the TUI owns the terminal)
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatflow")
        .join("logs");
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "chatflow.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    if let Some(Commands::Completions { shell }) = cli.command {
        completions::generate_completions(shell);
        return Ok(());
    }

    let relay_url = config.resolve_relay_url(cli.relay_url);
    tracing::info!("Connecting to relay at {}", relay_url);

    tui::run(relay_url).await
}
