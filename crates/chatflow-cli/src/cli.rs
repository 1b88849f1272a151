use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "chatflow")]
#[command(version, about = "ChatFlow - streaming chat in your terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Relay base URL (defaults to http://localhost:3000)
    #[arg(long, global = true, env = "CHATFLOW_RELAY_URL")]
    pub relay_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}
