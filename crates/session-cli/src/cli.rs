use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sessionctl")]
#[command(author, version, about = "Inspect and exercise session coordination state", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML config file (defaults apply when omitted)
    #[arg(short, long, global = true, env = "SESSIONS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Restore the engine from the configured store and print its statistics
    Stats,

    /// Run the four-worker pipeline scenario against the configured store
    Demo,
}
