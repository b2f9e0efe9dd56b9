use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Simple, file-backed planning board CLI.
/// Storage defaults to ~/.planboard/planboard.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "planboard", version, about = "Event planning board CLI")]
pub struct Cli {
    /// Path to the JSON snapshot file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
