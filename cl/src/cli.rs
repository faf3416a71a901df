//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

/// Codeloop - let a chat model work in a local checkout through tool calls
#[derive(Debug, Parser)]
#[command(
    name = "codeloop",
    about = "Streaming tool-calling loop for chat models",
    version
)]
pub struct Cli {
    /// What to ask the model; multiple words are joined with spaces
    #[arg(value_name = "QUERY", required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Path to config file
    #[arg(short, long, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, help = "Enable debug logging")]
    pub verbose: bool,

    /// Working directory for tools
    #[arg(short = 'C', long = "workdir", value_name = "DIR", help = "Working directory for tools")]
    pub workdir: Option<PathBuf>,
}

impl Cli {
    /// The query as one string
    pub fn query_text(&self) -> String {
        debug!(words = self.query.len(), "Cli::query_text: called");
        self.query.join(" ")
    }
}
