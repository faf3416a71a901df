//! Codeloop - streaming tool-calling orchestrator
//!
//! CLI entry point: runs one query against the configured model.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use codeloop::cli::Cli;
use codeloop::config::Config;
use codeloop::conversation::{ConversationEvent, Orchestrator, OrchestratorConfig, StopCause, render_system_prompt};
use codeloop::llm::create_client;
use codeloop::tools::standard_manager;

/// Longest argument preview printed for a tool call
const ARGUMENT_PREVIEW_CHARS: usize = 120;

fn setup_logging(verbose: bool) -> Result<PathBuf> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("codeloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    let log_path = log_dir.join("codeloop.log");
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(log_path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = setup_logging(cli.verbose).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = &cli.workdir {
        debug!(?dir, "main: workdir override from CLI");
        config.agent.working_dir = Some(dir.clone());
    }
    config.validate()?;

    info!(model = %config.llm.model, base_url = %config.llm.base_url, "Codeloop loaded config");

    let outcome = run_query(&config, &cli.query_text()).await;
    if let Err(e) = &outcome {
        tracing::error!(error = %e, "main: query failed");
        eprintln!("{} see {}", "log:".dimmed(), log_path.display());
    }
    outcome
}

async fn run_query(config: &Config, query: &str) -> Result<()> {
    let work_dir = match &config.agent.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    info!(?work_dir, "run_query: working directory");

    let tools = Arc::new(standard_manager(&work_dir).context("Failed to register built-in tools")?);
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let system_prompt = render_system_prompt(config.agent.system_prompt.as_deref(), &work_dir)?;

    let orchestrator = Orchestrator::new(
        llm,
        tools,
        OrchestratorConfig {
            system_prompt,
            max_tokens: config.llm.max_tokens,
        },
    );

    let (tx, rx) = mpsc::channel(256);
    let printer = tokio::spawn(print_events(rx));

    let result = orchestrator.run(query, tx).await;
    // The sender is gone once run returns, so the printer drains and exits
    let _ = printer.await;

    if let Err(e) = &result
        && let Some(wait) = e.retry_after()
    {
        eprintln!("{} rate limited, retry after {}s", "warning:".yellow().bold(), wait.as_secs());
    }
    let outcome = result.context("Model request failed")?;
    println!();
    if outcome.stop == StopCause::RoundLimit {
        eprintln!(
            "{} stopped after {} rounds; the model was still requesting tools",
            "warning:".yellow().bold(),
            outcome.rounds
        );
    }
    info!(rounds = outcome.rounds, stop = ?outcome.stop, "run_query: complete");
    Ok(())
}

/// Stream model text to stdout and tool activity to stderr
async fn print_events(mut rx: mpsc::Receiver<ConversationEvent>) {
    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        match event {
            ConversationEvent::TextDelta(text) => {
                let _ = write!(stdout, "{}", text);
                let _ = stdout.flush();
            }
            ConversationEvent::ToolCallStarted { name, arguments, .. } => {
                eprintln!("\n{} {} {}", "tool".cyan().bold(), name.bold(), preview(&arguments).dimmed());
            }
            ConversationEvent::ToolCallFinished { result, .. } => {
                if result.success {
                    eprintln!("{} {}", "  ok".green(), result.name);
                } else {
                    eprintln!(
                        "{} {}: {}",
                        "  failed".red(),
                        result.name,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            ConversationEvent::StreamInterrupted { round, error } => {
                eprintln!("\n{} round {} stream interrupted: {}", "warning:".yellow().bold(), round, error);
            }
            ConversationEvent::RoundComplete { round, tool_calls } => {
                debug!(round, tool_calls, "print_events: round complete");
            }
        }
    }
}

fn preview(arguments: &str) -> String {
    let flat = arguments.replace('\n', " ");
    if flat.chars().count() <= ARGUMENT_PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(ARGUMENT_PREVIEW_CHARS).collect();
    format!("{}...", cut)
}
