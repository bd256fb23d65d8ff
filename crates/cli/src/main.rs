//! AskRC CLI
//!
//! Main entry point for the askrc command-line tool.
//! Answers research-computing questions from indexed documentation.

mod commands;

use askrc_core::{config::AppConfig, logging, AppResult};
use clap::{Parser, Subcommand};
use commands::{AskCommand, GroundCommand, ScreenCommand};
use std::path::PathBuf;

/// AskRC - documentation-grounded answers for research computing
#[derive(Parser, Debug)]
#[command(name = "askrc")]
#[command(about = "Documentation-grounded answers for research computing", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "ASKRC_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "ASKRC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Model identifier
    #[arg(short, long, global = true, env = "ASKRC_MODEL")]
    model: Option<String>,

    /// Documentation fragments retrieved per question
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Shared content words required for a grounded answer
    #[arg(long, global = true)]
    threshold: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one or more questions
    Ask(AskCommand),

    /// Check how well an answer is grounded in a context
    Ground(GroundCommand),

    /// Run the bias screen on a piece of text
    Screen(ScreenCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration from defaults, config file and environment
    let config = AppConfig::load(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let mut config = config.with_overrides(
        cli.model,
        cli.top_k,
        cli.threshold,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    config.json_logs |= cli.json_logs;

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.json_logs)?;

    tracing::info!("AskRC CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Model: {}", config.generation.model);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Ground(_) => "ground",
        Commands::Screen(_) => "screen",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Ground(cmd) => cmd.execute(&config),
        Commands::Screen(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
