// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Aesthete: AI Image Quality Sorter
//!
//! Rates images with a vision model and files them into score-range folders.

use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use aesthete::batch::{is_supported_image, BatchEvent, BatchObserver, BatchRunner};
use aesthete::config::AppConfig;
use aesthete::evaluation::{Score, ScoringMode};
use aesthete::evaluator::Evaluator;
use aesthete::folders::Bucket;
use aesthete::history::{History, UndoOutcome};
use aesthete::openai::OpenAiClient;
use aesthete::{Result, SorterError};

/// Aesthete CLI - AI Image Quality Sorter
#[derive(Parser, Debug)]
#[command(name = "aesthete")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Sort images into score folders using a vision model", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (YAML format)
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate an image or directory and sort it into score folders
    Sort {
        /// Image file or directory (prompted for when omitted)
        path: Option<PathBuf>,

        /// Walk subdirectories too
        #[arg(short, long)]
        recursive: bool,

        /// Evaluate and log without moving files
        #[arg(long)]
        dry_run: bool,

        /// Scoring mode: averaged or direct (overrides config)
        #[arg(long)]
        mode: Option<ScoringMode>,
    },

    /// Show the folder a score is filed under
    Bucket {
        /// Score between 1 and 100
        score: u64,
    },

    /// History and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Check that the model provider is reachable
    Status,

    /// Create a default configuration and directories
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent moves
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Move recently sorted files back
    Undo {
        /// Number of moves to undo
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Some(Commands::Sort { path, recursive, dry_run, mode }) => {
            let config = AppConfig::load(&cli.config)?;
            run_sort(config, path, recursive, dry_run, mode, cli.quiet).await
        }
        Some(Commands::Bucket { score }) => run_bucket(score),
        Some(Commands::History { action }) => {
            let config = AppConfig::load(&cli.config)?;
            run_history_command(&config, action)
        }
        Some(Commands::Config { action }) => run_config_command(action, &cli.config),
        Some(Commands::Status) => {
            let config = AppConfig::load(&cli.config)?;
            run_status(config).await
        }
        Some(Commands::Init { dir, force }) => run_init(dir, force),
        None => {
            // Default: interactive sort
            let config = AppConfig::load(&cli.config)?;
            run_sort(config, None, false, false, None, cli.quiet).await
        }
    }
}

/// Evaluate and sort a file or directory
async fn run_sort(
    config: AppConfig,
    path: Option<PathBuf>,
    recursive: bool,
    dry_run: bool,
    mode: Option<ScoringMode>,
    quiet: bool,
) -> Result<()> {
    let api_key = config.resolve_api_key()?;

    let (source, recursive) = match path {
        Some(path) => (path, recursive),
        None => prompt_for_source()?,
    };

    if dry_run {
        warn!("DRY RUN MODE - files will not be moved");
    }

    let client = OpenAiClient::new(&config.openai, api_key)?;
    let mut evaluator = Evaluator::new(client, &config);
    if let Some(mode) = mode {
        evaluator = evaluator.with_mode(mode);
    }
    info!(
        "Using model {} ({} scoring)",
        config.openai.model,
        evaluator.mode()
    );

    if source.is_file() {
        println!("\nProcessing single file: {}", source.display());
    } else {
        println!("\nProcessing directory: {}", source.display());
    }

    let runner = BatchRunner::new(&evaluator, &config).with_dry_run(dry_run);
    let mut progress = ConsoleProgress { quiet, dry_run };
    runner.run(&source, recursive, &mut progress).await?;

    Ok(())
}

/// Ask for a source until a usable one is given
fn prompt_for_source() -> Result<(PathBuf, bool)> {
    let theme = ColorfulTheme::default();

    let path = loop {
        let input = Input::<String>::with_theme(&theme)
            .with_prompt("Enter the path to an image or directory")
            .interact_text()?;
        let path = PathBuf::from(input.trim());

        if path.is_dir() || (path.is_file() && is_supported_image(&path)) {
            break path;
        }
        println!("Invalid path. Please enter a valid path to an image file or directory.");
    };

    let recursive = if path.is_dir() {
        Confirm::with_theme(&theme)
            .with_prompt("Process directories recursively?")
            .default(false)
            .interact()?
    } else {
        false
    };

    Ok((path, recursive))
}

/// Prints per-image progress and the final summary
struct ConsoleProgress {
    quiet: bool,
    dry_run: bool,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl BatchObserver for ConsoleProgress {
    fn on_event(&mut self, event: BatchEvent<'_>) {
        match event {
            BatchEvent::Finished { summary } => {
                let totals = &summary.totals;
                println!("\nFinal token usage summary:");
                println!("{}", "=".repeat(50));
                println!("Total images processed: {}", totals.processed_count);
                println!("Total prompt tokens: {}", totals.prompt_tokens);
                println!("Total completion tokens: {}", totals.completion_tokens);
                println!("Total tokens used: {}", totals.total_tokens);
                if let Some(avg) = totals.average_tokens_per_image() {
                    println!("Average tokens per image: {:.2}", avg);
                }
                let folders: Vec<String> = summary.folders.iter().map(|b| b.name()).collect();
                println!("\nCreated folders: {:?}", folders);
                if summary.skipped > 0 {
                    println!("Skipped (destination exists): {}", summary.skipped);
                }
                if summary.failed > 0 {
                    println!("Failed: {}", summary.failed);
                }
            }
            _ if self.quiet => {}
            BatchEvent::Started { total } => {
                println!("\nStarting to process {} images...", total);
                println!("{}", "=".repeat(50));
            }
            BatchEvent::ImageStarted { index, total, path } => {
                println!("\nProcessing image {}/{}: {}", index, total, display_name(path));
            }
            BatchEvent::Usage { path, usage, totals } => {
                println!("Token usage for {}:", display_name(path));
                println!("  Prompt tokens: {}", usage.prompt_tokens);
                println!("  Completion tokens: {}", usage.completion_tokens);
                println!("  Total tokens: {}", usage.total_tokens);
                println!("\nRunning totals after {} images:", totals.processed_count);
                println!("  Total prompt tokens: {}", totals.prompt_tokens);
                println!("  Total completion tokens: {}", totals.completion_tokens);
                println!("  Accumulated total tokens: {}", totals.total_tokens);
                println!("{}", "-".repeat(50));
            }
            BatchEvent::Sorted { path, score, bucket, destination } => {
                let name = display_name(path);
                println!("Evaluated {} with score {}", name, score);
                match destination {
                    Some(dest) => println!("Moved {} to {}", name, dest.display()),
                    None if self.dry_run => println!("DRY RUN: Would move {} to {}", name, bucket),
                    None => {}
                }
            }
            BatchEvent::Skipped { path, score, existing } => {
                println!(
                    "Evaluated {} with score {}, left in place ({} exists)",
                    display_name(path),
                    score,
                    existing.display()
                );
            }
            BatchEvent::Failed { path, reason } => {
                println!("Failed to evaluate {}: {}", display_name(path), reason);
            }
        }
    }
}

/// Print the bucket for a score
fn run_bucket(score: u64) -> Result<()> {
    let score = Score::new(score).ok_or_else(|| {
        SorterError::Config(format!("Score must be between 1 and 100, got {}", score))
    })?;
    println!("{}", Bucket::for_score(score));
    Ok(())
}

/// Run history commands
fn run_history_command(config: &AppConfig, action: HistoryCommands) -> Result<()> {
    let history = History::new(config.history_path());

    match action {
        HistoryCommands::List { count } => {
            let entries = history.get_recent(count)?;
            println!("Recent history ({} entries):", entries.len());
            for entry in entries {
                let status = if entry.undone { "[UNDONE]" } else { "" };
                println!("  {} [{}] {} -> {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.score,
                    entry.original_path.display(),
                    entry.new_path.display(),
                    status
                );
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            let results = history.undo(count, dry_run)?;

            if results.is_empty() {
                println!("No moves to undo");
                return Ok(());
            }

            for (entry, outcome) in results {
                let from = entry.new_path.display();
                let to = entry.original_path.display();
                match outcome {
                    UndoOutcome::Restored => println!("Undone: {} -> {}", from, to),
                    UndoOutcome::WouldRestore => println!("Would undo: {} -> {}", from, to),
                    UndoOutcome::Missing => println!("Skip: {} (file not found)", from),
                    UndoOutcome::Occupied => println!("Skip: {} (original path already exists)", to),
                }
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            history.clear()?;
            println!("History cleared");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let mut config = AppConfig::load(config_path)?;
            if !config.openai.api_key.is_empty() {
                config.openai.api_key = "<redacted>".to_string();
            }
            print!("{}", serde_yaml::to_string(&config)?);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            let config = AppConfig::load(config_path)?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Model: {}", config.openai.model);
            println!("  Max tokens: {}", config.openai.max_tokens);
            println!("  Output directory: {}", config.directories.output.display());
            println!("  Evaluation log: {}", config.log_path().display());
            println!("  Scoring mode: {}", config.scoring.mode);
            match config.resolve_api_key() {
                Ok(_) => println!("  API key: set"),
                Err(e) => println!("  API key: missing ({})", e),
            }
        }
    }

    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    let client = OpenAiClient::new(&config.openai, config.resolve_api_key()?)?;

    println!("Aesthete v{} Status", env!("CARGO_PKG_VERSION"));
    println!("======================");
    println!("Endpoint: {}", config.openai.base_url);

    match client.list_models().await {
        Ok(models) => {
            println!("Provider: Reachable");
            if models.iter().any(|m| m == client.model()) {
                println!("Model '{}': available", client.model());
            } else {
                println!("Model '{}': not listed ({} models visible)", client.model(), models.len());
            }
        }
        Err(e) => println!("Provider: Error - {}", e),
    }

    println!("\nConfiguration:");
    println!("  Output directory: {}", config.directories.output.display());
    println!("  Evaluation log: {}", config.log_path().display());
    println!("  Scoring mode: {}", config.scoring.mode);

    Ok(())
}

/// Initialize a new Aesthete project
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.yaml");

    if config_path.exists() && !force {
        return Err(SorterError::Config(
            "config.yaml already exists. Use --force to overwrite".to_string()
        ));
    }

    let mut config = AppConfig::default();
    config.directories.output = target.join("output_folders");
    config.directories.logs = target.join("logs");

    // Create directories
    std::fs::create_dir_all(&config.directories.output)?;
    std::fs::create_dir_all(&config.directories.logs)?;

    config.save(&config_path)?;

    println!("Aesthete initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - config.yaml");
    println!("  - output_folders/");
    println!("  - logs/");
    println!("\nNext steps:");
    println!("  1. export OPENAI_API_KEY=...");
    println!("  2. aesthete sort <image-or-directory>");

    Ok(())
}
