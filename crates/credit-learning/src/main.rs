//! CLI entry point for the credit default pipeline.

use anyhow::Result;
use clap::{Parser, Subcommand};
use credit_learning::{TrainerConfig, run_pipeline, run_training};
use credit_processing::{ProjectConfig, run_preprocessing};
use dotenv::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Load, preprocess, train and report (default)
    Run,
    /// Load and preprocess only, writing the processed dataset
    Preprocess,
    /// Train and report from an existing processed dataset
    Train,
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Credit default risk baseline pipeline",
    long_about = "Cleans a customer table, trains logistic regression and random forest \
                  baselines, and writes ROC-AUC, PR-AUC and top-K capture per model.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  CREDIT_DEFAULT_CONFIG    Path to the TOML configuration file\n  \
                  RUST_LOG                 Log filter, overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Full pipeline with config/config.toml\n  \
                  credit-default\n\n  \
                  # Only rebuild the processed dataset\n  \
                  credit-default --config my.toml preprocess\n\n  \
                  # Metrics as JSON\n  \
                  credit-default --json train"
)]
struct Args {
    /// Path to the TOML configuration file
    ///
    /// Falls back to $CREDIT_DEFAULT_CONFIG, then config/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Print the result as JSON to stdout instead of logging
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn execute(args: &Args) -> credit_processing::Result<Option<String>> {
    let config_path = ProjectConfig::resolve_path(args.config.as_deref());
    info!("Using configuration: {}", config_path.display());
    let project = ProjectConfig::from_file(&config_path)?;
    let trainer = TrainerConfig::from_project(&project);

    let output = match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            let run = run_pipeline(&project, &trainer)?;
            args.json
                .then(|| serde_json::to_string_pretty(&run.metrics))
                .transpose()?
        }
        Command::Preprocess => {
            let output = run_preprocessing(&project)?;
            for step in &output.summary.processing_steps {
                info!("  {}", step);
            }
            args.json
                .then(|| serde_json::to_string_pretty(&output.summary))
                .transpose()?
        }
        Command::Train => {
            let records = run_training(&project, &trainer)?;
            args.json
                .then(|| serde_json::to_string_pretty(&records))
                .transpose()?
        }
    };

    Ok(output)
}

/// Run the selected stages and print the outcome.
///
/// A pipeline failure is reported here exactly once and turned into a
/// failing exit code; only output errors propagate.
fn run(args: &Args) -> Result<ExitCode> {
    match execute(args) {
        Ok(Some(json)) => {
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            } else {
                error!("Pipeline failed [{}]: {}", e.error_code(), e);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Environment must be loaded before the config path is resolved.
    dotenv().ok();
    init_logging(&args.log_level, args.quiet, args.json);

    run(&args)
}
