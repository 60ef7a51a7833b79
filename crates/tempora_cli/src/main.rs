//! TEMPORA CLI
//!
//! Inspect entity event logs: validate them, order them, and derive
//! point-in-time snapshots and diffs.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commands;
mod demo;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tempora")]
#[command(about = "TEMPORA - Temporal event log for a single entity", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Diagnostic output format (written to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogOutput::Text)]
    log_format: LogOutput,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogOutput {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every event in a log
    Validate {
        /// Path to a JSON or JSON Lines log
        log: PathBuf,
    },
    /// Print the log in timeline order as JSON Lines
    Timeline {
        /// Path to a JSON or JSON Lines log
        log: PathBuf,
        /// Write here instead of stdout (`.json` for an array, else JSON Lines)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Derive the entity's snapshot at a point in time
    Snapshot {
        /// Path to a JSON or JSON Lines log
        log: PathBuf,
        /// Point in time (ISO-8601, UTC)
        #[arg(long)]
        as_of: String,
        /// Entity to derive when the log holds several
        #[arg(short, long)]
        entity: Option<String>,
    },
    /// Diff the entity's snapshots at two points in time
    Diff {
        /// Path to a JSON or JSON Lines log
        log: PathBuf,
        /// Earlier point in time
        #[arg(long)]
        from: String,
        /// Later point in time
        #[arg(long)]
        to: String,
        /// Entity to diff when the log holds several
        #[arg(short, long)]
        entity: Option<String>,
    },
    /// Print the snapshot after every event
    History {
        /// Path to a JSON or JSON Lines log
        log: PathBuf,
        /// Entity to replay when the log holds several
        #[arg(short, long)]
        entity: Option<String>,
    },
    /// Walk through a company's lifecycle
    Demo,
}

fn init_tracing(level: &str, format: LogOutput) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tempora_core={level},tempora_log={level},tempora_replay={level},tempora={level}"
        ))
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogOutput::Text => builder.init(),
        LogOutput::Json => builder.json().init(),
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Validate { log } => commands::validate(&log, &mut out)?,
        Commands::Timeline { log, output } => commands::timeline(&log, output.as_deref(), &mut out)?,
        Commands::Snapshot { log, as_of, entity } => {
            commands::snapshot(&log, &as_of, entity.as_deref(), &mut out)?;
        }
        Commands::Diff {
            log,
            from,
            to,
            entity,
        } => commands::diff(&log, &from, &to, entity.as_deref(), &mut out)?,
        Commands::History { log, entity } => {
            commands::history(&log, entity.as_deref(), &mut out)?;
        }
        Commands::Demo => demo::run(&mut out)?,
    }

    out.flush()?;
    Ok(())
}
