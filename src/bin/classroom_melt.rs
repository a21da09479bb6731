//! classroom-melt: Flatten a classroom export snapshot into keyed collections
//!
//! Usage:
//!   # Newest classroom_data_*.json in the configured directory, stored as JSONL
//!   classroom-melt
//!
//!   # A specific snapshot into a chosen store directory
//!   classroom-melt classroom_data/classroom_data_20250830_192744.json -o ./store
//!
//!   # Read stdin, print every row as one tagged NDJSON stream
//!   cat snapshot.json | classroom-melt - --stdout

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use classroom_melt::config::Config;
use classroom_melt::snapshot::{latest_snapshot, read_snapshot, read_snapshot_file};
use classroom_melt::{store_all, RowWriter, SnapshotMelter};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "classroom-melt")]
#[command(about = "Flatten classroom export snapshots into keyed collections", long_about = None)]
struct Args {
    /// Snapshot file ("-" for stdin). Defaults to the newest snapshot in the input directory
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// TOML config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory scanned for classroom_data_*.json
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory holding one <collection>.jsonl file per collection
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Print rows to stdout as tagged NDJSON instead of upserting into the store
    #[arg(long)]
    stdout: bool,

    /// Comma-separated columns to keep on submission rows
    #[arg(long)]
    submission_columns: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_toml_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(dir) = args.input_dir {
        config.input.snapshot_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output.store_dir = dir;
    }
    if let Some(columns) = args.submission_columns {
        config.normalize.submission_columns = columns
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.json = true;
    }

    init_tracing(&config)?;

    let snapshot = match args.input.as_deref() {
        Some("-") => {
            info!("reading snapshot from stdin");
            read_snapshot(std::io::stdin().lock()).context("failed to read snapshot from stdin")?
        }
        Some(path) => {
            info!(snapshot = %path, "reading snapshot");
            read_snapshot_file(path).with_context(|| format!("failed to read snapshot {}", path))?
        }
        None => {
            let path = latest_snapshot(&config.input.snapshot_dir).with_context(|| {
                format!(
                    "failed to find a snapshot in {}",
                    config.input.snapshot_dir.display()
                )
            })?;
            info!(snapshot = %path.display(), "reading newest snapshot");
            read_snapshot_file(&path)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?
        }
    };

    let melter = SnapshotMelter::new(config.normalize.clone());
    let melted = melter.melt(&snapshot).context("failed to melt snapshot")?;

    if !melted.skipped.is_empty() {
        warn!(skipped = melted.skipped.len(), "some records were skipped");
    }

    if args.stdout {
        let stdout = std::io::stdout();
        let mut writer = RowWriter::tagged(BufWriter::new(stdout.lock()));
        for table in melted.tables() {
            writer.write_table(&table)?;
        }
        writer.flush()?;
    } else {
        store_all(&config.output.store_dir, &melted).with_context(|| {
            format!(
                "failed to store collections in {}",
                config.output.store_dir.display()
            )
        })?;
    }

    info!(
        export_timestamp = ?melted.export_timestamp,
        courses = melted.courses.len(),
        students = melted.students.len(),
        teachers = melted.teachers.len(),
        assignments = melted.assignments.len(),
        submissions = melted.submissions.len(),
        skipped = melted.skipped.len(),
        "run summary"
    );

    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    let default_directive = config
        .logging
        .level
        .parse()
        .context("invalid logging.level directive")?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_directive)
        .from_env_lossy();

    // Logs go to stderr so --stdout output stays clean
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_env_filter(env_filter);

    if config.logging.json {
        builder
            .json()
            .try_init()
            .map_err(|error| anyhow::anyhow!("failed to init JSON logger: {error}"))?;
    } else {
        builder
            .try_init()
            .map_err(|error| anyhow::anyhow!("failed to init logger: {error}"))?;
    }

    Ok(())
}
