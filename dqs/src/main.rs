//! Data quality auditing tool.
//!
//! Ingests a delimited file, a database table, or a JSON endpoint and prints
//! a data quality audit report: seven dimension scores, a composite score,
//! issues, prioritized remediation, and regulatory risk narratives.
//!
//! # Guarantees
//! - Sources are only read, never modified
//! - Connection credentials are redacted in every log line
//! - Reports go to stdout (or `--output`); logs go to stderr

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use dqs_core::{
    AuditConfig, AuditEngine, AuditReport, DqsError, EndpointSource, FailureReport, FileSource,
    SourceDescriptor, TableSource, build_context, logging::init_logging,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dqs")]
#[command(about = "Data quality scoring engine")]
#[command(version)]
#[command(long_about = "
DQS - Data quality scoring engine

Audits tabular data across seven dimensions (Completeness, Accuracy,
Consistency, Validity, Timeliness, Uniqueness, Integrity) and reports a
weighted composite score, issues, prioritized remediation actions, and
regulatory compliance risks.

SOURCES:
- Delimited files (CSV, TSV, ...)
- Database tables (postgres://, sqlite://)
- JSON endpoints returning an array of flat objects (http://, https://)

EXAMPLES:
  dqs file transactions.csv
  dqs --config audit.json table postgres://auditor@localhost/finance public.transactions
  dqs --context 2000 endpoint https://api.internal/transactions -H 'Authorization: Bearer ...'
  dqs placeholder
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Audit a delimited text file
    File(FileArgs),
    /// Audit a database table
    Table(TableArgs),
    /// Audit a JSON endpoint
    Endpoint(EndpointArgs),
    /// Print the fixed demo report
    Placeholder,
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// Path to the file
    pub path: PathBuf,

    /// Declared text encoding
    #[arg(long, help = "Text encoding (utf-8, ascii, latin-1)")]
    pub encoding: Option<String>,

    /// Field delimiter
    #[arg(
        long,
        default_value = ",",
        value_parser = parse_delimiter,
        help = "Single-byte field delimiter"
    )]
    pub delimiter: u8,
}

#[derive(Args, Debug)]
pub struct TableArgs {
    /// Database connection URL
    #[arg(
        env = "DQS_DATABASE_URL",
        help = "Database connection string (credentials will be redacted in logs)"
    )]
    pub database_url: String,

    /// Table to audit
    #[arg(help = "Table name, optionally schema-qualified (schema.table)")]
    pub table: String,
}

#[derive(Args, Debug)]
pub struct EndpointArgs {
    /// Endpoint URL
    pub url: String,

    /// Extra request headers
    #[arg(
        short = 'H',
        long = "header",
        value_parser = parse_header,
        help = "Request header as 'Name: value' (repeatable)"
    )]
    pub headers: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Audit configuration file
    #[arg(
        long,
        global = true,
        env = "DQS_CONFIG",
        help = "JSON file with thresholds, penalties, weights, and rules"
    )]
    pub config: Option<PathBuf>,

    /// Output file path
    #[arg(short, long, global = true, help = "Write the report to a file instead of stdout")]
    pub output: Option<PathBuf>,

    /// Render the bounded text context instead of JSON
    #[arg(
        long,
        global = true,
        value_name = "MAX_CHARS",
        help = "Print a text summary of at most MAX_CHARS characters"
    )]
    pub context: Option<usize>,

    /// Ingestion deadline in seconds
    #[arg(long, global = true, help = "Abort ingestion after this many seconds")]
    pub timeout: Option<u64>,

    /// Reference time for timeliness checks
    #[arg(
        long,
        global = true,
        value_parser = parse_reference_time,
        help = "Reference time (RFC 3339) used as 'now'"
    )]
    pub now: Option<DateTime<Utc>>,

    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all logging except errors")]
    pub quiet: bool,
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(format!("delimiter must be a single ASCII character, got '{}'", raw)),
        },
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("header must be 'Name: value', got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name is empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_reference_time(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{}': {}", raw, e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    match run(&cli).await {
        Ok(report) => {
            let rendered = match cli.global.context {
                Some(max_chars) => build_context(&report, max_chars),
                None => report.to_json_pretty()?,
            };
            emit(&rendered, cli.global.output.as_deref()).await?;
            info!("✓ Audit completed");
            Ok(())
        }
        Err(e) => {
            error!("Audit failed: {}", e);
            let failure = FailureReport::from_error(&e).to_json_pretty()?;
            emit(&failure, cli.global.output.as_deref()).await?;
            std::process::exit(1);
        }
    }
}

/// Loads configuration, ingests the selected source, and audits it.
async fn run(cli: &Cli) -> dqs_core::Result<AuditReport> {
    let source = match &cli.command {
        Command::Placeholder => {
            info!("Emitting placeholder demo report");
            return Ok(AuditReport::placeholder());
        }
        Command::File(args) => {
            let mut file = FileSource::from_path(&args.path)
                .await?
                .with_delimiter(args.delimiter);
            if let Some(encoding) = &args.encoding {
                file = file.with_encoding(encoding.clone());
            }
            SourceDescriptor::from(file)
        }
        Command::Table(args) => {
            SourceDescriptor::from(TableSource::new(&args.database_url, &args.table))
        }
        Command::Endpoint(args) => {
            let endpoint = args
                .headers
                .iter()
                .fold(EndpointSource::new(&args.url), |endpoint, (name, value)| {
                    endpoint.with_header(name, value)
                });
            SourceDescriptor::from(endpoint)
        }
    };

    let mut config = match &cli.global.config {
        Some(path) => load_config(path).await?,
        None => AuditConfig::default(),
    };
    if let Some(now) = cli.global.now {
        config = config.with_reference_time(now);
    }

    let engine = AuditEngine::new(config)?;
    match cli.global.timeout {
        Some(secs) => {
            engine
                .analyze_with_deadline(&source, Duration::from_secs(secs))
                .await
        }
        None => engine.analyze(&source).await,
    }
}

/// Reads an [`AuditConfig`] from a JSON file.
async fn load_config(path: &Path) -> dqs_core::Result<AuditConfig> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DqsError::io(format!("Failed to read config '{}'", path.display()), e))?;
    let config: AuditConfig = serde_json::from_str(&text).map_err(|e| {
        DqsError::config(format!("invalid config file '{}': {}", path.display(), e))
    })?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Writes rendered output to `path`, or stdout when absent.
async fn emit(rendered: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
