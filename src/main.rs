//! seeq CLI
//!
//! Search history time series from Google Takeout exports.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use seeq::{
    config::{parse_timezone, AggregationConfig, Config, Granularity, Tokenization},
    core::{Aggregator, DocumentMetadata, DOCUMENT_FILENAME},
    extractor::ArchiveExtractor,
    pipeline::Pipeline,
    transparency::TransparencyLog,
    PRIVACY_DECLARATION, VERSION,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seeq")]
#[command(version = VERSION)]
#[command(about = "Search history time series from Google Takeout exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a Takeout archive into a search data document
    Process {
        /// Path to the Takeout ZIP archive
        archive: PathBuf,

        /// Window size (raw, hour, day, week, month, year)
        #[arg(long)]
        granularity: Option<String>,

        /// Tokenization (full or words)
        #[arg(long)]
        search_string: Option<String>,

        /// IANA timezone for calendar windows
        #[arg(long)]
        timezone: Option<String>,

        /// Output directory (defaults to the configured export path)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output file name
        #[arg(long, default_value = DOCUMENT_FILENAME)]
        file_name: String,

        /// Close the series at this RFC 3339 instant instead of the current time
        #[arg(long)]
        now: Option<String>,

        /// Print the document to stdout instead of writing files
        #[arg(long)]
        stdout: bool,
    },

    /// Show what an archive contains without aggregating it
    Inspect {
        /// Path to the Takeout ZIP archive
        archive: PathBuf,
    },

    /// Show processing statistics
    Status {
        /// Zero the cumulative statistics
        #[arg(long)]
        reset: bool,
    },

    /// Display privacy declaration
    Privacy,

    /// Show configuration
    Config,

    /// Change saved defaults
    Set {
        #[arg(long)]
        granularity: Option<String>,

        #[arg(long)]
        search_string: Option<String>,

        #[arg(long)]
        timezone: Option<String>,

        /// Archive entry prefix holding search activity
        #[arg(long)]
        search_prefix: Option<String>,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            archive,
            granularity,
            search_string,
            timezone,
            output,
            file_name,
            now,
            stdout,
        } => cmd_process(
            archive,
            granularity.as_deref(),
            search_string.as_deref(),
            timezone.as_deref(),
            output,
            &file_name,
            now.as_deref(),
            stdout,
        ),
        Commands::Inspect { archive } => cmd_inspect(archive),
        Commands::Status { reset } => cmd_status(reset),
        Commands::Privacy => {
            println!("{PRIVACY_DECLARATION}");
            Ok(())
        }
        Commands::Config => cmd_config(),
        Commands::Set {
            granularity,
            search_string,
            timezone,
            search_prefix,
        } => cmd_set(
            granularity.as_deref(),
            search_string.as_deref(),
            timezone.as_deref(),
            search_prefix,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Overlay command-line options on the saved defaults.
fn resolve_aggregation(
    config: &Config,
    granularity: Option<&str>,
    search_string: Option<&str>,
    timezone: Option<&str>,
) -> Result<AggregationConfig> {
    let mut aggregation = config.aggregation();
    if let Some(g) = granularity {
        aggregation.granularity = g.parse::<Granularity>()?;
    }
    if let Some(s) = search_string {
        aggregation.tokenization = s.parse::<Tokenization>()?;
    }
    if let Some(tz) = timezone {
        aggregation.timezone = parse_timezone(tz)?;
    }
    Ok(aggregation)
}

fn parse_now(now: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(now)
        .with_context(|| format!("invalid --now value {now:?}"))?
        .with_timezone(&Utc))
}

fn transparency_path(config: &Config) -> PathBuf {
    config.data_path.join("transparency.json")
}

#[allow(clippy::too_many_arguments)]
fn cmd_process(
    archive: PathBuf,
    granularity: Option<&str>,
    search_string: Option<&str>,
    timezone: Option<&str>,
    output: Option<PathBuf>,
    file_name: &str,
    now: Option<&str>,
    stdout: bool,
) -> Result<()> {
    let config = Config::load()?;

    // Reject bad options before touching the archive
    let aggregation = resolve_aggregation(&config, granularity, search_string, timezone)?;
    let mut aggregator = Aggregator::new(aggregation);
    if let Some(now) = now {
        aggregator = aggregator.with_now(parse_now(now)?);
    }

    let mut transparency_log = TransparencyLog::open(transparency_path(&config))?;

    let file = File::open(&archive).with_context(|| format!("could not open {archive:?}"))?;
    let pipeline = Pipeline::new(config.extractor(), aggregator);
    let result = pipeline
        .process(BufReader::new(file), Some(&mut transparency_log))
        .with_context(|| format!("could not process {archive:?}"))?;

    if stdout {
        println!("{}", result.document.to_json_pretty()?);
    } else {
        let export_dir = output.unwrap_or_else(|| config.export_path.clone());
        let written = result
            .document
            .write_into(&export_dir, file_name, &DocumentMetadata::default())
            .with_context(|| format!("could not write document to {export_dir:?}"))?;
        transparency_log.record_document_written();

        println!(
            "Wrote {} windows ({} granularity, {} tokens) to {:?}",
            result.document.data.len(),
            result.document.granularity,
            result.document.data.total_tokens(),
            written.path
        );
    }

    if let Err(e) = transparency_log.save() {
        tracing::warn!("could not save transparency log: {e}");
    }

    if !stdout {
        println!();
        println!("{}", transparency_log.summary());
    }
    Ok(())
}

fn cmd_inspect(archive: PathBuf) -> Result<()> {
    let config = Config::load()?;
    let extraction = ArchiveExtractor::new(config.extractor())
        .extract_path(&archive)
        .with_context(|| format!("could not read {archive:?}"))?;

    let mut events = extraction.events;
    events.sort_by_timestamp();

    println!("Archive: {archive:?}");
    println!("Search entries: {}", extraction.entries_read);
    println!("Search events: {}", events.len());
    match events.span() {
        Some((first, last)) => {
            println!("First search: {}", first.to_rfc3339());
            println!("Last search: {}", last.to_rfc3339());
        }
        None => println!("No search events found under {:?}", config.search_prefix),
    }
    Ok(())
}

fn cmd_status(reset: bool) -> Result<()> {
    let config = Config::load()?;
    let mut transparency_log = TransparencyLog::open(transparency_path(&config))?;

    if reset {
        transparency_log.reset();
        transparency_log.save()?;
        if let Some(path) = transparency_log.path() {
            println!("Cleared processing statistics in {path:?}");
        }
        return Ok(());
    }

    println!("seeq Status");
    println!("===========");
    println!();
    println!("Defaults:");
    println!("  Granularity: {}", config.granularity);
    println!("  Search string: {}", config.search_string);
    println!("  Timezone: {}", config.timezone.name());
    println!("  Export path: {:?}", config.export_path);
    println!();

    match transparency_log.stats().last_updated {
        Some(_) => println!("{}", transparency_log.summary()),
        None => println!("No previous processing data found."),
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_set(
    granularity: Option<&str>,
    search_string: Option<&str>,
    timezone: Option<&str>,
    search_prefix: Option<String>,
) -> Result<()> {
    if granularity.is_none()
        && search_string.is_none()
        && timezone.is_none()
        && search_prefix.is_none()
    {
        bail!("nothing to set; pass at least one option");
    }

    let mut config = Config::load()?;
    let aggregation = resolve_aggregation(&config, granularity, search_string, timezone)?;
    config.granularity = aggregation.granularity;
    config.search_string = aggregation.tokenization;
    config.timezone = aggregation.timezone;
    if let Some(prefix) = search_prefix {
        config.search_prefix = prefix;
    }

    config.ensure_directories()?;
    config.save()?;
    println!("Saved defaults to {:?}", Config::config_path());
    Ok(())
}
