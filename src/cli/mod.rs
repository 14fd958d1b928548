//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `introspect` -- scan a table and summarise its fields
//! - `tables` -- list the tables and declared fields of a base
//! - `fetch` -- download creatives into a directory
//! - `serve` -- run the local diagnostic tool server
//! - `config show|path` -- inspect configuration
//! - `version` -- print build/version info

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Ad-creative table introspection and media fetching.
#[derive(Parser, Debug)]
#[command(
    name = "adscope",
    version = env!("CARGO_PKG_VERSION"),
    about = "adscope: inspect ad-creative tables and fetch their media"
)]
pub struct Cli {
    /// Config file to load instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log filter (e.g. "info", "adscope=debug"). RUST_LOG wins if set.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Page through a table and report each field's kind, preview and count.
    Introspect(IntrospectArgs),

    /// List the tables of a base with their declared fields.
    Tables {
        /// Base id (default: AIRTABLE_BASE_ID or config).
        #[arg(long)]
        base: Option<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Download each NAME=URL task into a directory and list the result.
    Fetch(FetchArgs),

    /// Run the diagnostic tool server on a loopback address.
    Serve {
        /// Listen host (default: 127.0.0.1).
        #[arg(long)]
        host: Option<String>,

        /// Listen port (default: 8811).
        #[arg(short, long)]
        port: Option<u16>,

        /// Register the `shell` tool.
        #[arg(long)]
        allow_shell: bool,
    },

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Args, Debug)]
pub struct IntrospectArgs {
    /// Base id (default: AIRTABLE_BASE_ID or config).
    #[arg(long)]
    pub base: Option<String>,

    /// Table name or id (default: AIRTABLE_TABLE or config).
    #[arg(long)]
    pub table: Option<String>,

    /// Records per request, 1-100.
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Stop after this many records.
    #[arg(long)]
    pub max_records: Option<usize>,

    /// Flag records whose text fields contain this (case-insensitive).
    #[arg(long)]
    pub flag: Option<String>,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Output directory (default: media.outputDir from config).
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Task as NAME=URL; repeatable, run in the order given.
    #[arg(short, long = "task", value_name = "NAME=URL", value_parser = TaskSpec::parse_arg)]
    pub tasks: Vec<TaskSpec>,

    /// JSON5 file with an array of {name, url} tasks, run before --task.
    #[arg(long, value_name = "PATH")]
    pub tasks_file: Option<PathBuf>,

    /// Per-task timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Downloader format selector.
    #[arg(long)]
    pub format: Option<String>,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration (secrets redacted) as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::airtable::{AirtableClient, TableRef};
use crate::config::{self, Config, ConfigError};
use crate::introspect::{render_tables_text, render_text, IntrospectOptions, Introspector};
use crate::logging::{self, LoggingError};
use crate::media::{load_task_file, DownloadOutcome, FetchReport, MediaFetcher, TaskSpec};
use crate::server;
use crate::tools::create_registry;
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Secrets that should be redacted when printing config.
const SECRET_KEYS: &[&str] = &["apikey", "api_key", "token", "secret", "password"];

/// Load configuration, install logging and run the chosen subcommand.
pub async fn run(cli: Cli) -> CliResult {
    let config_path = cli.config.clone().unwrap_or_else(config::get_config_path);
    let mut cfg = config::load_config_from(&config_path)?;
    if let Some(level) = &cli.log_level {
        cfg.logging.level = level.clone();
    }

    match logging::init_logging(&cfg.logging) {
        Ok(()) | Err(LoggingError::AlreadyInitialized(_)) => {}
        Err(e) => return Err(e.into()),
    }

    match cli.command {
        Command::Introspect(args) => handle_introspect(&cfg, args).await,
        Command::Tables { base, json } => handle_tables(&cfg, base, json).await,
        Command::Fetch(args) => handle_fetch(&cfg, args).await,
        Command::Serve {
            host,
            port,
            allow_shell,
        } => handle_serve(&cfg, host, port, allow_shell).await,
        Command::Config(ConfigCommand::Show) => handle_config_show(&cfg),
        Command::Config(ConfigCommand::Path) => {
            println!("{}", config_path.display());
            Ok(())
        }
        Command::Version => {
            handle_version();
            Ok(())
        }
    }
}

/// Run the `introspect` subcommand.
pub async fn handle_introspect(cfg: &Config, args: IntrospectArgs) -> CliResult {
    let airtable = cfg.airtable_config()?;
    let base = resolve_base(cfg, args.base)?;
    let table = args
        .table
        .or_else(|| cfg.airtable.table.clone())
        .ok_or(ConfigError::Missing {
            what: "table name",
            hint: "pass --table or set AIRTABLE_TABLE",
        })?;

    let source = TableRef::new(AirtableClient::new(airtable)?, base, table);
    let options = IntrospectOptions {
        page_size: args.page_size.unwrap_or(cfg.airtable.page_size),
        max_records: args.max_records,
        flag: args.flag,
    };
    let summary = Introspector::new(options).scan(&source).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_text(&summary));
    }
    Ok(())
}

/// Run the `tables` subcommand.
pub async fn handle_tables(cfg: &Config, base: Option<String>, json: bool) -> CliResult {
    let airtable = cfg.airtable_config()?;
    let base = resolve_base(cfg, base)?;
    let tables = AirtableClient::new(airtable)?.list_tables(&base).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
    } else {
        print!("{}", render_tables_text(&base, &tables));
    }
    Ok(())
}

/// Run the `fetch` subcommand. Per-task failures are reported, not fatal.
pub async fn handle_fetch(cfg: &Config, args: FetchArgs) -> CliResult {
    let dir = args
        .dir
        .or_else(|| cfg.media.output_dir.clone())
        .ok_or(ConfigError::Missing {
            what: "output directory",
            hint: "pass --dir or set media.outputDir in the config file",
        })?;

    let mut specs = match &args.tasks_file {
        Some(path) => load_task_file(path)?,
        None => Vec::new(),
    };
    specs.extend(args.tasks);
    if specs.is_empty() {
        warn!("no tasks given; only listing the output directory");
    }

    let mut downloader = cfg.downloader_config();
    if let Some(secs) = args.timeout {
        downloader.timeout = Duration::from_secs(secs);
    }
    if let Some(format) = args.format {
        downloader.format = format;
    }

    let report = MediaFetcher::new(downloader).run(&specs, &dir).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_fetch_text(&report));
    }
    Ok(())
}

/// Run the `serve` subcommand until interrupted.
pub async fn handle_serve(
    cfg: &Config,
    host: Option<String>,
    port: Option<u16>,
    allow_shell: bool,
) -> CliResult {
    let host = host.unwrap_or_else(|| cfg.server.host.clone());
    let port = port.unwrap_or(cfg.server.port);
    if allow_shell {
        warn!("shell tool enabled; any local client can run commands as this user");
    }

    let registry = create_registry(
        allow_shell,
        Duration::from_secs(cfg.server.shell_timeout_secs),
    );
    info!(tools = ?registry.list(), "tool registry ready");
    server::serve(&host, port, Arc::new(registry)).await?;
    Ok(())
}

/// Run the `config show` subcommand.
pub fn handle_config_show(cfg: &Config) -> CliResult {
    let redacted = redact_secrets(serde_json::to_value(cfg)?);
    println!("{}", serde_json::to_string_pretty(&redacted)?);
    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("adscope {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("ADSCOPE_BUILD_DATE"));
    println!("  Git commit: {}", env!("ADSCOPE_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_base(cfg: &Config, explicit: Option<String>) -> Result<String, ConfigError> {
    explicit
        .or_else(|| cfg.airtable.base_id.clone())
        .ok_or(ConfigError::Missing {
            what: "base id",
            hint: "pass --base or set AIRTABLE_BASE_ID",
        })
}

/// Text report for a fetch run: one line per task, then the manifest.
fn render_fetch_text(report: &FetchReport) -> String {
    let mut out = String::new();
    for task in &report.outcomes {
        let _ = match &task.outcome {
            DownloadOutcome::Success { path, size } => writeln!(
                out,
                "[ok]      {} -> {} ({} bytes)",
                task.name,
                path.display(),
                size
            ),
            DownloadOutcome::Failed { reason } => {
                writeln!(out, "[failed]  {}: {}", task.name, reason)
            }
            DownloadOutcome::TimedOut { after_secs } => {
                writeln!(out, "[timeout] {} after {}s", task.name, after_secs)
            }
        };
    }
    let _ = writeln!(
        out,
        "Downloaded {}/{} into {}",
        report.succeeded(),
        report.outcomes.len(),
        report.dir.display()
    );
    let _ = writeln!(out, "Manifest ({} file(s)):", report.manifest.len());
    for entry in &report.manifest {
        let _ = writeln!(out, "  {:<40} {:>12}", entry.name, entry.size);
    }
    out
}

/// Redact known secret keys in a JSON value (recursive).
fn redact_secrets(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let lower = key.to_lowercase();
                if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                    *child = Value::String("[REDACTED]".to_string());
                } else {
                    *child = redact_secrets(child.take());
                }
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                *item = redact_secrets(item.take());
            }
        }
        _ => {}
    }
    value
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
