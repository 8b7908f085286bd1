//! CLI for the faceted search engine
//!
//! `facet-search` loads a Gmail-shaped JSON mailbox, indexes it, and answers
//! queries against it:
//! - `query` prints the matching message ids
//! - `parse` shows the canonical AST and any repairs the parser made
//! - `check` syncs the store and prints index health

#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use facet_search_core::{
    ConsistencyReport, EngineManager, IndexHealth, MailAdapter, MailStore, QueryParser,
    SearchConfig, SearchError,
};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cannot read {path}: {source}")]
    ReadStore {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(
    name = "facet-search",
    version,
    about = "Faceted boolean search over Gmail-shaped JSON mailboxes"
)]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a query and print matching message ids
    Query {
        #[command(flatten)]
        store: StoreArgs,
        /// Pin the clock for relative dates (RFC 3339)
        #[arg(long)]
        now: Option<String>,
        /// Print a JSON array instead of one id per line
        #[arg(long)]
        json: bool,
        /// Query text, e.g. `from:alice@example.com is:unread`
        query: String,
    },
    /// Print the canonical AST and parser warnings
    Parse {
        #[arg(long)]
        json: bool,
        query: String,
    },
    /// Index a store and print its hash, counts and consistency
    Check {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Path to a JSON mailbox: `{"messages": {...}, "drafts": {...}}`
    #[arg(long)]
    pub store: PathBuf,
    /// Search drafts instead of messages
    #[arg(long)]
    pub drafts: bool,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    health: IndexHealth,
    consistency: ConsistencyReport,
}

pub fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match execute(cli, &mut out) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when `run` is driven in-process.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

pub fn execute<W: Write>(cli: Cli, out: &mut W) -> CliResult<()> {
    let config = SearchConfig::from_env();
    match cli.command {
        Commands::Query {
            store,
            now,
            json,
            query,
        } => handle_query(&config, &store, now.as_deref(), json, &query, out),
        Commands::Parse { json, query } => handle_parse(&config, json, &query, out),
        Commands::Check { store, json } => handle_check(&config, &store, json, out),
    }
}

fn load_store(path: &Path) -> CliResult<MailStore> {
    MailStore::from_path(path).map_err(|err| match err {
        SearchError::Io(source) => CliError::ReadStore {
            path: path.display().to_string(),
            source,
        },
        other => CliError::Search(other),
    })
}

fn synced_manager(
    config: &SearchConfig,
    args: &StoreArgs,
) -> CliResult<(EngineManager<MailAdapter>, MailStore)> {
    let store = load_store(&args.store)?;
    let adapter = if args.drafts {
        MailAdapter::drafts()
    } else {
        MailAdapter::messages()
    };
    let manager = EngineManager::with_config(adapter, *config);
    manager.sync(&store)?;
    Ok((manager, store))
}

fn parse_now(raw: Option<&str>) -> CliResult<DateTime<Utc>> {
    raw.map_or_else(
        || Ok(Utc::now()),
        |text| {
            DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| CliError::InvalidArgument(format!("--now {text:?}: {e}")))
        },
    )
}

fn handle_query<W: Write>(
    config: &SearchConfig,
    args: &StoreArgs,
    now: Option<&str>,
    json: bool,
    query: &str,
    out: &mut W,
) -> CliResult<()> {
    let now = parse_now(now)?;
    let (manager, _) = synced_manager(config, args)?;
    for warning in &manager.parse(query).warnings {
        tracing::warn!(%warning, "query repaired");
    }
    let hits = manager.query_at(query, now);
    if json {
        serde_json::to_writer(&mut *out, &hits)?;
        writeln!(out)?;
    } else {
        for id in &hits {
            writeln!(out, "{id}")?;
        }
    }
    Ok(())
}

fn handle_parse<W: Write>(
    config: &SearchConfig,
    json: bool,
    query: &str,
    out: &mut W,
) -> CliResult<()> {
    let outcome = QueryParser::new(config).parse_with_warnings(query);
    if json {
        serde_json::to_writer_pretty(&mut *out, &outcome)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", outcome.ast)?;
        for warning in &outcome.warnings {
            writeln!(out, "warning: {warning}")?;
        }
    }
    Ok(())
}

fn handle_check<W: Write>(
    config: &SearchConfig,
    args: &StoreArgs,
    json: bool,
    out: &mut W,
) -> CliResult<()> {
    let (manager, store) = synced_manager(config, args)?;
    let output = CheckOutput {
        health: manager.health(),
        consistency: manager.check_consistency(&store)?,
    };
    if json {
        serde_json::to_writer_pretty(&mut *out, &output)?;
        writeln!(out)?;
        return Ok(());
    }
    let health = &output.health;
    writeln!(out, "resource: {}", health.resource)?;
    writeln!(out, "parents:  {}", health.parent_count)?;
    writeln!(out, "chunks:   {}", health.doc_count)?;
    writeln!(out, "hash:     {}", health.content_hash)?;
    writeln!(
        out,
        "status:   {}",
        if output.consistency.healthy {
            "consistent"
        } else {
            "inconsistent"
        }
    )?;
    Ok(())
}
