use anyhow::{Context, Result};
use bookstore_core::{
    bookstore_catalog_with, ConfigOverrides, MongoStore, QueryRunner, RunnerConfig,
};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "bookstore")]
#[command(about = "Run the PLP bookstore query catalog against a MongoDB collection")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Connection string, e.g. mongodb://localhost:27017
    #[arg(long, global = true)]
    uri: Option<String>,
    #[arg(long, global = true)]
    database: Option<String>,
    #[arg(long, global = true)]
    collection: Option<String>,
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and run every query in order (default)
    Run {
        /// Documents per pagination page
        #[arg(long)]
        page_size: Option<u64>,
    },
    /// Print the catalog without connecting
    Catalog {
        #[arg(long)]
        page_size: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only query output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let page_size = match &cli.command {
        Some(Commands::Run { page_size }) | Some(Commands::Catalog { page_size }) => *page_size,
        None => None,
    };
    let overrides = ConfigOverrides {
        uri: cli.uri.clone(),
        database: cli.database.clone(),
        collection: cli.collection.clone(),
        page_size,
    };
    let config = RunnerConfig::load(cli.config.as_deref(), overrides)
        .context("Failed to load configuration")?;

    match cli.command {
        Some(Commands::Catalog { .. }) => print_catalog(&config),
        Some(Commands::Run { .. }) | None => run_catalog(&config),
    }
}

/// Connect, run the full catalog, close
fn run_catalog(config: &RunnerConfig) -> Result<()> {
    let store = MongoStore::connect(config).with_context(|| {
        format!(
            "Failed to open {}.{} at {}",
            config.database, config.collection, config.uri
        )
    })?;

    let runner = QueryRunner::new(store);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = runner.run(&bookstore_catalog_with(config.page_size), &mut out);
    out.flush().context("Failed to flush output")?;
    runner.into_store().close();

    let summary = result.context("Query catalog aborted")?;
    info!(
        entries = summary.entries_run,
        documents = summary.documents_printed,
        "done"
    );
    Ok(())
}

fn print_catalog(config: &RunnerConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for entry in bookstore_catalog_with(config.page_size) {
        writeln!(
            out,
            "[{}] {}\n{}\n",
            entry.section.title(),
            entry.label,
            serde_json::to_string_pretty(&entry.operation.describe())?
        )?;
    }
    Ok(())
}
