//! Ratecard CLI - Command-line interface
//!
//! Usage:
//!   ratecard import <rates|countries|templates|rates-json> <file>
//!   ratecard export <voice|gprs|sms|volte> <out.xlsx>
//!   ratecard schema [--apply]
//!   ratecard status
//!
//! The store is chosen by `DATABASE_URL` (or the file named by
//! `RATECARD_CONFIG`), exactly as for the server.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ratecard_core::schema::SCHEMA_SQL;
use ratecard_core::{AppConfig, BlankMarkerPolicy, PgStore, RateStore, Table};
use ratecard_export::{export, RatecardKind};
use ratecard_ingest::{IngestPipeline, SheetKind};

#[derive(Parser)]
#[command(name = "ratecard")]
#[command(about = "Ratesheet ingestion and ratecard export")]
#[command(version)]
struct Cli {
    /// Print the upload report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace a table with the rows of a workbook
    Import {
        /// rates, countries, templates or rates-json
        kind: SheetKind,
        /// Workbook to read (.xls, .xlsx, .xlsm, .xlsb, .ods)
        file: PathBuf,
        /// Blank marker handling: `skip` or `default:<placeholder>`
        #[arg(long)]
        blank_marker: Option<BlankMarkerPolicy>,
    },
    /// Write a ratecard workbook
    Export {
        /// voice, gprs, sms or volte
        kind: RatecardKind,
        /// Output path; defaults to the ratecard's download name
        out: Option<PathBuf>,
    },
    /// Print the table DDL, or apply it to the configured database
    Schema {
        #[arg(long)]
        apply: bool,
    },
    /// Row counts of every table
    Status,
}

async fn import(
    config: &AppConfig,
    store: std::sync::Arc<dyn RateStore>,
    kind: SheetKind,
    file: PathBuf,
    blank_marker: Option<BlankMarkerPolicy>,
    json: bool,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let policy = blank_marker.unwrap_or_else(|| config.ingest.blank_marker.clone());
    let mut pipeline = IngestPipeline::new(store).with_marker_policy(policy);
    let report = pipeline.ingest(kind, &file_name, &bytes).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ratecard_ingest=info,ratecard_export=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Schema { apply: false } => {
            print!("{SCHEMA_SQL}");
        }
        Commands::Schema { apply: true } => {
            anyhow::ensure!(
                !config.database.is_memory(),
                "schema --apply needs a PostgreSQL DATABASE_URL"
            );
            let store = PgStore::connect(&config.database.url, config.database.pool_size).await?;
            store.ensure_schema().await?;
            println!("Schema applied");
        }
        Commands::Import {
            kind,
            file,
            blank_marker,
        } => {
            if config.database.is_memory() {
                tracing::warn!("In-memory store: the import is discarded on exit");
            }
            let store = ratecard_core::store::open(&config.database).await?;
            import(&config, store, kind, file, blank_marker, cli.json).await?;
        }
        Commands::Export { kind, out } => {
            let store = ratecard_core::store::open(&config.database).await?;
            let file = export(store.as_ref(), kind, &config.ratecard).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(file.file_name));
            std::fs::write(&out, &file.bytes)
                .with_context(|| format!("writing {}", out.display()))?;
            println!("Wrote {} rows to {}", file.rows, out.display());
        }
        Commands::Status => {
            let store = ratecard_core::store::open(&config.database).await?;
            for table in [Table::Rates, Table::Countries, Table::Templates, Table::RateBags] {
                println!("{table}: {}", store.count(table).await?);
            }
        }
    }

    Ok(())
}
