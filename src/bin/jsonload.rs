//! jsonload: Import a JSON document into a Postgres table
//!
//! Every record is scanned to infer column types, then the table is created
//! (if absent) and all rows are inserted in one transaction.
//!
//! Usage:
//!   # Import a file
//!   jsonload data.json --connection-string postgresql://user:pw@localhost/db --table events
//!
//!   # Read NDJSON from stdin
//!   cat events.jsonl | jsonload --ndjson -c postgresql://localhost/db -t events
//!
//!   # Show the inferred schema and table definition without connecting
//!   jsonload data.json --table events --dry-run

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use jsonload::load::sql;
use jsonload::{DocumentFormat, ImportConfig, Importer, InferenceMode, PgConnector, UploadRequest};
use serde_json::json;
use std::fs::File;
use std::io::{stdin, Read};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jsonload")]
#[command(about = "Import a JSON document into a Postgres table", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Postgres connection string
    #[arg(long, short = 'c')]
    connection_string: Option<String>,

    /// Destination table (created if it does not exist)
    #[arg(long, short = 't')]
    table: Option<String>,

    /// Input is newline-delimited JSON (one record per line)
    #[arg(long)]
    ndjson: bool,

    /// Print the inferred schema and CREATE TABLE statement, then exit
    #[arg(long)]
    dry_run: bool,

    /// Infer types from the first N records only. Fields that first appear
    /// later are dropped; prefer the default full scan.
    #[arg(long)]
    sample_size: Option<usize>,

    /// Field name that marks wrapped record arrays
    #[arg(long, default_value = "records")]
    wrapper_field: String,

    /// Name of the generated primary key column
    #[arg(long, default_value = "_generated_id")]
    primary_key: String,

    /// Seconds to wait for the database connection
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,

    /// Seconds allowed for creating the table and inserting every row
    #[arg(long, default_value_t = 300)]
    load_timeout: u64,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = ImportConfig {
        wrapper_field: args.wrapper_field.clone(),
        primary_key: args.primary_key.clone(),
        inference: match args.sample_size {
            Some(n) => InferenceMode::Sample(n),
            None => InferenceMode::FullScan,
        },
        connect_timeout: Duration::from_secs(args.connect_timeout),
        load_timeout: Duration::from_secs(args.load_timeout),
    };

    let format = if args.ndjson {
        DocumentFormat::Ndjson
    } else {
        DocumentFormat::Json
    };

    let mut bytes = Vec::new();
    if let Some(file_path) = &args.input {
        File::open(file_path)
            .with_context(|| format!("Failed to open {file_path}"))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read {file_path}"))?;
    } else {
        stdin().read_to_end(&mut bytes).context("Failed to read stdin")?;
    }

    let importer = Importer::new(PgConnector, config);

    if args.dry_run {
        return dry_run(&importer, bytes, format, args.table.as_deref(), args.compact);
    }

    let reply = importer
        .handle(UploadRequest {
            file: Some(bytes),
            connection_string: args.connection_string,
            table_name: args.table,
            format,
        })
        .await;

    print_json(&serde_json::to_value(&reply.body)?, args.compact)?;

    if !reply.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn dry_run(
    importer: &Importer<PgConnector>,
    bytes: Vec<u8>,
    format: DocumentFormat,
    table: Option<&str>,
    compact: bool,
) -> Result<()> {
    let plan = match importer.plan(bytes, format) {
        Ok(plan) => plan,
        Err(e) => {
            print_json(&json!({ "error": e.to_string() }), compact)?;
            std::process::exit(1);
        }
    };

    let create_table = table.map(|t| sql::create_table(t, &importer.config().primary_key, &plan.schema));

    print_json(
        &json!({
            "rows": plan.rows.len(),
            "schema": plan.schema,
            "create_table": create_table,
        }),
        compact,
    )
}

fn print_json(value: &serde_json::Value, compact: bool) -> Result<()> {
    let output = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", output);
    Ok(())
}
