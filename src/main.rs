use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rvk_shelfmark::config::Config;
use rvk_shelfmark::domain::{CautionFlag, PipelineError, SchedulingGate};
use rvk_shelfmark::export::{write_audit, write_results};
use rvk_shelfmark::import::{ColumnNames, read_input};
use rvk_shelfmark::infrastructure::WallClockGate;
use rvk_shelfmark::services::BatchPipeline;

/// Resolve RVK classification and call-number prefixes for a list of ISBNs.
#[derive(Parser, Debug)]
#[command(name = "rvk-shelfmark", version, about)]
struct Args {
    /// Input CSV with a header row
    #[arg(short, long)]
    input: PathBuf,

    /// Result CSV (input columns plus results)
    #[arg(short, long)]
    output: PathBuf,

    /// Optional JSON file with every source's raw answer per record
    #[arg(long)]
    audit: Option<PathBuf>,

    /// Response cache database URL (overrides CACHE_DATABASE_URL)
    #[arg(long)]
    cache_db: Option<String>,

    #[arg(long, default_value = "ISBN")]
    isbn_column: String,

    #[arg(long, default_value = "Title")]
    title_column: String,

    #[arg(long, default_value = "Publication Date")]
    date_column: String,

    /// Only process the first N records
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rvk_shelfmark=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(url) = args.cache_db {
        config.cache_database_url = url;
    }

    let columns = ColumnNames {
        isbn: args.isbn_column,
        title: args.title_column,
        publication_date: args.date_column,
    };
    let input = File::open(&args.input)
        .with_context(|| format!("Failed to open input {}", args.input.display()))?;
    let mut table = read_input(BufReader::new(input), &columns)
        .with_context(|| format!("Failed to read input {}", args.input.display()))?;
    if let Some(limit) = args.limit {
        table.records.truncate(limit);
    }

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current request");
            ctrl_c_token.cancel();
        }
    });

    let gate: Arc<dyn SchedulingGate> = Arc::new(WallClockGate::new(
        config.maintenance_windows.clone(),
        cancel.clone(),
    ));

    let pipeline = BatchPipeline::open(&config, gate, cancel)
        .await
        .context("Failed to start pipeline")?;

    let outputs = match pipeline.run(&table.records).await {
        Ok(outputs) => outputs,
        Err(e @ PipelineError::Cancelled { .. }) => {
            pipeline.finish().await.ok();
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    pipeline.finish().await?;

    let output = File::create(&args.output)
        .with_context(|| format!("Failed to create output {}", args.output.display()))?;
    write_results(BufWriter::new(output), &table.headers, &table.records, &outputs)?;
    tracing::info!("Results written to {}", args.output.display());

    if let Some(path) = args.audit {
        let audit = File::create(&path)
            .with_context(|| format!("Failed to create audit file {}", path.display()))?;
        write_audit(BufWriter::new(audit), &outputs)?;
        tracing::info!("Audit written to {}", path.display());
    }

    let with_call_number = outputs
        .iter()
        .filter(|o| o.call_number.prefix.is_some())
        .count();
    let mismatches = outputs
        .iter()
        .filter(|o| o.consolidated.has_caution(CautionFlag::TitleMismatch))
        .count();
    tracing::info!(
        "Done: {} records, {} with call number, {} title mismatches",
        outputs.len(),
        with_call_number,
        mismatches
    );

    Ok(())
}
