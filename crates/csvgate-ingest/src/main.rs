//! CSVGate Ingest - CSV upload validation tool

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use csvgate_common::checksum::compute_file_checksum;
use csvgate_common::logging::{init_logging, LogConfig, LogLevel};
use csvgate_ingest::config::IngestConfig;
use csvgate_ingest::download::{export_file_name, parse_filter};
use csvgate_ingest::{DownloadService, UploadService, UploadStateStore};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "csvgate-ingest")]
#[command(author, version, about = "CSVGate upload validation tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Validate CSV files as uploads of a domain
    Validate {
        /// Domain the files belong to
        #[arg(short, long)]
        domain: String,

        /// Files to validate
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print a domain's descriptor as JSON
    Describe {
        #[arg(short, long)]
        domain: String,
    },

    /// List registered domains
    Domains,

    /// Export a domain as CSV
    Export {
        #[arg(short, long)]
        domain: String,

        /// Filter as key:operator:value, repeatable
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Output file (defaults to <domain>_<timestamp>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("csvgate-ingest")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let config = IngestConfig::load()?;
    let registry = Arc::new(config.load_registry().context("Failed to load domains")?);

    match cli.command {
        Command::Validate { domain, files } => {
            let service = Arc::new(UploadService::new(registry, Arc::new(UploadStateStore::new())));
            validate(service, &domain, files, config.max_concurrent_uploads).await?;
        },
        Command::Describe { domain } => {
            let service = UploadService::new(registry, Arc::new(UploadStateStore::new()));
            let descriptor = service.get_descriptor(&domain)?;
            println!("{}", descriptor.to_json_pretty()?);
        },
        Command::Domains => {
            for name in registry.names() {
                println!("{name}");
            }
        },
        Command::Export {
            domain,
            filters,
            output,
        } => {
            let filters = filters
                .iter()
                .map(|f| parse_filter(f))
                .collect::<Result<Vec<_>, _>>()?;

            let csv = DownloadService::new(registry).download(&domain, &filters)?;
            let output = output.unwrap_or_else(|| PathBuf::from(export_file_name(&domain, Utc::now())));

            std::fs::write(&output, csv)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(path = %output.display(), "Export written");
        },
    }

    Ok(())
}

async fn validate(
    service: Arc<UploadService>,
    domain: &str,
    files: Vec<PathBuf>,
    max_concurrent: usize,
) -> Result<()> {
    let permits = Arc::new(Semaphore::new(max_concurrent));

    let tasks = files.into_iter().map(|path| {
        let service = Arc::clone(&service);
        let permits = Arc::clone(&permits);
        let domain = domain.to_string();

        async move {
            let _permit = permits.acquire_owned().await?;

            let sha256 = compute_file_checksum(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file = std::fs::File::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            info!(path = %path.display(), sha256 = %sha256, "Validating file");

            let outcome = service
                .spawn_upload(domain, std::io::BufReader::new(file))
                .await
                .context("Upload task failed")?;

            anyhow::Ok((path, outcome))
        }
    });

    let mut failed = 0usize;
    for result in join_all(tasks).await {
        match result {
            Ok((path, Ok(receipt))) => {
                info!(
                    path = %path.display(),
                    upload_id = %receipt.upload_id,
                    rows = receipt.rows,
                    "File accepted"
                );
            },
            Ok((path, Err(e))) => {
                failed += 1;
                error!(
                    path = %path.display(),
                    upload_id = e.upload_id.as_deref().unwrap_or("-"),
                    kind = %e.kind(),
                    "File rejected: {}",
                    e
                );
            },
            Err(e) => {
                failed += 1;
                error!("{:#}", e);
            },
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of the files were rejected", failed);
    }

    info!("Validation complete");
    Ok(())
}
