//! Liferay connector CLI application.
//!
//! Writes one JSON document per collected item to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use liferay_connector::{
    Archive, Credentials, GroupId, HttpTransport, ItemEnvelope, LiferayCollector,
    PaginatedFetcher, RecordingTransport, ReplayTransport, Transport,
};
use shared::{ArchiveMode, Config};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Liferay server URL (overrides the config file)
    #[arg(long)]
    url: Option<String>,

    /// Site (group) to fetch data from
    #[arg(long)]
    group_id: Option<String>,

    /// Username for basic authentication
    #[arg(short, long)]
    user: Option<String>,

    /// Password for basic authentication
    #[arg(short, long)]
    password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    no_verify: bool,

    /// PEM file with the client certificate and private key
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Number of items requested per page
    #[arg(long)]
    max_results: Option<u64>,

    /// Archive directory; enables recording
    #[arg(long)]
    archive_dir: Option<PathBuf>,

    /// Replay a previous recording instead of contacting the server
    #[arg(long)]
    from_archive: bool,

    /// Tag written on every item (defaults to the server URL)
    #[arg(long)]
    tag: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Apply command-line overrides on top of the file configuration
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.liferay.base_url = url.clone();
        }
        if let Some(group_id) = &self.group_id {
            config.liferay.group_id = group_id.clone();
        }
        if self.user.is_some() {
            config.liferay.user = self.user.clone();
        }
        if self.password.is_some() {
            config.liferay.password = self.password.clone();
        }
        if self.no_verify {
            config.liferay.verify = false;
        }
        if let Some(cert) = &self.cert {
            config.liferay.cert = Some(cert.to_string_lossy().to_string());
        }
        if let Some(max_results) = self.max_results {
            config.liferay.max_results = max_results;
        }
        if let Some(dir) = &self.archive_dir {
            config.archive.enabled = true;
            config.archive.dir = dir.to_string_lossy().to_string();
        }
        if self.from_archive {
            config.archive.enabled = true;
            config.archive.mode = ArchiveMode::Replay;
        }
    }
}

/// Build the transport stack: live, live + recording, or replay only
fn build_transport(config: &Config) -> Result<Box<dyn Transport>> {
    if config.replaying() {
        info!(archive_dir = %config.archive.dir, "Replaying archived exchanges");
        let archive = Archive::open(config.archive_dir()).context("Failed to open archive")?;
        return Ok(Box::new(ReplayTransport::new(archive)));
    }

    let liferay = &config.liferay;
    let http = HttpTransport::new(
        Credentials::from_parts(liferay.user.clone(), liferay.password.clone()),
        liferay.verify,
        liferay.cert.as_deref().map(Path::new),
        Duration::from_secs(liferay.timeout_seconds),
        liferay.max_retries,
        liferay.retry_delay_ms,
    )
    .context("Failed to create HTTP transport")?;

    if config.archive.enabled {
        info!(archive_dir = %config.archive.dir, "Recording exchanges to archive");
        let archive = Archive::open(config.archive_dir()).context("Failed to open archive")?;
        Ok(Box::new(RecordingTransport::new(http, archive)))
    } else {
        Ok(Box::new(http))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config.logging.level()?
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "liferay-connector".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!("Liferay connector starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    let transport = build_transport(&config)?;
    let fetcher = PaginatedFetcher::new(
        transport,
        config.liferay.base_url.clone(),
        config.liferay.max_results,
    )
    .context("Failed to create fetcher")?;
    let collector = LiferayCollector::new(fetcher);

    let group: GroupId = config
        .liferay
        .group_id
        .parse()
        .context("Invalid group id")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut items = collector.run(&group);
    let mut written = 0usize;
    let mut skipped = 0usize;

    while let Some(item) = items.next().await.context("Collection failed")? {
        let envelope = match ItemEnvelope::wrap(item, collector.origin(), args.tag.as_deref()) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(error = %e, "Skipping item without required metadata");
                skipped += 1;
                continue;
            }
        };
        serde_json::to_writer(&mut out, &envelope).context("Failed to write item")?;
        writeln!(out).context("Failed to write item")?;
        written += 1;
    }
    out.flush().context("Failed to flush output")?;

    let stats = items.stats();
    info!("=== Collection Complete ===");
    info!("Users: {}", stats.users);
    info!("Identities indexed: {}", stats.identities);
    info!("Blog entries: {}", stats.blogs);
    info!("Message board categories: {}", stats.categories);
    info!("Messages: {}", stats.messages);
    info!("Entries without known author: {}", stats.unenriched);
    info!("Items written: {}", written);
    info!("Items skipped: {}", skipped);

    if config.archive.enabled && !config.replaying() {
        let archive = Archive::open(config.archive_dir()).context("Failed to open archive")?;
        info!("Archived exchanges: {}", archive.entry_count().context("Failed to count archive")?);
    }

    info!("Liferay connector finished successfully");

    Ok(())
}
