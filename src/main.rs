//! dirmon - directory monitor
//!
//! Entry point for the dirmon binary.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dirmon::config::SAMPLE_CONFIG;
use dirmon::ingest::{tracking_channel, BatchReceiver, Record};
use dirmon::telemetry::{gather_metrics, init_metrics, init_tracing};
use dirmon::{Config, DirectoryMonitor};

/// dirmon - ingest settled files from a directory
#[derive(Parser, Debug)]
#[command(name = "dirmon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "DIRMON_CONFIG")]
    config: Option<PathBuf>,

    /// Directory to monitor (overrides the config file)
    #[arg(short, long, env = "DIRMON_DIRECTORY")]
    directory: Option<PathBuf>,

    /// Directory finished files are moved to (overrides the config file)
    #[arg(short, long, env = "DIRMON_FINISHED_DIRECTORY")]
    finished_directory: Option<PathBuf>,

    /// Data format of the files: csv or json (overrides the config file)
    #[arg(long, env = "DIRMON_DATA_FORMAT")]
    data_format: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DIRMON_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "DIRMON_LOG_JSON")]
    log_json: bool,

    /// Print a documented sample configuration and exit
    #[arg(long)]
    sample_config: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(directory) = &self.directory {
            config.directory.clone_from(directory);
        }
        if let Some(finished) = &self.finished_directory {
            config.finished_directory.clone_from(finished);
        }
        if let Some(format) = &self.data_format {
            config.data_format.clone_from(format);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.sample_config {
        print!("{SAMPLE_CONFIG}");
        return Ok(());
    }

    init_tracing(&cli.log_level, cli.log_json);
    init_metrics();

    tracing::info!("dirmon v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = cli.load_config().context("failed to load configuration")?;
    tracing::debug!(?config, "Configuration loaded");

    let (sink, batches, deliveries) = tracking_channel();
    let monitor = DirectoryMonitor::from_config(&config, Arc::new(sink), deliveries)
        .context("failed to set up directory monitor")?;

    let consumer = tokio::spawn(write_records(batches, std::io::stdout()));
    monitor.start()?;

    tracing::info!(
        directory = %config.directory.display(),
        finished = %config.finished_directory.display(),
        "Monitoring directory, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    monitor.stop().await;
    // Every sink handle is gone once the workers finish, so this drains
    // what is still queued and then returns
    drop(monitor);
    consumer.await.context("record writer failed")?;

    tracing::debug!(metrics = %gather_metrics(), "Final metrics");
    Ok(())
}

/// Write every record as a JSON line and confirm its batch. Returns the
/// writer once all sink handles are dropped and the queue is drained.
async fn write_records<W: Write>(mut batches: BatchReceiver, mut out: W) -> W {
    while let Some(mut batch) = batches.recv().await {
        match write_batch(&mut out, &batch.take_records()) {
            Ok(()) => batch.accept(),
            Err(e) => {
                tracing::error!(id = batch.id().get(), error = %e, "Failed to write records");
                batch.reject();
            }
        }
    }
    out
}

fn write_batch<W: Write>(out: &mut W, records: &[Record]) -> anyhow::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirmon::ingest::{DeliveryInfo, TrackingSink};

    #[tokio::test]
    async fn test_write_records_drains_after_sink_dropped() {
        let (sink, batches, mut deliveries) = tracking_channel();
        for i in 0..3_i64 {
            sink.submit(vec![Record::new("m").with_field("i", i)]).unwrap();
        }
        drop(sink);

        let out = write_records(batches, Vec::new()).await;
        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2]["fields"]["i"], 2);

        for _ in 0..3 {
            let DeliveryInfo { delivered, .. } = deliveries.recv().await.unwrap();
            assert!(delivered);
        }
    }
}
