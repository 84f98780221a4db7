//! Lifecycle controller tying the poll loop, workers and delivery listener
//! together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::filter::FileFilter;
use super::gate::FlowGate;
use super::poller::Poller;
use super::registry::InUseRegistry;
use super::stats::{MonitorStats, MonitorStatsSnapshot};
use super::worker::FileWorker;
use crate::config::Config;
use crate::ingest::{build_parser, Decoder, DeliveryReceiver, RecordParser, TrackingSink};
use crate::{Error, Result};

/// Watches one directory and ingests every file that settles in it.
#[derive(Debug)]
pub struct DirectoryMonitor {
    directory: PathBuf,
    error_directory: Option<PathBuf>,
    registry: InUseRegistry,
    gate: FlowGate,
    stats: Arc<MonitorStats>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    listener_shutdown: CancellationToken,
    pending: Mutex<Option<(Poller, DeliveryReceiver)>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl DirectoryMonitor {
    /// Validate the configuration and prepare a monitor.
    ///
    /// Creates the finished directory, and the error directory when error
    /// relocation is enabled, if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any option is invalid or a target
    /// directory cannot be created.
    pub fn new(
        config: &Config,
        parser: Arc<dyn RecordParser>,
        sink: Arc<dyn TrackingSink>,
        deliveries: DeliveryReceiver,
    ) -> Result<Self> {
        config.validate()?;

        let filter = FileFilter::new(&config.files_to_monitor, &config.files_to_ignore)?;
        let decoder = Decoder::new(&config.character_encoding)?;

        ensure_directory(&config.finished_directory)?;
        let error_directory = config.error_directory_path();
        if let Some(directory) = &error_directory {
            ensure_directory(directory)?;
        }
        if !config.directory.is_dir() {
            tracing::warn!(
                directory = %config.directory.display(),
                "Watched directory does not exist yet"
            );
        }

        let registry = InUseRegistry::new();
        let gate = FlowGate::new(config.max_buffered_metrics);
        let stats = MonitorStats::new(config.directory.display().to_string());
        let tracker = TaskTracker::new();

        let worker = FileWorker::new(
            parser,
            decoder,
            sink,
            gate.clone(),
            Arc::clone(&stats),
            config.finished_directory.clone(),
            error_directory.clone(),
        );

        let poller = Poller::new(
            config.directory.clone(),
            filter,
            registry.clone(),
            gate.clone(),
            Arc::new(worker),
            tracker.clone(),
            config.max_concurrent_files,
            config.monitor_interval,
            config.directory_duration_threshold,
        );

        Ok(Self {
            directory: config.directory.clone(),
            error_directory,
            registry,
            gate,
            stats,
            tracker,
            shutdown: CancellationToken::new(),
            listener_shutdown: CancellationToken::new(),
            pending: Mutex::new(Some((poller, deliveries))),
            listener: Mutex::new(None),
        })
    }

    /// Prepare a monitor with the parser named by `config.data_format`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any option is invalid.
    pub fn from_config(
        config: &Config,
        sink: Arc<dyn TrackingSink>,
        deliveries: DeliveryReceiver,
    ) -> Result<Self> {
        let parser = build_parser(&config.data_format, &config.parser)?;
        Self::new(config, parser, sink, deliveries)
    }

    /// Launch the delivery listener and the poll loop. Returns immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor was already started.
    pub fn start(&self) -> Result<()> {
        let (poller, deliveries) = self
            .pending
            .lock()
            .take()
            .ok_or_else(|| Error::internal("directory monitor already started or stopped"))?;

        let listener = tokio::spawn(
            self.gate
                .clone()
                .release_on_delivery(deliveries, self.listener_shutdown.clone()),
        );
        *self.listener.lock() = Some(listener);

        self.tracker.spawn(poller.run(self.shutdown.clone()));
        Ok(())
    }

    /// Stop polling and wait for every in-flight file to finish.
    ///
    /// Files being processed are never interrupted; a stalled downstream
    /// consumer delays this call. Once it returns the monitor no longer holds
    /// the sink, so the consumer's batch stream ends after the queued batches.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        drop(self.pending.lock().take());
        tracing::warn!(
            in_use = self.registry.count(),
            "Stopping directory monitor, waiting for current files to finish"
        );

        self.tracker.close();
        self.tracker.wait().await;

        self.listener_shutdown.cancel();
        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            if let Err(e) = listener.await {
                tracing::error!(error = %e, "Delivery listener failed");
            }
        }

        let stats = self.stats.snapshot();
        tracing::info!(
            processed = stats.files_processed,
            dropped = stats.files_dropped,
            "Directory monitor stopped"
        );
    }

    /// Watched directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Resolved error directory, when error relocation is enabled.
    #[must_use]
    pub fn error_directory(&self) -> Option<&Path> {
        self.error_directory.as_deref()
    }

    /// File counters.
    #[must_use]
    pub fn stats(&self) -> MonitorStatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of files currently being processed.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.registry.count()
    }

    /// Records handed downstream and not yet confirmed.
    #[must_use]
    pub fn gate_in_flight(&self) -> usize {
        self.gate.in_flight()
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .map_err(|e| Error::config(format!("cannot create directory '{}': {e}", path.display())))
}
