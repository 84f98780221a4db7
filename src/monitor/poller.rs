//! Poll loop: scan the watched directory and dispatch settled files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use super::filter::FileFilter;
use super::gate::FlowGate;
use super::registry::InUseRegistry;
use super::settle::{is_settled, last_touched};
use super::worker::FileWorker;
use crate::error::ScanError;
use crate::telemetry::{metrics, spans};

/// A regular file observed during one scan.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    /// Full path.
    pub path: PathBuf,
    /// Bare file name used for filtering.
    pub name: String,
    /// Last access (or modification) time.
    pub last_access: SystemTime,
    /// Size in bytes.
    pub len: u64,
}

/// List the regular files directly inside `directory`.
///
/// Entries that vanish or cannot be inspected between listing and stat are
/// skipped.
///
/// # Errors
///
/// Returns an error if the directory itself cannot be listed.
pub async fn scan_directory(directory: &Path) -> Result<Vec<CandidateFile>, ScanError> {
    let list_failed = |source| ScanError::ListFailed {
        path: directory.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(directory).await.map_err(list_failed)?;
    let mut candidates = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(list_failed)? {
        let path = entry.path();
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(source) => {
                let e = ScanError::StatFailed { path, source };
                tracing::debug!(error = %e, "Skipping entry");
                continue;
            }
        };

        if !metadata.is_file() {
            continue;
        }

        let Ok(last_access) = last_touched(&metadata) else {
            tracing::debug!(path = %path.display(), "No timestamps available, skipping");
            continue;
        };

        candidates.push(CandidateFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            last_access,
            len: metadata.len(),
        });
    }

    Ok(candidates)
}

/// Repeatedly scans one directory and launches a worker per eligible file.
#[derive(Debug)]
pub struct Poller {
    directory: PathBuf,
    filter: FileFilter,
    registry: InUseRegistry,
    gate: FlowGate,
    worker: Arc<FileWorker>,
    tracker: TaskTracker,
    max_concurrent_files: usize,
    interval: Duration,
    settle_threshold: Duration,
}

impl Poller {
    /// Create a poll loop.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        directory: PathBuf,
        filter: FileFilter,
        registry: InUseRegistry,
        gate: FlowGate,
        worker: Arc<FileWorker>,
        tracker: TaskTracker,
        max_concurrent_files: usize,
        interval: Duration,
        settle_threshold: Duration,
    ) -> Self {
        Self {
            directory,
            filter,
            registry,
            gate,
            worker,
            tracker,
            max_concurrent_files,
            interval,
            settle_threshold,
        }
    }

    /// Scan, dispatch, wait; until `shutdown` fires.
    ///
    /// Workers already launched keep running after this returns.
    pub async fn run(self, shutdown: CancellationToken) {
        let span = spans::monitor_span(&self.directory);
        async {
            tracing::info!(interval = ?self.interval, "Directory monitor started");

            while !shutdown.is_cancelled() {
                self.poll_once().await;

                tokio::select! {
                    () = tokio::time::sleep(self.interval) => {}
                    () = shutdown.cancelled() => break,
                }
            }

            tracing::info!(in_use = self.registry.count(), "Directory monitor stopped");
        }
        .instrument(span)
        .await;
    }

    /// Run one scan and dispatch cycle. Returns the number of workers
    /// launched.
    pub async fn poll_once(&self) -> usize {
        let dispatched = match scan_directory(&self.directory).await {
            Ok(candidates) => self.dispatch(candidates, SystemTime::now()),
            Err(e) => {
                tracing::error!(error = %e, "Unable to monitor the directory");
                0
            }
        };

        metrics::record_occupancy(
            &self.directory.to_string_lossy(),
            self.registry.count(),
            self.gate.in_flight(),
        );
        dispatched
    }

    /// Claim and launch workers for the candidates that qualify at `now`.
    pub fn dispatch(&self, candidates: Vec<CandidateFile>, now: SystemTime) -> usize {
        let mut dispatched = 0;

        for candidate in candidates {
            if self.registry.count() >= self.max_concurrent_files {
                tracing::debug!(
                    max_concurrent_files = self.max_concurrent_files,
                    "Concurrency cap reached, deferring remaining files"
                );
                break;
            }

            if !is_settled(candidate.last_access, now, self.settle_threshold) {
                continue;
            }

            if !self.filter.is_eligible(&candidate.name) {
                continue;
            }

            let Some(claim) = self.registry.try_claim(candidate.path) else {
                continue;
            };

            tracing::debug!(path = %claim.path().display(), size = candidate.len, "Dispatching file");
            let worker = Arc::clone(&self.worker);
            self.tracker.spawn(async move {
                worker.process(claim).await;
            });
            dispatched += 1;
        }

        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{tracking_channel, BatchReceiver, CsvParser, Decoder, ParserConfig};
    use crate::monitor::stats::MonitorStats;
    use std::fs;
    use tempfile::TempDir;

    const NONE: &[&str] = &[];

    fn poller(
        tmp: &TempDir,
        filter: FileFilter,
        max_concurrent_files: usize,
    ) -> (Poller, BatchReceiver) {
        let watched = tmp.path().join("in");
        let finished = tmp.path().join("done");
        fs::create_dir_all(&watched).unwrap();
        fs::create_dir_all(&finished).unwrap();

        let (sink, batches, _deliveries) = tracking_channel();

        let gate = FlowGate::new(100);
        let worker = FileWorker::new(
            Arc::new(CsvParser::new(ParserConfig::default()).unwrap()),
            Decoder::default(),
            Arc::new(sink),
            gate.clone(),
            MonitorStats::new(watched.display().to_string()),
            finished,
            None,
        );

        let poller = Poller::new(
            watched,
            filter,
            InUseRegistry::new(),
            gate,
            Arc::new(worker),
            TaskTracker::new(),
            max_concurrent_files,
            Duration::from_millis(10),
            Duration::from_millis(50),
        );
        (poller, batches)
    }

    fn candidate(dir: &Path, name: &str, age: Duration, now: SystemTime) -> CandidateFile {
        CandidateFile {
            path: dir.join(name),
            name: name.to_string(),
            last_access: now - age,
            len: 0,
        }
    }

    #[tokio::test]
    async fn test_scan_skips_directories() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.csv"), "x").unwrap();
        fs::write(tmp.path().join("b.csv"), "yy").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();

        let mut found = scan_directory(tmp.path()).await.unwrap();
        found.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "a.csv");
        assert_eq!(found[1].len, 2);
        assert_eq!(found[1].path, tmp.path().join("b.csv"));
    }

    #[tokio::test]
    async fn test_scan_missing_directory() {
        let err = scan_directory(Path::new("/nonexistent/watched"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ListFailed { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_requires_settled() {
        let tmp = TempDir::new().unwrap();
        let (poller, _batches) = poller(&tmp, FileFilter::default(), 10);
        let now = SystemTime::now();

        let candidates = vec![
            candidate(&poller.directory, "fresh.csv", Duration::from_millis(1), now),
            candidate(&poller.directory, "old.csv", Duration::from_secs(1), now),
        ];
        assert_eq!(poller.dispatch(candidates, now), 1);
        assert!(poller.registry.contains(&poller.directory.join("old.csv")));
        assert!(!poller.registry.contains(&poller.directory.join("fresh.csv")));
    }

    #[tokio::test]
    async fn test_dispatch_applies_filter() {
        let tmp = TempDir::new().unwrap();
        let filter = FileFilter::new(&[r"\.csv$"], &[r"^skip"]).unwrap();
        let (poller, _batches) = poller(&tmp, filter, 10);
        let now = SystemTime::now();
        let age = Duration::from_secs(1);

        let candidates = vec![
            candidate(&poller.directory, "a.csv", age, now),
            candidate(&poller.directory, "b.json", age, now),
            candidate(&poller.directory, "skip.csv", age, now),
        ];
        assert_eq!(poller.dispatch(candidates, now), 1);
    }

    #[tokio::test]
    async fn test_dispatch_skips_claimed_paths() {
        let tmp = TempDir::new().unwrap();
        let (poller, _batches) = poller(&tmp, FileFilter::default(), 10);
        let now = SystemTime::now();
        let age = Duration::from_secs(1);

        let _held = poller
            .registry
            .try_claim(poller.directory.join("busy.csv"))
            .unwrap();
        let candidates = vec![candidate(&poller.directory, "busy.csv", age, now)];
        assert_eq!(poller.dispatch(candidates, now), 0);
    }

    #[tokio::test]
    async fn test_dispatch_respects_concurrency_cap() {
        let tmp = TempDir::new().unwrap();
        let (poller, _batches) = poller(&tmp, FileFilter::new(NONE, NONE).unwrap(), 2);
        let now = SystemTime::now();
        let age = Duration::from_secs(1);

        // Workers for files that do not exist finish quickly, so hold the
        // slots with claims instead
        let _a = poller.registry.try_claim("/elsewhere/a").unwrap();
        let candidates = vec![
            candidate(&poller.directory, "x.csv", age, now),
            candidate(&poller.directory, "y.csv", age, now),
        ];
        assert_eq!(poller.dispatch(candidates, now), 1);
    }

    #[tokio::test]
    async fn test_poll_once_dispatches_and_worker_relocates() {
        let tmp = TempDir::new().unwrap();
        let (poller, _batches) = poller(&tmp, FileFilter::default(), 10);
        let path = poller.directory.join("data.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(poller.poll_once().await, 1);

        poller.tracker.close();
        poller.tracker.wait().await;
        assert!(!path.exists());
        assert!(tmp.path().join("done").join("data.csv").exists());
        assert_eq!(poller.registry.count(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let tmp = TempDir::new().unwrap();
        let (poller, _batches) = poller(&tmp, FileFilter::default(), 10);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(poller.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poll loop did not stop")
            .unwrap();
    }
}
