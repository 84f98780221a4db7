//! Per-file ingest: read, parse, emit through the gate, relocate.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use tracing::Instrument;

use super::gate::FlowGate;
use super::registry::Claim;
use super::stats::MonitorStats;
use crate::error::{IngestError, RelocationError};
use crate::ingest::{skip_utf8_bom, Decoder, Record, RecordParser, TrackingSink};
use crate::telemetry::spans;
use crate::Result;

/// Extension of files treated as gzip-compressed.
pub const COMPRESSED_EXTENSION: &str = "gz";

/// How a file's processing ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Every record was handed downstream.
    Processed { records: usize },
    /// The file could not be read or parsed.
    Dropped,
    /// The downstream consumer went away mid-file; the file was left in place.
    Abandoned,
}

/// Processes claimed files. One instance is shared by every worker task.
pub struct FileWorker {
    parser: Arc<dyn RecordParser>,
    decoder: Decoder,
    sink: Arc<dyn TrackingSink>,
    gate: FlowGate,
    stats: Arc<MonitorStats>,
    finished_directory: PathBuf,
    error_directory: Option<PathBuf>,
}

impl std::fmt::Debug for FileWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWorker")
            .field("parser", &self.parser)
            .field("decoder", &self.decoder)
            .field("finished_directory", &self.finished_directory)
            .field("error_directory", &self.error_directory)
            .finish_non_exhaustive()
    }
}

impl FileWorker {
    /// Create a worker.
    #[must_use]
    pub fn new(
        parser: Arc<dyn RecordParser>,
        decoder: Decoder,
        sink: Arc<dyn TrackingSink>,
        gate: FlowGate,
        stats: Arc<MonitorStats>,
        finished_directory: PathBuf,
        error_directory: Option<PathBuf>,
    ) -> Self {
        Self {
            parser,
            decoder,
            sink,
            gate,
            stats,
            finished_directory,
            error_directory,
        }
    }

    /// Process one claimed file. The claim is released when this returns,
    /// whatever the outcome.
    pub async fn process(&self, claim: Claim) -> FileOutcome {
        let path = claim.path().to_path_buf();
        let outcome = self
            .ingest(&path)
            .instrument(spans::file_span(&path))
            .await;
        claim.release();
        outcome
    }

    async fn ingest(&self, path: &Path) -> FileOutcome {
        let records = match self.read_records(path).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Error while reading file");
                self.stats.file_dropped();
                if let Some(directory) = &self.error_directory {
                    relocate_logged(path, directory).await;
                }
                return FileOutcome::Dropped;
            }
        };

        let count = records.len();
        if let Err(e) = self.emit(records).await {
            tracing::error!(error = %e, "Downstream unavailable, leaving file in place");
            return FileOutcome::Abandoned;
        }

        relocate_logged(path, &self.finished_directory).await;
        self.stats.file_processed();
        tracing::info!(records = count, "Ingested file");

        FileOutcome::Processed { records: count }
    }

    async fn read_records(&self, path: &Path) -> std::result::Result<Vec<Record>, IngestError> {
        let owned = path.to_path_buf();
        let parser = Arc::clone(&self.parser);
        let decoder = self.decoder;

        tokio::task::spawn_blocking(move || read_file_to_records(&owned, decoder, parser.as_ref()))
            .await
            .map_err(|e| IngestError::Task {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
    }

    /// Hand records downstream one per batch, taking a gate unit for each.
    async fn emit(&self, records: Vec<Record>) -> Result<()> {
        for record in records {
            self.gate.acquire().await?;
            if let Err(e) = self.sink.submit(vec![record]) {
                // No delivery report will come for a batch the sink refused
                self.gate.release(1);
                return Err(e.into());
            }
        }
        Ok(())
    }
}

/// Check whether a file is handled as gzip-compressed.
#[must_use]
pub fn is_compressed(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(COMPRESSED_EXTENSION))
}

/// Open, decompress or decode, and parse a whole file.
///
/// # Errors
///
/// Returns an [`IngestError`] if any step fails.
pub fn read_file_to_records(
    path: &Path,
    decoder: Decoder,
    parser: &dyn RecordParser,
) -> std::result::Result<Vec<Record>, IngestError> {
    let read_error = |source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader: Box<dyn Read + Send> = if is_compressed(path) {
        Box::new(MultiGzDecoder::new(BufReader::new(file)))
    } else {
        skip_utf8_bom(decoder.wrap(Box::new(BufReader::new(file)))).map_err(read_error)?
    };

    let mut contents = Vec::new();
    reader.read_to_end(&mut contents).map_err(read_error)?;

    parser
        .parse(&contents)
        .map_err(|source| IngestError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Move a file into `directory`, keeping its base name.
///
/// # Errors
///
/// Returns a [`RelocationError`] if the rename fails.
pub async fn relocate(
    path: &Path,
    directory: &Path,
) -> std::result::Result<PathBuf, RelocationError> {
    let target = path
        .file_name()
        .map_or_else(|| directory.to_path_buf(), |name| directory.join(name));

    tokio::fs::rename(path, &target)
        .await
        .map_err(|source| RelocationError {
            from: path.to_path_buf(),
            to: target.clone(),
            source,
        })?;
    Ok(target)
}

async fn relocate_logged(path: &Path, directory: &Path) {
    match relocate(path, directory).await {
        Ok(target) => tracing::debug!(to = %target.display(), "Moved file"),
        Err(e) => tracing::error!(error = %e, "Error while moving file"),
    }
}
