//! File-backed outcome sink.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{OutcomeError, OutcomeLog, OutcomeRecord, OutcomeSink};

/// One append-only log file.
struct AppendLog {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl AppendLog {
    fn open(path: &Path) -> Result<Self, OutcomeError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| OutcomeError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Write `line` with a single `write_all` under the file lock, then sync.
    async fn append(&self, line: String) -> Result<(), OutcomeError> {
        let file = Arc::clone(&self.file);
        let result = tokio::task::spawn_blocking(move || {
            let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
            file.write_all(line.as_bytes())?;
            file.sync_data()
        })
        .await
        .map_err(|e| OutcomeError::Unavailable(e.to_string()))?;

        result.map_err(|source| OutcomeError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn truncate(&self) -> Result<(), OutcomeError> {
        let file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.set_len(0).map_err(|source| OutcomeError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Outcome sink writing comma-separated lines to a success file and a retry file.
///
/// Files are opened in append mode, so records accumulate across runs until
/// [`FileOutcomeSink::reset`] is called.
pub struct FileOutcomeSink {
    success: AppendLog,
    retry: AppendLog,
}

impl FileOutcomeSink {
    /// Open (creating if needed) both log files.
    pub fn open(success_path: &Path, retry_path: &Path) -> Result<Self, OutcomeError> {
        let sink = Self {
            success: AppendLog::open(success_path)?,
            retry: AppendLog::open(retry_path)?,
        };
        info!(
            "Outcome logs: success={:?} retry={:?}",
            success_path, retry_path
        );
        Ok(sink)
    }

    pub fn success_path(&self) -> &Path {
        &self.success.path
    }

    pub fn retry_path(&self) -> &Path {
        &self.retry.path
    }

    /// Discard all previously recorded outcomes in both files.
    pub fn reset(&self) -> Result<(), OutcomeError> {
        self.success.truncate()?;
        self.retry.truncate()?;
        info!("Outcome logs reset");
        Ok(())
    }

    fn log_for(&self, log: OutcomeLog) -> &AppendLog {
        match log {
            OutcomeLog::Success => &self.success,
            OutcomeLog::Retry => &self.retry,
        }
    }
}

#[async_trait]
impl OutcomeSink for FileOutcomeSink {
    async fn append(&self, record: &OutcomeRecord) -> Result<(), OutcomeError> {
        let target = self.log_for(record.log);
        target.append(record.to_line()).await?;
        debug!(
            "Recorded {} outcome for {}: {}",
            record.log, record.recipient, record.detail
        );
        Ok(())
    }
}

/// Read every record from an outcome log. Malformed lines are skipped.
pub fn read_outcome_log(path: &Path, log: OutcomeLog) -> Result<Vec<OutcomeRecord>, OutcomeError> {
    let text = std::fs::read_to_string(path).map_err(|source| OutcomeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .filter_map(|line| OutcomeRecord::parse_line(log, line))
        .collect())
}
