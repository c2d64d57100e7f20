//! Buffered file writer with size-based rotation

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use crate::config::Config;

/// Name of the active log file inside the log directory
pub const LATEST_LOG: &str = "latest.log";

const ROTATED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const SUFFIX_LEN: usize = 8;

/// What a successful flush did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing buffered or file output disabled
    Skipped,
    Written { bytes: usize },
    Rotated { bytes: usize, rotated_to: PathBuf },
}

/// Append-only write buffer, flushed to `<dir>/latest.log`
///
/// Owned by the coordinator; thresholds and the directory are read from the
/// [`Config`] passed to each call so updates take effect immediately.
#[derive(Debug, Default)]
pub struct BufferedWriter {
    buffer: Vec<u8>,
}

impl BufferedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Buffer `line` and flush once the buffer reaches `max_buffer_bytes`.
    ///
    /// Nothing is buffered while file output is disabled.
    pub async fn append(&mut self, config: &mut Config, line: &str) -> FlushOutcome {
        if !config.file_output_enabled() {
            return FlushOutcome::Skipped;
        }
        self.buffer.extend_from_slice(line.as_bytes());
        if self.buffer.len() < config.max_buffer_bytes {
            return FlushOutcome::Skipped;
        }
        self.flush(config).await
    }

    /// Flush the buffer, falling back to the console on any I/O failure.
    pub async fn flush(&mut self, config: &mut Config) -> FlushOutcome {
        match self.try_flush(&config.directory, config.max_file_bytes).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.fall_back(config, &e);
                FlushOutcome::Skipped
            }
        }
    }

    /// Flush without fallback. The buffer is cleared only when the write succeeds.
    pub async fn try_flush(&mut self, directory: &Path, max_file_bytes: u64) -> Result<FlushOutcome> {
        if self.buffer.is_empty() || directory.as_os_str().is_empty() {
            return Ok(FlushOutcome::Skipped);
        }

        let latest_path = directory.join(LATEST_LOG);
        let (mut file, size) = open_latest(&latest_path).await?;

        let mut rotated_to = None;
        if size >= max_file_bytes {
            drop(file);
            let rotated = rotate(directory, &latest_path).await?;
            let (fresh, fresh_size) = open_latest(&latest_path).await?;
            if fresh_size >= max_file_bytes {
                bail!(
                    "rotated log file {} is still too large ({} >= {} bytes)",
                    latest_path.display(),
                    fresh_size,
                    max_file_bytes
                );
            }
            file = fresh;
            rotated_to = Some(rotated);
        }

        file.write_all(&self.buffer)
            .await
            .with_context(|| format!("Failed to write to {}", latest_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("Failed to flush {}", latest_path.display()))?;

        let bytes = self.buffer.len();
        self.buffer.clear();

        Ok(match rotated_to {
            Some(rotated_to) => FlushOutcome::Rotated { bytes, rotated_to },
            None => FlushOutcome::Written { bytes },
        })
    }

    /// Disable file output, then dump the error and the pending buffer to the console.
    fn fall_back(&mut self, config: &mut Config, error: &anyhow::Error) {
        warn!(
            "[Logger] Falling back to console output: {:#} ({} bytes pending)",
            error,
            self.buffer.len()
        );
        let console = config.fall_back_to_console();
        console.write_line(&format!("failed to write to log file: {error:#}"));
        if !self.buffer.is_empty() {
            console.write_str(&String::from_utf8_lossy(&self.buffer));
        }
        self.buffer.clear();
    }
}

async fn open_latest(path: &Path) -> Result<(File, u64)> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let size = file
        .metadata()
        .await
        .with_context(|| format!("Failed to stat log file {}", path.display()))?
        .len();
    Ok((file, size))
}

/// Rename `latest.log` to a timestamped name; the caller recreates it.
async fn rotate(directory: &Path, latest_path: &Path) -> Result<PathBuf> {
    let rotated = rotated_path(directory).await?;
    tokio::fs::rename(latest_path, &rotated)
        .await
        .with_context(|| format!("Failed to rename {} to {}", latest_path.display(), rotated.display()))?;
    Ok(rotated)
}

/// `<dir>/<timestamp>.log`, or `<dir>/<timestamp>_<suffix>.log` if that name is taken.
pub(crate) async fn rotated_path(directory: &Path) -> Result<PathBuf> {
    let timestamp = Local::now().format(ROTATED_TIMESTAMP_FORMAT).to_string();
    rotated_path_for(directory, &timestamp).await
}

async fn rotated_path_for(directory: &Path, timestamp: &str) -> Result<PathBuf> {
    let path = directory.join(format!("{timestamp}.log"));
    let taken = tokio::fs::try_exists(&path)
        .await
        .with_context(|| format!("Failed to check {}", path.display()))?;
    if !taken {
        return Ok(path);
    }
    Ok(directory.join(format!("{}_{}.log", timestamp, random_suffix())))
}

/// Eight URL- and filename-safe characters
fn random_suffix() -> String {
    let mut encoded = URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes());
    encoded.truncate(SUFFIX_LEN);
    encoded
}
