//! Engine configuration, partial updates and the console sink

use serde::Deserialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::error::ConfigError;
use crate::level::Level;

pub const DEFAULT_MAX_BUFFER_BYTES: usize = 4096; // 4 KB
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024 * 1024; // 1 GB
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_DIRECTORY: &str = ".";

/// Destination for console output.
///
/// Cloning shares the underlying writer.
#[derive(Clone)]
pub struct ConsoleSink {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::from_writer(std::io::stdout())
    }

    pub fn stderr() -> Self {
        Self::from_writer(std::io::stderr())
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Best-effort write; failures are traced and otherwise ignored.
    pub fn write_str(&self, text: &str) {
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writer
            .write_all(text.as_bytes())
            .and_then(|_| writer.flush())
        {
            debug!("[Logger] Console write failed: {}", e);
        }
    }

    /// Write `text` followed by a newline unless it already ends with one.
    pub fn write_line(&self, text: &str) {
        if text.ends_with('\n') {
            self.write_str(text);
        } else {
            self.write_str(&format!("{text}\n"));
        }
    }
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink").finish_non_exhaustive()
    }
}

/// Live engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum level to emit
    pub level: Level,

    /// Buffer size that triggers an automatic flush
    pub max_buffer_bytes: usize,

    /// `latest.log` size that triggers rotation
    pub max_file_bytes: u64,

    /// Periodic flush interval; zero disables the timer
    pub flush_interval: Duration,

    /// Log directory; an empty path disables file output
    pub directory: PathBuf,

    /// Console output; `None` disables it
    pub console: Option<ConsoleSink>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: Level::default(),
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            console: None,
        }
    }
}

impl Config {
    pub fn file_output_enabled(&self) -> bool {
        !self.directory.as_os_str().is_empty()
    }

    /// Disable file output and make sure console output is on.
    pub(crate) fn fall_back_to_console(&mut self) -> &ConsoleSink {
        self.directory = PathBuf::new();
        self.console.get_or_insert_with(ConsoleSink::stdout)
    }

    /// Apply every field set in `update`, leaving the rest untouched.
    ///
    /// The directory is not applied here because it needs validation and may
    /// trigger the console fallback; the coordinator handles it.
    pub(crate) fn apply(&mut self, update: &ConfigUpdate) {
        if let Some(level) = update.level {
            self.level = level;
        }
        if let Some(bytes) = update.max_buffer_bytes {
            self.max_buffer_bytes = bytes;
        }
        if let Some(bytes) = update.max_file_bytes {
            self.max_file_bytes = bytes;
        }
        if let Some(interval) = update.flush_interval {
            self.flush_interval = interval;
        }
        if let Some(console) = &update.console {
            self.console = console.clone();
        }
    }
}

/// Partial configuration update; `None` fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub level: Option<Level>,
    pub max_buffer_bytes: Option<usize>,
    pub max_file_bytes: Option<u64>,
    pub flush_interval: Option<Duration>,
    pub directory: Option<PathBuf>,
    /// `Some(None)` removes the console sink
    pub console: Option<Option<ConsoleSink>>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.max_buffer_bytes = Some(bytes);
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = Some(bytes);
        self
    }

    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn console(mut self, console: Option<ConsoleSink>) -> Self {
        self.console = Some(console);
        self
    }
}

/// Check that `path` is empty or an existing directory.
pub fn validate_directory(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.as_os_str().is_empty() {
        return Ok(PathBuf::new());
    }
    let metadata = std::fs::metadata(path).map_err(|source| ConfigError::DirectoryUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ConfigError::NotADirectory(path.to_path_buf()));
    }
    Ok(path.to_path_buf())
}

/// Serializable subset of [`Config`], e.g. loaded from a settings file or the environment.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub level: Option<Level>,
    pub max_buffer_bytes: Option<usize>,
    pub max_file_bytes: Option<u64>,
    pub flush_interval_secs: Option<u64>,
    pub directory: Option<PathBuf>,
}

impl Settings {
    /// Read `BLOG_*` variables, loading a `.env` file first if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            level: lookup("BLOG_LEVEL").map(|v| v.parse()).transpose()?,
            max_buffer_bytes: parse_var(&lookup, "BLOG_MAX_BUFFER_BYTES")?,
            max_file_bytes: parse_var(&lookup, "BLOG_MAX_FILE_BYTES")?,
            flush_interval_secs: parse_var(&lookup, "BLOG_FLUSH_INTERVAL_SECS")?,
            directory: lookup("BLOG_DIRECTORY").map(PathBuf::from),
        })
    }

    pub fn into_update(self) -> ConfigUpdate {
        ConfigUpdate {
            level: self.level,
            max_buffer_bytes: self.max_buffer_bytes,
            max_file_bytes: self.max_file_bytes,
            flush_interval: self.flush_interval_secs.map(Duration::from_secs),
            directory: self.directory,
            console: None,
        }
    }

    /// Defaults overlaid with these settings. The directory is not validated here.
    pub fn into_config(self) -> Config {
        let update = self.into_update();
        let mut config = Config::default();
        config.apply(&update);
        if let Some(directory) = update.directory {
            config.directory = directory;
        }
        config
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidSetting { key, value })
        })
        .transpose()
}
