//! Error types surfaced to callers of the engine

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::engine::Logger;

/// Configuration problems reported synchronously to whoever triggered them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("blog: invalid log level: {0:?}")]
    InvalidLevel(String),

    #[error("blog: failed to stat path {}: {source}", path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("blog: path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("blog: invalid value {value:?} for {key}")]
    InvalidSetting { key: &'static str, value: String },
}

/// Errors returned by [`Logger`] operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("blog: logger has been shut down")]
    Stopped,

    /// The request was accepted but not acknowledged in time. It still runs to completion.
    #[error("blog: no acknowledgement within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("blog: coordinator task failed: {0}")]
    Join(String),
}

/// Returned by [`Logger::new`] when the configured directory is unusable.
///
/// The engine is still running with file output disabled and a console sink
/// installed, so the logger can be recovered with [`StartupError::into_logger`].
#[derive(Debug, Error)]
#[error("{source}")]
pub struct StartupError {
    logger: Logger,
    #[source]
    source: ConfigError,
}

impl StartupError {
    pub(crate) fn new(logger: Logger, source: ConfigError) -> Self {
        Self { logger, source }
    }

    pub fn config_error(&self) -> &ConfigError {
        &self.source
    }

    pub fn into_logger(self) -> Logger {
        self.logger
    }

    pub fn into_parts(self) -> (Logger, ConfigError) {
        (self.logger, self.source)
    }
}
