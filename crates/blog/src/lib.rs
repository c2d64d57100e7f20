//! # Blog
//!
//! A process-wide [`Logger`] for programs that want free logging functions
//! instead of passing a handle around.
//!
//! # Lifecycle
//!
//! ```ignore
//! // Inside a Tokio runtime. An empty directory logs to the console only.
//! if let Err(e) = blog::init("logs", Level::Info, true) {
//!     eprintln!("logging to console: {e}");
//! }
//!
//! blog::info("service started").await?;
//! blog::sync_flush(Duration::from_secs(1)).await?;
//!
//! // Flush and stop; the slot is free for another `init` afterwards.
//! blog::cleanup(Duration::ZERO).await?;
//! ```
//!
//! Everything here forwards to the instance installed by [`init`]; use
//! [`blog_core::Logger`] directly for multiple independent loggers.

use futures::future::{BoxFuture, FutureExt};
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub use blog_core::{
    Config, ConfigError, ConfigUpdate, ConsoleSink, EngineError, Level, LogEvent, Logger,
    LoggerBuilder, Settings,
};

static INSTANCE: RwLock<Option<Logger>> = RwLock::new(None);

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("blog: already initialized")]
    AlreadyInitialized,

    #[error("blog: uninitialized")]
    Uninitialized,

    #[error("blog: logger has been shut down")]
    Shutdown,

    /// Returned by [`init`] for an unusable directory; the instance is
    /// still installed and logging to the console.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, BlogError>;

/// Install the process-wide logger. Must be called inside a Tokio runtime.
///
/// An empty `directory` disables file output and logs to stdout instead.
pub fn init(directory: impl Into<PathBuf>, level: Level, capture_location: bool) -> Result<()> {
    let directory = directory.into();
    let console = directory.as_os_str().is_empty().then(ConsoleSink::stdout);
    let config = Config {
        level,
        directory,
        console,
        ..Config::default()
    };
    init_with(Logger::builder().capture_location(capture_location), config)
}

/// Install the process-wide logger from a builder and a full configuration.
pub fn init_with(builder: LoggerBuilder, config: Config) -> Result<()> {
    let mut slot = INSTANCE.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(BlogError::AlreadyInitialized);
    }
    match builder.build(config) {
        Ok(logger) => {
            *slot = Some(logger);
            Ok(())
        }
        Err(e) => {
            let (logger, source) = e.into_parts();
            *slot = Some(logger);
            Err(source.into())
        }
    }
}

pub fn is_initialized() -> bool {
    INSTANCE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// Flush, stop and uninstall the process-wide logger. A zero timeout waits forever.
pub async fn cleanup(timeout: Duration) -> Result<()> {
    let logger = INSTANCE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .ok_or(BlogError::Uninitialized)?;
    logger.shutdown(timeout).await?;
    debug!("[Blog] Process-wide logger cleaned up");
    Ok(())
}

/// The installed logger, if it is running.
pub fn logger() -> Result<Logger> {
    let slot = INSTANCE.read().unwrap_or_else(PoisonError::into_inner);
    let logger = slot.as_ref().ok_or(BlogError::Uninitialized)?;
    if !logger.is_running() {
        return Err(BlogError::Shutdown);
    }
    Ok(logger.clone())
}

pub fn level_from_str(level: &str) -> Result<Level> {
    Ok(level.parse()?)
}

// ==== Logging ====

#[track_caller]
pub fn log(level: Level, message: impl Into<String>) -> BoxFuture<'static, Result<()>> {
    let logger = match logger() {
        Ok(logger) => logger,
        Err(e) => return futures::future::ready(Err(e)).boxed(),
    };
    let event = logger.locate(LogEvent::new(level, message));
    async move { logger.submit(event).await.map_err(BlogError::from) }.boxed()
}

#[track_caller]
pub fn error(message: impl Into<String>) -> BoxFuture<'static, Result<()>> {
    log(Level::Error, message)
}

#[track_caller]
pub fn warn(message: impl Into<String>) -> BoxFuture<'static, Result<()>> {
    log(Level::Warn, message)
}

#[track_caller]
pub fn info(message: impl Into<String>) -> BoxFuture<'static, Result<()>> {
    log(Level::Info, message)
}

#[track_caller]
pub fn debug(message: impl Into<String>) -> BoxFuture<'static, Result<()>> {
    log(Level::Debug, message)
}

/// Log a fatal message and exit with `exit_code` once it is flushed or
/// `timeout` elapses (zero waits forever). Returns only if uninitialized.
#[track_caller]
pub fn fatal(
    exit_code: i32,
    timeout: Duration,
    message: impl Into<String>,
) -> BoxFuture<'static, Result<()>> {
    let logger = match logger() {
        Ok(logger) => logger,
        Err(e) => return futures::future::ready(Err(e)).boxed(),
    };
    let event = logger.locate(LogEvent::fatal(exit_code, message));
    async move {
        logger.submit_fatal(event, timeout).await;
        Ok(())
    }
    .boxed()
}

// ==== Buffer controls ====

/// Request a flush without waiting for it.
pub async fn flush() -> Result<()> {
    Ok(logger()?.flush().await?)
}

/// Flush and wait for completion. A zero timeout waits forever.
pub async fn sync_flush(timeout: Duration) -> Result<()> {
    Ok(logger()?.sync_flush(timeout).await?)
}

pub async fn set_max_buffer_bytes(bytes: usize) -> Result<()> {
    update(ConfigUpdate::new().max_buffer_bytes(bytes)).await
}

/// A zero interval disables periodic flushing.
pub async fn set_flush_interval(interval: Duration) -> Result<()> {
    update(ConfigUpdate::new().flush_interval(interval)).await
}

// ==== File controls ====

/// `latest.log` is rotated once it reaches this size.
pub async fn set_max_file_bytes(bytes: u64) -> Result<()> {
    update(ConfigUpdate::new().max_file_bytes(bytes)).await
}

/// An empty path disables file output.
pub async fn set_directory(directory: impl Into<PathBuf>) -> Result<()> {
    update(ConfigUpdate::new().directory(directory)).await
}

// ==== Other settings ====

pub async fn set_level(level: Level) -> Result<()> {
    update(ConfigUpdate::new().level(level)).await
}

/// `None` disables console output.
pub async fn set_console(console: Option<ConsoleSink>) -> Result<()> {
    update(ConfigUpdate::new().console(console)).await
}

pub async fn config() -> Result<Config> {
    Ok(logger()?.config().await?)
}

async fn update(update: ConfigUpdate) -> Result<()> {
    Ok(logger()?.update_config(update).await?)
}
