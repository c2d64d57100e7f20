//! Logger handle and coordinator lifecycle
//!
//! A [`Logger`] is a cheap, cloneable handle onto one coordinator task. Every
//! operation is a `Command` pushed through a single bounded channel; the
//! coordinator processes them one at a time, so buffer contents, rotations and
//! config values change in exactly the order commands were enqueued.
//!
//! ```text
//!  producers ──► mpsc (bounded, default 255) ──► Coordinator ──► latest.log
//!                                                     │
//!                   oneshot replies ◄─────────────────┘──► console sink
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let logger = Logger::new(Config { directory: "logs".into(), ..Config::default() })?;
//! logger.info("service started").await?;
//! logger.sync_flush(Duration::from_secs(1)).await?;
//! logger.shutdown(Duration::ZERO).await?;
//! ```

mod command;
mod coordinator;

pub(crate) use command::Command;

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::panic::Location;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{validate_directory, Config, ConfigUpdate};
use crate::error::{EngineError, StartupError};
use crate::event::LogEvent;
use crate::level::Level;
use coordinator::Coordinator;

/// Default capacity of the inbound command channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 255;

/// Called with the exit code once a fatal event has been handled.
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

fn process_exit() -> ExitHook {
    Arc::new(|code| std::process::exit(code))
}

/// Builder for [`Logger`]
pub struct LoggerBuilder {
    channel_capacity: usize,
    capture_location: bool,
    exit_hook: ExitHook,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            capture_location: true,
            exit_hook: process_exit(),
        }
    }
}

impl LoggerBuilder {
    /// Producers wait once this many commands are queued. Clamped to at least 1.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Attach `file:line` to error, debug and fatal events.
    pub fn capture_location(mut self, enabled: bool) -> Self {
        self.capture_location = enabled;
        self
    }

    /// Replace `std::process::exit` as the fatal-event terminator.
    pub fn exit_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit_hook = Arc::new(hook);
        self
    }

    /// Spawn the coordinator. Must be called inside a Tokio runtime.
    ///
    /// An unusable directory does not prevent startup: file output is disabled,
    /// a stdout console sink is installed if none was configured, and the error
    /// is returned together with the running logger.
    pub fn build(self, mut config: Config) -> Result<Logger, StartupError> {
        let startup_error = match validate_directory(&config.directory) {
            Ok(directory) => {
                config.directory = directory;
                None
            }
            Err(e) => {
                warn!("[Logger] {}; falling back to console output", e);
                config.fall_back_to_console();
                Some(e)
            }
        };

        let (sender, receiver) = mpsc::channel(self.channel_capacity);
        let running = Arc::new(AtomicBool::new(true));
        let coordinator = Coordinator::new(receiver, config, running.clone(), self.exit_hook.clone());
        let task = tokio::spawn(coordinator.run());

        let logger = Logger {
            inner: Arc::new(Inner {
                sender,
                running,
                capture_location: self.capture_location,
                exit_hook: self.exit_hook,
                task: Mutex::new(Some(task)),
            }),
        };

        match startup_error {
            Some(e) => Err(StartupError::new(logger, e)),
            None => Ok(logger),
        }
    }
}

struct Inner {
    sender: mpsc::Sender<Command>,
    running: Arc<AtomicBool>,
    capture_location: bool,
    exit_hook: ExitHook,
    /// Coordinator task; only `start` touches it, so at most one ever runs
    task: Mutex<Option<JoinHandle<Coordinator>>>,
}

/// Handle onto a running log engine
///
/// Cloning is cheap and every clone talks to the same coordinator. When the
/// last clone is dropped the coordinator flushes once more and exits.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("running", &self.is_running())
            .field("capture_location", &self.inner.capture_location)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Spawn a logger with default channel capacity and location capture.
    pub fn new(config: Config) -> Result<Self, StartupError> {
        Self::builder().build(config)
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Enqueue an event, waiting while the channel is full.
    pub async fn submit(&self, event: LogEvent) -> Result<(), EngineError> {
        self.send(Command::Log(event)).await
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>) -> BoxFuture<'_, Result<(), EngineError>> {
        let event = self.locate(LogEvent::new(level, message));
        self.submit(event).boxed()
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) -> BoxFuture<'_, Result<(), EngineError>> {
        self.log(Level::Error, message)
    }

    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) -> BoxFuture<'_, Result<(), EngineError>> {
        self.log(Level::Warn, message)
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) -> BoxFuture<'_, Result<(), EngineError>> {
        self.log(Level::Info, message)
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) -> BoxFuture<'_, Result<(), EngineError>> {
        self.log(Level::Debug, message)
    }

    /// Log a fatal event and terminate the process with `exit_code`.
    ///
    /// See [`Logger::submit_fatal`] for the timeout semantics.
    #[track_caller]
    pub fn fatal(&self, exit_code: i32, timeout: Duration, message: impl Into<String>) -> BoxFuture<'_, ()> {
        let event = self.locate(LogEvent::fatal(exit_code, message));
        self.submit_fatal(event, timeout).boxed()
    }

    /// Enqueue a fatal event and wait for the coordinator to end the process.
    ///
    /// The coordinator flushes and exits as soon as it handles the event. If it
    /// has not done so within `timeout` (zero waits forever), the message is
    /// printed to stderr and the process exits from here instead. Only returns
    /// when a custom exit hook returns.
    pub async fn submit_fatal(&self, event: LogEvent, timeout: Duration) {
        let exit_code = event.exit_code;
        let content = event.content.clone();

        let wait = async {
            if self.submit(event).await.is_ok() {
                std::future::pending::<()>().await;
            }
        };
        if timeout.is_zero() {
            wait.await;
        } else {
            let _ = tokio::time::timeout(timeout, wait).await;
        }
        eprintln!("Fatal message failed to log in time: {content}");
        (self.inner.exit_hook)(exit_code);
    }

    /// Ask for a flush without waiting for it.
    pub async fn flush(&self) -> Result<(), EngineError> {
        self.send(Command::Flush).await
    }

    /// Flush and wait for completion. A zero timeout waits forever.
    pub async fn sync_flush(&self, timeout: Duration) -> Result<(), EngineError> {
        self.request(Command::SyncFlush, timeout).await
    }

    /// Copy of the live configuration
    pub async fn config(&self) -> Result<Config, EngineError> {
        self.request(Command::GetConfig, Duration::ZERO).await
    }

    /// Apply a partial update. An invalid directory is reported on the
    /// console and switches the engine to console output; it is not an error here.
    pub async fn update_config(&self, update: ConfigUpdate) -> Result<(), EngineError> {
        self.send(Command::UpdateConfig(update)).await
    }

    /// Flush and stop the coordinator. A zero timeout waits forever.
    ///
    /// On timeout the shutdown still completes in the background.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), EngineError> {
        if !self.is_running() {
            return Ok(());
        }
        self.request(Command::Shutdown, timeout).await?;
        info!("[Logger] Shut down");
        Ok(())
    }

    /// Resume a stopped coordinator with its existing configuration.
    pub async fn start(&self) -> Result<(), EngineError> {
        let mut slot = self.inner.task.lock().await;
        if self.is_running() {
            return Ok(());
        }

        let task = slot
            .take()
            .ok_or_else(|| EngineError::Join("coordinator task is gone".to_string()))?;
        let coordinator = task.await.map_err(|e| EngineError::Join(e.to_string()))?;

        self.inner.running.store(true, Ordering::SeqCst);
        *slot = Some(tokio::spawn(coordinator.run()));
        info!("[Logger] Restarted");
        Ok(())
    }

    async fn send(&self, command: Command) -> Result<(), EngineError> {
        if !self.is_running() {
            return Err(EngineError::Stopped);
        }
        let type_name = command.type_name();
        self.inner.sender.send(command).await.map_err(|_| {
            debug!(command = type_name, "[Logger] Coordinator gone, command dropped");
            EngineError::Stopped
        })
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
        timeout: Duration,
    ) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        let command = command(reply);

        if timeout.is_zero() {
            self.send(command).await?;
            return response.await.map_err(|_| EngineError::Stopped);
        }

        if !self.is_running() {
            return Err(EngineError::Stopped);
        }
        let deadline = Instant::now() + timeout;
        let type_name = command.type_name();
        let sender = self.inner.sender.clone();
        let mut send = Box::pin(async move { sender.send(command).await });

        match tokio::time::timeout_at(deadline, &mut send).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(EngineError::Stopped),
            Err(_) => {
                // The channel is full; keep the command queued after the caller gives up.
                debug!(command = type_name, "[Logger] Channel full at timeout, enqueueing in background");
                tokio::spawn(async move {
                    if send.await.is_err() {
                        debug!(command = type_name, "[Logger] Coordinator gone, command dropped");
                    }
                });
                return Err(EngineError::Timeout(timeout));
            }
        }

        tokio::time::timeout_at(deadline, response)
            .await
            .map_err(|_| EngineError::Timeout(timeout))?
            .map_err(|_| EngineError::Stopped)
    }

    /// Attach the caller's `file:line` if this logger captures locations for the event's level.
    #[track_caller]
    pub fn locate(&self, event: LogEvent) -> LogEvent {
        if !self.inner.capture_location || !event.level.captures_location() {
            return event;
        }
        let caller = Location::caller();
        let file = Path::new(caller.file())
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| caller.file().to_string());
        event.with_location(format!("{}:{}", file, caller.line()))
    }
}
