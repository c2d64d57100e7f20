//! # Blog Core Library
//!
//! Asynchronous, buffered log engine with size-based file rotation.
//!
//! ## Modules
//!
//! - `level` - Severity levels and the emission filter
//! - `event` - Log events and the line format
//! - `config` - Live configuration, partial updates, console sink, settings
//! - `writer` - Write buffer, flush and `latest.log` rotation
//! - `engine` - The coordinator task and its `Logger` handle
//! - `error` - Errors surfaced to callers

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod level;
pub mod writer;

pub use config::{Config, ConfigUpdate, ConsoleSink, Settings};
pub use engine::{ExitHook, Logger, LoggerBuilder, DEFAULT_CHANNEL_CAPACITY};
pub use error::{ConfigError, EngineError, StartupError};
pub use event::LogEvent;
pub use level::Level;
pub use writer::{FlushOutcome, LATEST_LOG};
