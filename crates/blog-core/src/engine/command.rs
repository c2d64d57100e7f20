//! Commands multiplexed onto the coordinator's inbound channel

use tokio::sync::oneshot;

use crate::config::{Config, ConfigUpdate};
use crate::event::LogEvent;

/// Everything a [`Logger`](super::Logger) handle can ask of the coordinator.
///
/// A single channel carries all variants so the coordinator observes them in
/// exactly the order they were enqueued.
#[derive(Debug)]
pub enum Command {
    Log(LogEvent),
    Flush,
    SyncFlush(oneshot::Sender<()>),
    GetConfig(oneshot::Sender<Config>),
    UpdateConfig(ConfigUpdate),
    Shutdown(oneshot::Sender<()>),
}

impl Command {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Log(_) => "log",
            Self::Flush => "flush",
            Self::SyncFlush(_) => "sync_flush",
            Self::GetConfig(_) => "get_config",
            Self::UpdateConfig(_) => "update_config",
            Self::Shutdown(_) => "shutdown",
        }
    }
}
