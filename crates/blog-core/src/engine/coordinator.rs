//! The single task that owns and mutates all engine state

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::command::Command;
use super::ExitHook;
use crate::config::{validate_directory, Config, ConfigUpdate};
use crate::event::LogEvent;
use crate::level::Level;
use crate::writer::{BufferedWriter, FlushOutcome};

enum Step {
    Continue,
    Stop,
}

/// Engine state plus the receiving end of the command channel.
///
/// `run` hands the coordinator back when it stops so the owner can restart it
/// with the same configuration.
pub(crate) struct Coordinator {
    receiver: mpsc::Receiver<Command>,
    config: Config,
    writer: BufferedWriter,
    running: Arc<AtomicBool>,
    exit_hook: ExitHook,
}

impl Coordinator {
    pub(crate) fn new(
        receiver: mpsc::Receiver<Command>,
        config: Config,
        running: Arc<AtomicBool>,
        exit_hook: ExitHook,
    ) -> Self {
        Self {
            receiver,
            config,
            writer: BufferedWriter::new(),
            running,
            exit_hook,
        }
    }

    pub(crate) async fn run(mut self) -> Self {
        let mut ticker = flush_ticker(self.config.flush_interval);
        info!(
            directory = ?self.config.directory,
            level = %self.config.level,
            "[Logger] Coordinator started"
        );

        loop {
            tokio::select! {
                command = self.receiver.recv() => {
                    let Some(command) = command else {
                        debug!("[Logger] All handles dropped, final flush");
                        self.flush().await;
                        break;
                    };
                    if let Step::Stop = self.handle(command, &mut ticker).await {
                        break;
                    }
                }
                _ = next_tick(&mut ticker) => {
                    self.flush().await;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("[Logger] Coordinator stopped");
        self
    }

    async fn handle(&mut self, command: Command, ticker: &mut Option<Interval>) -> Step {
        match command {
            Command::Log(event) => return self.handle_event(event).await,
            Command::Flush => {
                self.flush().await;
            }
            Command::SyncFlush(done) => {
                self.flush().await;
                let _ = done.send(());
            }
            Command::GetConfig(reply) => {
                let _ = reply.send(self.config.clone());
            }
            Command::UpdateConfig(update) => self.update_config(update, ticker).await,
            Command::Shutdown(done) => {
                self.flush().await;
                self.running.store(false, Ordering::SeqCst);
                let _ = done.send(());
                return Step::Stop;
            }
        }
        Step::Continue
    }

    async fn handle_event(&mut self, event: LogEvent) -> Step {
        if !self.config.level.permits(event.level) {
            return Step::Continue;
        }

        let line = event.format_line();
        if let Some(console) = &self.config.console {
            console.write_str(&line);
        }
        let outcome = self.writer.append(&mut self.config, &line).await;
        self.record(outcome);

        if event.level != Level::Fatal {
            return Step::Continue;
        }
        self.flush().await;
        self.running.store(false, Ordering::SeqCst);
        info!(exit_code = event.exit_code, "[Logger] Fatal event flushed, exiting");
        (self.exit_hook)(event.exit_code);
        Step::Stop
    }

    async fn flush(&mut self) {
        let outcome = self.writer.flush(&mut self.config).await;
        self.record(outcome);
    }

    fn record(&self, outcome: FlushOutcome) {
        match outcome {
            FlushOutcome::Skipped => {}
            FlushOutcome::Written { bytes } => {
                debug!(bytes, "[Logger] Flushed to {:?}", self.config.directory);
            }
            FlushOutcome::Rotated { bytes, rotated_to } => {
                info!(bytes, "[Logger] Rotated log file to {:?}", rotated_to);
            }
        }
    }

    async fn update_config(&mut self, update: ConfigUpdate, ticker: &mut Option<Interval>) {
        self.config.apply(&update);

        if let Some(directory) = update.directory {
            self.set_directory(directory).await;
        }
        if update.flush_interval.is_some() {
            *ticker = flush_ticker(self.config.flush_interval);
            debug!(
                interval = ?self.config.flush_interval,
                "[Logger] Flush timer restarted"
            );
        }
    }

    /// Flush pending lines to the old destination, then switch directories.
    async fn set_directory(&mut self, directory: PathBuf) {
        self.flush().await;

        match validate_directory(&directory) {
            Ok(directory) => {
                debug!(?directory, "[Logger] Log directory updated");
                self.config.directory = directory;
            }
            Err(e) => {
                warn!("[Logger] Rejected log directory: {}", e);
                self.config
                    .fall_back_to_console()
                    .write_line(&e.to_string());
            }
        }
    }
}

/// `None` when the interval is zero, i.e. periodic flushing is disabled.
fn flush_ticker(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
