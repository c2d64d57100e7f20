//! Log events and their rendered line format

use chrono::{DateTime, Local};

use crate::level::Level;

/// Minimum width of the `[date,time,LEVEL] ` prefix
pub const PREFIX_WIDTH: usize = 28;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d,%H-%M-%S";

/// A single log entry, immutable once submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub level: Level,
    pub timestamp: DateTime<Local>,
    /// Call site, e.g. `main.rs:42`
    pub location: Option<String>,
    /// Only meaningful for [`Level::Fatal`]
    pub exit_code: i32,
    pub content: String,
}

impl LogEvent {
    pub fn new(level: Level, content: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Local::now(),
            location: None,
            exit_code: 0,
            content: content.into(),
        }
    }

    pub fn fatal(exit_code: i32, content: impl Into<String>) -> Self {
        Self {
            exit_code,
            ..Self::new(Level::Fatal, content)
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Render as `[YYYY-MM-DD,HH-MM-SS,LEVEL] [location] message\n`.
    ///
    /// The bracketed prefix and its trailing space are padded to [`PREFIX_WIDTH`].
    pub fn format_line(&self) -> String {
        let prefix = format!(
            "[{},{}] ",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level.as_str()
        );
        let location_len = self.location.as_ref().map_or(0, |l| l.len() + 3);
        let mut line = String::with_capacity(
            prefix.len().max(PREFIX_WIDTH) + location_len + self.content.len() + 1,
        );

        line.push_str(&prefix);
        for _ in prefix.len()..PREFIX_WIDTH {
            line.push(' ');
        }
        if let Some(location) = &self.location {
            line.push('[');
            line.push_str(location);
            line.push_str("] ");
        }
        line.push_str(&self.content);
        line.push('\n');
        line
    }
}
