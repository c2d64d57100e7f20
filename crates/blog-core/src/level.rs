//! Severity levels and the emission filter

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Log level
///
/// Declared in filter order: a configured minimum lets through every level
/// declared at or before it. `Disabled` never matches and `Fatal` always does.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[serde(alias = "none")]
    Disabled,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Fatal,
}

impl Level {
    /// All levels, in declaration order
    pub const ALL: [Level; 6] = [
        Self::Disabled,
        Self::Error,
        Self::Warn,
        Self::Info,
        Self::Debug,
        Self::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "NONE",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Fatal => "FATAL",
        }
    }

    /// Whether an event at `level` is emitted when `self` is the configured minimum.
    pub fn permits(self, level: Level) -> bool {
        match (self, level) {
            (_, Self::Fatal) => true,
            (_, Self::Disabled) | (Self::Disabled, _) => false,
            (min, level) => level <= min,
        }
    }

    /// Levels whose events carry a call-site location when capture is enabled.
    pub fn captures_location(self) -> bool {
        matches!(self, Self::Error | Self::Debug | Self::Fatal)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "disabled" => Ok(Self::Disabled),
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "fatal" => Ok(Self::Fatal),
            _ => Err(ConfigError::InvalidLevel(s.to_string())),
        }
    }
}
