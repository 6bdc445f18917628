//! Shared types used across Reaper crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Severity of a self-directed kill signal.
///
/// Ordered from most to least graceful, so `Quit < Term < Kill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillSignal {
    /// SIGQUIT: finish the current request, then exit.
    Quit,
    /// SIGTERM: finish the current request, then exit.
    Term,
    /// SIGKILL: immediate, cannot be handled.
    Kill,
}

impl KillSignal {
    pub fn name(&self) -> &'static str {
        match self {
            KillSignal::Quit => "SIGQUIT",
            KillSignal::Term => "SIGTERM",
            KillSignal::Kill => "SIGKILL",
        }
    }

    /// Whether the host gets a chance to drain in-flight work.
    pub fn is_graceful(&self) -> bool {
        !matches!(self, KillSignal::Kill)
    }
}

impl fmt::Display for KillSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which memory figure a probe should report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum MemoryKind {
    /// Resident set size.
    #[default]
    Rss,
    /// Proportional set size (shared pages split across sharers).
    Pss,
    /// Unique set size (private pages only).
    Uss,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Rss => "rss",
            MemoryKind::Pss => "pss",
            MemoryKind::Uss => "uss",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rss" => Ok(MemoryKind::Rss),
            "pss" => Ok(MemoryKind::Pss),
            "uss" => Ok(MemoryKind::Uss),
            other => Err(ConfigError::UnknownMemoryKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for MemoryKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
