//! Error types for Reaper.

use thiserror::Error;

use crate::types::{KillSignal, MemoryKind};

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for memory probes.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Result type alias for kill attempts.
pub type KillResult<T> = Result<T, KillError>;

/// Rejected configuration. Raised at construction time, never per request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max_quit_attempts ({quit}) must not exceed max_term_attempts ({term})")]
    EscalationOrder { quit: u32, term: u32 },

    #[error("max_requests ({max}) must not be below min_requests ({min})")]
    RequestRange { min: u64, max: u64 },

    #[error("check_cycle must be at least 1 when the memory limit is enabled")]
    ZeroCheckCycle,

    #[error("max_jitter must be a finite fraction in [0, 1], got {0}")]
    Jitter(f64),

    #[error("unknown memory kind: {0} (expected rss, pss or uss)")]
    UnknownMemoryKind(String),

    #[error("escalation killer is already installed")]
    AlreadyInstalled,

    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// Memory sampling failed. Callers skip the round and carry on.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{field} not found in {path}")]
    MissingField { field: &'static str, path: String },

    #[error("malformed {field} value: {value:?}")]
    Malformed { field: &'static str, value: String },

    #[error("memory kind {0} is not supported on this platform")]
    Unsupported(MemoryKind),

    #[error("probe failed: {0}")]
    Other(String),
}

/// A kill signal could not be delivered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KillError {
    #[error("failed to send {signal} to pid {pid}: {reason}")]
    Delivery {
        pid: u32,
        signal: KillSignal,
        reason: String,
    },

    #[error("signal delivery is not supported on this platform")]
    Unsupported,
}
