//! reaper-core — shared types for the Reaper worker self-termination policy.
//!
//! Holds the pieces every other crate agrees on: the kill signal ladder,
//! memory-kind selectors for probes, configuration parsing, and the error
//! taxonomy.

pub mod config;
pub mod error;
pub mod types;

pub use config::{EscalationConfig, MemoryLimitConfig, ReaperConfig, RequestLimitConfig};
pub use error::{ConfigError, ConfigResult, KillError, KillResult, ProbeError, ProbeResult};
pub use types::*;
