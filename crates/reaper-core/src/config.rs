//! reaper.toml configuration parser.
//!
//! Every section validates eagerly: a degenerate range or an out-of-order
//! escalation ladder is rejected when the config is built, never discovered
//! on the request path.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::MemoryKind;

pub const DEFAULT_MAX_QUIT_ATTEMPTS: u32 = 10;
pub const DEFAULT_MAX_TERM_ATTEMPTS: u32 = 15;

/// 2 GiB.
pub const DEFAULT_MEMORY_MAX: u64 = 2 * 1024 * 1024 * 1024;
pub const DEFAULT_CHECK_CYCLE: u32 = 16;
pub const DEFAULT_MAX_JITTER: f64 = 0.05;

pub const DEFAULT_MIN_REQUESTS: u64 = 3072;
pub const DEFAULT_MAX_REQUESTS: u64 = 4096;

/// Full configuration file.
///
/// A missing `[memory]` or `[requests]` section means that monitor is not
/// installed at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReaperConfig {
    #[serde(default)]
    pub escalation: EscalationConfig,
    pub memory: Option<MemoryLimitConfig>,
    pub requests: Option<RequestLimitConfig>,
}

impl ReaperConfig {
    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: ReaperConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content)?)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.escalation.validate()?;
        if let Some(memory) = &self.memory {
            memory.validate()?;
        }
        if let Some(requests) = &self.requests {
            requests.validate()?;
        }
        Ok(())
    }
}

/// How many kill attempts are made at each severity before escalating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EscalationConfig {
    /// Attempts `1..=max_quit_attempts` send SIGQUIT.
    pub max_quit_attempts: u32,
    /// Attempts up to `max_term_attempts` send SIGTERM; anything later is SIGKILL.
    pub max_term_attempts: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            max_quit_attempts: DEFAULT_MAX_QUIT_ATTEMPTS,
            max_term_attempts: DEFAULT_MAX_TERM_ATTEMPTS,
        }
    }
}

impl EscalationConfig {
    pub fn new(max_quit_attempts: u32, max_term_attempts: u32) -> ConfigResult<Self> {
        let config = Self {
            max_quit_attempts,
            max_term_attempts,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_quit_attempts > self.max_term_attempts {
            return Err(ConfigError::EscalationOrder {
                quit: self.max_quit_attempts,
                term: self.max_term_attempts,
            });
        }
        Ok(())
    }
}

/// Memory ceiling settings. `max = 0` disables the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryLimitConfig {
    /// Byte ceiling before jitter is applied.
    pub max: u64,
    /// Sample memory every Nth request.
    pub check_cycle: u32,
    /// Log every sample, not just breaches.
    pub verbose: bool,
    /// Figure requested from the memory probe.
    pub mem_type: MemoryKind,
    /// Upper bound of the random headroom added to `max`, as a fraction of it.
    pub max_jitter: f64,
}

impl Default for MemoryLimitConfig {
    fn default() -> Self {
        Self {
            max: DEFAULT_MEMORY_MAX,
            check_cycle: DEFAULT_CHECK_CYCLE,
            verbose: false,
            mem_type: MemoryKind::Rss,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl MemoryLimitConfig {
    /// Build from a key/value table (`max`, `check_cycle`, `verbose`,
    /// `mem_type`, `max_jitter`). Missing keys take their defaults.
    pub fn from_table(table: &toml::Table) -> ConfigResult<Self> {
        let config: Self = toml::Value::Table(table.clone())
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_enabled(&self) -> bool {
        self.max > 0
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.max_jitter.is_finite() || !(0.0..=1.0).contains(&self.max_jitter) {
            return Err(ConfigError::Jitter(self.max_jitter));
        }
        if self.is_enabled() && self.check_cycle == 0 {
            return Err(ConfigError::ZeroCheckCycle);
        }
        Ok(())
    }
}

/// Request budget settings. Both bounds at 0 disables the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestLimitConfig {
    pub min_requests: u64,
    pub max_requests: u64,
    pub verbose: bool,
}

impl Default for RequestLimitConfig {
    fn default() -> Self {
        Self {
            min_requests: DEFAULT_MIN_REQUESTS,
            max_requests: DEFAULT_MAX_REQUESTS,
            verbose: false,
        }
    }
}

impl RequestLimitConfig {
    pub fn new(min_requests: u64, max_requests: u64, verbose: bool) -> ConfigResult<Self> {
        let config = Self {
            min_requests,
            max_requests,
            verbose,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_table(table: &toml::Table) -> ConfigResult<Self> {
        let config: Self = toml::Value::Table(table.clone())
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_enabled(&self) -> bool {
        self.min_requests > 0 || self.max_requests > 0
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_requests < self.min_requests {
            return Err(ConfigError::RequestRange {
                min: self.min_requests,
                max: self.max_requests,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(src: &str) -> toml::Table {
        src.parse::<toml::Table>().unwrap()
    }

    #[test]
    fn defaults_match_documented_values() {
        let memory = MemoryLimitConfig::default();
        assert_eq!(memory.max, 2 * 1024 * 1024 * 1024);
        assert_eq!(memory.check_cycle, 16);
        assert!(!memory.verbose);
        assert_eq!(memory.mem_type, MemoryKind::Rss);
        assert_eq!(memory.max_jitter, 0.05);

        let requests = RequestLimitConfig::default();
        assert_eq!(requests.min_requests, 3072);
        assert_eq!(requests.max_requests, 4096);

        let escalation = EscalationConfig::default();
        assert!(escalation.validate().is_ok());
    }

    #[test]
    fn escalation_order_is_enforced() {
        assert!(EscalationConfig::new(2, 4).is_ok());
        assert!(EscalationConfig::new(3, 3).is_ok());
        assert_eq!(
            EscalationConfig::new(5, 4).unwrap_err(),
            ConfigError::EscalationOrder { quit: 5, term: 4 }
        );
    }

    #[test]
    fn request_range_is_enforced() {
        let err = RequestLimitConfig::new(100, 50, false).unwrap_err();
        assert_eq!(err, ConfigError::RequestRange { min: 100, max: 50 });
        assert!(RequestLimitConfig::new(100, 100, false).is_ok());
    }

    #[test]
    fn zero_requests_disables_monitor() {
        let config = RequestLimitConfig::new(0, 0, false).unwrap();
        assert!(!config.is_enabled());
        assert!(RequestLimitConfig::default().is_enabled());
    }

    #[test]
    fn memory_table_fills_defaults() {
        let config =
            MemoryLimitConfig::from_table(&table("max = 1000\nmem_type = \"PSS\"")).unwrap();
        assert_eq!(config.max, 1000);
        assert_eq!(config.mem_type, MemoryKind::Pss);
        assert_eq!(config.check_cycle, DEFAULT_CHECK_CYCLE);
        assert_eq!(config.max_jitter, DEFAULT_MAX_JITTER);
    }

    #[test]
    fn memory_table_rejects_unknown_keys() {
        let err = MemoryLimitConfig::from_table(&table("max = 1\nmax_memory = 2")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn memory_table_rejects_negative_limit() {
        let err = MemoryLimitConfig::from_table(&table("max = -1")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn memory_table_rejects_unknown_kind() {
        let err = MemoryLimitConfig::from_table(&table("mem_type = \"vms\"")).unwrap_err();
        assert!(err.to_string().contains("vms"), "{err}");
    }

    #[test]
    fn jitter_fraction_must_be_in_unit_range() {
        for bad in [-0.1, 1.5, f64::NAN, f64::INFINITY] {
            let config = MemoryLimitConfig {
                max_jitter: bad,
                ..MemoryLimitConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::Jitter(_))));
        }
    }

    #[test]
    fn zero_check_cycle_only_matters_when_enabled() {
        let mut config = MemoryLimitConfig {
            check_cycle: 0,
            ..MemoryLimitConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCheckCycle));

        config.max = 0;
        assert!(config.validate().is_ok());
        assert!(!config.is_enabled());
    }

    #[test]
    fn request_table_parses() {
        let config = RequestLimitConfig::from_table(
            &table("min_requests = 10\nmax_requests = 20\nverbose = true"),
        )
        .unwrap();
        assert_eq!(config, RequestLimitConfig::new(10, 20, true).unwrap());
    }

    #[test]
    fn parse_full_document() {
        let config = ReaperConfig::parse(
            r#"
[escalation]
max_quit_attempts = 2
max_term_attempts = 4

[memory]
max = 1073741824
check_cycle = 8

[requests]
min_requests = 100
max_requests = 200
"#,
        )
        .unwrap();
        assert_eq!(config.escalation, EscalationConfig::new(2, 4).unwrap());
        assert_eq!(config.memory.as_ref().unwrap().check_cycle, 8);
        assert_eq!(config.requests.unwrap().max_requests, 200);
    }

    #[test]
    fn parse_empty_document_installs_nothing() {
        let config = ReaperConfig::parse("").unwrap();
        assert_eq!(config.escalation, EscalationConfig::default());
        assert!(config.memory.is_none());
        assert!(config.requests.is_none());
    }

    #[test]
    fn parse_rejects_inverted_escalation() {
        let err = ReaperConfig::parse("[escalation]\nmax_quit_attempts = 9\nmax_term_attempts = 1")
            .unwrap_err();
        assert_eq!(err, ConfigError::EscalationOrder { quit: 9, term: 1 });
    }

    #[test]
    fn from_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reaper.toml");
        let config = ReaperConfig {
            memory: Some(MemoryLimitConfig::default()),
            ..ReaperConfig::default()
        };
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let loaded = ReaperConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn from_file_missing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ReaperConfig::from_file(&dir.path().join("absent.toml")).is_err());
    }
}
