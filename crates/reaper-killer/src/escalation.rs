//! Escalation killer: the process-wide kill-attempt state machine.
//!
//! Every call to [`EscalationKiller::kill_self`] counts as one attempt,
//! whichever monitor made it. The counter only moves forward, so a worker
//! that survives a SIGQUIT gets a SIGTERM, and eventually a SIGKILL.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tracing::warn;

use reaper_core::{ConfigError, ConfigResult, EscalationConfig, KillResult, KillSignal};

use crate::signal::{SignalSender, default_sender};

static GLOBAL: OnceLock<Arc<EscalationKiller>> = OnceLock::new();

/// Signal severity for the `attempt`-th kill attempt (1-based).
pub fn signal_for_attempt(config: &EscalationConfig, attempt: u32) -> KillSignal {
    if attempt <= config.max_quit_attempts {
        KillSignal::Quit
    } else if attempt <= config.max_term_attempts {
        KillSignal::Term
    } else {
        KillSignal::Kill
    }
}

/// Sends escalating signals to the current process.
pub struct EscalationKiller {
    config: EscalationConfig,
    /// Attempts made so far. Never reset.
    attempts: AtomicU32,
    /// Target of every signal: this process.
    pid: u32,
    sender: Arc<dyn SignalSender>,
}

impl EscalationKiller {
    /// Create a killer that delivers real signals to this process.
    pub fn new(config: EscalationConfig) -> ConfigResult<Self> {
        Self::with_sender(config, default_sender())
    }

    /// Create a killer with a custom signal sender.
    pub fn with_sender(
        config: EscalationConfig,
        sender: Arc<dyn SignalSender>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, sender))
    }

    fn from_parts(config: EscalationConfig, sender: Arc<dyn SignalSender>) -> Self {
        Self {
            config,
            attempts: AtomicU32::new(0),
            pid: std::process::id(),
            sender,
        }
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    /// The pid every signal is sent to.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Number of kill attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Make one kill attempt against this process.
    ///
    /// `started_at` is when the calling monitor armed; it is only used for
    /// the log line. Returns the signal that was sent. A delivery failure is
    /// returned as an error, but the attempt still counts.
    pub fn kill_self(&self, started_at: Instant) -> KillResult<KillSignal> {
        let alive = started_at.elapsed();

        // Saturate instead of wrapping so severity can never drop back.
        let previous = match self.attempts.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
            Some(n.saturating_add(1))
        }) {
            Ok(n) | Err(n) => n,
        };
        let attempt = previous.saturating_add(1);
        let signal = signal_for_attempt(&self.config, attempt);

        warn!(
            %signal,
            pid = self.pid,
            alive_secs = alive.as_secs(),
            attempt,
            "worker terminating itself"
        );

        self.sender.send(self.pid, signal)?;
        Ok(signal)
    }
}

impl std::fmt::Debug for EscalationKiller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationKiller")
            .field("config", &self.config)
            .field("attempts", &self.attempts())
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Install the process-wide killer. Call once, at worker startup.
///
/// Fails if a killer is already installed, including one created lazily by
/// [`global`].
pub fn install(config: EscalationConfig) -> ConfigResult<Arc<EscalationKiller>> {
    let killer = Arc::new(EscalationKiller::new(config)?);
    GLOBAL
        .set(killer.clone())
        .map_err(|_| ConfigError::AlreadyInstalled)?;
    Ok(killer)
}

/// The process-wide killer, created with default thresholds if nothing was
/// installed.
pub fn global() -> Arc<EscalationKiller> {
    GLOBAL
        .get_or_init(|| {
            Arc::new(EscalationKiller::from_parts(
                EscalationConfig::default(),
                default_sender(),
            ))
        })
        .clone()
}
