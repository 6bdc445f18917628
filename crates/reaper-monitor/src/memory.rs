//! Memory monitor. Kills the worker once its memory passes a jittered ceiling.
//!
//! Lifecycle per worker:
//!
//! ```text
//! uninitialized ──first request──▶ armed ──every check_cycle-th request──▶ measuring
//!                                    ▲                                        │
//!                                    └──────── counter reset to 0 ────────────┘
//! ```
//!
//! Arming records the start time and draws the effective limit:
//! `max + jitter(max_jitter * max)`. The limit is drawn once and kept for the
//! life of the worker.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use reaper_core::{ConfigResult, MemoryLimitConfig};
use reaper_killer::{EscalationKiller, jitter};

use crate::handler::WorkHandler;
use crate::probe::MemoryProbe;

struct Armed {
    started_at: Instant,
    limit: u64,
}

/// Wraps a handler and enforces a per-worker memory ceiling.
pub struct MemoryMonitor<H> {
    inner: H,
    config: MemoryLimitConfig,
    probe: Arc<dyn MemoryProbe>,
    killer: Arc<EscalationKiller>,
    pid: u32,
    armed: OnceLock<Armed>,
    /// Requests since the last sample.
    counter: AtomicU32,
}

impl<H> MemoryMonitor<H> {
    pub fn new(
        inner: H,
        config: MemoryLimitConfig,
        probe: Arc<dyn MemoryProbe>,
        killer: Arc<EscalationKiller>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            inner,
            config,
            probe,
            killer,
            pid: std::process::id(),
            armed: OnceLock::new(),
            counter: AtomicU32::new(0),
        })
    }

    /// Build from a key/value table; see [`MemoryLimitConfig::from_table`].
    pub fn from_table(
        inner: H,
        table: &toml::Table,
        probe: Arc<dyn MemoryProbe>,
        killer: Arc<EscalationKiller>,
    ) -> ConfigResult<Self> {
        Self::new(inner, MemoryLimitConfig::from_table(table)?, probe, killer)
    }

    pub fn config(&self) -> &MemoryLimitConfig {
        &self.config
    }

    /// `false` when `max` is 0; the monitor then does nothing at all.
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// The jittered ceiling, once the first request has armed the monitor.
    pub fn effective_limit(&self) -> Option<u64> {
        self.armed.get().map(|armed| armed.limit)
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn into_inner(self) -> H {
        self.inner
    }

    fn arm(&self) -> &Armed {
        self.armed.get_or_init(|| {
            let max = self.config.max;
            let headroom = jitter(self.config.max_jitter * max as f64) as u64;
            let limit = max.saturating_add(headroom);
            info!(
                pid = self.pid,
                max_bytes = max,
                limit_bytes = limit,
                check_cycle = self.config.check_cycle,
                mem_type = %self.config.mem_type,
                "memory limit armed"
            );
            Armed {
                started_at: Instant::now(),
                limit,
            }
        })
    }

    /// Count one request; `true` if this one should take a sample.
    fn tick(&self) -> bool {
        let cycle = self.config.check_cycle;
        let previous = match self.counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
            let next = n.saturating_add(1);
            Some(if next >= cycle { 0 } else { next })
        }) {
            Ok(n) | Err(n) => n,
        };
        previous.saturating_add(1) >= cycle
    }

    fn check(&self) {
        let armed = self.arm();
        if !self.tick() {
            return;
        }

        let bytes = match self.probe.sample(self.pid, self.config.mem_type) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(pid = self.pid, error = %e, "memory sample failed, skipping this cycle");
                return;
            }
        };

        if bytes > armed.limit {
            warn!(
                pid = self.pid,
                memory_bytes = bytes,
                limit_bytes = armed.limit,
                mem_type = %self.config.mem_type,
                "memory limit exceeded"
            );
            if let Err(e) = self.killer.kill_self(armed.started_at) {
                error!(pid = self.pid, error = %e, "self-termination failed");
            }
        } else if self.config.verbose {
            info!(
                pid = self.pid,
                memory_bytes = bytes,
                limit_bytes = armed.limit,
                mem_type = %self.config.mem_type,
                "memory within limit"
            );
        } else {
            debug!(pid = self.pid, memory_bytes = bytes, "memory sampled");
        }
    }
}

impl<W, H> WorkHandler<W> for MemoryMonitor<H>
where
    H: WorkHandler<W>,
{
    type Output = H::Output;

    fn handle(&self, work: W) -> Self::Output {
        let output = self.inner.handle(work);
        if self.config.is_enabled() {
            self.check();
        }
        output
    }
}
