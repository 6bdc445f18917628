//! Request-count monitor. Kills the worker after a randomized number of requests.
//!
//! The budget is drawn from `[min_requests, max_requests]` on the first
//! request and every request after that spends one unit. Once it is spent the
//! monitor never un-breaches: each further request makes another kill
//! attempt, which escalates.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use reaper_core::{ConfigResult, RequestLimitConfig};
use reaper_killer::{EscalationKiller, draw_budget};

use crate::handler::WorkHandler;

struct Armed {
    started_at: Instant,
    budget: u64,
}

/// Wraps a handler and enforces a per-worker request budget.
pub struct RequestMonitor<H> {
    inner: H,
    config: RequestLimitConfig,
    killer: Arc<EscalationKiller>,
    pid: u32,
    armed: OnceLock<Armed>,
    remaining: AtomicI64,
}

impl<H> RequestMonitor<H> {
    pub fn new(
        inner: H,
        config: RequestLimitConfig,
        killer: Arc<EscalationKiller>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            inner,
            config,
            killer,
            pid: std::process::id(),
            armed: OnceLock::new(),
            remaining: AtomicI64::new(0),
        })
    }

    /// Positional form: `min_requests`, `max_requests`, `verbose`.
    pub fn with_limits(
        inner: H,
        min_requests: u64,
        max_requests: u64,
        verbose: bool,
        killer: Arc<EscalationKiller>,
    ) -> ConfigResult<Self> {
        Self::new(
            inner,
            RequestLimitConfig::new(min_requests, max_requests, verbose)?,
            killer,
        )
    }

    /// Build from a key/value table; see [`RequestLimitConfig::from_table`].
    pub fn from_table(
        inner: H,
        table: &toml::Table,
        killer: Arc<EscalationKiller>,
    ) -> ConfigResult<Self> {
        Self::new(inner, RequestLimitConfig::from_table(table)?, killer)
    }

    pub fn config(&self) -> &RequestLimitConfig {
        &self.config
    }

    /// `false` when both bounds are 0; the monitor then does nothing at all.
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// The drawn budget, once the first request has armed the monitor.
    pub fn budget(&self) -> Option<u64> {
        self.armed.get().map(|armed| armed.budget)
    }

    /// Requests left before the limit. Goes negative past the limit.
    pub fn remaining(&self) -> Option<i64> {
        self.armed
            .get()
            .map(|_| self.remaining.load(Ordering::Acquire))
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn into_inner(self) -> H {
        self.inner
    }

    fn arm(&self) -> &Armed {
        self.armed.get_or_init(|| {
            let budget = draw_budget(self.config.min_requests, self.config.max_requests);
            // Set before the OnceLock publishes, so no request sees a stale 0.
            self.remaining
                .store(i64::try_from(budget).unwrap_or(i64::MAX), Ordering::Release);
            info!(
                pid = self.pid,
                budget,
                min_requests = self.config.min_requests,
                max_requests = self.config.max_requests,
                "request limit armed"
            );
            Armed {
                started_at: Instant::now(),
                budget,
            }
        })
    }

    fn check(&self) {
        let armed = self.arm();
        let previous = match self.remaining.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
            Some(n.saturating_sub(1))
        }) {
            Ok(n) | Err(n) => n,
        };
        let remaining = previous.saturating_sub(1);

        if self.config.verbose {
            info!(pid = self.pid, remaining, "requests remaining before restart");
        } else {
            debug!(pid = self.pid, remaining, "request counted");
        }

        if remaining <= 0 {
            warn!(
                pid = self.pid,
                budget = armed.budget,
                "request limit reached"
            );
            if let Err(e) = self.killer.kill_self(armed.started_at) {
                error!(pid = self.pid, error = %e, "self-termination failed");
            }
        }
    }
}

impl<W, H> WorkHandler<W> for RequestMonitor<H>
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
