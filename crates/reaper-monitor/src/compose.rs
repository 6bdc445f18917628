//! Assemble the monitor stack for a worker from a [`ReaperConfig`].

use std::sync::Arc;

use tracing::debug;

use reaper_core::{ConfigResult, ReaperConfig};
use reaper_killer::EscalationKiller;

use crate::handler::WorkHandler;
use crate::memory::MemoryMonitor;
use crate::probe::MemoryProbe;
use crate::requests::RequestMonitor;

/// A type-erased handler stack.
pub type BoxHandler<W, O> = Box<dyn WorkHandler<W, Output = O>>;

/// Wrap `inner` in the monitors the config enables.
///
/// The request monitor sits outermost and the memory monitor innermost, so a
/// request that breaches both checks memory first. Both share `killer`,
/// which is normally [`reaper_killer::install`]ed from
/// `config.escalation` at startup.
pub fn compose<W, H>(
    inner: H,
    config: &ReaperConfig,
    probe: Arc<dyn MemoryProbe>,
    killer: Arc<EscalationKiller>,
) -> ConfigResult<BoxHandler<W, H::Output>>
where
    W: 'static,
    H: WorkHandler<W> + 'static,
    H::Output: 'static,
{
    config.validate()?;
    let mut handler: BoxHandler<W, H::Output> = Box::new(inner);

    if let Some(memory) = config.memory.as_ref().filter(|m| m.is_enabled()) {
        handler = Box::new(MemoryMonitor::new(
            handler,
            memory.clone(),
            probe,
            killer.clone(),
        )?);
        debug!(max_bytes = memory.max, "memory monitor installed");
    }

    if let Some(requests) = config.requests.filter(|r| r.is_enabled()) {
        handler = Box::new(RequestMonitor::new(handler, requests, killer)?);
        debug!(
            min_requests = requests.min_requests,
            max_requests = requests.max_requests,
            "request monitor installed"
        );
    }

    Ok(handler)
}
