//! Signal delivery.
//!
//! [`SignalSender`] is the seam between the escalation state machine and the
//! OS. Production uses [`NixSignalSender`]; [`RecordingSender`] keeps the
//! signals in memory instead, for dry runs and tests.

use std::sync::{Arc, Mutex};

use reaper_core::{KillResult, KillSignal};

/// Delivers a kill signal to a process.
pub trait SignalSender: Send + Sync {
    fn send(&self, pid: u32, signal: KillSignal) -> KillResult<()>;
}

/// Sends real signals via `kill(2)`.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NixSignalSender;

#[cfg(unix)]
impl SignalSender for NixSignalSender {
    fn send(&self, pid: u32, signal: KillSignal) -> KillResult<()> {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid).map_err(|_| reaper_core::KillError::Delivery {
            pid,
            signal,
            reason: "pid out of range".to_string(),
        })?;
        let sig = match signal {
            KillSignal::Quit => Signal::SIGQUIT,
            KillSignal::Term => Signal::SIGTERM,
            KillSignal::Kill => Signal::SIGKILL,
        };
        kill(Pid::from_raw(raw), sig).map_err(|errno| reaper_core::KillError::Delivery {
            pid,
            signal,
            reason: errno.to_string(),
        })
    }
}

/// Fails every delivery. Used where the platform has no `kill(2)`.
#[cfg(not(unix))]
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedSignalSender;

#[cfg(not(unix))]
impl SignalSender for UnsupportedSignalSender {
    fn send(&self, _pid: u32, _signal: KillSignal) -> KillResult<()> {
        Err(reaper_core::KillError::Unsupported)
    }
}

/// The platform's real signal sender.
pub fn default_sender() -> Arc<dyn SignalSender> {
    #[cfg(unix)]
    {
        Arc::new(NixSignalSender)
    }
    #[cfg(not(unix))]
    {
        Arc::new(UnsupportedSignalSender)
    }
}

/// Records signals instead of delivering them.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(u32, KillSignal)>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(pid, signal)` pair seen so far, oldest first.
    pub fn sent(&self) -> Vec<(u32, KillSignal)> {
        self.sent
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    /// Just the signals, oldest first.
    pub fn signals(&self) -> Vec<KillSignal> {
        self.sent().into_iter().map(|(_, signal)| signal).collect()
    }

    pub fn len(&self) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignalSender for RecordingSender {
    fn send(&self, pid: u32, signal: KillSignal) -> KillResult<()> {
        tracing::debug!(pid, %signal, "signal recorded, not delivered");
        self.sent
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push((pid, signal));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sender_keeps_order() {
        let sender = RecordingSender::new();
        assert!(sender.is_empty());

        sender.send(42, KillSignal::Quit).unwrap();
        sender.send(42, KillSignal::Kill).unwrap();

        assert_eq!(sender.len(), 2);
        assert_eq!(sender.sent(), vec![(42, KillSignal::Quit), (42, KillSignal::Kill)]);
        assert_eq!(sender.signals(), vec![KillSignal::Quit, KillSignal::Kill]);
    }

    #[cfg(unix)]
    #[test]
    fn nix_sender_reports_missing_process() {
        // Pid values this large are never handed out by the kernel.
        let err = NixSignalSender.send(i32::MAX as u32, KillSignal::Term).unwrap_err();
        assert!(matches!(
            err,
            reaper_core::KillError::Delivery { signal: KillSignal::Term, .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn nix_sender_rejects_out_of_range_pid() {
        let err = NixSignalSender.send(u32::MAX, KillSignal::Quit).unwrap_err();
        assert!(err.to_string().contains("pid out of range"), "{err}");
    }
}
