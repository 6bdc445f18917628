//! reaper-killer — how a worker takes itself down.
//!
//! A worker that decides it should be replaced signals its own pid and lets
//! the supervisor respawn it. The first attempts are polite; if the worker
//! keeps breaching, the signal escalates until it cannot be ignored.
//!
//! # Architecture
//!
//! ```text
//! EscalationKiller (one per process, shared via Arc)
//!   ├── attempts: AtomicU32, never reset
//!   ├── signal_for_attempt() → SIGQUIT | SIGTERM | SIGKILL
//!   └── SignalSender::send(own pid, signal)
//!
//! jitter()        → random headroom for thresholds
//! draw_budget()   → random request budget in [min, max]
//! ```
//!
//! # Escalation
//!
//! With `max_quit_attempts = q` and `max_term_attempts = t`, attempts
//! `1..=q` send SIGQUIT, `q+1..=t` send SIGTERM, and everything after sends
//! SIGKILL.

pub mod escalation;
pub mod jitter;
pub mod signal;

pub use escalation::{EscalationKiller, global, install, signal_for_attempt};
pub use jitter::{draw_budget, jitter};
pub use signal::{RecordingSender, SignalSender, default_sender};

#[cfg(unix)]
pub use signal::NixSignalSender;
