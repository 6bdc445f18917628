//! reaper-monitor — threshold monitors for a worker's request path.
//!
//! Each monitor is a decorator around the host's [`WorkHandler`]. It lets
//! the wrapped handler finish, then checks its own limit and, on breach,
//! asks the shared [`EscalationKiller`](reaper_killer::EscalationKiller) to
//! take the worker down.
//!
//! # Architecture
//!
//! ```text
//! RequestMonitor            (budget drawn from [min, max], -1 per request)
//!   └── MemoryMonitor       (probe every check_cycle requests vs jittered max)
//!         └── host handler  (runs first, always completes)
//! ```
//!
//! Both monitors arm lazily on their first request: that is when the start
//! time is recorded and the per-worker randomized limit is drawn. The
//! randomization keeps a pool under uniform load from restarting in
//! lockstep.
//!
//! Monitor faults never reach the request path. Probe failures skip a
//! sampling round; signal failures are logged.

pub mod compose;
pub mod handler;
pub mod memory;
pub mod probe;
pub mod requests;

pub use compose::{BoxHandler, compose};
pub use handler::{FnHandler, WorkHandler, handler_fn};
pub use memory::MemoryMonitor;
pub use probe::{MemoryProbe, ProcMemoryProbe};
pub use requests::RequestMonitor;
