// Background jobs: the poll cycle and the scheduler that drives it.

pub mod poll_cycle;
pub mod scheduler;

pub use poll_cycle::{CycleSettings, PollCycle};
pub use scheduler::{Scheduler, DEFAULT_POLL_INTERVAL};
