//! Polling lifecycle.
//!
//! - [`scheduler`]: pure state machine ([`PollScheduler`]) returning the
//!   timer and fetch commands to perform, guarded by a generation counter
//! - [`session`]: [`MonitorSession`], which carries those commands out on a
//!   tokio runtime and owns the history, summary and last error

pub mod scheduler;
pub mod session;

pub use scheduler::{
    Command, Completion, Generation, PollConfig, PollScheduler, SchedulerError, SchedulerState,
    SchedulerStats, DEFAULT_INTERVAL,
};
pub use session::{
    Lookup, MonitorSession, MonitorSessionBuilder, SessionError, SessionEvent, StopHandle,
    DEFAULT_TIMESTAMP_FORMAT,
};
