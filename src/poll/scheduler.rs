//! Poll lifecycle as a pure state machine.
//!
//! The scheduler never touches timers or the network itself. Every
//! operation returns the ordered [`Command`]s the driver must carry out, and
//! every asynchronous callback is checked against the generation it was
//! scheduled under.
//!
//! ```text
//!            start()                     stop()
//!   Idle ───────────────▶ Running ───────────────▶ Stopped
//!                          │  ▲                      │
//!            reconfigure() │  │ (cancel, re-arm,     │ start()
//!                          └──┘  immediate fetch)    │
//!                          ▲                         │
//!                          └─────────────────────────┘
//! ```

use std::time::Duration;

use thiserror::Error;

/// Generation counter value captured when a timer or fetch was scheduled.
pub type Generation = u64;

/// Default poll interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

/// Errors from invalid scheduler transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("poll interval must be positive")]
    InvalidInterval,

    #[error("polling is already running")]
    AlreadyRunning,

    #[error("polling is not running")]
    NotRunning,
}

/// How often to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    interval: Duration,
}

impl PollConfig {
    /// Create a config, rejecting a zero interval.
    pub fn new(interval: Duration) -> Result<Self, SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }
        Ok(Self { interval })
    }

    pub fn from_millis(millis: u64) -> Result<Self, SchedulerError> {
        Self::new(Duration::from_millis(millis))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Lifecycle state of the scheduler.
///
/// Reconfiguring is a transient step inside [`PollScheduler::reconfigure`]
/// and is never observable between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

impl SchedulerState {
    pub fn label(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Stopped => "stopped",
        }
    }
}

/// An action the driver must perform, in the order returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Cancel the currently armed timer.
    CancelTimer,
    /// Abort the outstanding fetch; its result will never arrive.
    CancelFetch,
    /// Arm a repeating timer whose ticks carry `generation`.
    ArmTimer {
        generation: Generation,
        interval: Duration,
    },
    /// Issue one fetch whose result carries `generation`.
    Fetch { generation: Generation },
}

/// What to do with a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Current generation: apply the result.
    Apply,
    /// Outdated generation: drop it without touching state.
    Discard,
}

/// Counters for tests and the status bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub fetches_issued: u64,
    pub ticks_dropped: u64,
    pub stale_results: u64,
    pub fetches_cancelled: u64,
    pub timers_armed: u64,
    pub timers_cancelled: u64,
}

impl SchedulerStats {
    /// Timers armed and not yet cancelled.
    pub fn active_timers(&self) -> u64 {
        self.timers_armed - self.timers_cancelled
    }
}

/// Owns the repeating-fetch lifecycle.
#[derive(Debug, Clone)]
pub struct PollScheduler {
    state: SchedulerState,
    config: Option<PollConfig>,
    generation: Generation,
    /// Generation of the fetch currently outstanding, if any.
    in_flight: Option<Generation>,
    stats: SchedulerStats,
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PollScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            config: None,
            generation: 0,
            in_flight: None,
            stats: SchedulerStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Active config; `None` outside Running.
    pub fn config(&self) -> Option<PollConfig> {
        self.config
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Whether a current-generation fetch is outstanding.
    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Begin polling: one immediate fetch, then a repeating timer.
    ///
    /// Valid from Idle or Stopped.
    pub fn start(&mut self, config: PollConfig) -> Result<Vec<Command>, SchedulerError> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.generation += 1;
        self.state = SchedulerState::Running;
        self.config = Some(config);

        Ok(vec![self.issue_fetch(), self.arm_timer(config)])
    }

    /// Switch to a new interval: cancel, re-arm, then fetch immediately.
    ///
    /// A fetch still outstanding from before is cancelled, so at most one
    /// request is ever in flight.
    pub fn reconfigure(&mut self, config: PollConfig) -> Result<Vec<Command>, SchedulerError> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.generation += 1;
        self.config = Some(config);

        let mut commands = vec![self.cancel_timer()];
        commands.extend(self.cancel_fetch());
        commands.push(self.arm_timer(config));
        commands.push(self.issue_fetch());
        Ok(commands)
    }

    /// Stop polling. Idempotent; returns no commands unless Running.
    pub fn stop(&mut self) -> Vec<Command> {
        if !self.is_running() {
            return Vec::new();
        }

        self.generation += 1;
        self.state = SchedulerState::Stopped;
        self.config = None;

        let mut commands = vec![self.cancel_timer()];
        commands.extend(self.cancel_fetch());
        commands
    }

    /// A timer fired. Returns a fetch unless the tick is stale or a fetch is
    /// already outstanding (in which case the tick is dropped, not queued).
    pub fn on_tick(&mut self, generation: Generation) -> Option<Command> {
        if !self.is_running() || generation != self.generation {
            return None;
        }
        if self.in_flight.is_some() {
            self.stats.ticks_dropped += 1;
            return None;
        }
        Some(self.issue_fetch())
    }

    /// Fetch now without resetting the timer, unless one is outstanding.
    pub fn refresh_now(&mut self) -> Option<Command> {
        if !self.is_running() || self.in_flight.is_some() {
            return None;
        }
        Some(self.issue_fetch())
    }

    /// A fetch finished; decide whether its result may be applied.
    pub fn on_fetch_complete(&mut self, generation: Generation) -> Completion {
        if self.is_running() && generation == self.generation && self.in_flight == Some(generation)
        {
            self.in_flight = None;
            Completion::Apply
        } else {
            self.stats.stale_results += 1;
            Completion::Discard
        }
    }

    fn issue_fetch(&mut self) -> Command {
        self.in_flight = Some(self.generation);
        self.stats.fetches_issued += 1;
        Command::Fetch {
            generation: self.generation,
        }
    }

    fn arm_timer(&mut self, config: PollConfig) -> Command {
        self.stats.timers_armed += 1;
        Command::ArmTimer {
            generation: self.generation,
            interval: config.interval(),
        }
    }

    fn cancel_timer(&mut self) -> Command {
        self.stats.timers_cancelled += 1;
        Command::CancelTimer
    }

    fn cancel_fetch(&mut self) -> Option<Command> {
        self.in_flight.take().map(|_| {
            self.stats.fetches_cancelled += 1;
            Command::CancelFetch
        })
    }
}
