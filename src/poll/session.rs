//! Monitoring session: drives the scheduler with tokio tasks.
//!
//! The session owns all mutable state. Fetches and timers run as background
//! tasks that report back over an unbounded mpsc channel; the owner applies
//! those events in arrival order by calling [`MonitorSession::pump`] from its
//! loop (the TUI does so every frame).
//!
//! ```text
//!  timer task ──Tick{gen}──────┐
//!  fetch task ──Fetched{gen}───┤                ┌──────────────┐
//!  recommend  ──Recommended────┼──▶ channel ──▶ │ pump()       │──▶ HistoryStore
//!  models     ──ModelsLoaded───┤                │  scheduler   │──▶ FleetSummary
//!  StopHandle ──StopRequested──┘                └──────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use gpuwatch_types::{DeviceSnapshot, ModelRecord, Recommendation};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::scheduler::{
    Command, Completion, Generation, PollConfig, PollScheduler, SchedulerError, SchedulerState,
    SchedulerStats,
};
use crate::data::{task_histogram, FleetSummary, HistoryStore, RetentionPolicy, DEFAULT_CAPACITY};
use crate::source::{DeviceService, FetchError};

/// Default chrono format for series labels.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%H:%M:%S";

/// Errors building a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a tokio runtime is required to run a monitoring session")]
    NoRuntime,

    #[error("invalid timestamp format: {0:?}")]
    InvalidTimestampFormat(String),
}

/// Messages from background tasks to the session.
#[derive(Debug)]
pub enum SessionEvent {
    Tick {
        generation: Generation,
    },
    Fetched {
        generation: Generation,
        result: Result<Vec<DeviceSnapshot>, FetchError>,
    },
    Recommended(Result<Recommendation, FetchError>),
    ModelsLoaded(Result<Vec<ModelRecord>, FetchError>),
    StopRequested {
        generation: Generation,
        reason: String,
    },
}

/// State of an on-demand query.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Lookup<T> {
    #[default]
    NotRequested,
    Pending,
    Ready(T),
    Failed(FetchError),
}

impl<T> Lookup<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Lookup::Pending)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Lookup::Ready(value) => Some(value),
            _ => None,
        }
    }

    fn from_result(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => Lookup::Ready(value),
            Err(e) => Lookup::Failed(e),
        }
    }
}

/// Cloneable hook that lets the session layer stop polling, e.g. on logout.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
    generation: Arc<AtomicU64>,
}

impl StopHandle {
    /// Ask the session to stop the run that is current right now.
    ///
    /// The request is applied on the next `pump`. If the session has been
    /// stopped or restarted in between, the request is ignored and the newer
    /// run keeps polling. Returns false if the session is gone.
    pub fn stop(&self, reason: impl Into<String>) -> bool {
        self.tx
            .send(SessionEvent::StopRequested {
                generation: self.generation.load(Ordering::Acquire),
                reason: reason.into(),
            })
            .is_ok()
    }
}

/// Builder for [`MonitorSession`].
#[derive(Debug)]
pub struct MonitorSessionBuilder {
    service: Arc<dyn DeviceService>,
    history_capacity: usize,
    retention: RetentionPolicy,
    timestamp_format: String,
}

impl MonitorSessionBuilder {
    /// Points kept per series (default: 20).
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Policy for devices that disappear from snapshots.
    pub fn retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// chrono format used to label each poll (default: "%H:%M:%S").
    pub fn timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Build the session on the current tokio runtime.
    pub fn build(self) -> Result<MonitorSession, SessionError> {
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(SessionError::InvalidTimestampFormat(self.timestamp_format));
        }

        let (tx, rx) = mpsc::unbounded_channel();

        Ok(MonitorSession {
            scheduler: PollScheduler::new(),
            service: self.service,
            runtime,
            tx,
            rx,
            timer: None,
            fetch: None,
            generation: Arc::new(AtomicU64::new(0)),
            history: HistoryStore::with_capacity(self.history_capacity)
                .with_retention(self.retention),
            snapshots: Vec::new(),
            summary: FleetSummary::from_snapshots(&[]),
            last_error: None,
            last_updated: None,
            recommendation: Lookup::NotRequested,
            models: Lookup::NotRequested,
            stop_reason: None,
            timestamp_format: self.timestamp_format,
        })
    }
}

/// One client's monitoring session.
///
/// Holds the scheduler, the history, the last good snapshot list and the
/// most recent error ("stale but present").
#[derive(Debug)]
pub struct MonitorSession {
    scheduler: PollScheduler,
    service: Arc<dyn DeviceService>,
    runtime: Handle,
    tx: mpsc::UnboundedSender<SessionEvent>,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
    timer: Option<JoinHandle<()>>,
    fetch: Option<JoinHandle<()>>,
    /// Scheduler generation, mirrored for [`StopHandle`]s.
    generation: Arc<AtomicU64>,

    history: HistoryStore,
    snapshots: Vec<DeviceSnapshot>,
    summary: FleetSummary,
    last_error: Option<FetchError>,
    last_updated: Option<String>,

    recommendation: Lookup<Recommendation>,
    models: Lookup<Vec<ModelRecord>>,

    stop_reason: Option<String>,
    timestamp_format: String,
}

impl MonitorSession {
    /// Create a builder for a session over `service`.
    pub fn builder(service: Arc<dyn DeviceService>) -> MonitorSessionBuilder {
        MonitorSessionBuilder {
            service,
            history_capacity: DEFAULT_CAPACITY,
            retention: RetentionPolicy::default(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }

    /// Start polling at `config.interval`, fetching once immediately.
    pub fn start(&mut self, config: PollConfig) -> Result<(), SchedulerError> {
        let commands = self.scheduler.start(config)?;
        self.publish_generation();
        info!(
            source = self.service.description(),
            interval_ms = config.interval().as_millis() as u64,
            "polling started"
        );
        self.stop_reason = None;
        self.execute(commands);
        Ok(())
    }

    /// Change the poll interval. Only valid while polling.
    pub fn reconfigure(&mut self, config: PollConfig) -> Result<(), SchedulerError> {
        let commands = self.scheduler.reconfigure(config)?;
        self.publish_generation();
        info!(
            interval_ms = config.interval().as_millis() as u64,
            "poll interval changed"
        );
        self.execute(commands);
        Ok(())
    }

    /// Stop polling. Idempotent.
    pub fn stop(&mut self) {
        self.stop_with_reason("stopped");
    }

    fn stop_with_reason(&mut self, reason: impl Into<String>) {
        let commands = self.scheduler.stop();
        if commands.is_empty() {
            return;
        }
        self.publish_generation();
        let reason = reason.into();
        info!(reason = %reason, "polling stopped");
        self.stop_reason = Some(reason);
        self.execute(commands);
    }

    /// Fetch now without resetting the timer.
    ///
    /// Returns false if not polling or a fetch is already outstanding.
    pub fn refresh_now(&mut self) -> bool {
        match self.scheduler.refresh_now() {
            Some(command) => {
                debug!("manual refresh");
                self.execute(vec![command]);
                true
            }
            None => false,
        }
    }

    /// Ask the service for its recommended device.
    pub fn request_recommendation(&mut self) {
        if self.recommendation.is_pending() {
            return;
        }
        self.recommendation = Lookup::Pending;

        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = service.recommend().await;
            let _ = tx.send(SessionEvent::Recommended(result));
        });
    }

    /// Load the model list for the task histogram.
    pub fn request_models(&mut self) {
        if self.models.is_pending() {
            return;
        }
        self.models = Lookup::Pending;

        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = service.models().await;
            let _ = tx.send(SessionEvent::ModelsLoaded(result));
        });
    }

    /// A handle external code can use to stop this session.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.tx.clone(),
            generation: Arc::clone(&self.generation),
        }
    }

    fn publish_generation(&self) {
        self.generation
            .store(self.scheduler.generation(), Ordering::Release);
    }

    /// Apply every pending event without blocking.
    ///
    /// Returns true if any visible state changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            changed |= self.handle_event(event);
        }
        changed
    }

    /// Wait for the next event and apply it.
    pub async fn process_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => self.handle_event(event),
            None => false,
        }
    }

    fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Tick { generation } => {
                if let Some(command) = self.scheduler.on_tick(generation) {
                    self.execute(vec![command]);
                }
                false
            }
            SessionEvent::Fetched { generation, result } => {
                match self.scheduler.on_fetch_complete(generation) {
                    Completion::Apply => {
                        self.fetch = None;
                        self.apply_fetch(result);
                        true
                    }
                    Completion::Discard => {
                        debug!(generation, "discarding stale fetch result");
                        false
                    }
                }
            }
            SessionEvent::Recommended(result) => {
                if let Err(e) = &result {
                    self.escalate_auth(e);
                }
                self.recommendation = Lookup::from_result(result);
                true
            }
            SessionEvent::ModelsLoaded(result) => {
                if let Err(e) = &result {
                    self.escalate_auth(e);
                }
                self.models = Lookup::from_result(result);
                true
            }
            SessionEvent::StopRequested { generation, reason } => {
                if generation != self.scheduler.generation() {
                    debug!(generation, "ignoring stop request for an earlier run");
                    return false;
                }
                self.stop_with_reason(reason);
                true
            }
        }
    }

    fn apply_fetch(&mut self, result: Result<Vec<DeviceSnapshot>, FetchError>) {
        match result {
            Ok(snapshots) => {
                let label = self.timestamp_label();
                debug!(devices = snapshots.len(), label = %label, "poll applied");
                self.history.observe(&snapshots, &label);
                self.summary = FleetSummary::from_snapshots(&snapshots);
                self.snapshots = snapshots;
                self.last_error = None;
                self.last_updated = Some(label);
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "fetch failed, keeping last good data");
                self.escalate_auth(&e);
                self.last_error = Some(e);
            }
        }
    }

    /// An auth failure from any query ends polling.
    fn escalate_auth(&mut self, error: &FetchError) {
        if error.is_auth() {
            warn!("session rejected by service, stopping");
            self.stop_with_reason("session expired");
        }
    }

    fn timestamp_label(&self) -> String {
        let mut label = String::new();
        if write!(label, "{}", Local::now().format(&self.timestamp_format)).is_err() {
            label.clear();
            let _ = write!(label, "{}", Local::now().format(DEFAULT_TIMESTAMP_FORMAT));
        }
        label
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::CancelTimer => self.cancel_timer(),
                Command::CancelFetch => self.cancel_fetch(),
                Command::ArmTimer {
                    generation,
                    interval,
                } => self.arm_timer(generation, interval),
                Command::Fetch { generation } => self.spawn_fetch(generation),
            }
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn cancel_fetch(&mut self) {
        if let Some(fetch) = self.fetch.take() {
            debug!("aborting outstanding fetch");
            fetch.abort();
        }
    }

    fn arm_timer(&mut self, generation: Generation, period: Duration) {
        // Never two timers at once.
        self.cancel_timer();

        let tx = self.tx.clone();
        self.timer = Some(self.runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(SessionEvent::Tick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    /// A result that was already sent before an abort is still dropped by
    /// the generation check.
    fn spawn_fetch(&mut self, generation: Generation) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        self.fetch = Some(self.runtime.spawn(async move {
            let result = service.fetch().await;
            let _ = tx.send(SessionEvent::Fetched { generation, result });
        }));
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Current poll interval, if polling.
    pub fn interval(&self) -> Option<Duration> {
        self.scheduler.config().map(|c| c.interval())
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Number of live timers; at most one.
    pub fn armed_timers(&self) -> usize {
        usize::from(self.timer.is_some())
    }

    pub fn is_fetching(&self) -> bool {
        self.scheduler.is_fetching()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Last good snapshot list.
    pub fn snapshots(&self) -> &[DeviceSnapshot] {
        &self.snapshots
    }

    pub fn summary(&self) -> &FleetSummary {
        &self.summary
    }

    /// Most recent fetch error; cleared by the next success.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Label of the last successful poll.
    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    pub fn recommendation(&self) -> &Lookup<Recommendation> {
        &self.recommendation
    }

    pub fn models(&self) -> &Lookup<Vec<ModelRecord>> {
        &self.models
    }

    /// Task histogram of the loaded models.
    pub fn task_histogram(&self) -> Option<BTreeMap<String, usize>> {
        self.models.ready().map(Vec::as_slice).map(task_histogram)
    }

    /// Why polling stopped, if it did.
    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.as_deref()
    }

    pub fn source_description(&self) -> &str {
        self.service.description()
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.cancel_timer();
        self.cancel_fetch();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::data::Metric;
    use crate::source::{ModelSource, RecommendationSource, SnapshotFetcher};

    /// Service whose fetches can be held open and scripted.
    #[derive(Debug, Default)]
    struct MockService {
        calls: AtomicUsize,
        outstanding: AtomicUsize,
        scripted: Mutex<VecDeque<Result<Vec<DeviceSnapshot>, FetchError>>>,
        gate: Option<Semaphore>,
    }

    impl MockService {
        fn gated() -> Self {
            Self {
                gate: Some(Semaphore::new(0)),
                ..Self::default()
            }
        }

        fn script(self, result: Result<Vec<DeviceSnapshot>, FetchError>) -> Self {
            self.scripted.lock().push_back(result);
            self
        }

        fn release(&self, n: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(n);
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Fetches started and neither finished nor aborted.
        fn outstanding(&self) -> usize {
            self.outstanding.load(Ordering::SeqCst)
        }
    }

    /// Decrements the outstanding count when a fetch ends or is dropped.
    struct Outstanding<'a>(&'a AtomicUsize);

    impl<'a> Outstanding<'a> {
        fn enter(count: &'a AtomicUsize) -> Self {
            count.fetch_add(1, Ordering::SeqCst);
            Self(count)
        }
    }

    impl Drop for Outstanding<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn gpu(index: u32, util: f64) -> DeviceSnapshot {
        DeviceSnapshot::builder(index, "mock")
            .utilization(util)
            .temperature(40.0)
            .memory(1024.0, 4096.0)
            .build()
    }

    #[async_trait]
    impl SnapshotFetcher for MockService {
        async fn fetch(&self) -> Result<Vec<DeviceSnapshot>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let _outstanding = Outstanding::enter(&self.outstanding);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            let scripted = self.scripted.lock().pop_front();
            scripted.unwrap_or_else(|| Ok(vec![gpu(0, call as f64 * 10.0)]))
        }

        fn description(&self) -> &str {
            "mock"
        }
    }

    #[async_trait]
    impl RecommendationSource for MockService {
        async fn recommend(&self) -> Result<Recommendation, FetchError> {
            Ok(Recommendation::NotFound {
                message: "No suitable GPU found".to_string(),
            })
        }
    }

    #[async_trait]
    impl ModelSource for MockService {
        async fn models(&self) -> Result<Vec<ModelRecord>, FetchError> {
            Ok(vec![
                ModelRecord::with_task(Some("nlp")),
                ModelRecord::with_task(None),
                ModelRecord::with_task(Some("nlp")),
            ])
        }
    }

    fn session(service: &Arc<MockService>) -> MonitorSession {
        MonitorSession::builder(service.clone()).build().unwrap()
    }

    fn every(secs: u64) -> PollConfig {
        PollConfig::new(Duration::from_secs(secs)).unwrap()
    }

    /// Let background tasks run, then apply what they sent.
    async fn settle(session: &mut MonitorSession) {
        for _ in 0..10 {
            tokio::task::yield_now().await;
            session.pump();
        }
    }

    async fn advance(session: &mut MonitorSession, secs: u64) {
        tokio::time::advance(Duration::from_secs(secs)).await;
        settle(session).await;
    }

    #[test]
    fn test_build_requires_runtime() {
        let service = Arc::new(MockService::default());
        let err = MonitorSession::builder(service).build().unwrap_err();
        assert_eq!(err, SessionError::NoRuntime);
    }

    #[tokio::test]
    async fn test_build_rejects_bad_timestamp_format() {
        let service = Arc::new(MockService::default());
        let err = MonitorSession::builder(service)
            .timestamp_format("%Q")
            .build()
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTimestampFormat(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_fetches_immediately_then_on_interval() {
        let service = Arc::new(MockService::default());
        let mut session = session(&service);

        session.start(every(5)).unwrap();
        settle(&mut session).await;

        assert_eq!(service.calls(), 1);
        assert_eq!(session.history().series_for(0, Metric::Utilization).values(), vec![10.0]);
        assert!(session.last_updated().is_some());

        advance(&mut session, 5).await;
        assert_eq!(service.calls(), 2);
        assert_eq!(
            session.history().series_for(0, Metric::Utilization).values(),
            vec![10.0, 20.0]
        );
        assert_eq!(session.summary().device_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_rapid_reconfigures() {
        let service = Arc::new(MockService::default());
        let mut session = session(&service);

        session.start(every(5)).unwrap();
        settle(&mut session).await;
        assert_eq!(service.calls(), 1);

        session.reconfigure(every(2)).unwrap();
        session.reconfigure(every(10)).unwrap();
        settle(&mut session).await;

        // Two immediate fetches issued; the first was superseded before it ran.
        assert_eq!(session.stats().fetches_issued, 3);
        assert_eq!(session.stats().fetches_cancelled, 1);
        assert_eq!(service.calls(), 2);
        assert_eq!(session.armed_timers(), 1);
        assert_eq!(session.stats().active_timers(), 1);
        assert_eq!(session.interval(), Some(Duration::from_secs(10)));

        // Only the 10s timer is live.
        advance(&mut session, 5).await;
        assert_eq!(service.calls(), 2);
        advance(&mut session, 5).await;
        assert_eq!(service.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_reconfigures_against_slow_service_keep_one_request() {
        let service = Arc::new(MockService::gated());
        let mut session = session(&service);

        session.start(every(5)).unwrap();
        settle(&mut session).await;
        for _ in 0..5 {
            session.reconfigure(every(2)).unwrap();
            settle(&mut session).await;
        }

        assert_eq!(service.calls(), 6);
        assert_eq!(service.outstanding(), 1);
        assert_eq!(session.stats().fetches_cancelled, 5);
        assert!(session.is_fetching());

        service.release(1);
        settle(&mut session).await;
        assert_eq!(service.outstanding(), 0);
        assert!(!session.is_fetching());
        assert_eq!(session.history().series_for(0, Metric::Utilization).values(), vec![60.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fetch_after_stop_leaves_store_unchanged() {
        let service = Arc::new(MockService::gated());
        let mut session = session(&service);

        session.start(every(5)).unwrap();
        settle(&mut session).await;
        assert_eq!(service.calls(), 1);

        session.stop();
        settle(&mut session).await;
        assert_eq!(service.outstanding(), 0);

        service.release(1);
        settle(&mut session).await;

        assert!(session.history().is_empty());
        assert!(session.snapshots().is_empty());
        assert_eq!(session.stats().fetches_cancelled, 1);
        assert_eq!(session.state(), SchedulerState::Stopped);
        assert_eq!(session.armed_timers(), 0);

        // No further fetches once stopped.
        advance(&mut session, 30).await;
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_aborts_outstanding_fetch() {
        let service = Arc::new(MockService::gated());
        let mut session = session(&service);

        session.start(every(5)).unwrap();
        settle(&mut session).await;
        session.reconfigure(every(2)).unwrap();
        settle(&mut session).await;
        assert_eq!(service.calls(), 2);
        assert_eq!(service.outstanding(), 1);

        service.release(2);
        settle(&mut session).await;

        assert_eq!(session.stats().stale_results, 0);
        assert_eq!(session.history().series_for(0, Metric::Utilization).values(), vec![20.0]);
        assert!(!session.is_fetching());
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_sent_before_stop_is_discarded() {
        let service = Arc::new(MockService::default());
        let mut session = session(&service);

        // The fetch finishes and its result is queued, but not yet pumped.
        session.start(every(5)).unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        session.stop();
        settle(&mut session).await;

        assert_eq!(service.calls(), 1);
        assert_eq!(session.stats().stale_results, 1);
        assert!(session.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_dropped_while_fetch_outstanding() {
        let service = Arc::new(MockService::gated());
        let mut session = session(&service);

        session.start(every(5)).unwrap();
        settle(&mut session).await;

        advance(&mut session, 5).await;
        advance(&mut session, 5).await;
        assert_eq!(service.calls(), 1);
        assert_eq!(session.stats().ticks_dropped, 2);
        assert!(!session.refresh_now());

        service.release(1);
        settle(&mut session).await;
        assert!(session.refresh_now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_good_data() {
        let service = Arc::new(
            MockService::default()
                .script(Ok(vec![gpu(0, 42.0), gpu(1, 58.0)]))
                .script(Err(FetchError::Network("connection refused".into()))),
        );
        let mut session = session(&service);

        session.start(every(5)).unwrap();
        settle(&mut session).await;
        let updated = session.last_updated().map(str::to_string);

        advance(&mut session, 5).await;
        assert_eq!(service.calls(), 2);
        assert_eq!(session.snapshots().len(), 2);
        assert_eq!(session.history().series_for(1, Metric::Utilization).len(), 1);
        assert_eq!(
            session.last_error(),
            Some(&FetchError::Network("connection refused".into()))
        );
        assert_eq!(session.last_updated().map(str::to_string), updated);
        assert_eq!(session.state(), SchedulerState::Running);

        // Next success clears the error.
        advance(&mut session, 5).await;
        assert!(session.last_error().is_none());
        assert_eq!(session.snapshots().len(), 1);
        assert_eq!(session.history().series_for(0, Metric::Utilization).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_stops_polling() {
        let service =
            Arc::new(MockService::default().script(Err(FetchError::Auth("token expired".into()))));
        let mut session = session(&service);

        session.start(every(5)).unwrap();
        settle(&mut session).await;

        assert_eq!(session.state(), SchedulerState::Stopped);
        assert_eq!(session.stop_reason(), Some("session expired"));
        assert!(session.last_error().is_some_and(FetchError::is_auth));

        advance(&mut session, 20).await;
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_handle() {
        let service = Arc::new(MockService::default());
        let mut session = session(&service);
        let handle = session.stop_handle();

        session.start(every(5)).unwrap();
        settle(&mut session).await;

        assert!(handle.stop("logged out"));
        settle(&mut session).await;
        assert_eq!(session.state(), SchedulerState::Stopped);
        assert_eq!(session.stop_reason(), Some("logged out"));

        // Restart after stop.
        session.start(every(5)).unwrap();
        settle(&mut session).await;
        assert_eq!(session.state(), SchedulerState::Running);
        assert!(session.stop_reason().is_none());
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_request_does_not_outlive_its_run() {
        let service = Arc::new(MockService::default());
        let mut session = session(&service);
        let handle = session.stop_handle();

        session.start(every(5)).unwrap();
        settle(&mut session).await;

        // Requested during the first run, applied after a pause and resume.
        assert!(handle.stop("logged out"));
        session.stop();
        session.start(every(5)).unwrap();
        settle(&mut session).await;

        assert_eq!(session.state(), SchedulerState::Running);
        assert!(session.stop_reason().is_none());

        advance(&mut session, 5).await;
        assert_eq!(service.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recommendation_and_models() {
        let service = Arc::new(MockService::default());
        let mut session = session(&service);

        assert_eq!(session.recommendation(), &Lookup::NotRequested);
        session.request_recommendation();
        session.request_models();
        assert!(session.recommendation().is_pending());
        settle(&mut session).await;

        assert!(matches!(
            session.recommendation(),
            Lookup::Ready(Recommendation::NotFound { .. })
        ));
        let histogram = session.task_histogram().unwrap();
        assert_eq!(histogram["nlp"], 2);
        assert_eq!(histogram["unspecified"], 1);
    }
}
