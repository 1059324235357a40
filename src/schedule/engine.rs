//! Schedule engines that drive recurring backup runs.
//!
//! Two interchangeable strategies share the [`ScheduleEngine`] contract: a
//! cron-style engine that keeps a precomputed next fire time for a single
//! named trigger, and a coarse polling engine for environments where timer
//! wakeups cannot be trusted below a minute. Both block in `start()` until
//! `stop()` is called or the process is interrupted, and both validate the
//! schedule before taking the job slot, so a bad weekday or time string is
//! an error at startup rather than a silently idle scheduler.

use super::cadence::WeeklyCadence;
use crate::config::ScheduleConfig;
use crate::error::{NetvaultError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};

/// Name of the single recurring job slot.
pub const WEEKLY_JOB_ID: &str = "weekly-backup";

/// Default tick for the cron engine's due check.
const CRON_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Default wakeup interval for the polling engine.
const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Strategy used to drive the weekly cadence, selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Precomputed next-fire trigger checked on a short tick.
    #[default]
    Cron,
    /// Coarse minute-matching loop.
    Polling,
}

/// Lifecycle states of a schedule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    /// Constructed, not yet started.
    Configured = 0,
    /// Inside `start()`, firing the job on cadence.
    Running = 1,
    /// Stopped or interrupted.
    Stopped = 2,
}

/// The recurring action fired by a schedule engine.
#[async_trait]
pub trait BackupJob: Send + Sync {
    /// Execute one run, returning a short summary or an error message.
    async fn run(&self) -> std::result::Result<String, String>;

    /// Job name used in log lines.
    fn name(&self) -> &str;
}

/// Common contract over both engine strategies.
#[async_trait]
pub trait ScheduleEngine: Send + Sync {
    /// Validate the schedule, take the job slot, and block until stopped.
    ///
    /// Fails with a configuration error before any registration if the
    /// schedule does not resolve to a known weekday and HH:MM time, and
    /// with an invalid-state error if the engine is already running.
    async fn start(&self) -> Result<()>;

    /// Request a stop. Idempotent and safe to call when not running.
    fn stop(&self);

    /// Current lifecycle state.
    fn state(&self) -> EngineState;
}

/// Construct the engine selected by configuration.
pub fn build_engine(
    kind: SchedulerKind,
    schedule: ScheduleConfig,
    job: Arc<dyn BackupJob>,
) -> Arc<dyn ScheduleEngine> {
    match kind {
        SchedulerKind::Cron => Arc::new(CronEngine::new(schedule, job)),
        SchedulerKind::Polling => Arc::new(PollingEngine::new(schedule, job)),
    }
}

/// One registered recurring trigger.
#[derive(Debug, Clone)]
struct JobRegistration {
    id: String,
    cadence: WeeklyCadence,
    next_fire: DateTime<Local>,
}

const STATE_CONFIGURED: u8 = EngineState::Configured as u8;
const STATE_RUNNING: u8 = EngineState::Running as u8;
const STATE_STOPPED: u8 = EngineState::Stopped as u8;

/// Shared engine plumbing: the state machine and the stop signal.
struct EngineCore {
    state: AtomicU8,
    stop_tx: watch::Sender<bool>,
}

impl EngineCore {
    fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            state: AtomicU8::new(STATE_CONFIGURED),
            stop_tx,
        }
    }

    fn state(&self) -> EngineState {
        match self.state.load(Ordering::SeqCst) {
            STATE_CONFIGURED => EngineState::Configured,
            STATE_RUNNING => EngineState::Running,
            _ => EngineState::Stopped,
        }
    }

    /// Transition into `Running`. Rejects a start while already running so
    /// a second `start()` can never double-register the job slot.
    fn begin(&self) -> Result<()> {
        let entered = self
            .state
            .compare_exchange(
                STATE_CONFIGURED,
                STATE_RUNNING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
            || self
                .state
                .compare_exchange(
                    STATE_STOPPED,
                    STATE_RUNNING,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok();

        if !entered {
            return Err(NetvaultError::InvalidState(
                "schedule engine is already running".to_string(),
            ));
        }

        // Clear any stop request left over from a previous run.
        let _ = self.stop_tx.send(false);
        Ok(())
    }

    fn finish(&self) {
        self.state.store(STATE_STOPPED, Ordering::SeqCst);
    }

    fn request_stop(&self) {
        if self.state() != EngineState::Running {
            self.state.store(STATE_STOPPED, Ordering::SeqCst);
        }
        let _ = self.stop_tx.send(true);
    }

    fn stop_rx(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }
}

/// Fire the job once and log the outcome. Job failures never escape the
/// scheduler loop.
async fn run_job(job: &dyn BackupJob) {
    info!(job = %job.name(), "Firing scheduled job");
    match job.run().await {
        Ok(summary) => info!(job = %job.name(), %summary, "Scheduled job completed"),
        Err(e) => error!(job = %job.name(), error = %e, "Scheduled job failed"),
    }
}

/// Cron-style strategy: one named weekly trigger with a precomputed next
/// fire time, checked on a short tick.
pub struct CronEngine {
    schedule: ScheduleConfig,
    job: Arc<dyn BackupJob>,
    check_interval: Duration,
    registration: RwLock<Option<JobRegistration>>,
    core: EngineCore,
}

impl CronEngine {
    /// Create an engine for the given raw schedule. Validation happens at
    /// `start()`.
    pub fn new(schedule: ScheduleConfig, job: Arc<dyn BackupJob>) -> Self {
        Self {
            schedule,
            job,
            check_interval: CRON_CHECK_INTERVAL,
            registration: RwLock::new(None),
            core: EngineCore::new(),
        }
    }

    /// Shorten the due-check tick. Intended for tests.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// The registered trigger, if the engine has been started.
    pub async fn registration(&self) -> Option<(String, WeeklyCadence)> {
        self.registration
            .read()
            .await
            .as_ref()
            .map(|r| (r.id.clone(), r.cadence))
    }

    /// Next fire time of the registered trigger.
    pub async fn next_run_time(&self) -> Option<DateTime<Local>> {
        self.registration.read().await.as_ref().map(|r| r.next_fire)
    }

    /// Fire the job immediately, outside the cadence.
    pub async fn trigger_now(&self) {
        run_job(self.job.as_ref()).await;
    }

    /// Register the weekly trigger, replacing a previous slot with the
    /// same name.
    async fn register(&self, cadence: WeeklyCadence) -> Result<DateTime<Local>> {
        let now = Local::now();
        let next_fire = cadence.next_fire(&now).ok_or_else(|| {
            NetvaultError::Internal("no upcoming fire time for weekly cadence".to_string())
        })?;

        let mut slot = self.registration.write().await;
        if let Some(existing) = slot.as_ref() {
            warn!(job = %existing.id, "Replacing existing job registration");
        }
        *slot = Some(JobRegistration {
            id: WEEKLY_JOB_ID.to_string(),
            cadence,
            next_fire,
        });

        info!(
            job = WEEKLY_JOB_ID,
            cadence = %cadence,
            next_run = %next_fire,
            "Registered weekly trigger"
        );
        Ok(next_fire)
    }
}

#[async_trait]
impl ScheduleEngine for CronEngine {
    async fn start(&self) -> Result<()> {
        // Validation precedes registration: a bad schedule never takes the
        // job slot.
        let cadence = WeeklyCadence::parse(&self.schedule.day, &self.schedule.time)?;

        self.core.begin()?;
        let mut stop_rx = self.core.stop_rx();

        let mut next_fire = match self.register(cadence).await {
            Ok(next) => next,
            Err(e) => {
                self.core.finish();
                return Err(e);
            }
        };

        info!(job = WEEKLY_JOB_ID, "Schedule engine started");
        let mut ticker = tokio::time::interval(self.check_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if Local::now() >= next_fire {
                        run_job(self.job.as_ref()).await;

                        match cadence.next_fire(&Local::now()) {
                            Some(next) => {
                                next_fire = next;
                                if let Some(reg) = self.registration.write().await.as_mut() {
                                    reg.next_fire = next;
                                }
                                info!(job = WEEKLY_JOB_ID, next_run = %next, "Next run scheduled");
                            }
                            None => {
                                error!(job = WEEKLY_JOB_ID, "No next fire time; stopping");
                                break;
                            }
                        }
                    }
                }
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        info!(job = WEEKLY_JOB_ID, "Stop requested");
                        break;
                    }
                }
            }
        }

        self.core.finish();
        info!(job = WEEKLY_JOB_ID, "Schedule engine stopped");
        Ok(())
    }

    fn stop(&self) {
        self.core.request_stop();
    }

    fn state(&self) -> EngineState {
        self.core.state()
    }
}

/// Coarse fallback strategy: wakes on a fixed interval and fires when the
/// current minute equals the cadence.
pub struct PollingEngine {
    schedule: ScheduleConfig,
    job: Arc<dyn BackupJob>,
    poll_interval: Duration,
    /// Minute key of the last firing. Guards against a double fire when
    /// more than one tick lands inside the matching minute.
    last_fired: RwLock<Option<String>>,
    core: EngineCore,
}

impl PollingEngine {
    /// Create an engine for the given raw schedule. Validation happens at
    /// `start()`.
    pub fn new(schedule: ScheduleConfig, job: Arc<dyn BackupJob>) -> Self {
        Self {
            schedule,
            job,
            poll_interval: POLL_INTERVAL,
            last_fired: RwLock::new(None),
            core: EngineCore::new(),
        }
    }

    /// Shorten the poll interval. Intended for tests.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[async_trait]
impl ScheduleEngine for PollingEngine {
    async fn start(&self) -> Result<()> {
        let cadence = WeeklyCadence::parse(&self.schedule.day, &self.schedule.time)?;

        self.core.begin()?;
        let mut stop_rx = self.core.stop_rx();

        info!(
            cadence = %cadence,
            interval_secs = self.poll_interval.as_secs(),
            "Polling engine started"
        );
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Local::now();
                    if cadence.matches(&now) {
                        let minute_key = now.format("%Y%m%d%H%M").to_string();
                        let mut last = self.last_fired.write().await;
                        if last.as_deref() != Some(minute_key.as_str()) {
                            *last = Some(minute_key);
                            drop(last);
                            run_job(self.job.as_ref()).await;
                        }
                    }
                }
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        info!("Stop requested");
                        break;
                    }
                }
            }
        }

        self.core.finish();
        info!("Polling engine stopped");
        Ok(())
    }

    fn stop(&self) {
        self.core.request_stop();
    }

    fn state(&self) -> EngineState {
        self.core.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike, Weekday};
    use std::sync::atomic::AtomicUsize;

    struct CountingJob {
        fired: AtomicUsize,
    }

    impl CountingJob {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fired: AtomicUsize::new(0),
            })
        }

        fn count(&self) -> usize {
            self.fired.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BackupJob for CountingJob {
        async fn run(&self) -> std::result::Result<String, String> {
            self.fired.fetch_add(1, Ordering::SeqCst);
            Ok("fired".to_string())
        }

        fn name(&self) -> &str {
            "counting-job"
        }
    }

    fn schedule(day: &str, time: &str) -> ScheduleConfig {
        ScheduleConfig {
            day: day.to_string(),
            time: time.to_string(),
        }
    }

    #[tokio::test]
    async fn test_start_registers_single_weekly_trigger() {
        let job = CountingJob::new();
        let engine = Arc::new(
            CronEngine::new(schedule("Tuesday", "02:00"), job.clone())
                .with_check_interval(Duration::from_millis(10)),
        );

        let runner = engine.clone();
        let handle = tokio::spawn(async move { runner.start().await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(engine.state(), EngineState::Running);
        let (id, cadence) = engine.registration().await.expect("job registered");
        assert_eq!(id, WEEKLY_JOB_ID);
        assert_eq!(cadence.weekday_index(), 1);
        assert_eq!(cadence.weekday, Weekday::Tue);
        assert_eq!(cadence.hour, 2);
        assert_eq!(cadence.minute, 0);
        assert!(engine.next_run_time().await.is_some());

        engine.stop();
        handle.await.unwrap().unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_invalid_day_fails_before_registration() {
        let engine = CronEngine::new(schedule("Tuesdey", "02:00"), CountingJob::new());

        let err = engine.start().await.unwrap_err();
        assert!(matches!(err, NetvaultError::Schedule(_)));
        assert!(engine.registration().await.is_none());
        assert_eq!(engine.state(), EngineState::Configured);
    }

    #[tokio::test]
    async fn test_invalid_time_fails_before_registration() {
        let engine = CronEngine::new(schedule("tuesday", "2 AM"), CountingJob::new());

        assert!(engine.start().await.is_err());
        assert!(engine.registration().await.is_none());
    }

    #[tokio::test]
    async fn test_second_start_while_running_is_rejected() {
        let engine = Arc::new(
            CronEngine::new(schedule("sunday", "02:00"), CountingJob::new())
                .with_check_interval(Duration::from_millis(10)),
        );

        let runner = engine.clone();
        let handle = tokio::spawn(async move { runner.start().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = engine.start().await.unwrap_err();
        assert!(matches!(err, NetvaultError::InvalidState(_)));

        engine.stop();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let engine = Arc::new(
            CronEngine::new(schedule("sunday", "02:00"), CountingJob::new())
                .with_check_interval(Duration::from_millis(10)),
        );

        for _ in 0..2 {
            let runner = engine.clone();
            let handle = tokio::spawn(async move { runner.start().await });
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(engine.state(), EngineState::Running);
            engine.stop();
            handle.await.unwrap().unwrap();
            assert_eq!(engine.state(), EngineState::Stopped);
        }
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_when_not_running() {
        let engine = CronEngine::new(schedule("sunday", "02:00"), CountingJob::new());
        engine.stop();
        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_trigger_now_fires_outside_cadence() {
        let job = CountingJob::new();
        let engine = CronEngine::new(schedule("sunday", "02:00"), job.clone());

        engine.trigger_now().await;
        assert_eq!(job.count(), 1);
    }

    #[tokio::test]
    async fn test_polling_engine_fires_once_per_matching_minute() {
        // Stay clear of the minute boundary so the cadence derived from
        // "now" matches for the whole test.
        let mut now = Local::now();
        if now.second() >= 57 {
            tokio::time::sleep(Duration::from_secs(4)).await;
            now = Local::now();
        }

        let day = match now.weekday() {
            Weekday::Mon => "monday",
            Weekday::Tue => "tuesday",
            Weekday::Wed => "wednesday",
            Weekday::Thu => "thursday",
            Weekday::Fri => "friday",
            Weekday::Sat => "saturday",
            Weekday::Sun => "sunday",
        };
        let time = format!("{:02}:{:02}", now.hour(), now.minute());

        let job = CountingJob::new();
        let engine = Arc::new(
            PollingEngine::new(schedule(day, &time), job.clone())
                .with_poll_interval(Duration::from_millis(10)),
        );

        let runner = engine.clone();
        let handle = tokio::spawn(async move { runner.start().await });
        tokio::time::sleep(Duration::from_millis(200)).await;

        engine.stop();
        handle.await.unwrap().unwrap();

        // Many ticks landed inside the matching minute; exactly one fired.
        assert_eq!(job.count(), 1);
    }

    #[tokio::test]
    async fn test_polling_engine_rejects_bad_schedule() {
        let engine = PollingEngine::new(schedule("Tuesdey", "02:00"), CountingJob::new());
        assert!(engine.start().await.is_err());
        assert_eq!(engine.state(), EngineState::Configured);
    }

    #[tokio::test]
    async fn test_build_engine_respects_kind() {
        let cron = build_engine(
            SchedulerKind::Cron,
            schedule("sunday", "02:00"),
            CountingJob::new(),
        );
        assert_eq!(cron.state(), EngineState::Configured);

        let polling = build_engine(
            SchedulerKind::Polling,
            schedule("sunday", "02:00"),
            CountingJob::new(),
        );
        assert_eq!(polling.state(), EngineState::Configured);
    }
}
