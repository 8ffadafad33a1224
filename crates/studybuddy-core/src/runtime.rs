//! The live study timer.
//!
//! [`StudyTimer`] owns the engine, the ledger, the write-through store, the
//! countdown driver and the alarm signaler. Every transition goes through
//! one lock, is persisted before the lock is released, and re-syncs both
//! drivers to the new phase under the same lock.
//!
//! ```ignore
//! let timer = StudyTimer::builder(Database::open()?).build()?;
//! timer.start();
//! let mut updates = timer.subscribe();
//! while updates.changed().await.is_ok() {
//!     println!("{}", updates.borrow().display);
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::alarm::{AlarmSignaler, SilentPlayer, Tone, TonePlayer};
use crate::clock::{Clock, SystemClock};
use crate::driver::DriverSlot;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::ledger::{LedgerStats, Session, SessionLedger};
use crate::notify::{Notifier, NullNotifier, Permission};
use crate::storage::{KvStore, NotificationsConfig, TimerStore};
use crate::timer::{format_time, Phase, TimerEngine};

/// UI hint derived from the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Ready,
    Focusing,
    Paused,
    Ringing,
}

impl TimerStatus {
    pub fn message(self) -> &'static str {
        match self {
            TimerStatus::Ready => "Ready to start!",
            TimerStatus::Focusing => "Stay focused!",
            TimerStatus::Paused => "Paused",
            TimerStatus::Ringing => "Timer completed! The alarm will ring until you stop it.",
        }
    }
}

/// Everything the UI renders, computed in one consistent read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub total_seconds: u32,
    pub remaining_seconds: u32,
    pub phase: Phase,
    pub progress_percentage: f64,
    pub streak: u32,
    pub today_count: u32,
    /// `MM:SS` of the remaining time, `00:00` while ringing.
    pub display: String,
    pub status: TimerStatus,
}

struct Inner {
    engine: TimerEngine,
    ledger: SessionLedger,
    store: TimerStore,
    countdown: DriverSlot,
    /// Id of the live countdown driver; `None` while disarmed. A driver
    /// that was aborted while waiting on the lock sees a different id and
    /// stops without ticking.
    countdown_id: Option<u64>,
    next_countdown_id: u64,
    alarm: AlarmSignaler,
}

struct Shared {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    notifications: NotificationsConfig,
    snapshots: watch::Sender<TimerSnapshot>,
    runtime: Handle,
    tick_period: Duration,
}

pub struct StudyTimerBuilder {
    store: TimerStore,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    notifications: NotificationsConfig,
    player: Arc<dyn TonePlayer>,
    tone: Tone,
    alarm_period: Duration,
    tick_period: Duration,
    runtime: Option<Handle>,
}

impl StudyTimerBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn notifications(mut self, notifications: NotificationsConfig) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn tone_player(mut self, player: Arc<dyn TonePlayer>) -> Self {
        self.player = player;
        self
    }

    pub fn tone(mut self, tone: Tone, period: Duration) -> Self {
        self.tone = tone;
        self.alarm_period = period;
        self
    }

    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Restore state from the store and re-arm whichever driver the
    /// restored phase needs.
    ///
    /// # Errors
    /// Returns an error when no runtime handle was given and the caller is
    /// not inside a tokio runtime.
    pub fn build(self) -> Result<StudyTimer> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| CoreError::Runtime(e.to_string()))?,
        };

        if self.notifications.enabled && self.notifier.permission() == Permission::Default {
            let answer = self.notifier.request_permission();
            debug!(?answer, "notification permission requested");
        }

        let engine = TimerEngine::new(self.store.load_state());
        let ledger = self.store.load_ledger();
        info!(
            phase = ?engine.phase(),
            remaining = engine.remaining_seconds(),
            sessions = ledger.len(),
            "timer restored"
        );

        let alarm = AlarmSignaler::new(self.player, self.tone, self.alarm_period, runtime.clone());
        let initial = snapshot_of(&engine, &ledger, self.clock.as_ref());
        let (snapshots, _) = watch::channel(initial);

        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                engine,
                ledger,
                store: self.store,
                countdown: DriverSlot::new(),
                countdown_id: None,
                next_countdown_id: 0,
                alarm,
            }),
            clock: self.clock,
            notifier: self.notifier,
            notifications: self.notifications,
            snapshots,
            runtime,
            tick_period: self.tick_period,
        });

        {
            let mut inner = shared.lock();
            let phase = inner.engine.phase();
            shared.sync_drivers(&mut inner, phase);
        }

        Ok(StudyTimer { shared })
    }
}

/// Single owned timer instance. Dropping it tears down both drivers;
/// the persisted state is left as it was so the next run resumes it.
pub struct StudyTimer {
    shared: Arc<Shared>,
}

impl StudyTimer {
    pub fn builder(store: impl KvStore + 'static) -> StudyTimerBuilder {
        Self::builder_with(TimerStore::new(store))
    }

    pub fn builder_with(store: TimerStore) -> StudyTimerBuilder {
        StudyTimerBuilder {
            store,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(NullNotifier),
            notifications: NotificationsConfig::default(),
            player: Arc::new(SilentPlayer),
            tone: Tone::default(),
            alarm_period: Duration::from_secs(1),
            tick_period: Duration::from_secs(1),
            runtime: None,
        }
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Start/pause toggle; acknowledges the alarm while ringing.
    pub fn start(&self) -> Option<Event> {
        self.apply(TimerEngine::start)
    }

    pub fn pause(&self) -> Option<Event> {
        self.apply(TimerEngine::pause)
    }

    pub fn reset(&self) -> Option<Event> {
        self.apply(TimerEngine::reset)
    }

    pub fn stop_alarm(&self) -> Option<Event> {
        self.apply(TimerEngine::stop_alarm)
    }

    pub fn set_duration(&self, minutes: i64, seconds: i64) -> Option<Event> {
        self.apply(|engine| engine.set_duration(minutes, seconds))
    }

    pub fn apply_preset(&self, minutes: u32) -> Option<Event> {
        self.set_duration(i64::from(minutes), 0)
    }

    /// Cancel both drivers. Idempotent; also runs on drop.
    pub fn teardown(&self) {
        let mut inner = self.shared.lock();
        inner.countdown_id = None;
        let countdown = inner.countdown.disarm();
        inner.alarm.disarm();
        if countdown {
            debug!("countdown driver cancelled");
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> TimerSnapshot {
        let inner = self.shared.lock();
        snapshot_of(&inner.engine, &inner.ledger, self.shared.clock.as_ref())
    }

    /// Receives a fresh snapshot after every transition and tick.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn total_seconds(&self) -> u32 {
        self.shared.lock().engine.total_seconds()
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.shared.lock().engine.remaining_seconds()
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().engine.phase()
    }

    pub fn progress_percentage(&self) -> f64 {
        self.shared.lock().engine.progress_percentage()
    }

    pub fn streak(&self) -> u32 {
        let today = self.shared.clock.today();
        self.shared.lock().ledger.streak(today)
    }

    pub fn today_count(&self) -> u32 {
        let today = self.shared.clock.today();
        self.shared.lock().ledger.today_count(today)
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.shared.lock().ledger.sessions().to_vec()
    }

    pub fn stats(&self) -> LedgerStats {
        let today = self.shared.clock.today();
        self.shared.lock().ledger.stats(today)
    }

    pub fn format_time(seconds: u32) -> String {
        format_time(seconds)
    }

    pub fn countdown_armed(&self) -> bool {
        self.shared.lock().countdown.is_armed()
    }

    pub fn alarm_armed(&self) -> bool {
        self.shared.lock().alarm.is_armed()
    }

    fn apply(&self, transition: impl FnOnce(&mut TimerEngine) -> Option<Event>) -> Option<Event> {
        let (event, snapshot) = {
            let mut inner = self.shared.lock();
            let event = transition(&mut inner.engine)?;
            let state = inner.engine.state();
            inner.store.save_state(&state);
            self.shared.sync_drivers(&mut inner, state.phase);
            info!(?event, "timer transition");
            let snapshot = snapshot_of(&inner.engine, &inner.ledger, self.shared.clock.as_ref());
            (event, snapshot)
        };
        self.shared.snapshots.send_replace(snapshot);
        Some(event)
    }
}

impl Drop for StudyTimer {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm the driver the phase needs and disarm the other.
    fn sync_drivers(self: &Arc<Self>, inner: &mut Inner, phase: Phase) {
        if phase == Phase::Running {
            inner.next_countdown_id = inner.next_countdown_id.wrapping_add(1);
            let id = inner.next_countdown_id;
            inner.countdown_id = Some(id);
            let handle = self
                .runtime
                .spawn(countdown(Arc::downgrade(self), id, self.tick_period));
            inner.countdown.arm(handle);
        } else {
            inner.countdown_id = None;
            inner.countdown.disarm();
        }
        inner.alarm.sync(phase);
    }

    /// One countdown step for driver `id`. Returns whether the driver
    /// should keep going.
    fn on_tick(self: &Arc<Self>, id: u64) -> bool {
        let (completed, snapshot) = {
            let mut inner = self.lock();
            if inner.countdown_id != Some(id) {
                debug!(driver = id, "stale countdown driver stopped");
                return false;
            }
            let today = self.clock.today();
            let now = self.clock.now();
            let completed = match inner.engine.tick(today, now) {
                None => return false,
                Some(Event::TimerCompleted { session }) => {
                    inner.ledger.append(session.clone());
                    let state = inner.engine.state();
                    inner.store.save_state(&state);
                    inner.store.save_ledger(&inner.ledger);
                    self.sync_drivers(&mut inner, state.phase);
                    info!(
                        date = %session.date,
                        duration = session.duration_seconds,
                        "countdown completed"
                    );
                    Some(session)
                }
                Some(_) => {
                    let state = inner.engine.state();
                    inner.store.save_state(&state);
                    debug!(remaining = state.remaining_seconds, "tick");
                    None
                }
            };
            let snapshot = snapshot_of(&inner.engine, &inner.ledger, self.clock.as_ref());
            (completed, snapshot)
        };

        let done = completed.is_some();
        if done && self.notifications.enabled && self.notifier.permission() == Permission::Granted {
            self.notifier
                .notify(&self.notifications.title, &self.notifications.body);
        }
        self.snapshots.send_replace(snapshot);
        !done
    }
}

async fn countdown(shared: Weak<Shared>, id: u64, period: Duration) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let Some(strong) = shared.upgrade() else {
            break;
        };
        if !strong.on_tick(id) {
            break;
        }
    }
}

fn snapshot_of(engine: &TimerEngine, ledger: &SessionLedger, clock: &dyn Clock) -> TimerSnapshot {
    let today = clock.today();
    let state = engine.state();
    let status = match state.phase {
        Phase::Running => TimerStatus::Focusing,
        Phase::Alarming => TimerStatus::Ringing,
        Phase::Idle if state.remaining_seconds == state.total_seconds => TimerStatus::Ready,
        Phase::Idle => TimerStatus::Paused,
    };
    let display = if state.phase == Phase::Alarming {
        format_time(0)
    } else {
        format_time(state.remaining_seconds)
    };
    TimerSnapshot {
        total_seconds: state.total_seconds,
        remaining_seconds: state.remaining_seconds,
        phase: state.phase,
        progress_percentage: engine.progress_percentage(),
        streak: ledger.streak(today),
        today_count: ledger.today_count(today),
        display,
        status,
    }
}
