//! Integration tests for the live study timer.
//!
//! This test file verifies:
//! - Countdown driving, completion and session recording
//! - Alarm arming and acknowledgement
//! - Write-through persistence and resume after restart
//! - Streak and today's count through the facade
//! - Notification permission and delivery

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Days, TimeZone, Utc};
use studybuddy_core::{
    Clock, CoreError, Database, Event, FixedClock, KvStore, MemoryStore, Notifier, Permission,
    Phase, Session, SessionLedger, StoreError, StudyTimer, TimerStatus, TimerStore, Tone,
    TonePlayer,
};
use tokio::time::sleep;

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 10, 17, 14, 0, 0).unwrap(),
    ))
}

fn timer(store: &MemoryStore, clock: &Arc<FixedClock>) -> StudyTimer {
    StudyTimer::builder(store.clone())
        .clock(clock.clone())
        .build()
        .unwrap()
}

#[derive(Default)]
struct RecordingNotifier {
    permission: Mutex<Option<Permission>>,
    requests: AtomicUsize,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn with(permission: Permission) -> Self {
        Self {
            permission: Mutex::new(Some(permission)),
            ..Self::default()
        }
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        self.permission.lock().unwrap().unwrap_or(Permission::Default)
    }

    fn request_permission(&self) -> Permission {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.permission.lock().unwrap() = Some(Permission::Granted);
        Permission::Granted
    }

    fn notify(&self, title: &str, body: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

#[derive(Default)]
struct CountingPlayer {
    played: AtomicUsize,
}

impl TonePlayer for CountingPlayer {
    fn play(&self, _tone: &Tone) {
        self.played.fetch_add(1, Ordering::SeqCst);
    }
}

/// Memory store whose next write can be made to stall, holding the timer
/// lock for as long as the write takes.
#[derive(Clone, Default)]
struct StallingStore {
    inner: MemoryStore,
    stall_next: Arc<AtomicBool>,
}

impl KvStore for StallingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.stall_next.swap(false, Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1_500));
        }
        self.inner.set(key, value)
    }
}

#[tokio::test(start_paused = true)]
async fn test_countdown_completes_and_records_one_session() {
    let store = MemoryStore::new();
    let clock = clock();
    let timer = timer(&store, &clock);

    timer.set_duration(0, 5);
    assert!(matches!(timer.start(), Some(Event::TimerStarted { .. })));
    assert!(timer.countdown_armed());

    sleep(Duration::from_millis(4_010)).await;
    assert_eq!(timer.phase(), Phase::Running);
    assert_eq!(timer.remaining_seconds(), 1);

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(timer.phase(), Phase::Alarming);
    assert_eq!(timer.remaining_seconds(), 0);
    assert!(!timer.countdown_armed());
    assert!(timer.alarm_armed());

    let sessions = timer.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].duration_seconds, 5);
    assert_eq!(sessions[0].date, clock.today());
    assert_eq!(timer.today_count(), 1);
    assert_eq!(timer.streak(), 1);

    assert!(matches!(timer.stop_alarm(), Some(Event::AlarmStopped { .. })));
    assert_eq!(timer.phase(), Phase::Idle);
    assert_eq!(timer.remaining_seconds(), 5);
    assert!(!timer.alarm_armed());
    assert_eq!(timer.sessions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_alarm_rings_every_second_until_stopped() {
    let player = Arc::new(CountingPlayer::default());
    let timer = StudyTimer::builder(MemoryStore::new())
        .clock(clock())
        .tone_player(player.clone())
        .build()
        .unwrap();

    timer.set_duration(0, 1);
    timer.start();
    sleep(Duration::from_millis(1_010)).await;
    assert_eq!(timer.phase(), Phase::Alarming);
    assert_eq!(player.played.load(Ordering::SeqCst), 0);

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(player.played.load(Ordering::SeqCst), 1);

    sleep(Duration::from_millis(2_000)).await;
    assert_eq!(player.played.load(Ordering::SeqCst), 3);

    timer.start();
    assert_eq!(timer.phase(), Phase::Idle);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(player.played.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_pause_freezes_the_countdown() {
    let timer = timer(&MemoryStore::new(), &clock());

    timer.start();
    sleep(Duration::from_millis(2_010)).await;
    assert!(matches!(timer.pause(), Some(Event::TimerPaused { remaining_seconds: 1498 })));
    assert!(!timer.countdown_armed());

    sleep(Duration::from_secs(30)).await;
    assert_eq!(timer.remaining_seconds(), 1498);
    assert_eq!(timer.snapshot().status, TimerStatus::Paused);
    assert!(timer.pause().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_toggle_keeps_a_single_countdown_driver() {
    let timer = timer(&MemoryStore::new(), &clock());

    timer.start();
    timer.start();
    timer.start();
    assert_eq!(timer.phase(), Phase::Running);

    sleep(Duration::from_millis(3_010)).await;
    assert_eq!(timer.remaining_seconds(), 1497);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_driver_waiting_on_the_lock_never_ticks() {
    let store = StallingStore::default();
    let timer = Arc::new(
        StudyTimer::builder(store.clone())
            .clock(clock())
            .build()
            .unwrap(),
    );

    timer.start();
    sleep(Duration::from_millis(500)).await;

    // The pause write holds the lock across the first driver's 1 s tick,
    // so that driver is parked on the lock when pause and start return.
    store.stall_next.store(true, Ordering::SeqCst);
    let toggler = Arc::clone(&timer);
    tokio::task::spawn_blocking(move || {
        toggler.pause();
        toggler.start();
    })
    .await
    .unwrap();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(timer.phase(), Phase::Running);
    assert_eq!(timer.remaining_seconds(), 1500);
    assert!(timer.countdown_armed());
}

#[tokio::test(start_paused = true)]
async fn test_set_duration_while_alarming_cancels_without_new_session() {
    let timer = timer(&MemoryStore::new(), &clock());

    timer.set_duration(0, 2);
    timer.start();
    sleep(Duration::from_millis(2_010)).await;
    assert_eq!(timer.phase(), Phase::Alarming);
    assert_eq!(timer.sessions().len(), 1);

    assert!(timer.set_duration(25, 0).is_some());
    assert_eq!(timer.phase(), Phase::Idle);
    assert_eq!(timer.total_seconds(), 1500);
    assert_eq!(timer.remaining_seconds(), 1500);
    assert!(!timer.alarm_armed());
    assert_eq!(timer.sessions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_non_positive_duration_is_ignored() {
    let timer = timer(&MemoryStore::new(), &clock());
    assert!(timer.set_duration(0, 0).is_none());
    assert_eq!(timer.total_seconds(), 1500);
    assert_eq!(timer.remaining_seconds(), 1500);
}

#[tokio::test(start_paused = true)]
async fn test_reset_does_not_record_a_session() {
    let timer = timer(&MemoryStore::new(), &clock());
    timer.set_duration(0, 3);
    timer.start();
    sleep(Duration::from_millis(2_010)).await;
    timer.reset();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(timer.phase(), Phase::Idle);
    assert_eq!(timer.remaining_seconds(), 3);
    assert!(timer.sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_every_transition_is_written_through() {
    let store = MemoryStore::new();
    let timer = timer(&store, &clock());

    timer.set_duration(0, 2);
    assert_eq!(store.get("timer.totalSeconds").unwrap().as_deref(), Some("2"));

    timer.start();
    assert_eq!(store.get("timer.isActive").unwrap().as_deref(), Some("true"));

    sleep(Duration::from_millis(1_010)).await;
    assert_eq!(store.get("timer.remainingSeconds").unwrap().as_deref(), Some("1"));

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(store.get("timer.isActive").unwrap().as_deref(), Some("false"));
    assert_eq!(store.get("timer.isRinging").unwrap().as_deref(), Some("true"));
    let ledger: SessionLedger =
        serde_json::from_str(&store.get("timer.completedSessions").unwrap().unwrap()).unwrap();
    assert_eq!(ledger.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_running_countdown_resumes_after_restart() {
    let store = MemoryStore::new();
    let clock = clock();
    {
        let first = timer(&store, &clock);
        first.set_duration(0, 10);
        first.start();
        sleep(Duration::from_millis(3_010)).await;
        assert_eq!(first.remaining_seconds(), 7);
    }

    sleep(Duration::from_secs(60)).await;
    let second = timer(&store, &clock);
    assert_eq!(second.phase(), Phase::Running);
    assert_eq!(second.remaining_seconds(), 7);
    assert!(second.countdown_armed());

    sleep(Duration::from_millis(7_010)).await;
    assert_eq!(second.phase(), Phase::Alarming);
    assert_eq!(second.sessions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ringing_alarm_resumes_after_restart() {
    let store = MemoryStore::new();
    let clock = clock();
    {
        let first = timer(&store, &clock);
        first.set_duration(0, 1);
        first.start();
        sleep(Duration::from_millis(1_010)).await;
        assert!(first.alarm_armed());
        first.teardown();
        assert!(!first.alarm_armed());
        first.teardown();
    }

    let second = timer(&store, &clock);
    assert_eq!(second.phase(), Phase::Alarming);
    assert!(second.alarm_armed());
    assert_eq!(second.snapshot().display, "00:00");
    second.stop_alarm();
    assert_eq!(second.remaining_seconds(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_streak_from_persisted_history() {
    let store = MemoryStore::new();
    let clock = clock();
    let today = clock.today();
    let at = clock.now();
    let history = TimerStore::new(store.clone());
    history.save_ledger(&SessionLedger::from_sessions(vec![
        Session::new(today.checked_sub_days(Days::new(1)).unwrap(), at, 1500),
        Session::new(today.checked_sub_days(Days::new(2)).unwrap(), at, 1500),
    ]));

    let timer = timer(&store, &clock);
    assert_eq!(timer.streak(), 2);
    assert_eq!(timer.today_count(), 0);

    timer.set_duration(0, 1);
    timer.start();
    sleep(Duration::from_millis(1_010)).await;
    assert_eq!(timer.streak(), 3);
    assert_eq!(timer.today_count(), 1);

    clock.advance_days(2);
    assert_eq!(timer.streak(), 0);
    assert_eq!(timer.today_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_notification_sent_once_per_completion() {
    let notifier = Arc::new(RecordingNotifier::with(Permission::Default));
    let timer = StudyTimer::builder(MemoryStore::new())
        .clock(clock())
        .notifier(notifier.clone())
        .build()
        .unwrap();
    assert_eq!(notifier.requests.load(Ordering::SeqCst), 1);

    timer.set_duration(0, 1);
    timer.start();
    sleep(Duration::from_secs(5)).await;

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "StudyBuddy Timer");
}

#[tokio::test(start_paused = true)]
async fn test_denied_notifications_stay_silent() {
    let notifier = Arc::new(RecordingNotifier::with(Permission::Denied));
    let timer = StudyTimer::builder(MemoryStore::new())
        .clock(clock())
        .notifier(notifier.clone())
        .build()
        .unwrap();
    assert_eq!(notifier.requests.load(Ordering::SeqCst), 0);

    timer.set_duration(0, 1);
    timer.start();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(timer.phase(), Phase::Alarming);
    assert!(notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_each_tick() {
    let timer = timer(&MemoryStore::new(), &clock());
    let mut updates = timer.subscribe();
    assert_eq!(updates.borrow_and_update().status, TimerStatus::Ready);

    timer.set_duration(0, 3);
    timer.start();
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow_and_update().status, TimerStatus::Focusing);

    updates.changed().await.unwrap();
    let snapshot = updates.borrow_and_update().clone();
    assert_eq!(snapshot.display, "00:02");
    assert!((snapshot.progress_percentage - 100.0 / 3.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_presets_retarget_the_countdown() {
    let timer = timer(&MemoryStore::new(), &clock());
    timer.apply_preset(45);
    assert_eq!(timer.total_seconds(), 45 * 60);
    assert_eq!(StudyTimer::format_time(timer.remaining_seconds()), "45:00");
}

#[tokio::test(start_paused = true)]
async fn test_history_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studybuddy.db");
    let clock = clock();
    {
        let timer = StudyTimer::builder(Database::open_at(&path).unwrap())
            .clock(clock.clone())
            .build()
            .unwrap();
        timer.set_duration(0, 2);
        timer.start();
        sleep(Duration::from_millis(2_010)).await;
        timer.stop_alarm();
        timer.start();
        sleep(Duration::from_millis(1_010)).await;
    }

    let timer = StudyTimer::builder(Database::open_at(&path).unwrap())
        .clock(clock.clone())
        .build()
        .unwrap();
    assert_eq!(timer.phase(), Phase::Running);
    assert_eq!(timer.total_seconds(), 2);
    assert_eq!(timer.remaining_seconds(), 1);
    assert_eq!(timer.sessions().len(), 1);
    assert_eq!(timer.stats().total_seconds, 2);
}

#[test]
fn test_build_requires_a_runtime() {
    let result = StudyTimer::builder(MemoryStore::new()).build();
    assert!(matches!(result, Err(CoreError::Runtime(_))));
}
