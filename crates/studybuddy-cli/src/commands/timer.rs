use std::error::Error;
use std::io::BufRead;

use clap::Subcommand;
use serde::Serialize;
use studybuddy_core::{Config, Database, Phase, StudyTimer, TimerStatus, TimerStore};
use tracing::info;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print current timer state as JSON
    Status,
    /// Start or resume the countdown (pauses it when already running)
    Start,
    /// Pause the countdown
    Pause,
    /// Stop the countdown and restore the full duration
    Reset,
    /// Acknowledge a ringing alarm
    StopAlarm,
    /// Change the countdown length
    Set {
        /// Minutes
        minutes: i64,
        /// Extra seconds
        #[arg(default_value = "0")]
        seconds: i64,
    },
    /// Switch to one of the configured presets
    Preset {
        /// Preset length in minutes
        minutes: u32,
    },
    /// Run the countdown in the foreground until the alarm is stopped
    Run,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        match action {
            TimerAction::Run => foreground(open_timer(&config, true)?).await,
            action => one_shot(open_timer(&config, false)?, action, &config),
        }
    });
    // stdin reader may still be parked on read_line
    runtime.shutdown_background();
    result
}

/// Build the timer from the on-disk store. Sound and desktop notifications
/// are attached only for the foreground runner.
fn open_timer(config: &Config, foreground: bool) -> Result<StudyTimer, Box<dyn Error>> {
    let store = TimerStore::new(Database::open()?)
        .with_default_total(config.timer.default_minutes.saturating_mul(60));
    let mut builder = StudyTimer::builder_with(store);

    if foreground {
        builder = builder
            .notifications(config.notifications.clone())
            .tone(config.alarm.tone(), config.alarm.period());
        #[cfg(feature = "desktop-notify")]
        {
            builder = builder.notifier(std::sync::Arc::new(studybuddy_core::notify::DesktopNotifier));
        }
        #[cfg(feature = "audio")]
        if config.alarm.sound_enabled {
            builder = builder.tone_player(std::sync::Arc::new(studybuddy_core::alarm::RodioPlayer::new()));
        }
    } else {
        let mut quiet = config.notifications.clone();
        quiet.enabled = false;
        builder = builder.notifications(quiet);
    }

    Ok(builder.build()?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn one_shot(timer: StudyTimer, action: TimerAction, config: &Config) -> Result<(), Box<dyn Error>> {
    let event = match action {
        TimerAction::Status | TimerAction::Run => None,
        TimerAction::Start => timer.start(),
        TimerAction::Pause => timer.pause(),
        TimerAction::Reset => timer.reset(),
        TimerAction::StopAlarm => timer.stop_alarm(),
        TimerAction::Set { minutes, seconds } => Some(
            timer
                .set_duration(minutes, seconds)
                .ok_or("duration must be a positive number of seconds")?,
        ),
        TimerAction::Preset { minutes } => {
            if !config.timer.presets.contains(&minutes) {
                return Err(format!(
                    "no {minutes}-minute preset (configured: {:?})",
                    config.timer.presets
                )
                .into());
            }
            timer.apply_preset(minutes)
        }
    };

    match event {
        Some(event) => print_json(&event),
        None => print_json(&timer.snapshot()),
    }
}

async fn foreground(timer: StudyTimer) -> Result<(), Box<dyn Error>> {
    if timer.phase() == Phase::Idle {
        if let Some(event) = timer.start() {
            info!(?event, "foreground countdown started");
        }
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut updates = timer.subscribe();
    let mut snapshot = updates.borrow_and_update().clone();
    println!("{}  {}", snapshot.display, snapshot.status.message());

    while snapshot.phase == Phase::Running {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                snapshot = updates.borrow_and_update().clone();
                println!("{}", snapshot.display);
            }
            _ = &mut ctrl_c => {
                eprintln!("interrupted at {}, run again to resume", snapshot.display);
                return Ok(());
            }
        }
    }

    if snapshot.phase != Phase::Alarming {
        return Ok(());
    }

    eprintln!("{}", TimerStatus::Ringing.message());
    eprintln!("Press Enter to stop the alarm.");
    let enter = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).map(|_| ())
    });

    tokio::select! {
        _ = enter => {
            if let Some(event) = timer.stop_alarm() {
                print_json(&event)?;
            }
            let stats = timer.stats();
            println!(
                "today: {} session(s), streak: {} day(s)",
                stats.today_sessions, stats.streak
            );
        }
        _ = &mut ctrl_c => {
            eprintln!("interrupted, alarm is still pending");
        }
    }
    Ok(())
}
