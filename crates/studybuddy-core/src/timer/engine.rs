//! Timer engine implementation.
//!
//! The engine is a pure one-second-step state machine. It owns no threads
//! and does no I/O - the runtime calls `tick()` once per elapsed second
//! while the phase is `Running` and persists whatever changed.
//!
//! ## State Transitions
//!
//! ```text
//! Idle <-> Running -> Alarming -> Idle
//!   ^________________________________|  (reset / set_duration from anywhere)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(TimerState::new(5));
//! engine.start();
//! // Once per second:
//! engine.tick(today, now); // Some(Event::TimerCompleted { .. }) at zero
//! ```

use chrono::{DateTime, NaiveDate, Utc};

use super::state::{Phase, TimerState};
use crate::events::Event;
use crate::ledger::Session;

/// Core countdown state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerEngine {
    state: TimerState,
}

impl TimerEngine {
    /// Build an engine around a (possibly restored) state.
    ///
    /// The state is normalized first, so a corrupted snapshot can never
    /// leave the engine `Running` at zero.
    pub fn new(state: TimerState) -> Self {
        Self {
            state: state.normalized(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn total_seconds(&self) -> u32 {
        self.state.total_seconds
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.state.remaining_seconds
    }

    /// 0.0 .. 100.0 of the countdown already elapsed.
    pub fn progress_percentage(&self) -> f64 {
        let total = self.state.total_seconds;
        if total == 0 {
            return 0.0;
        }
        let elapsed = total.saturating_sub(self.state.remaining_seconds);
        (elapsed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start/pause toggle. While alarming this acknowledges the alarm.
    pub fn start(&mut self) -> Option<Event> {
        match self.state.phase {
            Phase::Alarming => self.stop_alarm(),
            Phase::Running => self.pause(),
            Phase::Idle => {
                if self.state.remaining_seconds == 0 {
                    self.state.remaining_seconds = self.state.total_seconds;
                }
                self.state.phase = Phase::Running;
                Some(Event::TimerStarted {
                    remaining_seconds: self.state.remaining_seconds,
                    total_seconds: self.state.total_seconds,
                })
            }
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.state.phase != Phase::Running {
            return None;
        }
        self.state.phase = Phase::Idle;
        Some(Event::TimerPaused {
            remaining_seconds: self.state.remaining_seconds,
        })
    }

    /// Advance the countdown by exactly one second.
    ///
    /// Returns `Event::TimerCompleted` with the new session on the tick that
    /// reaches zero, `Event::Ticked` otherwise, and `None` when not running.
    pub fn tick(&mut self, today: NaiveDate, now: DateTime<Utc>) -> Option<Event> {
        if self.state.phase != Phase::Running {
            return None;
        }
        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds > 0 {
            return Some(Event::Ticked {
                remaining_seconds: self.state.remaining_seconds,
            });
        }
        self.state.phase = Phase::Alarming;
        Some(Event::TimerCompleted {
            session: Session::new(today, now, self.state.total_seconds),
        })
    }

    pub fn stop_alarm(&mut self) -> Option<Event> {
        if self.state.phase != Phase::Alarming {
            return None;
        }
        self.state.phase = Phase::Idle;
        self.state.remaining_seconds = self.state.total_seconds;
        Some(Event::AlarmStopped {
            total_seconds: self.state.total_seconds,
        })
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.state.phase = Phase::Idle;
        self.state.remaining_seconds = self.state.total_seconds;
        Some(Event::TimerReset {
            total_seconds: self.state.total_seconds,
        })
    }

    /// Retarget the countdown to `minutes * 60 + seconds`.
    ///
    /// Non-positive (or overflowing) totals are ignored. A retarget is never
    /// a completion, so any running or ringing countdown is dropped silently.
    pub fn set_duration(&mut self, minutes: i64, seconds: i64) -> Option<Event> {
        let total = minutes
            .checked_mul(60)
            .and_then(|m| m.checked_add(seconds))
            .filter(|t| *t > 0)
            .and_then(|t| u32::try_from(t).ok())?;
        self.state = TimerState {
            total_seconds: total,
            remaining_seconds: total,
            phase: Phase::Idle,
        };
        Some(Event::DurationChanged {
            total_seconds: total,
        })
    }
}

/// Render seconds as `MM:SS`. Minutes are not wrapped at 60.
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
