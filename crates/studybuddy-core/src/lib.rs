//! # StudyBuddy Core Library
//!
//! This library provides the study timer behind StudyBuddy: a persistent
//! countdown with a ringing completion alarm and a consecutive-day study
//! streak. Every operation is available to the `studybuddy` CLI; any GUI is
//! a thin layer over the same core.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A pure one-second-step state machine
//!   (Idle / Running / Alarming)
//! - **Session Ledger**: Append-only log of completed countdowns, from which
//!   the streak and today's count are derived
//! - **Storage**: Write-through key/value persistence (SQLite) and TOML
//!   configuration
//! - **Runtime**: Owns the countdown and alarm drivers on a tokio runtime
//!
//! ## Key Components
//!
//! - [`StudyTimer`]: The timer facade the UI talks to
//! - [`TimerEngine`]: Core timer state machine
//! - [`SessionLedger`]: Completed sessions and streak math
//! - [`Database`]: SQLite key/value store
//! - [`Config`]: Application configuration management

pub mod alarm;
pub mod clock;
pub mod driver;
pub mod error;
pub mod events;
pub mod ledger;
pub mod notify;
pub mod runtime;
pub mod storage;
pub mod timer;

pub use alarm::{AlarmSignaler, SilentPlayer, Tone, TonePlayer};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, StoreError};
pub use events::Event;
pub use ledger::{LedgerStats, Session, SessionLedger};
pub use notify::{Notifier, NullNotifier, Permission};
pub use runtime::{StudyTimer, StudyTimerBuilder, TimerSnapshot, TimerStatus};
pub use storage::{Config, Database, KvStore, MemoryStore, TimerStore};
pub use timer::{format_time, Phase, TimerEngine, TimerState};
