use serde::{Deserialize, Serialize};

use crate::ledger::Session;

/// Every timer transition produces an Event.
/// The CLI prints them; the runtime uses them to drive side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        remaining_seconds: u32,
        total_seconds: u32,
    },
    TimerPaused {
        remaining_seconds: u32,
    },
    Ticked {
        remaining_seconds: u32,
    },
    /// Countdown reached zero. Carries the session that was recorded.
    TimerCompleted {
        session: Session,
    },
    AlarmStopped {
        total_seconds: u32,
    },
    TimerReset {
        total_seconds: u32,
    },
    DurationChanged {
        total_seconds: u32,
    },
}
