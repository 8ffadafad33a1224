use serde::{Deserialize, Serialize};

/// Default countdown length: 25 minutes.
pub const DEFAULT_TOTAL_SECONDS: u32 = 25 * 60;

/// Lifecycle position of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Running,
    /// Countdown reached zero; the alarm rings until acknowledged.
    Alarming,
}

impl Phase {
    /// Rebuild a phase from the two persisted flags.
    ///
    /// `is_ringing` wins when both are set.
    pub fn from_flags(is_active: bool, is_ringing: bool) -> Self {
        match (is_active, is_ringing) {
            (_, true) => Phase::Alarming,
            (true, false) => Phase::Running,
            (false, false) => Phase::Idle,
        }
    }

    pub fn is_active(self) -> bool {
        self == Phase::Running
    }

    pub fn is_ringing(self) -> bool {
        self == Phase::Alarming
    }
}

/// Countdown state owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub total_seconds: u32,
    pub remaining_seconds: u32,
    pub phase: Phase,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            total_seconds: DEFAULT_TOTAL_SECONDS,
            remaining_seconds: DEFAULT_TOTAL_SECONDS,
            phase: Phase::Idle,
        }
    }
}

impl TimerState {
    pub fn new(total_seconds: u32) -> Self {
        let total_seconds = if total_seconds == 0 {
            DEFAULT_TOTAL_SECONDS
        } else {
            total_seconds
        };
        Self {
            total_seconds,
            remaining_seconds: total_seconds,
            phase: Phase::Idle,
        }
    }

    /// Repair a state restored from storage so the invariants hold:
    /// `remaining <= total`, `total > 0`, and `Running` never sits at zero.
    pub fn normalized(mut self) -> Self {
        if self.total_seconds == 0 {
            self.total_seconds = DEFAULT_TOTAL_SECONDS;
        }
        if self.remaining_seconds > self.total_seconds {
            self.remaining_seconds = self.total_seconds;
        }
        match self.phase {
            Phase::Alarming => self.remaining_seconds = 0,
            Phase::Running | Phase::Idle if self.remaining_seconds == 0 => {
                self.phase = Phase::Idle;
                self.remaining_seconds = self.total_seconds;
            }
            _ => {}
        }
        self
    }
}
