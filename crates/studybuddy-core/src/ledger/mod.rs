//! Append-only record of completed study sessions.
//!
//! One [`Session`] is appended per countdown that reaches zero on its own.
//! Streak and daily counts are derived on demand and never stored.

mod streak;

pub use streak::{streak, today_count};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One fully completed countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Local calendar day the countdown finished on.
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "duration")]
    pub duration_seconds: u32,
}

impl Session {
    pub fn new(date: NaiveDate, timestamp: DateTime<Utc>, duration_seconds: u32) -> Self {
        Self {
            date,
            timestamp,
            duration_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub total_sessions: u64,
    pub total_seconds: u64,
    pub today_sessions: u64,
    pub today_seconds: u64,
    pub streak: u32,
}

/// Ordered sessions. Grows monotonically; nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionLedger {
    sessions: Vec<Session>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sessions(sessions: Vec<Session>) -> Self {
        Self { sessions }
    }

    pub fn append(&mut self, session: Session) {
        self.sessions.push(session);
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn streak(&self, today: NaiveDate) -> u32 {
        streak(&self.sessions, today)
    }

    pub fn today_count(&self, today: NaiveDate) -> u32 {
        today_count(&self.sessions, today)
    }

    pub fn stats(&self, today: NaiveDate) -> LedgerStats {
        let mut stats = LedgerStats {
            streak: self.streak(today),
            ..LedgerStats::default()
        };
        for session in &self.sessions {
            stats.total_sessions += 1;
            stats.total_seconds += u64::from(session.duration_seconds);
            if session.date == today {
                stats.today_sessions += 1;
                stats.today_seconds += u64::from(session.duration_seconds);
            }
        }
        stats
    }
}
