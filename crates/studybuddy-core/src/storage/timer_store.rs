//! Typed write-through layer over a [`KvStore`].
//!
//! Every key is read independently on load; a missing or unparsable key
//! falls back to its default without affecting the others. Writes never
//! fail from the caller's point of view: errors are logged and dropped and
//! the in-memory state stays authoritative for the current run.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::KvStore;
use crate::error::StoreError;
use crate::ledger::SessionLedger;
use crate::timer::{Phase, TimerState, DEFAULT_TOTAL_SECONDS};

pub const KEY_TOTAL_SECONDS: &str = "totalSeconds";
pub const KEY_REMAINING_SECONDS: &str = "remainingSeconds";
pub const KEY_IS_ACTIVE: &str = "isActive";
pub const KEY_IS_RINGING: &str = "isRinging";
pub const KEY_COMPLETED_SESSIONS: &str = "completedSessions";

pub struct TimerStore {
    store: Box<dyn KvStore>,
    scope: String,
    default_total: u32,
}

impl TimerStore {
    pub const DEFAULT_SCOPE: &'static str = "timer";

    pub fn new(store: impl KvStore + 'static) -> Self {
        Self::with_scope(store, Self::DEFAULT_SCOPE)
    }

    pub fn with_scope(store: impl KvStore + 'static, scope: impl Into<String>) -> Self {
        Self {
            store: Box::new(store),
            scope: scope.into(),
            default_total: DEFAULT_TOTAL_SECONDS,
        }
    }

    /// Countdown length used when nothing usable is persisted yet.
    pub fn with_default_total(mut self, seconds: u32) -> Self {
        if seconds > 0 {
            self.default_total = seconds;
        }
        self
    }

    /// Restore the countdown state, normalized so its invariants hold.
    pub fn load_state(&self) -> TimerState {
        let total_seconds = self
            .read::<u32>(KEY_TOTAL_SECONDS)
            .filter(|t| *t > 0)
            .unwrap_or(self.default_total);
        let remaining_seconds = self
            .read::<u32>(KEY_REMAINING_SECONDS)
            .filter(|r| *r > 0)
            .unwrap_or(total_seconds);
        let is_active = self.read::<bool>(KEY_IS_ACTIVE).unwrap_or(false);
        let is_ringing = self.read::<bool>(KEY_IS_RINGING).unwrap_or(false);

        TimerState {
            total_seconds,
            remaining_seconds,
            phase: Phase::from_flags(is_active, is_ringing),
        }
        .normalized()
    }

    pub fn load_ledger(&self) -> SessionLedger {
        self.read(KEY_COMPLETED_SESSIONS).unwrap_or_default()
    }

    pub fn save_state(&self, state: &TimerState) {
        self.write(KEY_TOTAL_SECONDS, &state.total_seconds);
        self.write(KEY_REMAINING_SECONDS, &state.remaining_seconds);
        self.write(KEY_IS_ACTIVE, &state.phase.is_active());
        self.write(KEY_IS_RINGING, &state.phase.is_ringing());
    }

    pub fn save_ledger(&self, ledger: &SessionLedger) {
        self.write(KEY_COMPLETED_SESSIONS, ledger);
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}.{}", self.scope, key)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let key = self.scoped(key);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(%key, error = %err, "failed to read persisted value, using default");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%key, error = %err, "persisted value is corrupt, using default");
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let key = self.scoped(key);
        let result = serde_json::to_string(value)
            .map_err(|source| StoreError::Encode {
                key: key.clone(),
                source,
            })
            .and_then(|raw| self.store.set(&key, &raw));
        match result {
            Ok(()) => debug!(%key, "persisted"),
            Err(err) => warn!(%key, error = %err, "failed to persist value"),
        }
    }
}
