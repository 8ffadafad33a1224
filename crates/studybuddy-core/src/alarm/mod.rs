//! Completion alarm.
//!
//! While the timer is [`Phase::Alarming`] a repeating task plays one short
//! tone per period, the first one a full period after the alarm starts. Leaving the phase cancels the task; a tone is only
//! played while holding the arm token, so nothing sounds after `disarm`
//! returns.

#[cfg(feature = "audio")]
mod rodio_player;

#[cfg(feature = "audio")]
pub use rodio_player::RodioPlayer;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::driver::DriverSlot;
use crate::timer::Phase;

/// A short fixed-pitch beep with an exponentially decaying envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    /// Starting gain, 0.0 ..= 1.0.
    pub volume: f32,
    pub duration: Duration,
}

impl Default for Tone {
    fn default() -> Self {
        Self {
            frequency_hz: 1000.0,
            volume: 0.3,
            duration: Duration::from_millis(500),
        }
    }
}

/// Sound output capability.
pub trait TonePlayer: Send + Sync {
    /// Start playing `tone`. Must not block for the tone's duration.
    fn play(&self, tone: &Tone);

    /// Cut off anything still sounding.
    fn silence(&self) {}
}

/// Host without sound: every call is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPlayer;

impl TonePlayer for SilentPlayer {
    fn play(&self, _tone: &Tone) {}
}

pub struct AlarmSignaler {
    player: Arc<dyn TonePlayer>,
    tone: Tone,
    period: Duration,
    runtime: Handle,
    /// Id of the live repeater; `None` while disarmed.
    token: Arc<Mutex<Option<u64>>>,
    next_id: u64,
    slot: DriverSlot,
}

impl AlarmSignaler {
    pub fn new(player: Arc<dyn TonePlayer>, tone: Tone, period: Duration, runtime: Handle) -> Self {
        Self {
            player,
            tone,
            period,
            runtime,
            token: Arc::new(Mutex::new(None)),
            next_id: 0,
            slot: DriverSlot::new(),
        }
    }

    /// Follow the timer phase: ring while alarming, silent otherwise.
    pub fn sync(&mut self, phase: Phase) {
        if phase == Phase::Alarming {
            self.arm();
        } else {
            self.disarm();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn arm(&mut self) {
        if self.is_armed() {
            return;
        }
        self.slot.disarm();

        self.next_id = self.next_id.wrapping_add(1);
        let id = self.next_id;
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);

        let token = Arc::clone(&self.token);
        let player = Arc::clone(&self.player);
        let tone = self.tone;
        let period = self.period;
        let handle = self.runtime.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let live = token.lock().unwrap_or_else(PoisonError::into_inner);
                if *live != Some(id) {
                    break;
                }
                player.play(&tone);
                debug!(repeater = id, "alarm tone");
            }
        });
        self.slot.arm(handle);
        info!(repeater = id, "alarm armed");
    }

    /// Stop ringing. Safe to call when already disarmed.
    pub fn disarm(&mut self) {
        let was_armed = self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        self.slot.disarm();
        if was_armed {
            self.player.silence();
            info!("alarm disarmed");
        }
    }
}

impl Drop for AlarmSignaler {
    fn drop(&mut self) {
        self.disarm();
    }
}
