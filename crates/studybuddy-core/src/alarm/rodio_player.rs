use std::f32::consts::TAU;
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use rodio::{OutputStream, Sink, Source};
use tracing::warn;

use super::{Tone, TonePlayer};

const SAMPLE_RATE: u32 = 44_100;
/// Gain the envelope decays to by the end of the tone.
const FLOOR_GAIN: f32 = 0.01;

/// Sine beep with an exponential gain ramp from `volume` down to
/// [`FLOOR_GAIN`] over the tone's duration.
struct Beep {
    frequency_hz: f32,
    volume: f32,
    decay_per_sample: f32,
    gain: f32,
    index: u32,
    len: u32,
}

impl Beep {
    fn new(tone: &Tone) -> Self {
        let len = (tone.duration.as_secs_f32() * SAMPLE_RATE as f32).round() as u32;
        let volume = tone.volume.clamp(0.0, 1.0);
        let decay_per_sample = if volume > FLOOR_GAIN && len > 0 {
            (FLOOR_GAIN / volume).powf(1.0 / len as f32)
        } else {
            1.0
        };
        Self {
            frequency_hz: tone.frequency_hz,
            volume,
            decay_per_sample,
            gain: volume,
            index: 0,
            len,
        }
    }
}

impl Iterator for Beep {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }
        let t = self.index as f32 / SAMPLE_RATE as f32;
        let sample = (TAU * self.frequency_hz * t).sin() * self.gain;
        self.gain = (self.gain * self.decay_per_sample).min(self.volume);
        self.index += 1;
        Some(sample)
    }
}

impl Source for Beep {
    fn current_frame_len(&self) -> Option<usize> {
        Some((self.len - self.index) as usize)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(self.len as f32 / SAMPLE_RATE as f32))
    }
}

enum AudioCommand {
    Play(Tone),
    Silence,
}

/// Plays alarm tones on the default output device.
///
/// `OutputStream` is not `Send`, so a dedicated thread owns it and receives
/// commands over a channel. When no output device exists the thread logs
/// once and drops every command.
pub struct RodioPlayer {
    tx: Mutex<Option<Sender<AudioCommand>>>,
}

impl RodioPlayer {
    pub fn new() -> Self {
        Self {
            tx: Mutex::new(None),
        }
    }

    fn sender(&self) -> Option<Sender<AudioCommand>> {
        let mut guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = guard.as_ref() {
            return Some(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let spawned = thread::Builder::new()
            .name("alarm-audio".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(error = %err, "no audio output, alarm will be silent");
                        while rx.recv().is_ok() {}
                        return;
                    }
                };
                let mut sink: Option<Sink> = None;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Play(tone) => {
                            if sink.is_none() {
                                match Sink::try_new(&handle) {
                                    Ok(s) => sink = Some(s),
                                    Err(err) => {
                                        warn!(error = %err, "failed to create audio sink");
                                        continue;
                                    }
                                }
                            }
                            if let Some(ref s) = sink {
                                s.append(Beep::new(&tone));
                            }
                        }
                        AudioCommand::Silence => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                        }
                    }
                }
            });

        match spawned {
            Ok(_) => {
                *guard = Some(tx.clone());
                Some(tx)
            }
            Err(err) => {
                warn!(error = %err, "failed to start audio thread");
                None
            }
        }
    }
}

impl Default for RodioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl TonePlayer for RodioPlayer {
    fn play(&self, tone: &Tone) {
        if let Some(tx) = self.sender() {
            let _ = tx.send(AudioCommand::Play(*tone));
        }
    }

    fn silence(&self) {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(AudioCommand::Silence);
        }
    }
}
