//! Fixed-size playback voice pool and hit → voice dispatch.

use crate::sound_bank::{DrumSound, SoundBank};
use crate::types::{HitEvent, SessionClock};
use log::{debug, warn};
use std::time::Duration;

/// One playback slot of the audio layer.
///
/// The audio layer owns playback state; the dispatcher only polls
/// `is_busy` and fires `play`.
pub trait Voice {
    fn is_busy(&self) -> bool;
    /// Start `sound` on this voice. Fire-and-forget.
    fn play(&mut self, sound: &DrumSound);
}

/// A hit that was given a voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub voice: usize,
    pub zone_index: usize,
    pub drum: String,
}

/// Assigns each hit to the first free voice, in pool order.
///
/// When every voice is busy the hit is dropped: no queue, no retry. A late
/// drum sound is worse than a missing one.
pub struct VoiceDispatcher {
    voices: Vec<Box<dyn Voice>>,
    dropped: u64,
}

impl VoiceDispatcher {
    pub fn new(voices: Vec<Box<dyn Voice>>) -> Self {
        Self { voices, dropped: 0 }
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn busy_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_busy()).count()
    }

    /// Hits dropped so far for lack of a free voice.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Play each hit's sound, in hit order.
    pub fn dispatch(&mut self, hits: &[HitEvent], bank: &SoundBank) -> Vec<Assignment> {
        let mut assigned = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(sound) = bank.get(hit.zone_index) else {
                warn!("No sound loaded for zone {} ('{}')", hit.zone_index, hit.drum);
                continue;
            };
            match self.voices.iter_mut().position(|v| !v.is_busy()) {
                Some(i) => {
                    self.voices[i].play(sound);
                    debug!("'{}' → voice {}", hit.drum, i);
                    assigned.push(Assignment {
                        voice: i,
                        zone_index: hit.zone_index,
                        drum: hit.drum.clone(),
                    });
                }
                None => {
                    self.dropped += 1;
                    debug!("All {} voices busy; dropped '{}'", self.voices.len(), hit.drum);
                }
            }
        }
        assigned
    }
}

// ─── Headless voice ─────────────────────────────────────────────────────────

/// Voice that plays nothing but stays busy for the sound's duration,
/// measured on the session clock. Used when no audio device is available.
#[derive(Default)]
pub struct TimedVoice {
    clock: SessionClock,
    busy_until_us: Option<u64>,
}

impl TimedVoice {
    pub fn new(clock: SessionClock) -> Self {
        Self {
            clock,
            busy_until_us: None,
        }
    }

    /// `count` boxed timed voices on a fresh clock.
    pub fn pool(count: usize) -> Vec<Box<dyn Voice>> {
        Self::pool_on(count, &SessionClock::new())
    }

    /// `count` boxed timed voices sharing `clock`, ready for a dispatcher.
    pub fn pool_on(count: usize, clock: &SessionClock) -> Vec<Box<dyn Voice>> {
        (0..count)
            .map(|_| Box::new(TimedVoice::new(clock.clone())) as Box<dyn Voice>)
            .collect()
    }
}

impl Voice for TimedVoice {
    fn is_busy(&self) -> bool {
        self.busy_until_us.is_some_and(|t| self.clock.now_us() < t)
    }

    fn play(&mut self, sound: &DrumSound) {
        // Zero-length sounds still hold the voice for a moment
        let d = sound.duration().max(Duration::from_millis(1));
        self.busy_until_us = Some(self.clock.now_us().saturating_add(d.as_micros() as u64));
    }
}
