// src/voice_pool.rs

use crate::clock::ClockTime;
use crate::voice::{Voice, VoiceId, VoiceOwner};

pub const DEFAULT_MAX_VOICES: usize = 32;

/// Tracks every live voice from registration to teardown.
///
/// Responsibilities:
/// - sole owner of live voices; nothing else retains a handle
/// - bulk and per-owner release, always via the click-free ramp
/// - bound the number of simultaneous voices
///
/// Does NOT:
/// - decide when voices start (the scheduler does)
/// - mix audio (the render engine iterates the pool)
#[derive(Debug)]
pub struct VoicePool {
    voices: Vec<Voice>,
    max_voices: usize,
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VOICES)
    }
}

impl VoicePool {
    pub fn new(max_voices: usize) -> Self {
        Self {
            voices: Vec::with_capacity(max_voices),
            max_voices,
        }
    }

    /// Take ownership of a voice.
    ///
    /// Returns the voice id, or `None` when the pool is full: the
    /// oldest-pending voices keep priority and the newcomer is dropped
    /// rather than growing memory without bound.
    pub fn register(&mut self, voice: Voice) -> Option<VoiceId> {
        if self.voices.len() >= self.max_voices {
            log::warn!(
                "voice pool full ({} voices); dropping voice scheduled at {:.3}s",
                self.voices.len(),
                voice.start_time()
            );
            return None;
        }
        let id = voice.id();
        self.voices.push(voice);
        Some(id)
    }

    /// Release every live voice. Idempotent and safe on an empty pool.
    ///
    /// Voices already past their scheduled stop are simply forgotten at
    /// the next reap; the rest get their gain re-targeted to ramp to
    /// the floor starting now.
    pub fn release_all(&mut self, now: ClockTime) {
        for voice in &mut self.voices {
            voice.release_at(now);
        }
    }

    /// Release the live voices belonging to one owner.
    pub fn release_owner(&mut self, owner: VoiceOwner, now: ClockTime) {
        for voice in self.voices.iter_mut().filter(|v| v.owner() == owner) {
            voice.release_at(now);
        }
    }

    /// Release a single voice by id. Unknown ids are ignored.
    pub fn release_one(&mut self, id: VoiceId, now: ClockTime) {
        if let Some(voice) = self.voices.iter_mut().find(|v| v.id() == id) {
            voice.release_at(now);
        }
    }

    /// Drop voices whose hard stop has passed.
    pub fn reap(&mut self, now: ClockTime) {
        self.voices.retain(|v| !v.is_finished(now));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Voices currently audible and not yet releasing.
    pub fn sounding_count(&self, now: ClockTime) -> usize {
        self.voices.iter().filter(|v| v.is_sounding(now)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut()
    }

    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id() == id)
    }
}
