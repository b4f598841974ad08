// src/voice.rs

use crate::clock::ClockTime;
use crate::envelope::GainShaper;
use crate::filter::LowpassFilter;
use crate::noise::NoiseBed;
use crate::oscillator::Oscillator;

pub type VoiceId = u64;

/// Which logical channel a voice belongs to.
///
/// Releasing a pattern must not tear down the ambience bed and vice
/// versa, so voices carry their owner from creation to teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceOwner {
    Pattern(u64),
    Ambience,
}

/// Signal source inside a voice: a (possibly filtered) oscillator or a
/// looping noise bed.
#[derive(Debug, Clone)]
pub enum VoiceSource {
    Tone {
        osc: Oscillator,
        filter: Option<LowpassFilter>,
    },
    Noise {
        bed: NoiseBed,
    },
}

impl VoiceSource {
    #[inline]
    fn next_sample(&mut self) -> f32 {
        match self {
            VoiceSource::Tone { osc, filter } => {
                let raw = osc.next_sample();
                match filter {
                    Some(f) => f.process_sample(raw),
                    None => raw,
                }
            }
            VoiceSource::Noise { bed } => bed.next_sample(),
        }
    }

    pub fn is_noise(&self) -> bool {
        matches!(self, VoiceSource::Noise { .. })
    }
}

/// One live sound-producing unit.
///
/// Lifecycle: Scheduled -> Sounding -> Released -> Finished. Owned
/// exclusively by the voice pool after registration; the render side
/// mixes it between its start and hard-stop clock times.
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    owner: VoiceOwner,
    source: VoiceSource,
    gain: GainShaper,
    start: ClockTime,
    /// Hard-stop time. Guarded to land after the gain floor; moves
    /// earlier on explicit release.
    stop: ClockTime,
    released: bool,
}

impl Voice {
    pub(crate) fn new(
        id: VoiceId,
        owner: VoiceOwner,
        source: VoiceSource,
        gain: GainShaper,
        start: ClockTime,
    ) -> Self {
        let stop = gain.stop_time();
        Self {
            id,
            owner,
            source,
            gain,
            start,
            stop,
            released: false,
        }
    }

    #[inline]
    pub fn id(&self) -> VoiceId {
        self.id
    }

    #[inline]
    pub fn owner(&self) -> VoiceOwner {
        self.owner
    }

    #[inline]
    pub fn start_time(&self) -> ClockTime {
        self.start
    }

    #[inline]
    pub fn stop_time(&self) -> ClockTime {
        self.stop
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn is_noise(&self) -> bool {
        self.source.is_noise()
    }

    /// True once the hard stop has passed and the voice can be reaped.
    #[inline]
    pub fn is_finished(&self, now: ClockTime) -> bool {
        now >= self.stop
    }

    /// True while the voice is audible (started, not yet releasing).
    pub fn is_sounding(&self, now: ClockTime) -> bool {
        now >= self.start && now < self.gain.release_start()
    }

    /// Begin the click-free early-release ramp at `now`.
    ///
    /// A voice whose scheduled stop is already in the past is left
    /// alone (it finished naturally). Idempotent.
    pub fn release_at(&mut self, now: ClockTime) {
        if self.is_finished(now) {
            return;
        }
        self.gain.release_now(now);
        self.stop = self.gain.stop_time();
        self.released = true;
    }

    /// Mix this voice into `out`, a block starting at `block_start`.
    ///
    /// Start and stop land on exact sample boundaries inside the block;
    /// the generator only runs for samples inside its live window.
    pub fn render_into(&mut self, out: &mut [f32], block_start: ClockTime, sample_rate: f64) {
        let frames = out.len();

        let first = if self.start <= block_start {
            0
        } else {
            ((self.start - block_start) * sample_rate).ceil() as usize
        };
        let last = if self.stop.is_infinite() {
            frames
        } else {
            (((self.stop - block_start) * sample_rate).ceil() as usize).min(frames)
        };
        if first >= last || first >= frames {
            return;
        }

        let dt = 1.0 / sample_rate;
        for (i, slot) in out[first..last].iter_mut().enumerate() {
            let t = block_start + (first + i) as f64 * dt;
            *slot += self.source.next_sample() * self.gain.gain_at(t);
        }
    }
}
