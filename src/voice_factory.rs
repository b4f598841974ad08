// src/voice_factory.rs

use crate::clock::ClockTime;
use crate::envelope::GainShaper;
use crate::error::{EngineError, Result};
use crate::filter::LowpassFilter;
use crate::noise::{NoiseBed, NoiseConfig};
use crate::oscillator::Oscillator;
use crate::pattern::{EnvelopeSpec, ToneSpec};
use crate::voice::{Voice, VoiceId, VoiceOwner, VoiceSource};

/// Ambience beds fade in and out over this long when created or torn
/// down, which bounds the audible gap on a kind change.
pub const AMBIENCE_FADE: f64 = 0.08;

/// Materializes voices from declarative descriptions.
///
/// This is only used at schedule time, on the control side. It rejects
/// invalid requests synchronously; a constructed voice is always
/// renderable.
#[derive(Debug)]
pub struct VoiceFactory {
    sample_rate: f64,
    noise: NoiseConfig,
    next_id: VoiceId,
}

impl VoiceFactory {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_noise_config(sample_rate, NoiseConfig::default())
    }

    pub fn with_noise_config(sample_rate: f64, noise: NoiseConfig) -> Self {
        Self {
            sample_rate,
            noise,
            next_id: 1,
        }
    }

    fn take_id(&mut self) -> VoiceId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Build a tone voice sounding in `[start, stop)` clock time.
    ///
    /// `start`/`stop` are positions on the device clock, not call
    /// times; the lookahead scheduler hands in times slightly in the
    /// future. `stop <= start` is rejected, never silently ignored.
    pub fn create_tone(
        &mut self,
        spec: &ToneSpec,
        envelope: &EnvelopeSpec,
        start: ClockTime,
        stop: ClockTime,
        owner: VoiceOwner,
    ) -> Result<Voice> {
        spec.validate()?;
        envelope.validate()?;

        if stop <= start {
            return Err(EngineError::InvalidSchedule(format!(
                "stop ({stop}) must be after start ({start})"
            )));
        }
        let lifetime = stop - start;
        if envelope.attack_seconds + envelope.release_seconds > lifetime {
            return Err(EngineError::InvalidEnvelope(format!(
                "envelope ({} + {} s) exceeds the voice lifetime ({lifetime} s)",
                envelope.attack_seconds, envelope.release_seconds
            )));
        }

        let osc = Oscillator::from_spec(spec, self.sample_rate);
        let filter = spec
            .filter
            .as_ref()
            .map(|f| LowpassFilter::new(f.cutoff_hz, self.sample_rate));
        let gain = GainShaper::new(envelope, start, stop, 1.0);

        Ok(Voice::new(
            self.take_id(),
            owner,
            VoiceSource::Tone { osc, filter },
            gain,
            start,
        ))
    }

    /// Build an ambience bed that sounds from `start` until released.
    ///
    /// The buffer is generated once here, then looped by the render
    /// side; it is never regenerated per loop iteration.
    pub fn create_noise_bed(
        &mut self,
        cutoff_hz: f32,
        volume: f32,
        start: ClockTime,
    ) -> Result<Voice> {
        if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 {
            return Err(EngineError::InvalidTone(format!(
                "noise cutoff must be positive, got {cutoff_hz}"
            )));
        }
        if !(0.0..=1.0).contains(&volume) {
            return Err(EngineError::InvalidTone(format!(
                "ambience volume must be in [0, 1], got {volume}"
            )));
        }

        let id = self.take_id();
        let bed = NoiseBed::generate(&self.noise, cutoff_hz, self.sample_rate, id as u32);
        let envelope = EnvelopeSpec {
            attack_seconds: AMBIENCE_FADE,
            sustain_level: 1.0,
            release_seconds: AMBIENCE_FADE,
        };
        let gain = GainShaper::new(&envelope, start, f64::INFINITY, volume);

        Ok(Voice::new(
            id,
            VoiceOwner::Ambience,
            VoiceSource::Noise { bed },
            gain,
            start,
        ))
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> VoiceFactory {
        VoiceFactory::new(48_000.0)
    }

    #[test]
    fn rejects_stop_before_start() {
        let mut factory = factory();
        let err = factory.create_tone(
            &ToneSpec::sine(440.0),
            &EnvelopeSpec::default(),
            1.0,
            1.0,
            VoiceOwner::Pattern(0),
        );
        assert!(matches!(err, Err(EngineError::InvalidSchedule(_))));
    }

    #[test]
    fn rejects_envelope_longer_than_lifetime() {
        let mut factory = factory();
        let envelope = EnvelopeSpec {
            attack_seconds: 0.3,
            sustain_level: 0.8,
            release_seconds: 0.3,
        };
        let err = factory.create_tone(
            &ToneSpec::sine(440.0),
            &envelope,
            0.0,
            0.5,
            VoiceOwner::Pattern(0),
        );
        assert!(matches!(err, Err(EngineError::InvalidEnvelope(_))));
    }

    #[test]
    fn tone_ids_increase_monotonically() {
        let mut factory = factory();
        let a = factory
            .create_tone(
                &ToneSpec::sine(440.0),
                &EnvelopeSpec::default(),
                0.0,
                1.0,
                VoiceOwner::Pattern(0),
            )
            .unwrap();
        let b = factory
            .create_tone(
                &ToneSpec::sine(220.0),
                &EnvelopeSpec::default(),
                0.5,
                1.5,
                VoiceOwner::Pattern(0),
            )
            .unwrap();
        assert!(b.id() > a.id());
    }

    #[test]
    fn noise_bed_is_unbounded_until_released() {
        let mut factory = factory();
        let bed = factory.create_noise_bed(2_000.0, 0.5, 0.0).unwrap();
        assert!(bed.stop_time().is_infinite());
        assert_eq!(bed.owner(), VoiceOwner::Ambience);
        assert!(bed.is_noise());
    }

    #[test]
    fn noise_bed_rejects_bad_volume() {
        let mut factory = factory();
        assert!(factory.create_noise_bed(2_000.0, 1.5, 0.0).is_err());
        assert!(factory.create_noise_bed(2_000.0, -0.1, 0.0).is_err());
        assert!(factory.create_noise_bed(0.0, 0.5, 0.0).is_err());
    }
}
