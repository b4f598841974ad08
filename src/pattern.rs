// src/pattern.rs
//
// Declarative descriptions of what a lesson screen wants to hear.
//
// These types:
// - live ONLY on the control side
// - are plain serializable data, authored per screen
// - are validated atomically before any scheduler state changes

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Basic waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

/// One segment of a stepped frequency sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyStep {
    pub hz: f32,
    pub seconds: f32,
}

/// Pitch source for a tone: a fixed frequency, or a sequence of
/// frequencies with per-step durations (arpeggios, sirens).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frequency {
    Hz(f32),
    Sequence(Vec<FrequencyStep>),
}

/// Optional band-limiting applied after the generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub cutoff_hz: f32,
}

/// Declarative description of one tone voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    pub waveform: Waveform,
    pub frequency: Frequency,
    #[serde(default)]
    pub filter: Option<FilterSpec>,
    #[serde(default)]
    pub detune_cents: f32,
}

impl ToneSpec {
    pub fn new(waveform: Waveform, hz: f32) -> Self {
        Self {
            waveform,
            frequency: Frequency::Hz(hz),
            filter: None,
            detune_cents: 0.0,
        }
    }

    pub fn sine(hz: f32) -> Self {
        Self::new(Waveform::Sine, hz)
    }

    pub fn triangle(hz: f32) -> Self {
        Self::new(Waveform::Triangle, hz)
    }

    pub fn square(hz: f32) -> Self {
        Self::new(Waveform::Square, hz)
    }

    pub fn sawtooth(hz: f32) -> Self {
        Self::new(Waveform::Sawtooth, hz)
    }

    /// Replace the fixed frequency with a stepped sequence.
    pub fn with_sequence(mut self, steps: Vec<FrequencyStep>) -> Self {
        self.frequency = Frequency::Sequence(steps);
        self
    }

    pub fn with_filter(mut self, cutoff_hz: f32) -> Self {
        self.filter = Some(FilterSpec { cutoff_hz });
        self
    }

    pub fn with_detune(mut self, cents: f32) -> Self {
        self.detune_cents = cents;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match &self.frequency {
            Frequency::Hz(hz) => {
                if !hz.is_finite() || *hz <= 0.0 {
                    return Err(EngineError::InvalidTone(format!(
                        "frequency must be positive, got {hz}"
                    )));
                }
            }
            Frequency::Sequence(steps) => {
                if steps.is_empty() {
                    return Err(EngineError::InvalidTone(
                        "frequency sequence must not be empty".into(),
                    ));
                }
                for step in steps {
                    if !step.hz.is_finite() || step.hz <= 0.0 {
                        return Err(EngineError::InvalidTone(format!(
                            "sequence frequency must be positive, got {}",
                            step.hz
                        )));
                    }
                    if !step.seconds.is_finite() || step.seconds <= 0.0 {
                        return Err(EngineError::InvalidTone(format!(
                            "sequence step duration must be positive, got {}",
                            step.seconds
                        )));
                    }
                }
            }
        }

        if let Some(filter) = &self.filter {
            if !filter.cutoff_hz.is_finite() || filter.cutoff_hz <= 0.0 {
                return Err(EngineError::InvalidTone(format!(
                    "filter cutoff must be positive, got {}",
                    filter.cutoff_hz
                )));
            }
        }

        if !self.detune_cents.is_finite() {
            return Err(EngineError::InvalidTone("detune must be finite".into()));
        }

        Ok(())
    }
}

/// Attack/sustain/release amplitude shape applied to every voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeSpec {
    pub attack_seconds: f64,
    /// Plateau level in (0, 1]. Never exactly zero while sounding; the
    /// release ramp targets a small positive floor before the hard stop.
    pub sustain_level: f32,
    pub release_seconds: f64,
}

impl Default for EnvelopeSpec {
    fn default() -> Self {
        Self {
            attack_seconds: 0.01,
            sustain_level: 0.8,
            release_seconds: 0.15,
        }
    }
}

impl EnvelopeSpec {
    pub fn validate(&self) -> Result<()> {
        if !self.attack_seconds.is_finite() || self.attack_seconds < 0.0 {
            return Err(EngineError::InvalidEnvelope(format!(
                "attack must be non-negative, got {}",
                self.attack_seconds
            )));
        }
        if !self.release_seconds.is_finite() || self.release_seconds < 0.0 {
            return Err(EngineError::InvalidEnvelope(format!(
                "release must be non-negative, got {}",
                self.release_seconds
            )));
        }
        if !self.sustain_level.is_finite()
            || self.sustain_level <= 0.0
            || self.sustain_level > 1.0
        {
            return Err(EngineError::InvalidEnvelope(format!(
                "sustain level must be in (0, 1], got {}",
                self.sustain_level
            )));
        }
        Ok(())
    }
}

/// One step of a pattern. An empty tone list is a rest.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternStep {
    pub tones: Vec<ToneSpec>,
}

impl PatternStep {
    pub fn rest() -> Self {
        Self::default()
    }

    pub fn tone(tone: ToneSpec) -> Self {
        Self { tones: vec![tone] }
    }

    pub fn chord(tones: Vec<ToneSpec>) -> Self {
        Self { tones }
    }
}

/// A looping tempo/step description of discrete events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub tempo_bpm: f64,
    pub steps: Vec<PatternStep>,
    #[serde(default)]
    pub envelope: EnvelopeSpec,
    /// Lifetime of each scheduled tone. Defaults to one step duration.
    #[serde(default)]
    pub note_seconds: Option<f64>,
}

impl Pattern {
    pub fn new(tempo_bpm: f64, steps: Vec<PatternStep>) -> Self {
        Self {
            tempo_bpm,
            steps,
            envelope: EnvelopeSpec::default(),
            note_seconds: None,
        }
    }

    pub fn with_envelope(mut self, envelope: EnvelopeSpec) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn with_note_seconds(mut self, seconds: f64) -> Self {
        self.note_seconds = Some(seconds);
        self
    }

    /// Duration of one step: one beat at the pattern tempo.
    #[inline]
    pub fn step_seconds(&self) -> f64 {
        60.0 / self.tempo_bpm
    }

    /// Length of one full loop.
    ///
    /// A single multiplication, so `step_seconds * total_steps ==
    /// loop_seconds` holds exactly with no accumulated rounding.
    #[inline]
    pub fn loop_seconds(&self) -> f64 {
        self.step_seconds() * self.steps.len() as f64
    }

    #[inline]
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Lifetime of each scheduled tone voice.
    #[inline]
    pub fn note_seconds(&self) -> f64 {
        self.note_seconds.unwrap_or_else(|| self.step_seconds())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tempo_bpm.is_finite() || self.tempo_bpm <= 0.0 {
            return Err(EngineError::InvalidPattern(format!(
                "tempo must be positive, got {}",
                self.tempo_bpm
            )));
        }
        if self.steps.is_empty() {
            return Err(EngineError::InvalidPattern(
                "pattern must have at least one step".into(),
            ));
        }
        self.envelope.validate()?;
        for step in &self.steps {
            for tone in &step.tones {
                tone.validate()?;
            }
        }

        let note_seconds = self.note_seconds();
        if !note_seconds.is_finite() || note_seconds <= 0.0 {
            return Err(EngineError::InvalidPattern(format!(
                "note duration must be positive, got {note_seconds}"
            )));
        }
        if self.envelope.attack_seconds + self.envelope.release_seconds > note_seconds {
            return Err(EngineError::InvalidPattern(format!(
                "envelope ({} + {} s) is longer than the note ({note_seconds} s)",
                self.envelope.attack_seconds, self.envelope.release_seconds
            )));
        }
        Ok(())
    }
}
