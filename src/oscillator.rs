// src/oscillator.rs

use crate::pattern::{Frequency, ToneSpec, Waveform};

/// Phase-accumulator generator for the basic waveform shapes.
///
/// Phase is kept in cycles [0, 1) and wrapped with `fract()`; stepped
/// frequency sequences are resolved from the time elapsed since the
/// first generated sample and cycle modulo their total length.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: Frequency,
    detune_ratio: f32,
    phase: f32,
    elapsed: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn from_spec(spec: &ToneSpec, sample_rate: f64) -> Self {
        Self {
            waveform: spec.waveform,
            frequency: spec.frequency.clone(),
            detune_ratio: 2.0_f32.powf(spec.detune_cents / 1200.0),
            phase: 0.0,
            elapsed: 0.0,
            sample_rate,
        }
    }

    /// Frequency at the current elapsed time, detune applied.
    #[inline]
    fn effective_freq(&self) -> f32 {
        let base = match &self.frequency {
            Frequency::Hz(hz) => *hz,
            Frequency::Sequence(steps) => {
                let total: f64 = steps.iter().map(|s| s.seconds as f64).sum();
                let mut offset = self.elapsed % total;
                let mut hz = steps[steps.len() - 1].hz;
                for step in steps {
                    if offset < step.seconds as f64 {
                        hz = step.hz;
                        break;
                    }
                    offset -= step.seconds as f64;
                }
                hz
            }
        };
        base * self.detune_ratio
    }

    /// Generate one sample and advance phase and elapsed time.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let inc = self.effective_freq() / self.sample_rate as f32;

        let sample = match self.waveform {
            Waveform::Sine => (self.phase * std::f32::consts::TAU).sin(),
            Waveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * self.phase - 1.0,
        };

        self.phase = (self.phase + inc).fract();
        self.elapsed += 1.0 / self.sample_rate;
        sample
    }
}
