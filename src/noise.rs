// src/noise.rs
//
// Colored-noise beds for ambience (rain/cafe/white).

use serde::{Deserialize, Serialize};

use crate::filter::LowpassFilter;

/// Tunables for noise-bed generation.
///
/// `makeup_gain` compensates for the leaky integrator's low-pass
/// attenuation; it is a perceptual-loudness parameter, not a derived
/// constant, so it lives in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Leak amount of the integrator; larger values correlate samples
    /// more strongly.
    pub integrator_k: f32,
    /// Gain applied after integration.
    pub makeup_gain: f32,
    /// Length of the generated buffer. Generated once per activation
    /// and looped, never regenerated per iteration.
    pub loop_seconds: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            integrator_k: 0.15,
            makeup_gain: 3.5,
            loop_seconds: 2.0,
        }
    }
}

/// Linear congruential generator for noise samples.
#[derive(Debug, Clone)]
struct Lcg {
    state: u32,
}

impl Lcg {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Uniform sample in [-1, 1).
    #[inline]
    fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / 2_147_483_648.0 - 1.0
    }
}

/// A looped buffer of correlated random samples, played through a
/// lowpass whose cutoff sets the white/rain/cafe character.
#[derive(Debug, Clone)]
pub struct NoiseBed {
    buffer: Vec<f32>,
    pos: usize,
    filter: LowpassFilter,
}

impl NoiseBed {
    /// Generate the bed buffer once.
    ///
    /// Correlation comes from a single-pole leaky integrator:
    /// `out[i] = (out[i-1] + k * rand[i]) / (1 + k)`.
    pub fn generate(config: &NoiseConfig, cutoff_hz: f32, sample_rate: f64, seed: u32) -> Self {
        let len = ((config.loop_seconds * sample_rate) as usize).max(1);
        let mut rng = Lcg::new(seed);
        let mut buffer = Vec::with_capacity(len);

        let k = config.integrator_k;
        let mut last = 0.0_f32;
        for _ in 0..len {
            last = (last + k * rng.next_f32()) / (1.0 + k);
            buffer.push((last * config.makeup_gain).clamp(-1.0, 1.0));
        }

        Self {
            buffer,
            pos: 0,
            filter: LowpassFilter::new(cutoff_hz, sample_rate),
        }
    }

    /// Next looped, filtered sample.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let raw = self.buffer[self.pos];
        self.pos = (self.pos + 1) % self.buffer.len();
        self.filter.process_sample(raw)
    }

    pub fn loop_len(&self) -> usize {
        self.buffer.len()
    }
}
