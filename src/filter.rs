// src/filter.rs
//
// Lowpass filter using State Variable Filter (SVF) topology.

/// Lowpass output of a state variable filter.
///
/// Used for band-limiting tone voices and for shaping the character of
/// noise beds (higher cutoff reads whiter, lower reads duller).
#[derive(Debug, Clone)]
pub struct LowpassFilter {
    cutoff: f32,
    resonance: f32,

    // Filter state
    ic1eq: f32,
    ic2eq: f32,

    // Cached coefficients
    g: f32,
    k: f32,
    a1: f32,
    a2: f32,
    a3: f32,

    sample_rate: f64,
}

impl LowpassFilter {
    pub fn new(cutoff_hz: f32, sample_rate: f64) -> Self {
        let mut filter = Self {
            cutoff: cutoff_hz,
            resonance: 0.5,
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.0,
            k: 0.0,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            sample_rate,
        };
        filter.recalc_coeffs();
        filter
    }

    fn recalc_coeffs(&mut self) {
        // Clamp cutoff below Nyquist
        let cutoff = self
            .cutoff
            .clamp(20.0, (self.sample_rate as f32 * 0.49).max(20.0));
        let resonance = self.resonance.clamp(0.0, 0.99);

        self.g = (std::f32::consts::PI * cutoff / self.sample_rate as f32).tan();
        self.k = 2.0 - 2.0 * resonance;
        self.a1 = 1.0 / (1.0 + self.g * (self.g + self.k));
        self.a2 = self.g * self.a1;
        self.a3 = self.g * self.a2;
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let v3 = input - self.ic2eq;
        let v1 = self.a1 * self.ic1eq + self.a2 * v3;
        let v2 = self.ic2eq + self.a2 * self.ic1eq + self.a3 * v3;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        v2
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
