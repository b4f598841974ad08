// src/envelope.rs
//
// Amplitude control for voices.
//
// The shaper evaluates gain as a function of clock time rather than
// stepping per-sample state: voices carry their scheduled start/stop
// times, so the whole trajectory is known (or re-known, after an early
// release) up front.

use crate::clock::ClockTime;
use crate::pattern::EnvelopeSpec;

/// Smallest gain a ramp ever targets while a generator is live. Ramping
/// to exactly zero and cutting there is audible; the hard stop happens
/// only after the floor is reached.
pub const GAIN_FLOOR: f32 = 0.001;

/// Delay between the gain reaching the floor and the generator's hard
/// stop. Invariant: `stop_time() >= floor_time()` for every voice.
pub const STOP_GUARD: f64 = 0.005;

/// Phase of the gain trajectory at a queried time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainPhase {
    Pending,
    Attack,
    Sustain,
    Release,
    Floored,
}

/// Attack/sustain/release gain trajectory for one voice.
///
/// - linear attack from 0 to the sustain plateau (no discontinuity at
///   the attack/sustain boundary)
/// - exponential release from the level at release start down to
///   [`GAIN_FLOOR`]
/// - monotonic within each phase, no overshoot
#[derive(Debug, Clone)]
pub struct GainShaper {
    attack: f64,
    release: f64,
    /// Plateau level: sustain_level scaled by the voice's peak volume.
    plateau: f32,
    start: ClockTime,
    /// When the release ramp begins. Natural position is
    /// `scheduled_stop - release`; an early release moves it earlier.
    release_start: ClockTime,
    /// Level captured at release start; the exponential decays from here.
    release_from: f32,
}

impl GainShaper {
    /// Build the trajectory for a voice sounding in `[start, stop)`.
    ///
    /// `stop` may be `f64::INFINITY` for voices that sound until
    /// explicitly released (ambience beds).
    pub fn new(spec: &EnvelopeSpec, start: ClockTime, stop: ClockTime, peak: f32) -> Self {
        let release_start = stop - spec.release_seconds;
        let mut shaper = Self {
            attack: spec.attack_seconds,
            release: spec.release_seconds,
            plateau: spec.sustain_level * peak,
            start,
            release_start,
            release_from: 0.0,
        };
        shaper.release_from = shaper.level_before_release(release_start);
        shaper
    }

    /// Level the pre-release part of the curve has at `t`.
    fn level_before_release(&self, t: ClockTime) -> f32 {
        if t <= self.start {
            return 0.0;
        }
        let dt = t - self.start;
        if dt < self.attack {
            self.plateau * (dt / self.attack) as f32
        } else {
            self.plateau
        }
    }

    /// Gain at clock time `t`.
    #[inline]
    pub fn gain_at(&self, t: ClockTime) -> f32 {
        if t < self.start {
            return 0.0;
        }
        if t < self.release_start {
            return self.level_before_release(t);
        }

        let te = t - self.release_start;
        if te >= self.release || self.release_from <= GAIN_FLOOR {
            return GAIN_FLOOR;
        }
        let ratio = GAIN_FLOOR / self.release_from;
        self.release_from * ratio.powf((te / self.release) as f32)
    }

    pub fn phase_at(&self, t: ClockTime) -> GainPhase {
        if t < self.start {
            GainPhase::Pending
        } else if t < self.release_start {
            if t - self.start < self.attack {
                GainPhase::Attack
            } else {
                GainPhase::Sustain
            }
        } else if t - self.release_start < self.release {
            GainPhase::Release
        } else {
            GainPhase::Floored
        }
    }

    /// Re-target the release ramp to begin at `at`, decaying from
    /// whatever level the curve has there. No-op if the release has
    /// already begun.
    pub fn release_now(&mut self, at: ClockTime) {
        if at >= self.release_start {
            return;
        }
        self.release_from = self.level_before_release(at);
        self.release_start = at;
    }

    /// When the gain reaches the floor.
    #[inline]
    pub fn floor_time(&self) -> ClockTime {
        self.release_start + self.release
    }

    /// When the generator may be hard-stopped. Always after the floor.
    #[inline]
    pub fn stop_time(&self) -> ClockTime {
        self.floor_time() + STOP_GUARD
    }

    #[inline]
    pub fn release_start(&self) -> ClockTime {
        self.release_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> EnvelopeSpec {
        EnvelopeSpec {
            attack_seconds: 0.1,
            sustain_level: 0.8,
            release_seconds: 0.2,
        }
    }

    #[test]
    fn attack_ramps_monotonically_to_plateau() {
        let shaper = GainShaper::new(&spec(), 1.0, 3.0, 1.0);
        let mut last = -1.0;
        for i in 0..=100 {
            let t = 1.0 + 0.001 * i as f64;
            let g = shaper.gain_at(t);
            assert!(g >= last);
            last = g;
        }
        assert!((shaper.gain_at(1.1) - 0.8).abs() < 1e-3);
        assert_eq!(shaper.gain_at(0.5), 0.0);
    }

    #[test]
    fn release_decays_to_floor_by_floor_time() {
        let shaper = GainShaper::new(&spec(), 0.0, 2.0, 1.0);
        assert_eq!(shaper.release_start(), 1.8);
        assert!((shaper.gain_at(shaper.floor_time()) - GAIN_FLOOR).abs() < 1e-6);

        // Monotonically decreasing through the release.
        let mut last = f32::MAX;
        for i in 0..=200 {
            let t = 1.8 + 0.001 * i as f64;
            let g = shaper.gain_at(t);
            assert!(g <= last);
            last = g;
        }
    }

    #[test]
    fn stop_is_always_after_floor() {
        let shaper = GainShaper::new(&spec(), 0.0, 2.0, 1.0);
        assert!(shaper.stop_time() >= shaper.floor_time());

        let mut early = GainShaper::new(&spec(), 0.0, 2.0, 1.0);
        early.release_now(0.3);
        assert!(early.stop_time() >= early.floor_time());
    }

    #[test]
    fn early_release_moves_the_stop_forward() {
        let mut shaper = GainShaper::new(&spec(), 0.0, 2.0, 1.0);
        shaper.release_now(0.3);
        assert_eq!(shaper.release_start(), 0.3);
        assert!((shaper.floor_time() - 0.5).abs() < 1e-12);
        // Decays from the sustain plateau it had reached at 0.3.
        assert!((shaper.gain_at(0.3) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn release_during_attack_captures_partial_level() {
        let mut shaper = GainShaper::new(&spec(), 0.0, 2.0, 1.0);
        shaper.release_now(0.05);
        // Attack was halfway to the 0.8 plateau.
        assert!((shaper.gain_at(0.05) - 0.4).abs() < 1e-3);
    }

    #[test]
    fn release_now_is_a_no_op_once_releasing() {
        let mut shaper = GainShaper::new(&spec(), 0.0, 2.0, 1.0);
        shaper.release_now(0.3);
        shaper.release_now(0.6);
        assert_eq!(shaper.release_start(), 0.3);
    }

    #[test]
    fn unbounded_voice_sustains_until_released() {
        let shaper = GainShaper::new(&spec(), 0.0, f64::INFINITY, 0.5);
        assert!((shaper.gain_at(1_000.0) - 0.4).abs() < 1e-6);
        assert_eq!(shaper.phase_at(1_000.0), GainPhase::Sustain);

        let mut released = shaper.clone();
        released.release_now(10.0);
        assert!(released.stop_time().is_finite());
    }
}
