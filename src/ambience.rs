// src/ambience.rs

use serde::{Deserialize, Serialize};

use crate::clock::ClockTime;
use crate::error::Result;
use crate::voice::VoiceId;
use crate::voice_factory::VoiceFactory;
use crate::voice_pool::VoicePool;

/// Background texture selection. The lowpass cutoff over the shared
/// noise source is what distinguishes the kinds: higher reads whiter,
/// lower reads duller and more muffled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmbienceKind {
    Off,
    Rain,
    Cafe,
    White,
}

impl AmbienceKind {
    /// Filter cutoff giving the kind its character. `None` for off.
    pub fn cutoff_hz(self) -> Option<f32> {
        match self {
            AmbienceKind::Off => None,
            AmbienceKind::Rain => Some(1_800.0),
            AmbienceKind::Cafe => Some(700.0),
            AmbienceKind::White => Some(9_000.0),
        }
    }
}

/// Manages the single continuous noise bed.
///
/// At most one bed is live per core. Any change of kind or volume
/// tears the old bed down (click-free ramp) and, if still audible,
/// creates a fresh one. Filter state is never mutated in place across
/// kind changes, so the old texture cannot bleed into the new.
#[derive(Debug)]
pub struct AmbienceController {
    kind: AmbienceKind,
    volume: f32,
    live: Option<VoiceId>,
}

impl Default for AmbienceController {
    fn default() -> Self {
        Self::new()
    }
}

impl AmbienceController {
    pub fn new() -> Self {
        Self {
            kind: AmbienceKind::Off,
            volume: 0.0,
            live: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> AmbienceKind {
        self.kind
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Id of the live bed, if one is sounding.
    pub fn live_voice(&self) -> Option<VoiceId> {
        self.live
    }

    /// Switch texture and/or volume.
    ///
    /// Volume 0 (or `Off`) tears the bed down. The replacement bed
    /// starts immediately while the old one ramps out, so the audible
    /// gap is bounded by the fade length.
    pub fn set(
        &mut self,
        kind: AmbienceKind,
        volume: f32,
        now: ClockTime,
        factory: &mut VoiceFactory,
        pool: &mut VoicePool,
    ) -> Result<()> {
        let volume = volume.clamp(0.0, 1.0);
        let silent = volume == 0.0 || kind == AmbienceKind::Off;

        if let Some(id) = self.live.take() {
            pool.release_one(id, now);
        }

        if silent {
            self.kind = AmbienceKind::Off;
            self.volume = 0.0;
            return Ok(());
        }

        let cutoff = kind
            .cutoff_hz()
            .expect("non-off ambience kinds always carry a cutoff");
        let bed = factory.create_noise_bed(cutoff, volume, now)?;
        self.live = pool.register(bed);
        if self.live.is_none() {
            log::warn!("voice pool refused the ambience bed; ambience stays silent");
        }
        self.kind = kind;
        self.volume = volume;
        Ok(())
    }

    /// Tear down the bed unconditionally (screen unmount, shutdown).
    pub fn clear(&mut self, now: ClockTime, pool: &mut VoicePool) {
        if let Some(id) = self.live.take() {
            pool.release_one(id, now);
        }
        self.kind = AmbienceKind::Off;
        self.volume = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (AmbienceController, VoiceFactory, VoicePool) {
        (
            AmbienceController::new(),
            VoiceFactory::new(48_000.0),
            VoicePool::default(),
        )
    }

    fn live_bed_count(pool: &VoicePool) -> usize {
        pool.iter()
            .filter(|v| v.is_noise() && !v.is_released())
            .count()
    }

    #[test]
    fn turning_on_creates_one_bed() {
        let (mut ambience, mut factory, mut pool) = setup();
        ambience
            .set(AmbienceKind::Rain, 0.6, 0.0, &mut factory, &mut pool)
            .unwrap();
        assert_eq!(live_bed_count(&pool), 1);
        assert_eq!(ambience.kind(), AmbienceKind::Rain);
    }

    #[test]
    fn switching_kind_never_leaves_two_active_beds() {
        let (mut ambience, mut factory, mut pool) = setup();
        ambience
            .set(AmbienceKind::Rain, 0.6, 0.0, &mut factory, &mut pool)
            .unwrap();
        ambience
            .set(AmbienceKind::White, 0.6, 1.0, &mut factory, &mut pool)
            .unwrap();

        // The old bed is ramping out; exactly one bed is active.
        assert_eq!(live_bed_count(&pool), 1);
        assert_eq!(pool.len(), 2);

        // The gap is bounded: the new bed starts at the switch time,
        // not after the old one finishes.
        let new_id = ambience.live_voice().unwrap();
        assert_eq!(pool.get(new_id).unwrap().start_time(), 1.0);
    }

    #[test]
    fn volume_zero_tears_down() {
        let (mut ambience, mut factory, mut pool) = setup();
        ambience
            .set(AmbienceKind::Cafe, 0.5, 0.0, &mut factory, &mut pool)
            .unwrap();
        ambience
            .set(AmbienceKind::Cafe, 0.0, 1.0, &mut factory, &mut pool)
            .unwrap();

        assert_eq!(ambience.kind(), AmbienceKind::Off);
        assert_eq!(live_bed_count(&pool), 0);
        assert!(ambience.live_voice().is_none());
    }

    #[test]
    fn off_kind_tears_down() {
        let (mut ambience, mut factory, mut pool) = setup();
        ambience
            .set(AmbienceKind::White, 0.8, 0.0, &mut factory, &mut pool)
            .unwrap();
        ambience
            .set(AmbienceKind::Off, 0.8, 0.5, &mut factory, &mut pool)
            .unwrap();
        assert_eq!(live_bed_count(&pool), 0);
    }

    #[test]
    fn out_of_range_volume_is_clamped() {
        let (mut ambience, mut factory, mut pool) = setup();
        ambience
            .set(AmbienceKind::Rain, 2.0, 0.0, &mut factory, &mut pool)
            .unwrap();
        assert_eq!(ambience.volume(), 1.0);
    }
}
