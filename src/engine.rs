// src/engine.rs

use crate::clock::OutputDevice;
use crate::voice_pool::VoicePool;

/// Render side of the core.
///
/// This struct runs on the audio callback's cadence. It executes
/// decisions the control side already committed to (voices with fixed
/// start/stop clock times) and does no musical-time reasoning of its
/// own: once a voice is registered, its audible timing is honoured here
/// even if the control side stalls.
#[derive(Debug)]
pub struct RenderEngine {
    device: OutputDevice,
    pool: VoicePool,
}

impl RenderEngine {
    pub fn new(device: OutputDevice, pool: VoicePool) -> Self {
        Self { device, pool }
    }

    /// Render one block of mono samples.
    ///
    /// Mixes every live voice sample-accurately (scheduled starts and
    /// stops land on exact sample boundaries inside the block),
    /// advances the device clock, and forgets finished voices. While
    /// the device is suspended the output is silence and the clock
    /// does not move.
    pub fn process_block(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if out.is_empty() || !self.device.is_running() {
            return;
        }

        let block_start = self.device.now();
        let sample_rate = self.device.sample_rate();

        for voice in self.pool.iter_mut() {
            voice.render_into(out, block_start, sample_rate);
        }

        self.device.advance(out.len() as u64);
        self.pool.reap(self.device.now());
    }

    #[inline]
    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    #[inline]
    pub fn pool_mut(&mut self) -> &mut VoicePool {
        &mut self.pool
    }

    /// Number of voices the pool is tracking.
    pub fn live_voices(&self) -> usize {
        self.pool.len()
    }
}
