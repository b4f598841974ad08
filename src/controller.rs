// src/controller.rs
//
// The narrow surface lesson screens talk to.
//
// An `AudioCore` is driven by two external cadences:
// - `frame()` from the host's animation loop (scheduling decisions,
//   visual triggers)
// - `render()` from the host's audio callback (sample-accurate mixing,
//   clock advance)
//
// Neither call blocks; start/stop/ambience changes are synchronous
// state transitions plus pool releases.

use serde::{Deserialize, Serialize};

use crate::ambience::{AmbienceController, AmbienceKind};
use crate::clock::OutputDevice;
use crate::engine::RenderEngine;
use crate::error::{EngineError, Result};
use crate::noise::NoiseConfig;
use crate::pattern::Pattern;
use crate::scheduler::{LookaheadScheduler, SchedulerConfig};
use crate::voice_factory::VoiceFactory;
use crate::voice_pool::{DEFAULT_MAX_VOICES, VoicePool};

/// Top-level tunables for one core instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub scheduler: SchedulerConfig,
    pub noise: NoiseConfig,
    pub max_voices: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            noise: NoiseConfig::default(),
            max_voices: DEFAULT_MAX_VOICES,
        }
    }
}

/// The audio core behind every lesson screen.
///
/// Owns the output device, the voice pool (via the render engine), the
/// lookahead scheduler and the ambience controller. One core exists
/// per application; screens configure patterns and poll progress.
pub struct AudioCore {
    device: OutputDevice,
    factory: VoiceFactory,
    engine: RenderEngine,
    scheduler: LookaheadScheduler,
    ambience: AmbienceController,
    visual_callback: Option<Box<dyn FnMut(usize) + Send>>,
}

impl AudioCore {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_config(sample_rate, CoreConfig::default())
    }

    pub fn with_config(sample_rate: f64, config: CoreConfig) -> Self {
        let device = OutputDevice::new(sample_rate);
        let pool = VoicePool::new(config.max_voices.max(1));
        Self {
            factory: VoiceFactory::with_noise_config(sample_rate, config.noise),
            engine: RenderEngine::new(device.clone(), pool),
            scheduler: LookaheadScheduler::new(config.scheduler),
            ambience: AmbienceController::new(),
            device,
            visual_callback: None,
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Device readiness
    // ───────────────────────────────────────────────────────────────

    /// Bring the device out of the suspended state. Idempotent; call
    /// from a user gesture before the first scheduling request.
    pub fn resume(&mut self) {
        self.device.resume();
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.device.is_running()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.device.is_running() {
            Ok(())
        } else {
            Err(EngineError::DeviceSuspended)
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Pattern surface
    // ───────────────────────────────────────────────────────────────

    /// Validate and start a pattern.
    ///
    /// A running pattern is quiesced first; on error no state changes.
    pub fn start_pattern(&mut self, pattern: Pattern) -> Result<()> {
        self.ensure_running()?;
        let now = self.device.now();
        self.scheduler.start(pattern, now, self.engine.pool_mut())
    }

    /// Stop the running pattern and release its voices. Idempotent.
    pub fn stop_pattern(&mut self) {
        let now = self.device.now();
        self.scheduler.stop(now, self.engine.pool_mut());
    }

    // ───────────────────────────────────────────────────────────────
    // Ambience surface
    // ───────────────────────────────────────────────────────────────

    /// Select the background texture. Volume 0 or `Off` tears it down.
    pub fn set_ambience(&mut self, kind: AmbienceKind, volume: f32) -> Result<()> {
        self.ensure_running()?;
        let now = self.device.now();
        self.ambience
            .set(kind, volume, now, &mut self.factory, self.engine.pool_mut())
    }

    pub fn ambience_kind(&self) -> AmbienceKind {
        self.ambience.kind()
    }

    // ───────────────────────────────────────────────────────────────
    // Visual synchronization
    // ───────────────────────────────────────────────────────────────

    /// Register the per-event visual callback. Invoked with the step
    /// index once each scheduled event becomes audible.
    pub fn on_visual_trigger(&mut self, callback: impl FnMut(usize) + Send + 'static) {
        self.visual_callback = Some(Box::new(callback));
    }

    /// Normalized position in the active loop for a progress
    /// indicator. Pure read; poll once per animation frame.
    pub fn progress(&self) -> f64 {
        self.scheduler.progress(self.device.now())
    }

    // ───────────────────────────────────────────────────────────────
    // Cadence entry points
    // ───────────────────────────────────────────────────────────────

    /// Control-side tick. Call once per animation frame.
    pub fn frame(&mut self) {
        let now = self.device.now();
        self.scheduler
            .pump(now, &mut self.factory, self.engine.pool_mut());

        match &mut self.visual_callback {
            Some(callback) => self.scheduler.drain_triggers(now, callback),
            // Keep the queue bounded even when nobody listens.
            None => self.scheduler.drain_triggers(now, |_| {}),
        }
    }

    /// Render-side tick. Call from the audio callback with the block
    /// to fill.
    pub fn render(&mut self, out: &mut [f32]) {
        self.engine.process_block(out);
    }

    // ───────────────────────────────────────────────────────────────
    // Teardown
    // ───────────────────────────────────────────────────────────────

    /// Quiesce everything (screen unmount, application shutdown): stop
    /// the pattern, drop the ambience bed, release any stragglers. The
    /// device itself stays alive until the core is dropped.
    pub fn shutdown(&mut self) {
        let now = self.device.now();
        self.scheduler.stop(now, self.engine.pool_mut());
        self.ambience.clear(now, self.engine.pool_mut());
        self.engine.pool_mut().release_all(now);
    }

    // ───────────────────────────────────────────────────────────────
    // Introspection
    // ───────────────────────────────────────────────────────────────

    pub fn device(&self) -> &OutputDevice {
        &self.device
    }

    pub fn live_voices(&self) -> usize {
        self.engine.live_voices()
    }

    pub fn is_pattern_running(&self) -> bool {
        self.scheduler.is_running()
    }
}

impl std::fmt::Debug for AudioCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCore")
            .field("device", &self.device)
            .field("live_voices", &self.live_voices())
            .field("pattern_running", &self.is_pattern_running())
            .finish()
    }
}
