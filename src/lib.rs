// src/lib.rs
//
// Real-time audio scheduling and synthesis core for the lesson screens.

mod ambience;
mod clock;
mod controller;
mod engine;
mod envelope;
mod error;
mod filter;
mod noise;
mod oscillator;
mod pattern;
mod scheduler;
mod visual;
mod voice;
mod voice_factory;
mod voice_pool;

// Re-export key types for consumers
pub use ambience::{AmbienceController, AmbienceKind};
pub use clock::{ClockTime, DeviceState, OutputDevice};
pub use controller::{AudioCore, CoreConfig};
pub use engine::RenderEngine;
pub use envelope::{GAIN_FLOOR, GainPhase, GainShaper, STOP_GUARD};
pub use error::{EngineError, Result};
pub use filter::LowpassFilter;
pub use noise::{NoiseBed, NoiseConfig};
pub use oscillator::Oscillator;
pub use pattern::{
    EnvelopeSpec, FilterSpec, Frequency, FrequencyStep, Pattern, PatternStep, ToneSpec, Waveform,
};
pub use scheduler::{LookaheadScheduler, SchedulerConfig, SchedulerState, VisualTrigger};
pub use visual::loop_progress;
pub use voice::{Voice, VoiceId, VoiceOwner};
pub use voice_factory::{AMBIENCE_FADE, VoiceFactory};
pub use voice_pool::{DEFAULT_MAX_VOICES, VoicePool};
