// src/clock.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Time in seconds on the output device's sample clock.
///
/// Values are only meaningful relative to the [`OutputDevice`] that
/// produced them. Never compare times across devices.
pub type ClockTime = f64;

/// Readiness of the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Constructed but not yet producing audio. Scheduling calls are
    /// rejected with a recoverable error until the device is resumed.
    Suspended,
    /// The clock is live and the render side is advancing it.
    Running,
}

/// Shared handle to the process-wide audio output clock.
///
/// This struct:
/// - is reference-counted; clones observe the same clock
/// - starts `Suspended` and must be explicitly resumed
/// - is advanced ONLY by the render side, once per rendered block
#[derive(Debug, Clone)]
pub struct OutputDevice {
    shared: Arc<SharedClock>,
}

#[derive(Debug)]
struct SharedClock {
    /// Absolute sample position, written by the render side.
    sample_pos: AtomicU64,

    /// Whether the device has been resumed.
    running: AtomicBool,

    /// Sample rate (Hz), fixed for the life of the device.
    sample_rate: f64,
}

impl OutputDevice {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            shared: Arc::new(SharedClock {
                sample_pos: AtomicU64::new(0),
                running: AtomicBool::new(false),
                sample_rate,
            }),
        }
    }

    /// Current clock position in seconds.
    ///
    /// Monotonically increasing while the device lives; never resets.
    #[inline]
    pub fn now(&self) -> ClockTime {
        self.shared.sample_pos.load(Ordering::Relaxed) as f64 / self.shared.sample_rate
    }

    /// Absolute sample position.
    #[inline]
    pub fn sample_position(&self) -> u64 {
        self.shared.sample_pos.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.shared.sample_rate
    }

    /// Bring the device out of the suspended state.
    ///
    /// Idempotent: resuming a running device is a no-op.
    pub fn resume(&self) {
        self.shared.running.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn state(&self) -> DeviceState {
        if self.shared.running.load(Ordering::Relaxed) {
            DeviceState::Running
        } else {
            DeviceState::Suspended
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == DeviceState::Running
    }

    /// Advance the clock by a number of rendered frames.
    ///
    /// Called once per block by the render side. Control-side code must
    /// never call this.
    pub(crate) fn advance(&self, frames: u64) {
        self.shared.sample_pos.fetch_add(frames, Ordering::Relaxed);
    }
}
