// src/scheduler.rs
//
// Lookahead scheduling of pattern events.
//
// The scheduler runs on the control side, typically once per animation
// frame. It materializes upcoming events slightly ahead of the device
// clock so that audible timing never depends on how regularly it is
// invoked; only the decision of WHICH events to queue next does, and
// the lookahead horizon exists to tolerate stalls there.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::clock::ClockTime;
use crate::error::Result;
use crate::pattern::Pattern;
use crate::visual;
use crate::voice::VoiceOwner;
use crate::voice_factory::VoiceFactory;
use crate::voice_pool::VoicePool;

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
    Running,
}

/// Timing tunables for the two-horizon design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Lead between `start()` and the first audible event, absorbing
    /// thread-scheduling jitter around the start call.
    pub start_latency: f64,
    /// How far ahead of the clock events are materialized.
    pub lookahead: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            start_latency: 0.05,
            lookahead: 0.1,
        }
    }
}

/// A visual callback waiting for its sound to become audible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualTrigger {
    pub step: usize,
    pub due: ClockTime,
}

/// Schedules pattern events against the device clock.
///
/// This struct:
/// - lives ONLY on the control side
/// - materializes events in strictly increasing clock order
/// - never blocks; stop is a state transition plus pool release
#[derive(Debug)]
pub struct LookaheadScheduler {
    config: SchedulerConfig,
    state: SchedulerState,
    pattern: Option<Pattern>,

    /// Owner tag for the active pattern's voices; bumped on each start
    /// so a re-arm can never release the wrong generation.
    pattern_serial: u64,

    next_event_time: ClockTime,
    current_step: usize,
    loop_start_time: ClockTime,

    /// Triggers queued at schedule time, drained when audible.
    pending_triggers: VecDeque<VisualTrigger>,
}

impl LookaheadScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: SchedulerState::Idle,
            pattern: None,
            pattern_serial: 0,
            next_event_time: 0.0,
            current_step: 0,
            loop_start_time: 0.0,
            pending_triggers: VecDeque::with_capacity(16),
        }
    }

    #[inline]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Owner tag of the active pattern's voices.
    pub fn owner(&self) -> VoiceOwner {
        VoiceOwner::Pattern(self.pattern_serial)
    }

    /// Validate and arm a pattern.
    ///
    /// Atomic: an invalid pattern leaves all state untouched. When a
    /// pattern is already running, its live voices are released before
    /// the new one is armed; overlapping pattern instances are
    /// disallowed.
    pub fn start(&mut self, pattern: Pattern, now: ClockTime, pool: &mut VoicePool) -> Result<()> {
        pattern.validate()?;

        if self.state == SchedulerState::Running {
            self.quiesce(now, pool);
        }

        self.state = SchedulerState::Armed;
        self.pattern_serial += 1;
        self.loop_start_time = now + self.config.start_latency;
        self.next_event_time = self.loop_start_time;
        self.current_step = 0;
        self.pattern = Some(pattern);
        self.state = SchedulerState::Running;
        Ok(())
    }

    /// Stop scheduling and release every live voice of the pattern.
    ///
    /// Idempotent: a second stop finds the scheduler Idle and the pool
    /// already released, and changes nothing.
    pub fn stop(&mut self, now: ClockTime, pool: &mut VoicePool) {
        self.quiesce(now, pool);
        self.state = SchedulerState::Idle;
        self.pattern = None;
        self.current_step = 0;
        self.next_event_time = 0.0;
        self.loop_start_time = 0.0;
    }

    fn quiesce(&mut self, now: ClockTime, pool: &mut VoicePool) {
        self.pending_triggers.clear();
        pool.release_owner(self.owner(), now);
    }

    /// The lookahead loop. Call once per animation frame.
    ///
    /// Materializes every event inside `[now, now + lookahead)` and
    /// queues its visual trigger. Cheap when there is nothing to do.
    pub fn pump(&mut self, now: ClockTime, factory: &mut VoiceFactory, pool: &mut VoicePool) {
        if self.state != SchedulerState::Running {
            return;
        }
        let Some(pattern) = &self.pattern else {
            return;
        };

        let step_seconds = pattern.step_seconds();
        let total_steps = pattern.total_steps();
        let note_seconds = pattern.note_seconds();
        let owner = VoiceOwner::Pattern(self.pattern_serial);

        // A caller stalled for longer than the lookahead window must
        // not flush the backlog as a burst: jump to the next future
        // step boundary on the original grid and drop what was missed.
        if now - self.next_event_time > self.config.lookahead {
            let missed = ((now - self.next_event_time) / step_seconds).ceil() as u64;
            self.next_event_time += missed as f64 * step_seconds;
            self.current_step = (self.current_step + missed as usize) % total_steps;
            log::debug!("scheduler stalled; skipped {missed} step(s)");
        }

        while self.next_event_time < now + self.config.lookahead {
            let step = &pattern.steps[self.current_step];
            for tone in &step.tones {
                match factory.create_tone(
                    tone,
                    &pattern.envelope,
                    self.next_event_time,
                    self.next_event_time + note_seconds,
                    owner,
                ) {
                    Ok(voice) => {
                        pool.register(voice);
                    }
                    Err(e) => log::warn!("skipping unplayable tone: {e}"),
                }
            }

            self.pending_triggers.push_back(VisualTrigger {
                step: self.current_step,
                due: self.next_event_time,
            });

            self.next_event_time += step_seconds;
            self.current_step = (self.current_step + 1) % total_steps;
        }
    }

    /// Deliver visual triggers whose sound is now audible.
    pub fn drain_triggers(&mut self, now: ClockTime, mut deliver: impl FnMut(usize)) {
        while let Some(&trigger) = self.pending_triggers.front() {
            if trigger.due > now {
                break;
            }
            self.pending_triggers.pop_front();
            deliver(trigger.step);
        }
    }

    /// Normalized position inside the active loop, for presentational
    /// animation. 0 while idle or before the first event.
    pub fn progress(&self, now: ClockTime) -> f64 {
        let Some(pattern) = &self.pattern else {
            return 0.0;
        };
        if self.state != SchedulerState::Running {
            return 0.0;
        }
        visual::loop_progress(now, self.loop_start_time, pattern.loop_seconds())
    }

    #[inline]
    pub fn next_event_time(&self) -> ClockTime {
        self.next_event_time
    }

    #[inline]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    #[inline]
    pub fn loop_start_time(&self) -> ClockTime {
        self.loop_start_time
    }

    pub fn pending_trigger_count(&self) -> usize {
        self.pending_triggers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{PatternStep, ToneSpec};

    fn four_step_pattern(tempo: f64) -> Pattern {
        Pattern::new(
            tempo,
            vec![
                PatternStep::tone(ToneSpec::sine(261.63)),
                PatternStep::tone(ToneSpec::sine(329.63)),
                PatternStep::tone(ToneSpec::sine(392.0)),
                PatternStep::tone(ToneSpec::sine(523.25)),
            ],
        )
    }

    fn scheduler() -> (LookaheadScheduler, VoiceFactory, VoicePool) {
        (
            LookaheadScheduler::new(SchedulerConfig::default()),
            VoiceFactory::new(48_000.0),
            VoicePool::default(),
        )
    }

    #[test]
    fn start_rejects_invalid_patterns_without_state_change() {
        let (mut scheduler, _, mut pool) = scheduler();
        let bad = Pattern::new(0.0, vec![PatternStep::rest()]);
        assert!(scheduler.start(bad, 0.0, &mut pool).is_err());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn concrete_scenario_100_bpm() {
        // 4 steps at 100 BPM (0.6 s/step), 50 ms start latency:
        // starts at {0.05, 0.65, 1.25, 1.85}, looping at ~2.45.
        let (mut scheduler, mut factory, mut pool) = scheduler();
        scheduler
            .start(four_step_pattern(100.0), 0.0, &mut pool)
            .unwrap();

        let mut starts = Vec::new();
        let mut now = 0.0;
        while now < 2.5 {
            let before = pool.len();
            scheduler.pump(now, &mut factory, &mut pool);
            for voice in pool.iter().skip(before) {
                starts.push(voice.start_time());
            }
            pool.reap(now);
            now += 0.016;
        }

        let expected = [0.05, 0.65, 1.25, 1.85, 2.45];
        for (i, want) in expected.iter().enumerate() {
            assert!(
                (starts[i] - want).abs() < 1e-9,
                "event {i}: got {}, want {want}",
                starts[i]
            );
        }
    }

    #[test]
    fn no_drift_over_many_loops() {
        let (mut scheduler, mut factory, mut pool) = scheduler();
        let pattern = four_step_pattern(120.0);
        let step = pattern.step_seconds();
        scheduler.start(pattern, 0.0, &mut pool).unwrap();

        // Simulate 1000 steps of pumping; next_event_time must stay on
        // the analytic grid.
        let mut now = 0.0;
        let mut scheduled = 0u64;
        while scheduled < 1_000 {
            scheduler.pump(now, &mut factory, &mut pool);
            pool.release_all(now);
            pool.reap(now + 10.0);
            scheduled = ((scheduler.next_event_time() - 0.05) / step).round() as u64;
            now += step;
        }

        let predicted = 0.05 + scheduled as f64 * step;
        assert!((scheduler.next_event_time() - predicted).abs() < 1e-9);
    }

    #[test]
    fn events_are_strictly_ordered() {
        let (mut scheduler, mut factory, mut pool) = scheduler();
        scheduler
            .start(four_step_pattern(240.0), 0.0, &mut pool)
            .unwrap();

        let mut now = 0.0;
        let mut last_start = f64::NEG_INFINITY;
        for _ in 0..50 {
            let before = pool.len();
            scheduler.pump(now, &mut factory, &mut pool);
            for voice in pool.iter().skip(before) {
                assert!(voice.start_time() > last_start);
                last_start = voice.start_time();
            }
            pool.release_all(now);
            pool.reap(now + 10.0);
            now += 0.05;
        }
    }

    #[test]
    fn stall_fast_forwards_to_the_next_boundary() {
        let (mut scheduler, mut factory, mut pool) = scheduler();
        let pattern = four_step_pattern(120.0); // 0.5 s/step
        scheduler.start(pattern, 0.0, &mut pool).unwrap();
        scheduler.pump(0.0, &mut factory, &mut pool);

        // Stall for 3.3 s, far beyond the 100 ms lookahead.
        let resume_at = 3.3;
        scheduler.pump(resume_at, &mut factory, &mut pool);

        // next_event_time must be a future grid point, not a backlog.
        assert!(scheduler.next_event_time() + 1e-9 >= resume_at);
        let offset = (scheduler.next_event_time() - 0.05) / 0.5;
        assert!((offset - offset.round()).abs() < 1e-9, "off-grid: {offset}");

        // No burst: the voices registered at resume fit the lookahead
        // window, not the whole missed span.
        let late_voices = pool
            .iter()
            .filter(|v| v.start_time() >= resume_at)
            .count();
        assert!(late_voices <= 2);
    }

    #[test]
    fn stop_twice_matches_stop_once() {
        let (mut scheduler, mut factory, mut pool) = scheduler();
        scheduler
            .start(four_step_pattern(120.0), 0.0, &mut pool)
            .unwrap();
        scheduler.pump(0.0, &mut factory, &mut pool);

        scheduler.stop(0.2, &mut pool);
        let state_once = scheduler.state();
        let stops: Vec<_> = pool.iter().map(|v| v.stop_time()).collect();

        scheduler.stop(0.25, &mut pool);
        assert_eq!(scheduler.state(), state_once);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        let stops_again: Vec<_> = pool.iter().map(|v| v.stop_time()).collect();
        assert_eq!(stops, stops_again);
        assert_eq!(scheduler.progress(0.3), 0.0);
        assert_eq!(scheduler.pending_trigger_count(), 0);
    }

    #[test]
    fn restart_releases_the_previous_pattern() {
        let (mut scheduler, mut factory, mut pool) = scheduler();
        scheduler
            .start(four_step_pattern(60.0), 0.0, &mut pool)
            .unwrap();
        scheduler.pump(0.0, &mut factory, &mut pool);
        let first_owner = scheduler.owner();

        scheduler
            .start(four_step_pattern(120.0), 0.2, &mut pool)
            .unwrap();
        assert_ne!(scheduler.owner(), first_owner);

        // Every voice of the first pattern is releasing.
        assert!(
            pool.iter()
                .filter(|v| v.owner() == first_owner)
                .all(|v| v.is_released())
        );
    }

    #[test]
    fn visual_triggers_fire_when_audible() {
        let (mut scheduler, mut factory, mut pool) = scheduler();
        scheduler
            .start(four_step_pattern(120.0), 0.0, &mut pool)
            .unwrap();

        // Everything within the lookahead is scheduled immediately, but
        // nothing is delivered before its due time.
        scheduler.pump(0.0, &mut factory, &mut pool);
        let mut fired = Vec::new();
        scheduler.drain_triggers(0.0, |step| fired.push(step));
        assert!(fired.is_empty());

        scheduler.drain_triggers(0.06, |step| fired.push(step));
        assert_eq!(fired, vec![0]);
    }
}
