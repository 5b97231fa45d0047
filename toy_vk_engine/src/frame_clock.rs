//! Frame clock: fixed-step ticks, FPS and uptime
//!
//! Threaded through the main loop as a plain value. `advance` is called once
//! per rendered frame and reports how many fixed simulation ticks elapsed.

use std::time::{Duration, Instant};

/// Default simulation rate
pub const DEFAULT_TICKS_PER_SECOND: u32 = 60;

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Result of one `FrameClock::advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockStep {
    /// Fixed ticks to simulate before drawing this frame
    pub ticks: u32,
    /// A one-second FPS window closed during this step
    pub second_elapsed: bool,
}

#[derive(Debug, Clone)]
pub struct FrameClock {
    tick_duration: Duration,
    max_ticks_per_step: u32,
    last: Instant,
    accumulator: Duration,
    second_timer: Duration,
    frames_this_second: u32,
    fps: u32,
    uptime_seconds: u64,
    total_frames: u64,
    total_ticks: u64,
}

impl FrameClock {
    pub fn new(ticks_per_second: u32, now: Instant) -> Self {
        let ticks_per_second = ticks_per_second.max(1);
        Self {
            tick_duration: Duration::from_nanos(1_000_000_000 / ticks_per_second as u64),
            max_ticks_per_step: ticks_per_second,
            last: now,
            accumulator: Duration::ZERO,
            second_timer: Duration::ZERO,
            frames_this_second: 0,
            fps: 0,
            uptime_seconds: 0,
            total_frames: 0,
            total_ticks: 0,
        }
    }

    /// Account for one rendered frame at time `now`
    ///
    /// At most one second worth of ticks is reported per step; the excess
    /// is dropped after a long stall.
    pub fn advance(&mut self, now: Instant) -> ClockStep {
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;

        self.accumulator += elapsed;
        let due = (self.accumulator.as_nanos() / self.tick_duration.as_nanos()) as u64;
        let ticks = due.min(self.max_ticks_per_step as u64) as u32;
        if due > ticks as u64 {
            self.accumulator = Duration::ZERO;
        } else {
            self.accumulator -= self.tick_duration * ticks;
        }
        self.total_ticks += ticks as u64;

        self.total_frames += 1;
        self.frames_this_second += 1;
        self.second_timer += elapsed;

        let mut second_elapsed = false;
        while self.second_timer >= ONE_SECOND {
            self.second_timer -= ONE_SECOND;
            self.uptime_seconds += 1;
            self.fps = self.frames_this_second;
            self.frames_this_second = 0;
            second_elapsed = true;
        }

        ClockStep { ticks, second_elapsed }
    }

    /// Frames rendered during the last complete second
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.uptime_seconds
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}

#[cfg(test)]
#[path = "frame_clock_tests.rs"]
mod tests;
