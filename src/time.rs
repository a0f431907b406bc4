//! Frame clock.
//!
//! The clock is the tick source for the whole experience. Each call to
//! [`Clock::tick`] (real time) or [`Clock::advance`] (manual stepping)
//! produces a [`Tick`] and emits it on [`Clock::on_tick`].
//!
//! Times are in milliseconds, matching what the crystal's hover and clip
//! mixer expect. The master timeline runs in seconds; see [`Tick::seconds`].
//!
//! # Example
//!
//! ```ignore
//! use crystalfx::time::Clock;
//!
//! let mut clock = Clock::new();
//! let listener = clock.on_tick.subscribe();
//!
//! // In your frame loop:
//! clock.tick();
//! for tick in clock.on_tick.drain(listener) {
//!     println!("Elapsed: {:.2}ms, delta: {:.2}ms", tick.elapsed_ms, tick.delta_ms);
//! }
//! ```

use std::time::Instant;

use crate::signal::Signal;

/// Clock time each frame-rate sample spans.
const FPS_WINDOW_MS: f32 = 500.0;

/// One frame's worth of timing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tick {
    /// Milliseconds since the clock started.
    pub elapsed_ms: f32,
    /// Milliseconds since the previous tick.
    pub delta_ms: f32,
    /// Frames since the clock started, counting this one.
    pub frame: u64,
}

impl Tick {
    /// Elapsed time in seconds, the unit of the master timeline.
    #[inline]
    pub fn seconds(&self) -> f32 {
        self.elapsed_ms * 0.001
    }
}

/// Time tracking for the frame loop.
#[derive(Debug)]
pub struct Clock {
    /// When the clock was created.
    start: Instant,
    /// When the last frame occurred.
    last_frame: Instant,
    elapsed_ms: f32,
    delta_ms: f32,
    frame_count: u64,
    /// Frame rate over the last completed window.
    fps: f32,
    fps_frames: u32,
    fps_window_ms: f32,
    /// Emitted once per tick.
    pub on_tick: Signal<Tick>,
}

impl Clock {
    /// Create a clock starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            elapsed_ms: 0.0,
            delta_ms: 16.0,
            frame_count: 0,
            fps: 0.0,
            fps_frames: 0,
            fps_window_ms: 0.0,
            on_tick: Signal::new(),
        }
    }

    /// Measure real time since the last frame and emit a tick.
    pub fn tick(&mut self) -> Tick {
        let now = Instant::now();
        let delta_ms = now.duration_since(self.last_frame).as_secs_f32() * 1000.0;
        self.last_frame = now;
        self.elapsed_ms = now.duration_since(self.start).as_secs_f32() * 1000.0;
        self.record(delta_ms);
        self.emit()
    }

    /// Step the clock by `delta_ms` without looking at the wall clock.
    pub fn advance(&mut self, delta_ms: f32) -> Tick {
        let delta_ms = delta_ms.max(0.0);
        self.elapsed_ms += delta_ms;
        self.record(delta_ms);
        self.emit()
    }

    fn record(&mut self, delta_ms: f32) {
        self.delta_ms = delta_ms;
        self.frame_count += 1;

        self.fps_frames += 1;
        self.fps_window_ms += delta_ms;
        if self.fps_window_ms >= FPS_WINDOW_MS {
            self.fps = self.fps_frames as f32 * 1000.0 / self.fps_window_ms;
            self.fps_frames = 0;
            self.fps_window_ms = 0.0;
        }
    }

    fn emit(&mut self) -> Tick {
        let tick = self.current();
        self.on_tick.emit(tick);
        tick
    }

    /// The most recent tick's values.
    pub fn current(&self) -> Tick {
        Tick {
            elapsed_ms: self.elapsed_ms,
            delta_ms: self.delta_ms,
            frame: self.frame_count,
        }
    }

    #[inline]
    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed_ms
    }

    #[inline]
    pub fn delta_ms(&self) -> f32 {
        self.delta_ms
    }

    /// Total frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, measured over windows of clock time. Zero until
    /// the first window completes.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_clock_new() {
        let clock = Clock::new();
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.elapsed_ms(), 0.0);
    }

    #[test]
    fn test_clock_tick_measures_time() {
        let mut clock = Clock::new();
        thread::sleep(Duration::from_millis(10));
        let tick = clock.tick();

        assert!(tick.elapsed_ms >= 10.0);
        assert!(tick.delta_ms > 0.0);
        assert_eq!(tick.frame, 1);
    }

    #[test]
    fn test_fps_over_stepped_frames() {
        let mut clock = Clock::new();
        for _ in 0..31 {
            clock.advance(16.0);
        }
        assert_eq!(clock.fps(), 0.0);

        // 32 frames of 16ms close the first 512ms window
        clock.advance(16.0);
        assert_eq!(clock.fps(), 62.5);

        for _ in 0..10 {
            clock.advance(50.0);
        }
        assert_eq!(clock.fps(), 20.0);
    }

    #[test]
    fn test_advance_emits_to_subscribers() {
        let mut clock = Clock::new();
        let listener = clock.on_tick.subscribe();

        clock.advance(500.0);
        clock.advance(250.0);

        let ticks = clock.on_tick.drain(listener);
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[1].elapsed_ms, 750.0);
        assert_eq!(ticks[1].delta_ms, 250.0);
        assert!((ticks[1].seconds() - 0.75).abs() < 1e-6);
    }
}
