//! Frame timing.
//!
//! There is no shared clock inside ember. The application builds a
//! [`FrameContext`] once per frame and passes it explicitly to
//! [`ParticleSystem::update`](crate::ParticleSystem::update), which forwards
//! it to every emitter.
//!
//! [`Time`] is a convenience driver that derives those contexts from the wall
//! clock, with pause, time scale and fixed-step support.
//!
//! # Example
//!
//! ```ignore
//! use ember::time::Time;
//!
//! let mut time = Time::new();
//!
//! // In your frame loop:
//! let ctx = time.update();
//! system.update(&ctx)?;
//! ```

use std::time::Instant;

/// Clock state for a single simulation frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameContext {
    /// Seconds since the previous frame. Zero or negative means paused.
    pub elapsed_time: f64,
    /// Simulation seconds since start. Non-decreasing except on explicit reset.
    pub cumulative_time: f64,
}

impl FrameContext {
    /// Create a context from raw values.
    pub fn new(elapsed_time: f64, cumulative_time: f64) -> Self {
        Self {
            elapsed_time,
            cumulative_time,
        }
    }

    /// Same context with `elapsed_time` multiplied by `scale`.
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            elapsed_time: self.elapsed_time * scale,
            cumulative_time: self.cumulative_time,
        }
    }
}

/// Wall-clock driver producing [`FrameContext`]s.
#[derive(Debug)]
pub struct Time {
    /// When the last frame occurred.
    last_frame: Instant,
    /// Simulation time accumulated from (scaled) deltas.
    cumulative: f64,
    /// Time since last frame in seconds.
    delta: f64,
    /// Total frames since start.
    frame_count: u64,
    paused: bool,
    /// Fixed delta time for deterministic updates (optional).
    fixed_delta: Option<f64>,
    /// Time scale multiplier (1.0 = normal speed).
    time_scale: f64,
}

impl Time {
    /// Create a new time tracker starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            cumulative: 0.0,
            delta: 0.0,
            frame_count: 0,
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
        }
    }

    /// Measure the wall clock and produce this frame's context. Call once per frame.
    pub fn update(&mut self) -> FrameContext {
        let now = Instant::now();
        let raw_delta = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;

        if self.paused {
            self.delta = 0.0;
            return self.context();
        }

        self.advance(self.fixed_delta.unwrap_or(raw_delta))
    }

    /// Step the clock by `delta` seconds without reading the wall clock.
    ///
    /// The time scale applies. Cumulative time never drops below zero.
    pub fn advance(&mut self, delta: f64) -> FrameContext {
        self.delta = delta * self.time_scale;
        self.cumulative = (self.cumulative + self.delta).max(0.0);
        self.frame_count += 1;
        self.context()
    }

    /// Context for the most recent frame.
    pub fn context(&self) -> FrameContext {
        FrameContext::new(self.delta, self.cumulative)
    }

    /// Total simulation time in seconds.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.cumulative
    }

    /// Time since last frame in seconds (delta time).
    #[inline]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Total frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Pause time progression. While paused, contexts carry a zero delta.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.last_frame = Instant::now();
            self.paused = false;
        }
    }

    /// Set a fixed delta time for deterministic updates. `None` uses real frame timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f64>) {
        self.fixed_delta = delta;
    }

    /// Set time scale multiplier (negative values clamp to 0).
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    /// Reset the timer. This is the only way cumulative time moves backwards.
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
        self.cumulative = 0.0;
        self.delta = 0.0;
        self.frame_count = 0;
        self.paused = false;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
