//! Frame statistics.
//!
//! [`RigStats`] records cumulative numbers across frames: ticks, simulated
//! time, draw counts and when (if ever) the controller left physics mode.

// ---------------------------------------------------------------------------
// RigStats
// ---------------------------------------------------------------------------

/// Cumulative statistics for one rig.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RigStats {
    /// Number of accepted ticks.
    pub frames: u64,
    /// Simulated seconds across all accepted ticks.
    pub sim_time: f64,
    /// Draw items emitted by the most recent render.
    pub last_draw_count: usize,
    /// Total renders performed.
    pub renders: u64,
    /// Frame on which the controller dropped to kinematic mode.
    pub physics_fallback_frame: Option<u64>,
}

impl RigStats {
    pub const fn new() -> Self {
        Self {
            frames: 0,
            sim_time: 0.0,
            last_draw_count: 0,
            renders: 0,
            physics_fallback_frame: None,
        }
    }

    /// Average tick length in seconds.
    pub fn mean_dt(&self) -> Option<f64> {
        if self.frames == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(self.sim_time / self.frames as f64)
    }

    /// Record one accepted tick and whether physics is still active after it.
    pub(crate) fn record_tick(&mut self, dt: f32, was_physics: bool, is_physics: bool) {
        self.frames += 1;
        self.sim_time += f64::from(dt);
        if was_physics && !is_physics && self.physics_fallback_frame.is_none() {
            self.physics_fallback_frame = Some(self.frames);
        }
    }

    pub(crate) fn record_render(&mut self, drawn: usize) {
        self.renders += 1;
        self.last_draw_count = drawn;
    }

    /// Reset frame and render counters.
    ///
    /// The fallback frame survives: leaving physics mode is permanent.
    pub fn reset(&mut self) {
        *self = Self {
            physics_fallback_frame: self.physics_fallback_frame,
            ..Self::new()
        };
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
