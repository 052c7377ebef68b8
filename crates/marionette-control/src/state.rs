//! Per-joint runtime state and the wrap/clamp rules each joint kind obeys.

use std::f32::consts::{PI, TAU};

use marionette_urdf::{JointData, JointType};

// ---------------------------------------------------------------------------
// Angle helpers
// ---------------------------------------------------------------------------

/// Wrap an angle into `(-pi, pi]`. Non-finite input maps to `0`.
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut a = (angle + PI).rem_euclid(TAU) - PI;
    if a <= -PI {
        a += TAU;
    }
    a
}

/// Signed difference `target - current` along the shorter way round.
///
/// The result lies in `(-pi, pi]`, so its magnitude never exceeds `pi`.
pub fn shortest_angular_delta(target: f32, current: f32) -> f32 {
    wrap_angle(target - current)
}

/// Clamp `value` into `[-limit, limit]`. A NaN limit leaves `value` alone.
pub fn clamp_magnitude(value: f32, limit: f32) -> f32 {
    let limit = limit.abs();
    if limit.is_nan() {
        value
    } else {
        value.clamp(-limit, limit)
    }
}

// ---------------------------------------------------------------------------
// JointState
// ---------------------------------------------------------------------------

/// Mutable state of one movable joint.
///
/// Static properties (kind, range, caps) are copied from the tree when the
/// state is created; the public fields change every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct JointState {
    name: String,
    kind: JointType,
    range: Option<(f32, f32)>,
    max_velocity: Option<f32>,
    max_effort: Option<f32>,
    /// Current coordinate (rad or m).
    pub position: f32,
    /// Current rate (rad/s or m/s).
    pub velocity: f32,
    /// Commanded coordinate, already clamped or wrapped.
    pub target: f32,
    /// Commanded rate used by the derivative term.
    pub target_velocity: f32,
    /// Last applied torque or force. Zero in kinematic mode.
    pub effort: f32,
}

impl JointState {
    /// Create the state for a joint at `initial` (constrained), at rest,
    /// targeting its own position.
    pub fn from_joint(joint: &JointData, initial: f32) -> Self {
        let limits = joint.limits.as_ref();
        let mut state = Self {
            name: joint.name.clone(),
            kind: joint.joint_type,
            range: joint.position_range(),
            max_velocity: limits.and_then(|l| l.max_velocity()),
            max_effort: limits.and_then(|l| l.max_effort()),
            position: 0.0,
            velocity: 0.0,
            target: 0.0,
            target_velocity: 0.0,
            effort: 0.0,
        };
        state.position = state.constrain(initial);
        state.target = state.position;
        state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn kind(&self) -> JointType {
        self.kind
    }

    /// Ordered position range, for limited revolute and prismatic joints.
    pub const fn range(&self) -> Option<(f32, f32)> {
        self.range
    }

    /// Velocity cap declared by the joint, if any.
    pub const fn max_velocity(&self) -> Option<f32> {
        self.max_velocity
    }

    /// Effort cap declared by the joint, if any.
    pub const fn max_effort(&self) -> Option<f32> {
        self.max_effort
    }

    /// Map a coordinate into the set this joint can occupy.
    ///
    /// Continuous joints wrap; limited joints clamp. Non-finite input
    /// becomes `0` (then constrained) so NaN never enters the state.
    pub fn constrain(&self, value: f32) -> f32 {
        let value = if value.is_finite() { value } else { 0.0 };
        match (self.kind, self.range) {
            (JointType::Continuous, _) => wrap_angle(value),
            (_, Some((lo, hi))) => value.clamp(lo, hi),
            _ => value,
        }
    }

    /// Store a new target after constraining it.
    pub fn set_target(&mut self, target: f32) {
        self.target = self.constrain(target);
    }

    /// Target as seen from the current position.
    ///
    /// For continuous joints this is `position + shortest_angular_delta`,
    /// which may lie outside `(-pi, pi]` so the error takes the short way.
    pub fn effective_target(&self) -> f32 {
        if self.kind == JointType::Continuous {
            self.position + shortest_angular_delta(self.target, self.position)
        } else {
            self.target
        }
    }

    /// Re-establish the position invariant after integration or readback.
    ///
    /// A clamp against a limit also zeroes the velocity.
    pub fn enforce_bounds(&mut self) {
        if !self.position.is_finite() {
            self.position = 0.0;
            self.velocity = 0.0;
        }
        if !self.velocity.is_finite() {
            self.velocity = 0.0;
        }
        let constrained = self.constrain(self.position);
        if self.kind != JointType::Continuous && constrained != self.position {
            self.velocity = 0.0;
        }
        self.position = constrained;
    }

    /// Reset to `position` (constrained) at rest, targeting itself.
    pub fn reset_to(&mut self, position: f32) {
        self.position = self.constrain(position);
        self.velocity = 0.0;
        self.target = self.position;
        self.target_velocity = 0.0;
        self.effort = 0.0;
    }

    pub fn snapshot(&self) -> JointSnapshot {
        JointSnapshot {
            name: self.name.clone(),
            kind: self.kind,
            position: self.position,
            velocity: self.velocity,
            target: self.target,
            effort: self.effort,
        }
    }
}

/// Read-only copy of a joint's state for consumers outside the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSnapshot {
    pub name: String,
    pub kind: JointType,
    pub position: f32,
    pub velocity: f32,
    pub target: f32,
    pub effort: f32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
