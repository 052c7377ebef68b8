//! Kinematic PD integrator.
//!
//! Advances a joint as a unit-inertia second-order system driven by a PD law
//! toward its target. No engine is involved; this is also the fallback when
//! the physics-backed path fails.

use marionette_core::config::ControllerConfig;

use crate::state::{JointState, clamp_magnitude};

/// Semi-implicit Euler PD stepper shared by every joint in kinematic mode.
#[derive(Clone, Debug)]
pub struct KinematicStepper {
    /// Position gain (1/s²).
    pub kp: f32,
    /// Velocity gain (1/s).
    pub kd: f32,
    /// Acceleration clamp (units/s²).
    pub max_acceleration: f32,
    /// Velocity clamp for joints without a declared velocity limit.
    pub default_max_velocity: f32,
}

impl KinematicStepper {
    pub const fn from_config(config: &ControllerConfig) -> Self {
        Self {
            kp: config.kp,
            kd: config.kd,
            max_acceleration: config.max_acceleration,
            default_max_velocity: config.default_max_velocity,
        }
    }

    /// Acceleration commanded for `state` by the PD law, after clamping.
    pub fn acceleration(&self, state: &JointState) -> f32 {
        let error = state.effective_target() - state.position;
        let accel = self
            .kp
            .mul_add(error, self.kd * (state.target_velocity - state.velocity));
        clamp_magnitude(accel, self.max_acceleration)
    }

    /// Advance one joint by `dt` seconds.
    ///
    /// Ignores non-positive or non-finite `dt`.
    pub fn step(&self, state: &mut JointState, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let accel = self.acceleration(state);
        let v_max = state.max_velocity().unwrap_or(self.default_max_velocity);
        state.velocity = clamp_magnitude(accel.mul_add(dt, state.velocity), v_max);
        state.position = state.velocity.mul_add(dt, state.position);
        state.effort = 0.0;
        state.enforce_bounds();
    }

    /// Advance every joint by `dt` seconds.
    pub fn step_all(&self, states: &mut [JointState], dt: f32) {
        for state in states {
            self.step(state, dt);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use marionette_urdf::{JointData, JointLimits, JointType};
    use std::f32::consts::PI;

    const DT: f32 = 0.01;

    fn stepper() -> KinematicStepper {
        KinematicStepper::from_config(&ControllerConfig::default())
    }

    fn state(kind: JointType, limits: Option<JointLimits>) -> JointState {
        let mut joint = JointData::new("j", kind, "a", "b");
        joint.limits = limits;
        JointState::from_joint(&joint, 0.0)
    }

    #[test]
    fn at_target_and_rest_nothing_moves() {
        let s0 = state(JointType::Revolute, None);
        let mut s = s0.clone();
        stepper().step(&mut s, DT);
        assert_eq!(s, s0);
    }

    #[test]
    fn first_step_matches_hand_computation() {
        let stepper = KinematicStepper {
            kp: 10.0,
            kd: 1.0,
            max_acceleration: 100.0,
            default_max_velocity: 100.0,
        };
        let mut s = state(JointType::Prismatic, None);
        s.set_target(1.0);
        stepper.step(&mut s, 0.1);
        // a = 10 * 1 - 1 * 0 = 10; v = 1; p = 0.1
        assert_relative_eq!(s.velocity, 1.0);
        assert_relative_eq!(s.position, 0.1);
    }

    #[test]
    fn acceleration_is_clamped() {
        let stepper = KinematicStepper {
            kp: 1000.0,
            kd: 0.0,
            max_acceleration: 5.0,
            default_max_velocity: 100.0,
        };
        let mut s = state(JointType::Prismatic, None);
        s.set_target(10.0);
        assert_relative_eq!(stepper.acceleration(&s), 5.0);
    }

    #[test]
    fn velocity_respects_joint_limit_then_default() {
        let stepper = KinematicStepper {
            kp: 1000.0,
            kd: 0.0,
            max_acceleration: 1000.0,
            default_max_velocity: 3.0,
        };
        let mut capped = state(
            JointType::Prismatic,
            Some(JointLimits::default().with_caps(0.0, 0.5)),
        );
        capped.set_target(10.0);
        stepper.step(&mut capped, 0.1);
        assert_relative_eq!(capped.velocity, 0.5);

        let mut uncapped = state(JointType::Prismatic, None);
        uncapped.set_target(10.0);
        stepper.step(&mut uncapped, 0.1);
        assert_relative_eq!(uncapped.velocity, 3.0);
    }

    #[test]
    fn converges_to_target() {
        let stepper = stepper();
        let mut s = state(JointType::Revolute, Some(JointLimits::position(-2.0, 2.0)));
        s.set_target(1.2);
        for _ in 0..2_000 {
            stepper.step(&mut s, DT);
        }
        assert_relative_eq!(s.position, 1.2, epsilon = 1e-3);
        assert!(s.velocity.abs() < 1e-3);
    }

    #[test]
    fn limit_clamp_zeroes_velocity() {
        let stepper = KinematicStepper {
            kp: 0.0,
            kd: 0.0,
            max_acceleration: 10.0,
            default_max_velocity: 10.0,
        };
        let mut s = state(JointType::Revolute, Some(JointLimits::position(-0.1, 0.1)));
        s.velocity = 5.0;
        stepper.step(&mut s, 0.1);
        assert_relative_eq!(s.position, 0.1);
        assert_relative_eq!(s.velocity, 0.0);
    }

    #[test]
    fn continuous_goes_the_short_way_across_pi() {
        let stepper = stepper();
        let mut s = state(JointType::Continuous, None);
        s.reset_to(3.0);
        s.set_target(-3.0);
        stepper.step(&mut s, DT);
        // Short way from 3.0 to -3.0 is through +pi.
        assert!(s.velocity > 0.0);

        let mut travelled = 0.0_f32;
        let mut prev = s.position;
        for _ in 0..2_000 {
            stepper.step(&mut s, DT);
            travelled += crate::state::shortest_angular_delta(s.position, prev).abs();
            prev = s.position;
            assert!(s.position > -PI && s.position <= PI);
        }
        assert_relative_eq!(s.position, -3.0, epsilon = 1e-3);
        assert!(travelled <= PI);
    }

    #[test]
    fn bad_dt_is_ignored() {
        let stepper = stepper();
        let mut s = state(JointType::Prismatic, None);
        s.set_target(1.0);
        let before = s.clone();
        stepper.step(&mut s, 0.0);
        stepper.step(&mut s, -1.0);
        stepper.step(&mut s, f32::NAN);
        assert_eq!(s, before);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn stepper_is_send_sync() {
        assert_send_sync::<KinematicStepper>();
    }
}
