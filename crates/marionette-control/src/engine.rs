//! The narrow interface the controller needs from a rigid-body engine.
//!
//! Engines are injected at construction. Nothing in this crate depends on a
//! concrete engine; `marionette-physics` provides one backed by rapier3d.

use nalgebra::{Isometry3, Point3, UnitQuaternion, UnitVector3, Vector3};

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Engine-assigned body handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub usize);

/// Engine-assigned joint handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineJointId(pub usize);

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Whether a body is simulated or pinned in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Fixed,
    Dynamic,
}

/// Everything an engine needs to create one body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    /// Link the body stands for.
    pub name: String,
    pub kind: BodyKind,
    /// Initial world pose.
    pub pose: Isometry3<f32>,
    /// Mass in kilograms.
    pub mass: f32,
    /// Center of mass in the body frame.
    pub center_of_mass: Point3<f32>,
    /// Principal moments of inertia.
    pub principal_inertia: Vector3<f32>,
}

/// Engine joint flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineJointKind {
    /// One rotational degree of freedom.
    Hinge,
    /// One translational degree of freedom.
    Slider,
    /// No relative motion.
    Weld,
}

/// Everything an engine needs to create one joint.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineJointDesc {
    /// Tree joint the engine joint stands for.
    pub name: String,
    pub kind: EngineJointKind,
    pub parent: BodyId,
    pub child: BodyId,
    /// Joint frame in the parent body frame. The child body frame coincides
    /// with it at coordinate zero.
    pub frame: Isometry3<f32>,
    /// Motion axis in the joint frame.
    pub axis: UnitVector3<f32>,
    /// Ordered position range, if limited.
    pub limits: Option<(f32, f32)>,
}

/// Linear and angular velocity of a body, in world coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyVelocity {
    pub linear: Vector3<f32>,
    pub angular: Vector3<f32>,
}

impl EngineJointDesc {
    /// Joint coordinate implied by the two body poses.
    ///
    /// The relative pose is taken out of the joint frame, then the rotation
    /// about the axis (hinge) or the offset along it (slider) is measured.
    /// Welds always read zero.
    pub fn measure(&self, parent: &Isometry3<f32>, child: &Isometry3<f32>) -> f32 {
        let motion = self.frame.inverse() * parent.inverse() * child;
        match self.kind {
            EngineJointKind::Hinge => hinge_angle(&motion.rotation, &self.axis),
            EngineJointKind::Slider => motion.translation.vector.dot(&self.axis),
            EngineJointKind::Weld => 0.0,
        }
    }

    /// Joint axis in world coordinates for the given parent pose.
    pub fn world_axis(&self, parent: &Isometry3<f32>) -> Vector3<f32> {
        (parent.rotation * self.frame.rotation) * self.axis.into_inner()
    }
}

/// Signed rotation angle of `rotation` about `axis`, in `(-pi, pi]`.
pub fn hinge_angle(rotation: &UnitQuaternion<f32>, axis: &UnitVector3<f32>) -> f32 {
    let q = rotation.quaternion();
    let angle = 2.0 * q.imag().dot(axis).atan2(q.w);
    crate::state::wrap_angle(angle)
}

// ---------------------------------------------------------------------------
// PhysicsError
// ---------------------------------------------------------------------------

/// Failures reported by an engine or detected while driving it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("physics engine is not initialized")]
    NotInitialized,

    #[error("unknown body handle {0:?}")]
    UnknownBody(BodyId),

    #[error("unknown joint handle {0:?}")]
    UnknownJoint(EngineJointId),

    #[error("invalid timestep: {0}")]
    InvalidTimestep(f32),

    #[error("simulation diverged at joint {joint}")]
    Diverged { joint: String },

    #[error("engine error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// PhysicsEngine
// ---------------------------------------------------------------------------

/// Operations the physics-backed controller needs from a rigid-body engine.
///
/// Forces, torques and joint efforts apply to the next [`step`](Self::step)
/// only.
pub trait PhysicsEngine: Send {
    /// Human-readable name of the engine.
    fn name(&self) -> &str;

    /// Whether the engine is ready to accept bodies.
    fn is_initialized(&self) -> bool;

    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyId, PhysicsError>;

    fn create_joint(&mut self, desc: &EngineJointDesc) -> Result<EngineJointId, PhysicsError>;

    fn body_pose(&self, body: BodyId) -> Result<Isometry3<f32>, PhysicsError>;

    fn set_body_pose(&mut self, body: BodyId, pose: Isometry3<f32>) -> Result<(), PhysicsError>;

    fn body_velocity(&self, body: BodyId) -> Result<BodyVelocity, PhysicsError>;

    fn set_body_velocity(
        &mut self,
        body: BodyId,
        velocity: BodyVelocity,
    ) -> Result<(), PhysicsError>;

    /// Apply a world-frame force at the body's center of mass.
    fn apply_force(&mut self, body: BodyId, force: Vector3<f32>) -> Result<(), PhysicsError>;

    /// Apply a world-frame torque.
    fn apply_torque(&mut self, body: BodyId, torque: Vector3<f32>) -> Result<(), PhysicsError>;

    /// Joint coordinate (rad or m) measured from the joint frame.
    fn joint_position(&self, joint: EngineJointId) -> Result<f32, PhysicsError>;

    /// Joint rate (rad/s or m/s).
    fn joint_velocity(&self, joint: EngineJointId) -> Result<f32, PhysicsError>;

    /// Apply a torque (hinge) or force (slider) along the joint axis.
    fn apply_joint_effort(&mut self, joint: EngineJointId, effort: f32)
    -> Result<(), PhysicsError>;

    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f32) -> Result<(), PhysicsError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Translation3;

    fn desc(kind: EngineJointKind, frame: Isometry3<f32>) -> EngineJointDesc {
        EngineJointDesc {
            name: "j".into(),
            kind,
            parent: BodyId(0),
            child: BodyId(1),
            frame,
            axis: Vector3::z_axis(),
            limits: None,
        }
    }

    #[test]
    fn hinge_measures_rotation_about_axis() {
        let frame = Isometry3::translation(1.0, 0.0, 0.0);
        let d = desc(EngineJointKind::Hinge, frame);
        let parent = Isometry3::rotation(Vector3::new(0.0, 0.3, 0.0));
        let child = parent * frame * Isometry3::rotation(Vector3::new(0.0, 0.0, 0.7));
        assert_relative_eq!(d.measure(&parent, &child), 0.7, epsilon = 1e-5);
    }

    #[test]
    fn hinge_angle_wraps_past_pi() {
        let r = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 3.5);
        let a = hinge_angle(&r, &Vector3::z_axis());
        assert_relative_eq!(a, 3.5 - std::f32::consts::TAU, epsilon = 1e-5);
    }

    #[test]
    fn slider_measures_offset_along_axis() {
        let frame = Isometry3::from_parts(
            Translation3::new(0.0, 0.0, 0.2),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.4),
        );
        let d = desc(EngineJointKind::Slider, frame);
        let parent = Isometry3::identity();
        let child = frame * Isometry3::translation(0.0, 0.0, 0.15);
        assert_relative_eq!(d.measure(&parent, &child), 0.15, epsilon = 1e-5);
        assert_relative_eq!(
            d.world_axis(&parent),
            frame.rotation * Vector3::z(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn weld_reads_zero() {
        let d = desc(EngineJointKind::Weld, Isometry3::identity());
        let child = Isometry3::translation(3.0, 0.0, 0.0);
        assert_relative_eq!(d.measure(&Isometry3::identity(), &child), 0.0);
    }

    #[test]
    fn error_display_messages() {
        assert_eq!(
            PhysicsError::Diverged {
                joint: "elbow".into()
            }
            .to_string(),
            "simulation diverged at joint elbow"
        );
        assert_eq!(
            PhysicsError::UnknownBody(BodyId(3)).to_string(),
            "unknown body handle BodyId(3)"
        );
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn error_is_send_sync() {
        assert_send_sync::<PhysicsError>();
    }
}
