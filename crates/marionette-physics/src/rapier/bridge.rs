//! Conversions from marionette engine descriptors to rapier bodies and
//! impulse joints.

use std::f32::consts::PI;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, UnitVector3, Vector3};
use rapier3d::prelude::{
    FixedJointBuilder, GenericJoint, JointAxis, MassProperties, PrismaticJointBuilder,
    RevoluteJointBuilder, RigidBody, RigidBodyBuilder,
};

use marionette_control::engine::{BodyDesc, BodyKind, EngineJointDesc, EngineJointKind};

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Rigid body for a link, posed and weighted as described.
pub fn build_body(desc: &BodyDesc) -> RigidBody {
    let builder = match desc.kind {
        BodyKind::Fixed => RigidBodyBuilder::fixed(),
        BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
    };
    builder
        .position(desc.pose)
        .can_sleep(false)
        .additional_mass_properties(MassProperties::new(
            desc.center_of_mass,
            desc.mass,
            desc.principal_inertia,
        ))
        .build()
}

// ---------------------------------------------------------------------------
// Joints
// ---------------------------------------------------------------------------

/// Impulse joint for a tree joint.
///
/// Rapier drives the free axis of a revolute or prismatic joint along the
/// local X of its frames, so both frames are rotated to carry X onto the
/// joint axis. The child's frame sits at the child body origin.
pub fn build_joint(desc: &EngineJointDesc) -> GenericJoint {
    match desc.kind {
        EngineJointKind::Hinge | EngineJointKind::Slider => {
            let (mut joint, limit_axis): (GenericJoint, JointAxis) =
                if desc.kind == EngineJointKind::Hinge {
                    (RevoluteJointBuilder::new(desc.axis).build().into(), JointAxis::AngX)
                } else {
                    (PrismaticJointBuilder::new(desc.axis).build().into(), JointAxis::LinX)
                };
            let to_axis = x_to_axis(&desc.axis);
            joint
                .set_local_frame1(Isometry3::from_parts(
                    desc.frame.translation,
                    desc.frame.rotation * to_axis,
                ))
                .set_local_frame2(Isometry3::from_parts(Translation3::identity(), to_axis));
            if let Some((lo, hi)) = desc.limits {
                // Rapier hinge limits cover a single turn. Wider ranges are
                // held by the controller's target clamp instead.
                let single_turn = lo >= -PI && hi <= PI;
                if desc.kind == EngineJointKind::Slider || single_turn {
                    joint.set_limits(limit_axis, [lo, hi]);
                }
            }
            joint
        }
        EngineJointKind::Weld => FixedJointBuilder::new().local_frame1(desc.frame).build().into(),
    }
}

/// Rotation taking local X onto `axis`.
fn x_to_axis(axis: &UnitVector3<f32>) -> UnitQuaternion<f32> {
    UnitQuaternion::rotation_between_axis(&Vector3::x_axis(), axis)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn x_maps_onto_axis() {
        for axis in [Vector3::x_axis(), Vector3::y_axis(), -Vector3::x_axis()] {
            let r = x_to_axis(&axis);
            assert_relative_eq!(r * Vector3::x(), axis.into_inner(), epsilon = 1e-6);
        }
    }

    #[test]
    fn limits_land_on_free_axis() {
        let desc = EngineJointDesc {
            name: "elbow".into(),
            kind: EngineJointKind::Hinge,
            parent: marionette_control::engine::BodyId(0),
            child: marionette_control::engine::BodyId(1),
            frame: Isometry3::translation(0.0, 0.0, 0.5),
            axis: Vector3::y_axis(),
            limits: Some((-1.0, 0.5)),
        };
        let joint = build_joint(&desc);
        let limits = joint.limits(JointAxis::AngX).unwrap();
        assert_relative_eq!(limits.min, -1.0);
        assert_relative_eq!(limits.max, 0.5);
        assert_relative_eq!(
            joint.local_frame1.translation.vector,
            Vector3::new(0.0, 0.0, 0.5)
        );
    }

    #[test]
    fn multi_turn_hinge_range_is_not_limited_in_rapier() {
        let desc = EngineJointDesc {
            name: "wrist".into(),
            kind: EngineJointKind::Hinge,
            parent: marionette_control::engine::BodyId(0),
            child: marionette_control::engine::BodyId(1),
            frame: Isometry3::identity(),
            axis: Vector3::z_axis(),
            limits: Some((-4.0, 4.0)),
        };
        assert!(build_joint(&desc).limits(JointAxis::AngX).is_none());

        let slider = EngineJointDesc {
            kind: EngineJointKind::Slider,
            ..desc
        };
        let joint = build_joint(&slider);
        let limits = joint.limits(JointAxis::LinX).unwrap();
        assert_relative_eq!(limits.max, 4.0);
    }
}
