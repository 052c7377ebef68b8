//! Integration test: rapier-backed joints under gravity and PD control.
//!
//! Checks that:
//! 1. A free hinge swings under gravity and the joint keeps the bodies together
//! 2. Slider effort moves the child along the axis and the limit holds it
//! 3. The controller in physics-backed mode tracks targets through rapier
//! 4. Reset returns the rig to its initial configuration
//! 5. Revolute joints with a range past pi track the same target as in
//!    kinematic mode

use approx::assert_relative_eq;
use marionette_control::prelude::*;
use marionette_physics::RapierEngine;
use marionette_test_utils::fixtures::visual_link;
use marionette_test_utils::{mixed_arm, two_link_arm};
use marionette_urdf::{JointData, JointLimits, JointType, KinematicTree};
use nalgebra::{Isometry3, Point3, Vector3};

fn body(name: &str, kind: BodyKind, com: Point3<f32>) -> BodyDesc {
    BodyDesc {
        name: name.into(),
        kind,
        pose: Isometry3::identity(),
        mass: 1.0,
        center_of_mass: com,
        principal_inertia: Vector3::new(0.01, 0.01, 0.01),
    }
}

fn physics_config() -> PhysicsConfig {
    PhysicsConfig {
        substeps: 50,
        ..PhysicsConfig::default()
    }
}

#[test]
fn hinge_swings_under_gravity() {
    let mut engine = RapierEngine::default();
    let base = engine
        .create_body(&body("base", BodyKind::Fixed, Point3::origin()))
        .unwrap();
    // Center of mass held out horizontally so gravity (-Z) twists about +Y.
    let arm = engine
        .create_body(&body("arm", BodyKind::Dynamic, Point3::new(0.5, 0.0, 0.0)))
        .unwrap();
    let hinge = engine
        .create_joint(&EngineJointDesc {
            name: "pivot".into(),
            kind: EngineJointKind::Hinge,
            parent: base,
            child: arm,
            frame: Isometry3::identity(),
            axis: Vector3::y_axis(),
            limits: None,
        })
        .unwrap();

    assert_relative_eq!(engine.joint_position(hinge).unwrap(), 0.0, epsilon = 1e-6);
    for _ in 0..200 {
        engine.step(0.001).unwrap();
    }

    let angle = engine.joint_position(hinge).unwrap();
    eprintln!("pendulum angle after 0.2s: {angle}");
    assert!(angle > 0.05, "arm should swing down: angle={angle}");
    assert!(engine.joint_velocity(hinge).unwrap() > 0.0);

    let pivot = engine.body_pose(arm).unwrap().translation.vector;
    assert!(pivot.norm() < 1e-2, "joint drifted apart: {pivot}");
}

#[test]
fn slider_effort_moves_child_until_limit() {
    let mut engine = RapierEngine::new(Vector3::zeros());
    let rail = engine
        .create_body(&body("rail", BodyKind::Fixed, Point3::origin()))
        .unwrap();
    let cart = engine
        .create_body(&body("cart", BodyKind::Dynamic, Point3::origin()))
        .unwrap();
    let slide = engine
        .create_joint(&EngineJointDesc {
            name: "slide".into(),
            kind: EngineJointKind::Slider,
            parent: rail,
            child: cart,
            frame: Isometry3::identity(),
            axis: Vector3::x_axis(),
            limits: Some((0.0, 0.3)),
        })
        .unwrap();

    for _ in 0..200 {
        engine.apply_joint_effort(slide, 5.0).unwrap();
        engine.step(0.001).unwrap();
    }
    let mid = engine.joint_position(slide).unwrap();
    assert!(mid > 0.05, "cart should have moved: {mid}");

    for _ in 0..2000 {
        engine.apply_joint_effort(slide, 5.0).unwrap();
        engine.step(0.001).unwrap();
    }
    let end = engine.joint_position(slide).unwrap();
    assert!(end <= 0.3 + 0.02, "limit should hold the cart: {end}");
    assert!(end > 0.25);
}

#[test]
fn controller_tracks_target_through_rapier() {
    let tree = two_link_arm([0.0, 0.0, 0.2]);
    let config = physics_config();
    let mut controller = JointController::builder(&tree)
        .engine(Box::new(RapierEngine::from_config(&config)))
        .physics_config(config)
        .build();
    assert!(controller.is_using_physics());

    controller.set_target("joint1", 0.5);
    for _ in 0..100 {
        controller.update(0.05);
    }
    assert!(controller.is_using_physics());
    let q = controller.position("joint1").unwrap();
    eprintln!("joint1 after 5s: {q}");
    assert_relative_eq!(q, 0.5, epsilon = 0.05);
}

#[test]
fn limited_joints_stay_in_range_under_rapier() {
    let tree = mixed_arm();
    let config = physics_config();
    let mut controller = JointController::builder(&tree)
        .engine(Box::new(RapierEngine::from_config(&config)))
        .physics_config(config)
        .build();
    controller.set_target("shoulder", 5.0);
    controller.set_target("slide", 5.0);
    for _ in 0..40 {
        controller.update(0.05);
        let s = controller.position("shoulder").unwrap();
        let p = controller.position("slide").unwrap();
        assert!((-1.2..=1.2).contains(&s), "shoulder {s}");
        assert!((0.0..=0.3).contains(&p), "slide {p}");
    }
}

#[test]
fn reset_restores_initial_configuration() {
    let tree = two_link_arm([0.0, 0.0, 0.2]);
    let config = physics_config();
    let mut controller = JointController::builder(&tree)
        .engine(Box::new(RapierEngine::from_config(&config)))
        .physics_config(config)
        .build();
    controller.set_target("joint1", 1.0);
    for _ in 0..20 {
        controller.update(0.05);
    }
    assert!(controller.position("joint1").unwrap() > 0.1);

    controller.reset();
    assert!(controller.is_using_physics());
    assert_relative_eq!(controller.position("joint1").unwrap(), 0.0);

    controller.update(0.05);
    assert_relative_eq!(controller.position("joint1").unwrap(), 0.0, epsilon = 1e-2);
}

fn wide_wrist() -> KinematicTree {
    let mut tree = KinematicTree::new("wide_wrist");
    tree.add_link(visual_link("base"));
    tree.add_link(visual_link("hand"));
    tree.add_joint(
        JointData::new("wrist", JointType::Revolute, "base", "hand")
            .with_axis([0.0, 0.0, 1.0])
            .with_limits(JointLimits::position(-4.0, 4.0)),
    );
    tree.build_hierarchy().unwrap();
    tree
}

#[test]
fn revolute_past_pi_tracks_like_kinematic_mode() {
    let tree = wide_wrist();
    let config = PhysicsConfig {
        gravity: [0.0, 0.0, 0.0],
        ..physics_config()
    };
    let mut physics = JointController::builder(&tree)
        .engine(Box::new(RapierEngine::from_config(&config)))
        .physics_config(config)
        .build();
    let mut kinematic = JointController::builder(&tree).build();
    assert!(physics.is_using_physics());

    physics.set_target("wrist", 3.5);
    kinematic.set_target("wrist", 3.5);
    for _ in 0..200 {
        physics.update(0.05);
        kinematic.update(0.05);
        let q = physics.position("wrist").unwrap();
        assert!((-4.0..=4.0).contains(&q), "wrist left its range: {q}");
    }

    assert!(physics.is_using_physics());
    assert_relative_eq!(kinematic.position("wrist").unwrap(), 3.5, epsilon = 1e-3);
    let q = physics.position("wrist").unwrap();
    assert!((q - 3.5).abs() < 0.1, "physics wrist settled at {q}");
}
