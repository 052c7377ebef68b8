//! Ready-made trees for tests.
//!
//! Every fixture has its hierarchy built already.

use marionette_urdf::{
    Geometry, Inertial, JointData, JointLimits, JointType, KinematicTree, LinkData, Material,
    Origin, Visual,
};

/// Visual box with a flat gray material.
pub fn box_visual(size: [f32; 3]) -> Visual {
    Visual::new(Geometry::Box { size }).with_material(Material {
        name: "gray".into(),
        color: Some([0.5, 0.5, 0.5, 1.0]),
        texture: None,
    })
}

/// Link with a small box visual and unit-ish inertia.
pub fn visual_link(name: &str) -> LinkData {
    LinkData::new(name)
        .with_visual(box_visual([0.05, 0.05, 0.2]))
        .with_inertial(Inertial {
            origin: Origin::default(),
            mass: 1.0,
            inertia: [0.01, 0.0, 0.0, 0.01, 0.0, 0.01],
        })
}

/// Links `A`, `B`, `C` joined by revolute joints `ab` and `bc` about Z.
pub fn chain_abc() -> KinematicTree {
    let mut tree = KinematicTree::new("chain_abc");
    for name in ["A", "B", "C"] {
        tree.add_link(visual_link(name));
    }
    tree.add_joint(
        JointData::new("ab", JointType::Revolute, "A", "B")
            .with_axis([0.0, 0.0, 1.0])
            .with_limits(JointLimits::position(-1.5, 1.5)),
    );
    tree.add_joint(
        JointData::new("bc", JointType::Revolute, "B", "C")
            .with_origin(Origin::from_xyz([0.0, 0.0, 0.5]))
            .with_axis([0.0, 0.0, 1.0])
            .with_limits(JointLimits::position(-1.5, 1.5)),
    );
    build(tree)
}

/// Root and one child on a revolute Z joint with the given origin.
pub fn two_link_arm(origin: [f32; 3]) -> KinematicTree {
    let mut tree = KinematicTree::new("two_link_arm");
    tree.add_link(visual_link("base"));
    tree.add_link(visual_link("link1"));
    tree.add_joint(
        JointData::new("joint1", JointType::Revolute, "base", "link1")
            .with_origin(Origin::from_xyz(origin))
            .with_axis([0.0, 0.0, 1.0])
            .with_limits(JointLimits::position(-3.1, 3.1).with_caps(20.0, 4.0)),
    );
    build(tree)
}

/// One joint of every movable kind plus a fixed tool mount:
///
/// ```text
/// base ─shoulder(revolute, ±1.2)→ upper ─wrist(continuous)→ forearm
///      ─slide(prismatic, 0..0.3)→ carriage ─tool_mount(fixed)→ tool
/// ```
pub fn mixed_arm() -> KinematicTree {
    let mut tree = KinematicTree::new("mixed_arm");
    for name in ["base", "upper", "forearm", "carriage", "tool"] {
        tree.add_link(visual_link(name));
    }
    tree.add_joint(
        JointData::new("shoulder", JointType::Revolute, "base", "upper")
            .with_origin(Origin::from_xyz([0.0, 0.0, 0.1]))
            .with_axis([0.0, 1.0, 0.0])
            .with_limits(JointLimits::position(-1.2, 1.2).with_caps(30.0, 2.0)),
    );
    tree.add_joint(
        JointData::new("wrist", JointType::Continuous, "upper", "forearm")
            .with_origin(Origin::from_xyz([0.0, 0.0, 0.3]))
            .with_axis([0.0, 0.0, 1.0]),
    );
    tree.add_joint(
        JointData::new("slide", JointType::Prismatic, "forearm", "carriage")
            .with_origin(Origin::new([0.0, 0.0, 0.2], [0.0, 0.0, 0.3]))
            .with_axis([1.0, 0.0, 0.0])
            .with_limits(JointLimits::position(0.0, 0.3).with_caps(50.0, 0.5)),
    );
    tree.add_joint(
        JointData::new("tool_mount", JointType::Fixed, "carriage", "tool")
            .with_origin(Origin::from_xyz([0.05, 0.0, 0.0])),
    );
    build(tree)
}

fn build(mut tree: KinematicTree) -> KinematicTree {
    tree.build_hierarchy()
        .expect("fixture trees always have links");
    tree
}
