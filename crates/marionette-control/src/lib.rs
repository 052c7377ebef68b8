//! Joint control for articulated models.
//!
//! Pure Rust, engine-agnostic. Joint state is advanced either by a kinematic
//! PD integrator or by a rigid-body engine injected through the
//! [`PhysicsEngine`](engine::PhysicsEngine) trait, with a one-way fallback
//! from the latter to the former.
//!
//! # Tick Pipeline
//!
//! ```text
//! set_target → JointState.target ─┬─ kinematic: PD accel → clamp → integrate → wrap/clamp
//!                                 └─ physics:   PD effort → clamp → engine.step → readback → wrap/clamp
//! ```
//!
//! # Quick Start
//!
//! ```
//! use marionette_control::prelude::*;
//! use marionette_urdf::{JointData, JointLimits, JointType, KinematicTree, LinkData};
//!
//! let mut tree = KinematicTree::new("arm");
//! tree.add_link(LinkData::new("base"));
//! tree.add_link(LinkData::new("upper"));
//! tree.add_joint(
//!     JointData::new("shoulder", JointType::Revolute, "base", "upper")
//!         .with_limits(JointLimits::position(-1.0, 1.0)),
//! );
//! tree.build_hierarchy().unwrap();
//!
//! let mut controller = JointController::new(&tree, ControllerConfig::default());
//! controller.set_target("shoulder", 2.0);
//! assert_eq!(controller.target("shoulder"), Some(1.0));
//! controller.update(0.05);
//! ```

pub mod controller;
pub mod engine;
pub mod kinematic;
pub mod physics;
pub mod state;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::controller::{ControlMode, ControllerBuilder, JointController};
    pub use crate::engine::{
        BodyDesc, BodyId, BodyKind, BodyVelocity, EngineJointDesc, EngineJointId,
        EngineJointKind, PhysicsEngine, PhysicsError,
    };
    pub use crate::kinematic::KinematicStepper;
    pub use crate::state::{JointSnapshot, JointState, shortest_angular_delta, wrap_angle};
    pub use marionette_core::config::{ControllerConfig, PhysicsConfig};
}
