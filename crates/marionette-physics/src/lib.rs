//! rapier3d engine for the marionette joint controller.
//!
//! [`RapierEngine`] implements
//! [`PhysicsEngine`](marionette_control::engine::PhysicsEngine): one rigid
//! body per link, one impulse joint per tree joint, joint efforts applied as
//! equal and opposite torques or forces on the two bodies.
//!
//! ```no_run
//! use marionette_control::prelude::*;
//! use marionette_physics::RapierEngine;
//! # fn tree() -> marionette_urdf::KinematicTree { unimplemented!() }
//!
//! let tree = tree();
//! let physics = PhysicsConfig::default();
//! let controller = JointController::builder(&tree)
//!     .engine(Box::new(RapierEngine::from_config(&physics)))
//!     .physics_config(physics)
//!     .build();
//! ```

pub mod rapier;

pub use rapier::{RapierContext, RapierEngine};
