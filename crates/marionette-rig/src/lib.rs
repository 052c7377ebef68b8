//! One object per animated robot.
//!
//! [`Rig`] owns a [`KinematicTree`](marionette_urdf::KinematicTree), the
//! [`JointController`](marionette_control::controller::JointController)
//! driving it and the [`PoseComposer`](marionette_pose::PoseComposer) that
//! turns joint positions into draw items. A frame is `set_targets`, `tick`,
//! `render`.
//!
//! # Example
//!
//! ```
//! use marionette_rig::RigBuilder;
//! use marionette_urdf::{KinematicTree, LinkData};
//!
//! let mut tree = KinematicTree::new("puck");
//! tree.add_link(LinkData::new("base"));
//!
//! let mut rig = RigBuilder::new().with_tree(tree).build().unwrap();
//! rig.tick(0.05);
//! assert_eq!(rig.stats().frames, 1);
//! ```

pub mod builder;
pub mod rig;
pub mod stats;

#[cfg(test)]
mod integration;

use marionette_core::error::ConfigError;
use marionette_urdf::ModelError;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use builder::RigBuilder;
pub use rig::Rig;
pub use stats::RigStats;

// ---------------------------------------------------------------------------
// RigError
// ---------------------------------------------------------------------------

/// Reasons a rig cannot be built.
#[derive(Debug, thiserror::Error)]
pub enum RigError {
    #[error("no kinematic tree supplied")]
    NoTree,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
