//! Link/joint model of an articulated robot for Marionette.
//!
//! Provides the URDF-style data types (links, joints, geometry, limits) and
//! [`KinematicTree`], which infers parent/child topology and the root link
//! from a flat joint list. Parsing URDF XML is left to the caller: trees are
//! built programmatically or through [`TreeEdit`] batches.

pub mod error;
pub mod tree;
pub mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use error::ModelError;
pub use tree::{ExclusionReason, HierarchyReport, HierarchyStatus, KinematicTree, TreeEdit};
pub use types::{
    Collision, Geometry, Inertial, JointData, JointDynamics, JointLimits, JointPositions,
    JointType, LinkData, Material, MeshHandle, Origin, RestPose, Visual, normalize_axis,
};
