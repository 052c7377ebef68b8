//! Forward kinematics and scene-basis correction for Marionette rigs.
//!
//! # Architecture
//!
//! ```text
//! KinematicTree + JointPositions ──► PoseComposer ──► RenderSink (DrawItem per visual link)
//!                                          │
//!                      BasisCorrection ────┘ (root only, once)
//! ```
//!
//! The composer reads joint positions through
//! [`JointPositions`](marionette_urdf::JointPositions), so any controller or
//! plain map of joint coordinates can drive it.

pub mod basis;
pub mod compose;

pub use basis::BasisCorrection;
pub use compose::{DrawItem, LinkPoses, PoseComposer, RenderSink};
