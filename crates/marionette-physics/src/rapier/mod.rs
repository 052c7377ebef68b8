//! Raw `rapier3d` engine.
//!
//! We own the [`PhysicsPipeline`](rapier3d::pipeline::PhysicsPipeline), call
//! `step()` ourselves, and translate between marionette's engine descriptors
//! and rapier's bodies and impulse joints.

pub mod bridge;
pub mod context;
pub mod engine;

pub use context::RapierContext;
pub use engine::RapierEngine;
