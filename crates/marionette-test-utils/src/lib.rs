//! Shared test fixtures and utilities for Marionette crates.
//!
//! Provides ready-built trees, a scripted rigid-body engine with fault
//! injection, a recording render sink, and deterministic RNG setup.

pub mod fixtures;
pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{chain_abc, mixed_arm, two_link_arm};
pub use mocks::{RecordedDraw, RecordingSink, ScriptedEngine};
pub use rng::{random_targets, seeded_rng};
