//! Deterministic RNG utilities for reproducible tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use marionette_urdf::KinematicTree;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// One random target per movable joint, drawn from `[-spread, spread]`.
///
/// The range ignores joint limits on purpose so callers exercise clamping.
pub fn random_targets(tree: &KinematicTree, rng: &mut impl Rng, spread: f32) -> Vec<(String, f32)> {
    tree.movable_joints()
        .map(|joint| (joint.name.clone(), rng.gen_range(-spread..=spread)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
