//! One-time basis correction between the model's axes and the scene's.
//!
//! A model authored Z-up/X-forward shown in a Y-up/Z-forward scene needs a
//! single rotation at the root. [`BasisCorrection`] computes it from the two
//! up/forward pairs: align the up axes along the shortest arc, then spin
//! about the destination up axis until the forward axes agree.

use nalgebra::{Unit, UnitQuaternion, UnitVector3, Vector3};

use marionette_core::config::BasisConfig;

/// Vectors shorter than this are treated as degenerate.
const EPSILON: f32 = 1e-6;

/// Rotation mapping a source up/forward convention onto a destination one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasisCorrection {
    rotation: UnitQuaternion<f32>,
}

impl Default for BasisCorrection {
    fn default() -> Self {
        Self::identity()
    }
}

impl BasisCorrection {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Compute the correction from source to destination axes.
    ///
    /// Never fails: a degenerate up axis contributes no up alignment, and a
    /// forward axis parallel to up contributes no spin.
    pub fn new(
        source_up: Vector3<f32>,
        source_forward: Vector3<f32>,
        target_up: Vector3<f32>,
        target_forward: Vector3<f32>,
    ) -> Self {
        let (Some(src_up), Some(dst_up)) = (unit(source_up), unit(target_up)) else {
            return Self::identity();
        };

        let up_alignment = shortest_arc(&src_up, &dst_up);
        let forward = up_alignment * source_forward;

        let angle = match (
            project_onto_plane(&forward, &dst_up),
            project_onto_plane(&target_forward, &dst_up),
        ) {
            (Some(from), Some(to)) => from.cross(&to).dot(&dst_up).atan2(from.dot(&to)),
            _ => 0.0,
        };

        Self {
            rotation: UnitQuaternion::from_axis_angle(&dst_up, angle) * up_alignment,
        }
    }

    pub fn from_config(config: &BasisConfig) -> Self {
        Self::new(
            Vector3::from(config.source_up),
            Vector3::from(config.source_forward),
            Vector3::from(config.target_up),
            Vector3::from(config.target_forward),
        )
    }

    pub const fn rotation(&self) -> &UnitQuaternion<f32> {
        &self.rotation
    }

    /// Rotate a source-frame vector into the destination frame.
    pub fn apply(&self, v: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * v
    }
}

fn unit(v: Vector3<f32>) -> Option<UnitVector3<f32>> {
    if v.iter().all(|c| c.is_finite()) {
        Unit::try_new(v, EPSILON)
    } else {
        None
    }
}

/// Shortest rotation taking `from` onto `to`.
///
/// For antiparallel input the rotation is a half turn about the world axis
/// least aligned with `from`, made orthogonal to it.
fn shortest_arc(from: &UnitVector3<f32>, to: &UnitVector3<f32>) -> UnitQuaternion<f32> {
    if let Some(rotation) = UnitQuaternion::rotation_between_axis(from, to) {
        return rotation;
    }
    let world = [Vector3::x(), Vector3::y(), Vector3::z()];
    let least_aligned = world
        .iter()
        .min_by(|a, b| a.dot(from).abs().total_cmp(&b.dot(from).abs()))
        .copied()
        .unwrap_or_else(Vector3::x);
    let axis = least_aligned - from.into_inner() * least_aligned.dot(from);
    Unit::try_new(axis, EPSILON).map_or_else(UnitQuaternion::identity, |axis| {
        UnitQuaternion::from_axis_angle(&axis, std::f32::consts::PI)
    })
}

/// Component of `v` orthogonal to `normal`, normalized.
fn project_onto_plane(v: &Vector3<f32>, normal: &UnitVector3<f32>) -> Option<Vector3<f32>> {
    let projected = v - normal.into_inner() * v.dot(normal);
    unit(projected).map(Unit::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
