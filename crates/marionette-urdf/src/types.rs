//! Core data types for the in-memory link/joint model.
//!
//! These types map closely to URDF concepts but use Rust-native types. A
//! joint's static origin is converted to an [`Isometry3`] once, when it is
//! set, so the per-frame pose walk never re-derives rotations from angles.

use std::collections::HashMap;
use std::hash::BuildHasher;

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, UnitVector3, Vector3};

/// Axis lengths below this are treated as degenerate.
const AXIS_EPSILON: f32 = 1e-6;

// ---------------------------------------------------------------------------
// JointType
// ---------------------------------------------------------------------------

/// URDF joint type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    /// Rotation about a single axis, with position limits.
    Revolute,
    /// Unlimited rotation about a single axis, wrapped into `(-pi, pi]`.
    Continuous,
    /// Translation along an axis, with position limits.
    Prismatic,
    /// No relative motion between parent and child.
    Fixed,
    /// Recognized, but carries no motion in this model.
    Floating,
    /// Recognized, but carries no motion in this model.
    Planar,
}

impl JointType {
    /// Whether this joint type has a single controllable coordinate.
    pub const fn is_actuated(self) -> bool {
        matches!(self, Self::Revolute | Self::Continuous | Self::Prismatic)
    }

    /// Whether the joint coordinate is an angle.
    pub const fn is_rotational(self) -> bool {
        matches!(self, Self::Revolute | Self::Continuous)
    }
}

// ---------------------------------------------------------------------------
// JointLimits
// ---------------------------------------------------------------------------

/// Limits on a joint's motion, effort, and velocity.
///
/// A joint "has position limits" iff `lower` or `upper` is nonzero; an
/// all-zero range is how URDF spells "no limit".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointLimits {
    /// Lower position limit (rad or m).
    pub lower: f32,
    /// Upper position limit (rad or m).
    pub upper: f32,
    /// Maximum effort (Nm or N). Zero means unspecified.
    pub effort: f32,
    /// Maximum velocity (rad/s or m/s). Zero means unspecified.
    pub velocity: f32,
}

impl JointLimits {
    /// Limits with a position range only.
    pub const fn position(lower: f32, upper: f32) -> Self {
        Self {
            lower,
            upper,
            effort: 0.0,
            velocity: 0.0,
        }
    }

    /// Set effort and velocity caps.
    #[must_use]
    pub const fn with_caps(mut self, effort: f32, velocity: f32) -> Self {
        self.effort = effort;
        self.velocity = velocity;
        self
    }

    /// Whether a position range is declared.
    pub fn has_position_limits(&self) -> bool {
        self.lower != 0.0 || self.upper != 0.0
    }

    /// Ordered, finite `(lower, upper)` range, if any.
    ///
    /// A reversed range is swapped rather than rejected; a non-finite bound
    /// disables the range.
    pub fn position_range(&self) -> Option<(f32, f32)> {
        if !self.has_position_limits() || !self.lower.is_finite() || !self.upper.is_finite() {
            return None;
        }
        Some(if self.lower <= self.upper {
            (self.lower, self.upper)
        } else {
            (self.upper, self.lower)
        })
    }

    /// Declared velocity cap, if positive.
    pub fn max_velocity(&self) -> Option<f32> {
        (self.velocity.is_finite() && self.velocity > 0.0).then_some(self.velocity)
    }

    /// Declared effort cap, if positive.
    pub fn max_effort(&self) -> Option<f32> {
        (self.effort.is_finite() && self.effort > 0.0).then_some(self.effort)
    }
}

// ---------------------------------------------------------------------------
// JointDynamics
// ---------------------------------------------------------------------------

/// Dynamic properties of a joint (damping and friction). Advisory only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointDynamics {
    /// Viscous damping coefficient (Nm·s/rad).
    pub damping: f32,
    /// Coulomb friction torque (Nm).
    pub friction: f32,
}

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// A 3D pose specified as position + roll-pitch-yaw.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Origin {
    /// Translation `[x, y, z]` in meters.
    pub xyz: [f32; 3],
    /// Rotation `[roll, pitch, yaw]` in radians.
    pub rpy: [f32; 3],
}

impl Origin {
    pub const fn new(xyz: [f32; 3], rpy: [f32; 3]) -> Self {
        Self { xyz, rpy }
    }

    pub const fn from_xyz(xyz: [f32; 3]) -> Self {
        Self { xyz, rpy: [0.0; 3] }
    }

    /// Rotation `Rz(yaw) * Ry(pitch) * Rx(roll)`: roll is applied first.
    pub fn rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(self.rpy[0], self.rpy[1], self.rpy[2])
    }

    /// Translation followed by rotation, as a rigid transform.
    pub fn to_isometry(&self) -> Isometry3<f32> {
        let translation = Translation3::new(self.xyz[0], self.xyz[1], self.xyz[2]);
        Isometry3::from_parts(translation, self.rotation())
    }
}

// ---------------------------------------------------------------------------
// Inertial
// ---------------------------------------------------------------------------

/// Inertial properties of a link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inertial {
    /// Origin of the inertial frame relative to the link frame.
    pub origin: Origin,
    /// Mass in kilograms.
    pub mass: f32,
    /// Inertia tensor elements `[ixx, ixy, ixz, iyy, iyz, izz]`.
    pub inertia: [f32; 6],
}

impl Inertial {
    /// Diagonal of the inertia tensor `[ixx, iyy, izz]`.
    pub const fn principal(&self) -> [f32; 3] {
        [self.inertia[0], self.inertia[3], self.inertia[5]]
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Geometric shape used for visual or collision elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Sphere { radius: f32 },
    Box { size: [f32; 3] },
    Cylinder { radius: f32, length: f32 },
    Mesh { filename: String, scale: [f32; 3] },
}

// ---------------------------------------------------------------------------
// Material
// ---------------------------------------------------------------------------

/// Visual material for a link.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material name.
    pub name: String,
    /// RGBA color `[r, g, b, a]`, each in `0.0..=1.0`.
    pub color: Option<[f32; 4]>,
    /// Texture file reference, resolved by the renderer.
    pub texture: Option<String>,
}

// ---------------------------------------------------------------------------
// Visual / Collision
// ---------------------------------------------------------------------------

/// Opaque handle to a mesh uploaded by the external mesh loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// The visual element of a link.
#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    /// Placement of the geometry in the link frame.
    pub origin: Origin,
    pub geometry: Geometry,
    pub material: Option<Material>,
}

impl Visual {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            origin: Origin::default(),
            geometry,
            material: None,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }
}

/// A collision element of a link.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub origin: Origin,
    pub geometry: Geometry,
}

// ---------------------------------------------------------------------------
// LinkData
// ---------------------------------------------------------------------------

/// In-memory representation of a URDF link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkData {
    /// Link name.
    pub name: String,
    /// Visual geometry, if the link is drawn.
    pub visual: Option<Visual>,
    /// Mesh handle cached by the mesh loader.
    pub mesh: Option<MeshHandle>,
    /// Inertial properties (mass, inertia tensor).
    pub inertial: Option<Inertial>,
    /// Collision geometries.
    pub collisions: Vec<Collision>,
}

impl LinkData {
    /// Create a link with only a name (no geometry or inertia).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visual: None,
            mesh: None,
            inertial: None,
            collisions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_visual(mut self, visual: Visual) -> Self {
        self.visual = Some(visual);
        self
    }

    #[must_use]
    pub fn with_inertial(mut self, inertial: Inertial) -> Self {
        self.inertial = Some(inertial);
        self
    }
}

// ---------------------------------------------------------------------------
// JointData
// ---------------------------------------------------------------------------

/// In-memory representation of a URDF joint.
///
/// `origin` and `axis` are private so the cached origin transform and the
/// normalized axis cannot drift from their sources.
#[derive(Debug, Clone, PartialEq)]
pub struct JointData {
    /// Joint name.
    pub name: String,
    /// Joint type.
    pub joint_type: JointType,
    /// Parent link name.
    pub parent: String,
    /// Child link name.
    pub child: String,
    /// Motion limits.
    pub limits: Option<JointLimits>,
    /// Dynamic properties.
    pub dynamics: Option<JointDynamics>,
    origin: Origin,
    origin_transform: Isometry3<f32>,
    axis: UnitVector3<f32>,
}

impl JointData {
    /// Create a joint at the identity origin with the default `(1, 0, 0)` axis.
    pub fn new(
        name: impl Into<String>,
        joint_type: JointType,
        parent: impl Into<String>,
        child: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            joint_type,
            parent: parent.into(),
            child: child.into(),
            limits: None,
            dynamics: None,
            origin: Origin::default(),
            origin_transform: Isometry3::identity(),
            axis: Vector3::x_axis(),
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self.origin_transform = origin.to_isometry();
        self
    }

    /// Set the motion axis; zero-length or non-finite axes fall back to `(1, 0, 0)`.
    #[must_use]
    pub fn with_axis(mut self, axis: [f32; 3]) -> Self {
        self.axis = normalize_axis(axis);
        self
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: JointLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    #[must_use]
    pub const fn with_dynamics(mut self, dynamics: JointDynamics) -> Self {
        self.dynamics = Some(dynamics);
        self
    }

    /// Static origin relative to the parent link.
    pub const fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Static origin as a rigid transform.
    pub const fn origin_transform(&self) -> &Isometry3<f32> {
        &self.origin_transform
    }

    /// Unit motion axis in the joint frame.
    pub const fn axis(&self) -> &UnitVector3<f32> {
        &self.axis
    }

    /// Position range when position limits apply to this joint type.
    pub fn position_range(&self) -> Option<(f32, f32)> {
        match self.joint_type {
            JointType::Revolute | JointType::Prismatic => {
                self.limits.as_ref().and_then(JointLimits::position_range)
            }
            _ => None,
        }
    }

    /// Motion at coordinate `q`: rotation about the axis for revolute and
    /// continuous joints, translation along it for prismatic, else identity.
    pub fn motion_transform(&self, q: f32) -> Isometry3<f32> {
        match self.joint_type {
            JointType::Revolute | JointType::Continuous => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&self.axis, q),
            ),
            JointType::Prismatic => Isometry3::from_parts(
                Translation3::from(self.axis.into_inner() * q),
                UnitQuaternion::identity(),
            ),
            JointType::Fixed | JointType::Floating | JointType::Planar => Isometry3::identity(),
        }
    }

    /// Child link frame in the parent link frame at coordinate `q`.
    pub fn transform_at(&self, q: f32) -> Isometry3<f32> {
        self.origin_transform * self.motion_transform(q)
    }
}

/// Normalize a raw axis, substituting `(1, 0, 0)` for degenerate input.
pub fn normalize_axis(axis: [f32; 3]) -> UnitVector3<f32> {
    let v = Vector3::new(axis[0], axis[1], axis[2]);
    let norm = v.norm();
    if norm.is_finite() && norm > AXIS_EPSILON {
        Unit::new_unchecked(v / norm)
    } else {
        Vector3::x_axis()
    }
}

// ---------------------------------------------------------------------------
// JointPositions
// ---------------------------------------------------------------------------

/// Source of current joint coordinates, keyed by joint name.
///
/// Joints the source does not know are posed at their rest coordinate.
pub trait JointPositions {
    fn joint_position(&self, joint: &str) -> Option<f32>;
}

impl<S: BuildHasher> JointPositions for HashMap<String, f32, S> {
    fn joint_position(&self, joint: &str) -> Option<f32> {
        self.get(joint).copied()
    }
}

/// Every joint at its rest coordinate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestPose;

impl JointPositions for RestPose {
    fn joint_position(&self, _joint: &str) -> Option<f32> {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    // -- JointType --

    #[test]
    fn joint_type_is_actuated() {
        assert!(JointType::Revolute.is_actuated());
        assert!(JointType::Continuous.is_actuated());
        assert!(JointType::Prismatic.is_actuated());
        assert!(!JointType::Fixed.is_actuated());
        assert!(!JointType::Floating.is_actuated());
        assert!(!JointType::Planar.is_actuated());
    }

    #[test]
    fn joint_type_is_rotational() {
        assert!(JointType::Revolute.is_rotational());
        assert!(JointType::Continuous.is_rotational());
        assert!(!JointType::Prismatic.is_rotational());
    }

    // -- JointLimits --

    #[test]
    fn zero_range_means_no_position_limits() {
        let lim = JointLimits::default().with_caps(10.0, 2.0);
        assert!(!lim.has_position_limits());
        assert!(lim.position_range().is_none());
        assert_eq!(lim.max_velocity(), Some(2.0));
    }

    #[test]
    fn one_sided_nonzero_counts_as_limited() {
        let lim = JointLimits::position(0.0, 1.5);
        assert!(lim.has_position_limits());
        assert_eq!(lim.position_range(), Some((0.0, 1.5)));
    }

    #[test]
    fn reversed_range_is_swapped() {
        let lim = JointLimits::position(1.0, -1.0);
        assert_eq!(lim.position_range(), Some((-1.0, 1.0)));
    }

    #[test]
    fn nan_bound_disables_range() {
        let lim = JointLimits::position(f32::NAN, 1.0);
        assert!(lim.position_range().is_none());
    }

    #[test]
    fn unspecified_caps_are_none() {
        let lim = JointLimits::position(-1.0, 1.0);
        assert!(lim.max_velocity().is_none());
        assert!(lim.max_effort().is_none());
    }

    // -- Origin --

    #[test]
    fn origin_default_is_identity() {
        let iso = Origin::default().to_isometry();
        assert_relative_eq!(iso.translation.vector.norm(), 0.0);
        assert_relative_eq!(iso.rotation.angle(), 0.0);
    }

    #[test]
    fn rpy_applies_roll_then_pitch_then_yaw() {
        let origin = Origin::new([0.0; 3], [FRAC_PI_2, 0.0, FRAC_PI_2]);
        // Roll maps +Y to +Z; yaw about Z leaves +Z unchanged.
        let v = origin.rotation() * Vector3::y();
        assert_relative_eq!(v, Vector3::z(), epsilon = 1e-6);
        // Roll leaves +X alone; yaw maps +X to +Y.
        let v = origin.rotation() * Vector3::x();
        assert_relative_eq!(v, Vector3::y(), epsilon = 1e-6);
    }

    #[test]
    fn origin_translation() {
        let iso = Origin::from_xyz([1.0, 2.0, 3.0]).to_isometry();
        assert_relative_eq!(iso.translation.vector, Vector3::new(1.0, 2.0, 3.0));
    }

    // -- Axis --

    #[test]
    fn axis_is_normalized() {
        let axis = normalize_axis([0.0, 0.0, 2.0]);
        assert_relative_eq!(axis.into_inner(), Vector3::z(), epsilon = 1e-6);
    }

    #[test]
    fn degenerate_axis_falls_back_to_x() {
        assert_eq!(normalize_axis([0.0; 3]), Vector3::x_axis());
        assert_eq!(normalize_axis([1e-9, 0.0, 0.0]), Vector3::x_axis());
        assert_eq!(normalize_axis([f32::NAN, 1.0, 0.0]), Vector3::x_axis());
    }

    #[test]
    fn default_joint_axis_is_x() {
        let j = JointData::new("j", JointType::Revolute, "a", "b");
        assert_eq!(*j.axis(), Vector3::x_axis());
    }

    // -- JointData transforms --

    #[test]
    fn origin_transform_cached_on_set() {
        let j = JointData::new("j", JointType::Fixed, "a", "b")
            .with_origin(Origin::from_xyz([0.0, 0.0, 0.5]));
        assert_relative_eq!(j.origin_transform().translation.z, 0.5);
        assert_eq!(j.origin().xyz, [0.0, 0.0, 0.5]);
    }

    #[test]
    fn revolute_motion_rotates_about_axis() {
        let j = JointData::new("j", JointType::Revolute, "a", "b").with_axis([0.0, 0.0, 1.0]);
        let p = j.motion_transform(FRAC_PI_2) * nalgebra::Point3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(p.coords, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn prismatic_motion_translates_along_axis() {
        let j = JointData::new("j", JointType::Prismatic, "a", "b").with_axis([0.0, 1.0, 0.0]);
        let m = j.motion_transform(0.3);
        assert_relative_eq!(m.translation.vector, Vector3::new(0.0, 0.3, 0.0));
        assert_relative_eq!(m.rotation.angle(), 0.0);
    }

    #[test]
    fn fixed_and_floating_have_no_motion() {
        for ty in [JointType::Fixed, JointType::Floating, JointType::Planar] {
            let j = JointData::new("j", ty, "a", "b");
            assert_eq!(j.motion_transform(1.0), Isometry3::identity());
        }
    }

    #[test]
    fn transform_at_applies_origin_before_motion() {
        let j = JointData::new("j", JointType::Revolute, "a", "b")
            .with_origin(Origin::from_xyz([1.0, 0.0, 0.0]))
            .with_axis([0.0, 0.0, 1.0]);
        let t = j.transform_at(FRAC_PI_2);
        // Translation comes from the origin only.
        assert_relative_eq!(t.translation.vector, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        // A point on the child's X axis lands along parent +Y from the joint.
        let p = t * nalgebra::Point3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(p.coords, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn continuous_joint_ignores_position_range() {
        let j = JointData::new("j", JointType::Continuous, "a", "b")
            .with_limits(JointLimits::position(-1.0, 1.0));
        assert!(j.position_range().is_none());
    }

    // -- LinkData --

    #[test]
    fn link_data_new() {
        let link = LinkData::new("arm");
        assert_eq!(link.name, "arm");
        assert!(link.inertial.is_none());
        assert!(link.visual.is_none());
        assert!(link.mesh.is_none());
        assert!(link.collisions.is_empty());
    }

    #[test]
    fn inertial_principal_diagonal() {
        let i = Inertial {
            inertia: [1.0, 0.1, 0.2, 2.0, 0.3, 3.0],
            ..Default::default()
        };
        assert_eq!(i.principal(), [1.0, 2.0, 3.0]);
    }

    // -- JointPositions --

    #[test]
    fn hashmap_joint_positions() {
        let mut map = HashMap::new();
        map.insert("elbow".to_string(), 0.5_f32);
        assert_eq!(map.joint_position("elbow"), Some(0.5));
        assert_eq!(map.joint_position("wrist"), None);
        assert_eq!(RestPose.joint_position("elbow"), None);
    }
}
