//! Forward kinematics for rendering.
//!
//! [`PoseComposer`] walks the tree from the root in pre-order, composing each
//! joint's static origin and current motion onto its parent's transform. Links
//! with a visual are handed to a [`RenderSink`] as [`DrawItem`]s; the full set
//! of link frames is available as [`LinkPoses`].

use std::collections::{HashMap, HashSet};

use nalgebra::{Point3, Similarity3, Translation3};
use tracing::warn;

use marionette_core::config::BasisConfig;
use marionette_urdf::{Geometry, JointPositions, KinematicTree, LinkData, Material, MeshHandle};

use crate::basis::BasisCorrection;

// ---------------------------------------------------------------------------
// DrawItem / RenderSink
// ---------------------------------------------------------------------------

/// One visual link to draw this frame.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub link: &'a str,
    /// World transform of the geometry, visual origin included.
    pub transform: Similarity3<f32>,
    /// Mesh uploaded by the loader, if any.
    pub mesh: Option<MeshHandle>,
    pub geometry: &'a Geometry,
    pub material: Option<&'a Material>,
}

impl DrawItem<'_> {
    /// RGBA color of the material, if one is set.
    pub fn color(&self) -> Option<[f32; 4]> {
        self.material.and_then(|m| m.color)
    }

    /// World position of the geometry origin.
    pub fn position(&self) -> Point3<f32> {
        self.transform * Point3::origin()
    }
}

/// Receives draw items from [`PoseComposer::render`].
pub trait RenderSink {
    fn draw(&mut self, item: DrawItem<'_>);
}

impl<F: FnMut(DrawItem<'_>)> RenderSink for F {
    fn draw(&mut self, item: DrawItem<'_>) {
        self(item);
    }
}

// ---------------------------------------------------------------------------
// LinkPoses
// ---------------------------------------------------------------------------

/// World transform of every link reachable from the root, in walk order.
#[derive(Debug, Clone, Default)]
pub struct LinkPoses {
    poses: Vec<(String, Similarity3<f32>)>,
    index: HashMap<String, usize>,
}

impl LinkPoses {
    pub fn get(&self, link: &str) -> Option<&Similarity3<f32>> {
        self.index.get(link).map(|&i| &self.poses[i].1)
    }

    /// World position of a link frame's origin.
    pub fn position(&self, link: &str) -> Option<Point3<f32>> {
        self.get(link).map(|t| t * Point3::origin())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Similarity3<f32>)> {
        self.poses.iter().map(|(name, t)| (name.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    fn push(&mut self, link: &str, transform: Similarity3<f32>) {
        self.index.insert(link.to_string(), self.poses.len());
        self.poses.push((link.to_string(), transform));
    }
}

// ---------------------------------------------------------------------------
// PoseComposer
// ---------------------------------------------------------------------------

/// Computes world transforms for every link from the current joint positions.
///
/// The root transform (uniform scale and basis correction) is computed once
/// at construction and applied at the root only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseComposer {
    basis: BasisCorrection,
    scale: f32,
}

impl Default for PoseComposer {
    fn default() -> Self {
        Self::new(BasisCorrection::identity(), 1.0)
    }
}

impl PoseComposer {
    /// Composer with the given basis correction and global uniform scale.
    ///
    /// A non-finite or non-positive scale is replaced with `1.0`.
    pub fn new(basis: BasisCorrection, scale: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            warn!(scale, "invalid global scale, using 1.0");
            1.0
        };
        Self { basis, scale }
    }

    pub fn from_config(config: &BasisConfig) -> Self {
        Self::new(BasisCorrection::from_config(config), config.scale)
    }

    pub const fn basis(&self) -> &BasisCorrection {
        &self.basis
    }

    pub const fn scale(&self) -> f32 {
        self.scale
    }

    /// Transform applied at the root before any joint.
    pub fn root_transform(&self) -> Similarity3<f32> {
        Similarity3::from_parts(Translation3::identity(), *self.basis.rotation(), self.scale)
    }

    /// Emit one draw item per visual link. Returns the number drawn.
    pub fn render<P, S>(&self, tree: &KinematicTree, positions: &P, sink: &mut S) -> usize
    where
        P: JointPositions + ?Sized,
        S: RenderSink + ?Sized,
    {
        let mut drawn = 0;
        self.walk(tree, positions, |link, transform| {
            if let Some(visual) = &link.visual {
                sink.draw(DrawItem {
                    link: &link.name,
                    transform: transform * visual.origin.to_isometry(),
                    mesh: link.mesh,
                    geometry: &visual.geometry,
                    material: visual.material.as_ref(),
                });
                drawn += 1;
            }
        });
        drawn
    }

    /// Link-frame world transform of every reachable link.
    pub fn link_poses<P>(&self, tree: &KinematicTree, positions: &P) -> LinkPoses
    where
        P: JointPositions + ?Sized,
    {
        let mut poses = LinkPoses::default();
        self.walk(tree, positions, |link, transform| {
            poses.push(&link.name, *transform);
        });
        poses
    }

    /// Pre-order walk from the root, visiting children in construction order.
    ///
    /// Each link is visited at most once; a second arrival (cyclic input)
    /// is skipped with a warning.
    fn walk<'t, P, F>(&self, tree: &'t KinematicTree, positions: &P, mut visit: F)
    where
        P: JointPositions + ?Sized,
        F: FnMut(&'t LinkData, &Similarity3<f32>),
    {
        let Some(root) = tree.root_link_name() else {
            warn!(model = tree.name(), "no root link, hierarchy not built");
            return;
        };

        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&str, Similarity3<f32>)> = vec![(root, self.root_transform())];
        while let Some((name, transform)) = stack.pop() {
            if !visited.insert(name) {
                warn!(link = name, "link reached twice, skipping");
                continue;
            }
            let Ok(link) = tree.link(name) else {
                continue;
            };
            visit(link, &transform);

            // Reverse so the first child joint is popped first.
            let children: Vec<_> = tree.child_joints(name).collect();
            for joint in children.into_iter().rev() {
                let q = if joint.joint_type.is_actuated() {
                    positions.joint_position(&joint.name).unwrap_or(0.0)
                } else {
                    0.0
                };
                stack.push((joint.child.as_str(), transform * joint.transform_at(q)));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
