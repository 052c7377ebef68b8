//! The kinematic tree: links and joints with an inferred hierarchy.
//!
//! Topology is never given explicitly. [`KinematicTree::build_hierarchy`]
//! derives parent/child adjacency from the flat joint list and picks the
//! root link, excluding joints that do not resolve instead of failing.

use std::collections::HashMap;

use tracing::{debug, error, warn};

use crate::error::ModelError;
use crate::types::{JointData, LinkData, MeshHandle};

// ---------------------------------------------------------------------------
// HierarchyReport
// ---------------------------------------------------------------------------

/// Overall outcome of hierarchy construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyStatus {
    /// The root was found as a parent that is never a child.
    Connected,
    /// One link and no joints: a legitimate single-body model.
    SingleLink,
    /// Several links but no child joint anywhere. The model cannot articulate.
    Disconnected,
    /// Every parent is also a child (cyclic input); the first link was used.
    FallbackRoot,
}

/// Why a joint was left out of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    MissingParent(String),
    MissingChild(String),
    /// Parent and child are the same link.
    SelfLoop,
    /// Another joint already claimed this child link.
    DuplicateChild { kept: String },
}

/// Diagnostics produced by [`KinematicTree::build_hierarchy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyReport {
    pub status: HierarchyStatus,
    pub root: String,
    pub link_count: usize,
    pub joint_count: usize,
    /// Joints included in the hierarchy with a controllable coordinate.
    pub movable_joint_count: usize,
    /// Child joint count per link, in link order.
    pub child_joint_counts: Vec<(String, usize)>,
    /// Joints left out of the hierarchy, in joint order.
    pub excluded: Vec<(String, ExclusionReason)>,
    /// Links other than the root that have no incoming joint.
    pub orphan_links: Vec<String>,
}

impl HierarchyReport {
    /// Total number of joints included in the hierarchy.
    pub fn connected_joint_count(&self) -> usize {
        self.child_joint_counts.iter().map(|(_, n)| n).sum()
    }

    /// Whether the hierarchy is usable without caveats.
    pub fn is_clean(&self) -> bool {
        matches!(
            self.status,
            HierarchyStatus::Connected | HierarchyStatus::SingleLink
        ) && self.excluded.is_empty()
            && self.orphan_links.is_empty()
    }
}

// ---------------------------------------------------------------------------
// KinematicTree
// ---------------------------------------------------------------------------

/// Links and joints of an articulated model plus the derived hierarchy.
///
/// Links and joints keep insertion order. Name lookups go through indices;
/// when a name is added twice the later entry wins the lookup.
#[derive(Debug, Clone, Default)]
pub struct KinematicTree {
    name: String,
    links: Vec<LinkData>,
    joints: Vec<JointData>,
    link_index: HashMap<String, usize>,
    joint_index: HashMap<String, usize>,
    /// Parent link name to indices of its child joints, in joint order.
    children: HashMap<String, Vec<usize>>,
    /// Child link name to the index of its incoming joint.
    parent_joint: HashMap<String, usize>,
    root: Option<String>,
}

impl KinematicTree {
    /// Create an empty tree.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a link. Returns `false` and leaves the tree untouched if the
    /// link has no name.
    pub fn add_link(&mut self, link: LinkData) -> bool {
        if link.name.is_empty() {
            debug!("ignoring unnamed link");
            return false;
        }
        if self.link_index.contains_key(&link.name) {
            warn!(link = %link.name, "duplicate link name, later definition wins lookups");
        }
        self.link_index.insert(link.name.clone(), self.links.len());
        self.links.push(link);
        true
    }

    /// Append a joint. Returns `false` and leaves the tree untouched if the
    /// joint has no name.
    ///
    /// The hierarchy is not updated until [`build_hierarchy`](Self::build_hierarchy).
    pub fn add_joint(&mut self, joint: JointData) -> bool {
        if joint.name.is_empty() {
            debug!("ignoring unnamed joint");
            return false;
        }
        if self.joint_index.contains_key(&joint.name) {
            warn!(joint = %joint.name, "duplicate joint name, later definition wins lookups");
        }
        self.joint_index.insert(joint.name.clone(), self.joints.len());
        self.joints.push(joint);
        true
    }

    /// Recompute name indices, adjacency, and the root link.
    ///
    /// Joints whose parent or child does not resolve are excluded and
    /// reported, never fatal. Fails only when the tree has no links.
    pub fn build_hierarchy(&mut self) -> Result<HierarchyReport, ModelError> {
        self.rebuild_indices();
        self.children.clear();
        self.parent_joint.clear();
        self.root = None;

        if self.links.is_empty() {
            error!(model = %self.name, "cannot build hierarchy: no links");
            return Err(ModelError::EmptyTree);
        }

        let mut excluded = Vec::new();
        for (idx, joint) in self.joints.iter().enumerate() {
            let reason = if !self.link_index.contains_key(&joint.parent) {
                Some(ExclusionReason::MissingParent(joint.parent.clone()))
            } else if !self.link_index.contains_key(&joint.child) {
                Some(ExclusionReason::MissingChild(joint.child.clone()))
            } else if joint.parent == joint.child {
                Some(ExclusionReason::SelfLoop)
            } else if let Some(&kept) = self.parent_joint.get(&joint.child) {
                Some(ExclusionReason::DuplicateChild {
                    kept: self.joints[kept].name.clone(),
                })
            } else {
                None
            };

            if let Some(reason) = reason {
                warn!(joint = %joint.name, ?reason, "joint excluded from hierarchy");
                excluded.push((joint.name.clone(), reason));
                continue;
            }
            self.children.entry(joint.parent.clone()).or_default().push(idx);
            self.parent_joint.insert(joint.child.clone(), idx);
        }

        // Root: first parent (in joint order) that is never a child.
        let found = self
            .connected_joints()
            .map(|j| &j.parent)
            .find(|parent| !self.parent_joint.contains_key(*parent))
            .cloned();

        let connected = self.parent_joint.len();
        let first_link = self.links[0].name.clone();
        let (root, status) = match found {
            Some(root) => (root, HierarchyStatus::Connected),
            None if connected == 0 && self.links.len() == 1 => {
                (first_link, HierarchyStatus::SingleLink)
            }
            None if connected == 0 => {
                error!(
                    model = %self.name,
                    links = self.links.len(),
                    "hierarchy construction failed: no child joints, using first link as root"
                );
                (first_link, HierarchyStatus::Disconnected)
            }
            None => {
                warn!(
                    model = %self.name,
                    root = %first_link,
                    "no link is a parent without being a child, falling back to first link as root; topology may be cyclic"
                );
                (first_link, HierarchyStatus::FallbackRoot)
            }
        };

        let orphan_links: Vec<String> = self
            .links
            .iter()
            .enumerate()
            .filter(|(i, l)| {
                self.link_index.get(&l.name) == Some(i)
                    && l.name != root
                    && !self.parent_joint.contains_key(&l.name)
            })
            .map(|(_, l)| l.name.clone())
            .collect();
        if status == HierarchyStatus::Connected && !orphan_links.is_empty() {
            warn!(model = %self.name, orphans = ?orphan_links, "links unreachable from root");
        }

        let child_joint_counts = self
            .links
            .iter()
            .map(|l| (l.name.clone(), self.children.get(&l.name).map_or(0, Vec::len)))
            .collect();
        let movable_joint_count = self.movable_joints().count();

        let report = HierarchyReport {
            status,
            root: root.clone(),
            link_count: self.links.len(),
            joint_count: self.joints.len(),
            movable_joint_count,
            child_joint_counts,
            excluded,
            orphan_links,
        };
        debug!(
            model = %self.name,
            root = %report.root,
            links = report.link_count,
            joints = report.joint_count,
            movable = report.movable_joint_count,
            status = ?report.status,
            "hierarchy built"
        );

        self.root = Some(root);
        Ok(report)
    }

    fn rebuild_indices(&mut self) {
        self.link_index = self
            .links
            .iter()
            .enumerate()
            .map(|(i, l)| (l.name.clone(), i))
            .collect();
        self.joint_index = self
            .joints
            .iter()
            .enumerate()
            .map(|(i, j)| (j.name.clone(), i))
            .collect();
    }

    /// Joints included in the hierarchy, in joint order.
    fn connected_joints(&self) -> impl Iterator<Item = &JointData> {
        let mut included: Vec<usize> = self.parent_joint.values().copied().collect();
        included.sort_unstable();
        included.into_iter().map(|i| &self.joints[i])
    }

    // -- Queries --

    /// Child joints of a link, in construction order. Empty for leaves and
    /// unknown links.
    pub fn child_joints<'a>(
        &'a self,
        parent_link: &str,
    ) -> impl Iterator<Item = &'a JointData> + use<'a> {
        self.child_joint_indices(parent_link)
            .iter()
            .map(|&i| &self.joints[i])
    }

    /// Indices into [`joints`](Self::joints) of a link's child joints.
    pub fn child_joint_indices(&self, parent_link: &str) -> &[usize] {
        self.children.get(parent_link).map_or(&[], Vec::as_slice)
    }

    /// The joint whose child is this link, if any.
    pub fn parent_joint_of(&self, child_link: &str) -> Option<&JointData> {
        self.parent_joint.get(child_link).map(|&i| &self.joints[i])
    }

    /// Get a link by name.
    pub fn link(&self, name: &str) -> Result<&LinkData, ModelError> {
        self.link_index
            .get(name)
            .map(|&i| &self.links[i])
            .ok_or_else(|| ModelError::MissingLink(name.into()))
    }

    /// Get a joint by name.
    pub fn joint(&self, name: &str) -> Result<&JointData, ModelError> {
        self.joint_index
            .get(name)
            .map(|&i| &self.joints[i])
            .ok_or_else(|| ModelError::MissingJoint(name.into()))
    }

    /// All links, in insertion order.
    pub fn links(&self) -> &[LinkData] {
        &self.links
    }

    /// All joints, in insertion order.
    pub fn joints(&self) -> &[JointData] {
        &self.joints
    }

    /// Root link name, once the hierarchy has been built.
    pub fn root_link_name(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Joints with a controllable coordinate that made it into the
    /// hierarchy, in insertion order. Empty until the hierarchy is built.
    ///
    /// Duplicate names yield only the definition that wins lookups.
    pub fn movable_joints(&self) -> impl Iterator<Item = &JointData> {
        self.joints.iter().enumerate().filter_map(|(i, j)| {
            let in_hierarchy = self.parent_joint.get(&j.child) == Some(&i);
            let wins_lookup = self.joint_index.get(&j.name) == Some(&i);
            (j.joint_type.is_actuated() && in_hierarchy && wins_lookup).then_some(j)
        })
    }

    /// Number of controllable degrees of freedom.
    pub fn dof(&self) -> usize {
        self.movable_joints().count()
    }

    /// Cache the mesh handle assigned to a link by the mesh loader.
    pub fn set_mesh_handle(&mut self, link: &str, mesh: MeshHandle) -> Result<(), ModelError> {
        let idx = *self
            .link_index
            .get(link)
            .ok_or_else(|| ModelError::MissingLink(link.into()))?;
        self.links[idx].mesh = Some(mesh);
        Ok(())
    }

    /// Apply a batch of edits atomically and rebuild the hierarchy.
    ///
    /// On error the tree is left exactly as it was.
    pub fn commit(&mut self, edit: TreeEdit) -> Result<HierarchyReport, ModelError> {
        let mut next = self.clone();
        for op in edit.ops {
            next.apply(op)?;
        }
        let report = next.build_hierarchy()?;
        *self = next;
        Ok(report)
    }

    fn apply(&mut self, op: EditOp) -> Result<(), ModelError> {
        match op {
            EditOp::AddLink(link) => {
                self.add_link(link);
            }
            EditOp::AddJoint(joint) => {
                self.add_joint(joint);
            }
            EditOp::RemoveLink(name) => {
                let idx = *self
                    .link_index
                    .get(&name)
                    .ok_or(ModelError::MissingLink(name))?;
                self.links.remove(idx);
                self.rebuild_indices();
            }
            EditOp::RemoveJoint(name) => {
                let idx = *self
                    .joint_index
                    .get(&name)
                    .ok_or(ModelError::MissingJoint(name))?;
                self.joints.remove(idx);
                self.rebuild_indices();
            }
            EditOp::ReplaceJoint(joint) => {
                let idx = *self
                    .joint_index
                    .get(&joint.name)
                    .ok_or_else(|| ModelError::MissingJoint(joint.name.clone()))?;
                self.joints[idx] = joint;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TreeEdit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum EditOp {
    AddLink(LinkData),
    AddJoint(JointData),
    RemoveLink(String),
    RemoveJoint(String),
    ReplaceJoint(JointData),
}

/// A batch of structural changes, applied together by
/// [`KinematicTree::commit`] between ticks.
#[derive(Debug, Clone, Default)]
pub struct TreeEdit {
    ops: Vec<EditOp>,
}

impl TreeEdit {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_link(mut self, link: LinkData) -> Self {
        self.ops.push(EditOp::AddLink(link));
        self
    }

    #[must_use]
    pub fn add_joint(mut self, joint: JointData) -> Self {
        self.ops.push(EditOp::AddJoint(joint));
        self
    }

    #[must_use]
    pub fn remove_link(mut self, name: impl Into<String>) -> Self {
        self.ops.push(EditOp::RemoveLink(name.into()));
        self
    }

    #[must_use]
    pub fn remove_joint(mut self, name: impl Into<String>) -> Self {
        self.ops.push(EditOp::RemoveJoint(name.into()));
        self
    }

    /// Replace the joint with the same name.
    #[must_use]
    pub fn replace_joint(mut self, joint: JointData) -> Self {
        self.ops.push(EditOp::ReplaceJoint(joint));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
