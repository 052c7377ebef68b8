//! The per-frame rig.

use marionette_control::controller::{ControlMode, JointController};
use marionette_control::state::JointSnapshot;
use marionette_core::config::RigConfig;
use marionette_pose::{LinkPoses, PoseComposer, RenderSink};
use marionette_urdf::{HierarchyReport, KinematicTree, MeshHandle, ModelError, TreeEdit};
use tracing::{debug, info};

use crate::stats::RigStats;

/// A tree, its controller and its composer, advanced and drawn together.
///
/// Built by [`RigBuilder`](crate::RigBuilder).
#[derive(Debug)]
pub struct Rig {
    pub(crate) tree: KinematicTree,
    pub(crate) controller: JointController,
    pub(crate) composer: PoseComposer,
    pub(crate) config: RigConfig,
    pub(crate) stats: RigStats,
}

impl Rig {
    pub const fn tree(&self) -> &KinematicTree {
        &self.tree
    }

    pub const fn controller(&self) -> &JointController {
        &self.controller
    }

    pub const fn composer(&self) -> &PoseComposer {
        &self.composer
    }

    pub const fn config(&self) -> &RigConfig {
        &self.config
    }

    pub const fn stats(&self) -> &RigStats {
        &self.stats
    }

    pub fn is_using_physics(&self) -> bool {
        self.controller.is_using_physics()
    }

    pub fn mode(&self) -> ControlMode {
        self.controller.mode()
    }

    // -- Targets --

    /// See [`JointController::set_target`].
    pub fn set_target(&mut self, joint: &str, target: f32) -> bool {
        self.controller.set_target(joint, target)
    }

    /// See [`JointController::set_targets`].
    pub fn set_targets<'n, I>(&mut self, targets: I) -> usize
    where
        I: IntoIterator<Item = (&'n str, f32)>,
    {
        self.controller.set_targets(targets)
    }

    // -- Frame --

    /// Advance the controller by `dt` seconds.
    ///
    /// Invalid `dt` is ignored and not counted as a frame.
    pub fn tick(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            debug!(dt, "rig tick with invalid dt ignored");
            return;
        }
        let was_physics = self.controller.is_using_physics();
        self.controller.update(dt);
        self.stats
            .record_tick(dt, was_physics, self.controller.is_using_physics());
    }

    /// Advance by the configured control period.
    pub fn tick_fixed(&mut self) {
        self.tick(self.config.controller.dt);
    }

    /// Hand one draw item per visual link to `sink`. Returns the count.
    pub fn render<S: RenderSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let drawn = self.composer.render(&self.tree, &self.controller, sink);
        self.stats.record_render(drawn);
        drawn
    }

    /// World transform of every reachable link at the current positions.
    pub fn link_poses(&self) -> LinkPoses {
        self.composer.link_poses(&self.tree, &self.controller)
    }

    /// Copy of every joint's state.
    pub fn snapshot(&self) -> Vec<JointSnapshot> {
        self.controller.snapshot()
    }

    /// Return all joints to their initial positions and clear frame counters.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.stats.reset();
    }

    // -- Tree changes --

    /// Cache a loader-assigned mesh on a link.
    pub fn set_mesh_handle(&mut self, link: &str, mesh: MeshHandle) -> Result<(), ModelError> {
        self.tree.set_mesh_handle(link, mesh)
    }

    /// Apply a structural edit between frames and reload the controller.
    ///
    /// On error neither the tree nor the controller change. A successful
    /// commit ends physics-backed mode.
    pub fn commit(&mut self, edit: TreeEdit) -> Result<HierarchyReport, ModelError> {
        let report = self.tree.commit(edit)?;
        self.controller.reload(&self.tree);
        info!(
            model = self.tree.name(),
            joints = report.joint_count,
            status = ?report.status,
            "tree edit committed"
        );
        Ok(report)
    }
}
