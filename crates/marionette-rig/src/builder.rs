//! Fluent construction of a [`Rig`].
//!
//! # Example
//!
//! ```no_run
//! use marionette_core::config::RigConfig;
//! use marionette_rig::RigBuilder;
//! # fn tree() -> marionette_urdf::KinematicTree { unimplemented!() }
//!
//! let rig = RigBuilder::new()
//!     .with_config(RigConfig::from_file("rig.toml").unwrap())
//!     .with_tree(tree())
//!     .with_initial_position("shoulder", 0.3)
//!     .build()
//!     .unwrap();
//! ```

use marionette_control::controller::JointController;
use marionette_control::engine::PhysicsEngine;
use marionette_core::config::RigConfig;
use marionette_pose::PoseComposer;
use marionette_urdf::{HierarchyStatus, KinematicTree};
use tracing::{info, warn};

use crate::{Rig, RigError, RigStats};

// ---------------------------------------------------------------------------
// RigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for a [`Rig`].
///
/// Only the tree is required. Without an engine the controller runs in
/// kinematic mode.
#[derive(Default)]
pub struct RigBuilder {
    config: Option<RigConfig>,
    tree: Option<KinematicTree>,
    engine: Option<Box<dyn PhysicsEngine>>,
    initial_positions: Vec<(String, f32)>,
}

impl RigBuilder {
    /// Create a new rig builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rig configuration.
    #[must_use]
    pub fn with_config(mut self, config: RigConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn with_tree(mut self, tree: KinematicTree) -> Self {
        self.tree = Some(tree);
        self
    }

    /// Supply a rigid-body engine for physics-backed mode.
    #[must_use]
    pub fn with_engine(mut self, engine: Box<dyn PhysicsEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Starting position for one joint, overriding the config's entry.
    #[must_use]
    pub fn with_initial_position(mut self, joint: impl Into<String>, position: f32) -> Self {
        self.initial_positions.push((joint.into(), position));
        self
    }

    /// Validate the config, build the hierarchy and create the controller.
    ///
    /// # Errors
    ///
    /// [`RigError::NoTree`] without a tree, [`RigError::Config`] for an
    /// invalid config, [`RigError::Model`] for a tree with no links.
    pub fn build(self) -> Result<Rig, RigError> {
        let mut tree = self.tree.ok_or(RigError::NoTree)?;
        let mut config = self.config.unwrap_or_default();
        config.initial_joint_positions.extend(self.initial_positions);
        config.validate()?;

        let report = tree.build_hierarchy()?;
        if !matches!(
            report.status,
            HierarchyStatus::Connected | HierarchyStatus::SingleLink
        ) {
            warn!(model = tree.name(), status = ?report.status, "rig built on an imperfect hierarchy");
        }

        let mut controller = JointController::builder(&tree).rig_config(&config);
        if let Some(engine) = self.engine {
            controller = controller.engine(engine);
        }
        let controller = controller.build();
        let composer = PoseComposer::from_config(&config.basis);

        info!(
            model = tree.name(),
            links = report.link_count,
            dof = tree.dof(),
            mode = ?controller.mode(),
            "rig ready"
        );
        Ok(Rig {
            tree,
            controller,
            composer,
            config,
            stats: RigStats::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_control::controller::ControlMode;
    use marionette_core::config::ControllerConfig;
    use marionette_test_utils::{ScriptedEngine, mixed_arm};

    #[test]
    fn missing_tree_is_an_error() {
        assert!(matches!(RigBuilder::new().build(), Err(RigError::NoTree)));
    }

    #[test]
    fn empty_tree_is_an_error() {
        let result = RigBuilder::new()
            .with_tree(KinematicTree::new("nothing"))
            .build();
        assert!(matches!(result, Err(RigError::Model(_))));
    }

    #[test]
    fn invalid_config_is_an_error() {
        let config = RigConfig {
            controller: ControllerConfig {
                dt: 0.0,
                ..ControllerConfig::default()
            },
            ..RigConfig::default()
        };
        let result = RigBuilder::new()
            .with_tree(mixed_arm())
            .with_config(config)
            .build();
        assert!(matches!(result, Err(RigError::Config(_))));
    }

    #[test]
    fn initial_position_overrides_config() {
        let mut config = RigConfig::default();
        config
            .initial_joint_positions
            .insert("shoulder".into(), 0.1);
        let rig = RigBuilder::new()
            .with_tree(mixed_arm())
            .with_config(config)
            .with_initial_position("shoulder", 0.4)
            .with_initial_position("slide", 9.0)
            .build()
            .unwrap();
        assert_eq!(rig.controller().position("shoulder"), Some(0.4));
        // Clamped into the slide's range.
        assert_eq!(rig.controller().position("slide"), Some(0.3));
    }

    #[test]
    fn engine_enables_physics_mode() {
        let rig = RigBuilder::new()
            .with_tree(mixed_arm())
            .with_engine(Box::new(ScriptedEngine::new()))
            .build()
            .unwrap();
        assert_eq!(rig.controller().mode(), ControlMode::Physics);
    }

    #[test]
    fn default_builder_is_kinematic() {
        let rig = RigBuilder::default()
            .with_tree(mixed_arm())
            .build()
            .unwrap();
        assert!(!rig.is_using_physics());
        assert_eq!(rig.tree().dof(), 3);
    }
}
