//! The dual-mode joint controller.
//!
//! [`JointController`] owns one [`JointState`] per movable joint and advances
//! them every tick, either with the kinematic PD integrator or through an
//! injected rigid-body engine. The switch from physics to kinematic is
//! one-way: the first setup or tick failure (error or panic) drops the
//! engine for the rest of the session.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, error, info, warn};

use marionette_core::config::{ControllerConfig, PhysicsConfig, RigConfig};
use marionette_urdf::{JointPositions, KinematicTree};

use crate::engine::{PhysicsEngine, PhysicsError};
use crate::kinematic::KinematicStepper;
use crate::physics::PhysicsDriver;
use crate::state::{JointSnapshot, JointState};

// ---------------------------------------------------------------------------
// ControlMode
// ---------------------------------------------------------------------------

/// Which integrator is currently advancing joint state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Kinematic,
    Physics,
}

// ---------------------------------------------------------------------------
// ControllerBuilder
// ---------------------------------------------------------------------------

/// Builder for [`JointController`].
///
/// ```
/// use marionette_control::prelude::*;
/// use marionette_urdf::{KinematicTree, LinkData};
///
/// let mut tree = KinematicTree::new("puck");
/// tree.add_link(LinkData::new("base"));
/// tree.build_hierarchy().unwrap();
///
/// let controller = ControllerBuilder::new(&tree).build();
/// assert_eq!(controller.mode(), ControlMode::Kinematic);
/// ```
pub struct ControllerBuilder<'a> {
    tree: &'a KinematicTree,
    config: ControllerConfig,
    physics: PhysicsConfig,
    initial_positions: HashMap<String, f32>,
    engine: Option<Box<dyn PhysicsEngine>>,
}

impl<'a> ControllerBuilder<'a> {
    pub fn new(tree: &'a KinematicTree) -> Self {
        Self {
            tree,
            config: ControllerConfig::default(),
            physics: PhysicsConfig::default(),
            initial_positions: HashMap::new(),
            engine: None,
        }
    }

    /// Take controller, physics and initial positions from a rig config.
    #[must_use]
    pub fn rig_config(mut self, config: &RigConfig) -> Self {
        self.config = config.controller.clone();
        self.physics = config.physics.clone();
        self.initial_positions = config.initial_joint_positions.clone();
        self
    }

    #[must_use]
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn physics_config(mut self, physics: PhysicsConfig) -> Self {
        self.physics = physics;
        self
    }

    /// Starting coordinate per joint name. Unlisted joints start at zero.
    #[must_use]
    pub fn initial_positions(mut self, positions: HashMap<String, f32>) -> Self {
        self.initial_positions = positions;
        self
    }

    /// Engine for physics-backed mode.
    #[must_use]
    pub fn engine(mut self, engine: Box<dyn PhysicsEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Create joint state and attempt physics setup once.
    pub fn build(self) -> JointController {
        let states = initial_states(self.tree, &self.initial_positions);
        let index = index_states(&states);
        let mut controller = JointController {
            stepper: KinematicStepper::from_config(&self.config),
            states,
            index,
            config: self.config,
            physics_config: self.physics,
            initial_positions: self.initial_positions,
            physics: None,
        };

        match self.engine {
            Some(engine) if controller.physics_config.enabled => {
                controller.physics = controller.setup_physics(engine, self.tree);
            }
            Some(engine) => {
                info!(
                    engine = engine.name(),
                    "physics disabled by configuration, using kinematic mode"
                );
            }
            None => debug!("no physics engine supplied, using kinematic mode"),
        }
        controller
    }
}

fn initial_states(tree: &KinematicTree, initial: &HashMap<String, f32>) -> Vec<JointState> {
    tree.movable_joints()
        .map(|joint| {
            let q = initial.get(&joint.name).copied().unwrap_or(0.0);
            JointState::from_joint(joint, q)
        })
        .collect()
}

fn index_states(states: &[JointState]) -> HashMap<String, usize> {
    states
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name().to_string(), i))
        .collect()
}

// ---------------------------------------------------------------------------
// JointController
// ---------------------------------------------------------------------------

/// Advances joint state toward targets every tick.
///
/// Never fails at runtime: unknown joints and out-of-range targets are
/// ignored or clamped, and physics failures degrade to kinematic mode.
#[derive(Debug)]
pub struct JointController {
    states: Vec<JointState>,
    index: HashMap<String, usize>,
    stepper: KinematicStepper,
    config: ControllerConfig,
    physics_config: PhysicsConfig,
    initial_positions: HashMap<String, f32>,
    physics: Option<PhysicsDriver>,
}

impl JointController {
    /// Kinematic-only controller with the given gains.
    pub fn new(tree: &KinematicTree, config: ControllerConfig) -> Self {
        ControllerBuilder::new(tree).config(config).build()
    }

    pub fn builder(tree: &KinematicTree) -> ControllerBuilder<'_> {
        ControllerBuilder::new(tree)
    }

    fn setup_physics(
        &self,
        engine: Box<dyn PhysicsEngine>,
        tree: &KinematicTree,
    ) -> Option<PhysicsDriver> {
        let name = engine.name().to_string();
        if !engine.is_initialized() {
            info!(engine = %name, "physics engine not initialized, using kinematic mode");
            return None;
        }
        let result = catch_unwind(AssertUnwindSafe(|| {
            PhysicsDriver::build(engine, tree, &self.states, &self.physics_config)
        }));
        match result {
            Ok(Ok(driver)) => {
                info!(engine = %name, bodies = driver.body_count(), "physics-backed mode active");
                Some(driver)
            }
            Ok(Err(err)) => {
                error!(engine = %name, %err, "physics setup failed, falling back to kinematic mode");
                None
            }
            Err(_) => {
                error!(engine = %name, "physics setup panicked, falling back to kinematic mode");
                None
            }
        }
    }

    // -- Targets --

    /// Set a joint's target position, clamped or wrapped for its kind.
    ///
    /// Returns `false` (and logs) if no movable joint has this name.
    pub fn set_target(&mut self, joint: &str, target: f32) -> bool {
        let Some(&i) = self.index.get(joint) else {
            debug!(joint, "set_target on unknown joint ignored");
            return false;
        };
        self.states[i].set_target(target);
        true
    }

    /// Set a joint's target velocity. Non-finite values become zero.
    pub fn set_target_velocity(&mut self, joint: &str, velocity: f32) -> bool {
        let Some(&i) = self.index.get(joint) else {
            debug!(joint, "set_target_velocity on unknown joint ignored");
            return false;
        };
        self.states[i].target_velocity = if velocity.is_finite() { velocity } else { 0.0 };
        true
    }

    /// Apply a batch of `(joint, target)` pairs. Returns how many matched.
    pub fn set_targets<'n, I>(&mut self, targets: I) -> usize
    where
        I: IntoIterator<Item = (&'n str, f32)>,
    {
        targets
            .into_iter()
            .filter(|&(joint, target)| self.set_target(joint, target))
            .count()
    }

    // -- Queries --

    pub fn target(&self, joint: &str) -> Option<f32> {
        self.state(joint).map(|s| s.target)
    }

    pub fn position(&self, joint: &str) -> Option<f32> {
        self.state(joint).map(|s| s.position)
    }

    pub fn velocity(&self, joint: &str) -> Option<f32> {
        self.state(joint).map(|s| s.velocity)
    }

    pub fn state(&self, joint: &str) -> Option<&JointState> {
        self.index.get(joint).map(|&i| &self.states[i])
    }

    /// All joint states, in tree order.
    pub fn states(&self) -> &[JointState] {
        &self.states
    }

    pub fn joint_count(&self) -> usize {
        self.states.len()
    }

    pub fn is_using_physics(&self) -> bool {
        self.physics.is_some()
    }

    pub fn mode(&self) -> ControlMode {
        if self.physics.is_some() {
            ControlMode::Physics
        } else {
            ControlMode::Kinematic
        }
    }

    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Copy of every joint's state.
    pub fn snapshot(&self) -> Vec<JointSnapshot> {
        self.states.iter().map(JointState::snapshot).collect()
    }

    // -- Stepping --

    /// Advance all joints by `dt` seconds.
    ///
    /// Non-positive or non-finite `dt` is ignored. A physics failure during
    /// the tick switches to kinematic mode for this and every later tick.
    pub fn update(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            debug!(dt, "update with invalid dt ignored");
            return;
        }
        if let Some(driver) = self.physics.as_mut() {
            let states = &mut self.states;
            let outcome = catch_unwind(AssertUnwindSafe(|| driver.tick(states, dt)));
            match outcome {
                Ok(Ok(())) => return,
                Ok(Err(err)) => self.fall_back(&err),
                Err(_) => self.fall_back(&PhysicsError::Backend("engine panicked during step".into())),
            }
        }
        self.stepper.step_all(&mut self.states, dt);
    }

    /// Advance by the configured control period.
    pub fn tick(&mut self) {
        self.update(self.config.dt);
    }

    fn fall_back(&mut self, err: &PhysicsError) {
        let engine = self
            .physics
            .take()
            .map(|d| d.engine_name().to_string())
            .unwrap_or_default();
        for state in &mut self.states {
            state.effort = 0.0;
            state.enforce_bounds();
        }
        error!(engine = %engine, %err, "physics tick failed, switching to kinematic mode permanently");
    }

    /// Return every joint to its initial position, at rest.
    ///
    /// In physics mode the engine bodies are reset too; a failure there
    /// falls back to kinematic mode.
    pub fn reset(&mut self) {
        for state in &mut self.states {
            let q = self.initial_positions.get(state.name()).copied().unwrap_or(0.0);
            state.reset_to(q);
        }
        if let Some(driver) = self.physics.as_mut() {
            let outcome = catch_unwind(AssertUnwindSafe(|| driver.reset()));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => self.fall_back(&err),
                Err(_) => self.fall_back(&PhysicsError::Backend("engine panicked during reset".into())),
            }
        }
        debug!(joints = self.states.len(), "controller reset");
    }

    /// Rebuild joint state after the tree changed structurally.
    ///
    /// Joints that survive by name keep position, velocity and targets. The
    /// engine mirrors the old structure, so physics mode ends here.
    pub fn reload(&mut self, tree: &KinematicTree) {
        let mut states = initial_states(tree, &self.initial_positions);
        for state in &mut states {
            if let Some(old) = self.state(state.name()) {
                state.position = state.constrain(old.position);
                state.velocity = old.velocity;
                state.set_target(old.target);
                state.target_velocity = old.target_velocity;
                state.enforce_bounds();
            }
        }
        if let Some(driver) = self.physics.take() {
            warn!(
                engine = driver.engine_name(),
                "tree reloaded, physics-backed mode ended"
            );
        }
        self.index = index_states(&states);
        self.states = states;
        info!(joints = self.states.len(), "controller reloaded");
    }
}

impl JointPositions for JointController {
    fn joint_position(&self, joint: &str) -> Option<f32> {
        self.position(joint)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
