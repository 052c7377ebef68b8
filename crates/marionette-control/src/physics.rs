//! Physics-backed joint integration.
//!
//! [`PhysicsDriver`] mirrors the kinematic tree into an injected
//! [`PhysicsEngine`]: one body per link and one engine joint per tree joint.
//! Each tick it closes a PD loop on engine-reported joint state, steps the
//! engine, and copies the result back into [`JointState`].

use std::collections::{HashMap, VecDeque};

use nalgebra::{Isometry3, Point3, Vector3};
use tracing::debug;

use marionette_core::config::PhysicsConfig;
use marionette_urdf::{JointData, JointType, KinematicTree, LinkData};

use crate::engine::{
    BodyDesc, BodyId, BodyKind, BodyVelocity, EngineJointDesc, EngineJointId, EngineJointKind,
    PhysicsEngine, PhysicsError,
};
use crate::state::{JointState, clamp_magnitude, shortest_angular_delta};

// ---------------------------------------------------------------------------
// PhysicsDriver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct DrivenJoint {
    /// Index into the controller's state slice.
    state: usize,
    handle: EngineJointId,
    max_effort: f32,
    /// Revolute joints keep a multi-turn coordinate; the engine reports
    /// hinge angles in `(-pi, pi]`.
    multi_turn: bool,
    last: f32,
    initial: f32,
}

impl DrivenJoint {
    /// Engine reading carried onto the joint's own coordinate.
    fn track(&mut self, raw: f32) -> f32 {
        if !self.multi_turn {
            return raw;
        }
        self.last += shortest_angular_delta(raw, self.last);
        self.last
    }
}

/// Owns an engine populated from a tree and drives it from joint targets.
pub struct PhysicsDriver {
    engine: Box<dyn PhysicsEngine>,
    kp: f32,
    kd: f32,
    substeps: u32,
    bodies: HashMap<String, BodyId>,
    driven: Vec<DrivenJoint>,
    initial_poses: Vec<(BodyId, Isometry3<f32>)>,
}

impl std::fmt::Debug for PhysicsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsDriver")
            .field("engine", &self.engine.name())
            .field("bodies", &self.bodies.len())
            .field("driven", &self.driven.len())
            .field("substeps", &self.substeps)
            .finish_non_exhaustive()
    }
}

impl PhysicsDriver {
    /// Populate `engine` from `tree`, posing bodies at the current joint
    /// positions in `states`.
    ///
    /// Any engine error aborts setup; the engine is dropped with the error.
    pub fn build(
        mut engine: Box<dyn PhysicsEngine>,
        tree: &KinematicTree,
        states: &[JointState],
        config: &PhysicsConfig,
    ) -> Result<Self, PhysicsError> {
        if !engine.is_initialized() {
            return Err(PhysicsError::NotInitialized);
        }
        let root = tree.root_link_name().ok_or(PhysicsError::NotInitialized)?;
        let positions: HashMap<&str, f32> =
            states.iter().map(|s| (s.name(), s.position)).collect();
        let poses = link_world_poses(tree, root, &positions);

        let mut bodies = HashMap::new();
        let mut initial_poses = Vec::new();
        for link in tree.links() {
            if bodies.contains_key(&link.name) {
                continue;
            }
            let kind = if link.name == root && config.fixed_base {
                BodyKind::Fixed
            } else {
                BodyKind::Dynamic
            };
            let pose = poses
                .get(link.name.as_str())
                .copied()
                .unwrap_or_else(Isometry3::identity);
            let desc = body_desc(link, kind, pose, config);
            let id = engine.create_body(&desc)?;
            bodies.insert(link.name.clone(), id);
            initial_poses.push((id, pose));
        }

        let state_index: HashMap<&str, usize> = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name(), i))
            .collect();
        let mut driven = Vec::new();
        for joint in tree.joints() {
            let in_hierarchy = tree
                .parent_joint_of(&joint.child)
                .is_some_and(|j| std::ptr::eq(j, joint));
            if !in_hierarchy {
                continue;
            }
            let Some(kind) = engine_joint_kind(joint.joint_type) else {
                debug!(joint = %joint.name, kind = ?joint.joint_type, "child body left free");
                continue;
            };
            let (Some(&parent), Some(&child)) =
                (bodies.get(&joint.parent), bodies.get(&joint.child))
            else {
                continue;
            };
            let desc = EngineJointDesc {
                name: joint.name.clone(),
                kind,
                parent,
                child,
                frame: *joint.origin_transform(),
                axis: *joint.axis(),
                limits: joint.position_range(),
            };
            let handle = engine.create_joint(&desc)?;

            if let Some(&state) = state_index.get(joint.name.as_str()) {
                let max_effort = states[state]
                    .max_effort()
                    .unwrap_or(config.default_max_effort);
                let initial = states[state].position;
                driven.push(DrivenJoint {
                    state,
                    handle,
                    max_effort,
                    multi_turn: joint.joint_type == JointType::Revolute,
                    last: initial,
                    initial,
                });
            }
        }

        debug!(
            engine = engine.name(),
            bodies = bodies.len(),
            driven = driven.len(),
            "physics setup complete"
        );
        Ok(Self {
            engine,
            kp: config.kp,
            kd: config.kd,
            substeps: config.substeps.max(1),
            bodies,
            driven,
            initial_poses,
        })
    }

    /// Name of the underlying engine.
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Number of bodies created in the engine.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Advance the engine by `dt` and copy joint state back into `states`.
    ///
    /// Positions and velocities are left untouched if any readback is
    /// non-finite.
    pub fn tick(&mut self, states: &mut [JointState], dt: f32) -> Result<(), PhysicsError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        #[allow(clippy::cast_precision_loss)]
        let sub_dt = dt / self.substeps as f32;

        for _ in 0..self.substeps {
            for dj in &mut self.driven {
                let state = &mut states[dj.state];
                let q = dj.track(self.engine.joint_position(dj.handle)?);
                let v = self.engine.joint_velocity(dj.handle)?;
                let error = if state.kind() == JointType::Continuous {
                    shortest_angular_delta(state.target, q)
                } else {
                    state.target - q
                };
                let effort = clamp_magnitude(
                    self.kp.mul_add(error, self.kd * (state.target_velocity - v)),
                    dj.max_effort,
                );
                self.engine.apply_joint_effort(dj.handle, effort)?;
                state.effort = effort;
            }
            self.engine.step(sub_dt)?;
        }

        let mut readback = Vec::with_capacity(self.driven.len());
        for dj in &mut self.driven {
            let raw = self.engine.joint_position(dj.handle)?;
            let v = self.engine.joint_velocity(dj.handle)?;
            if !raw.is_finite() {
                return Err(PhysicsError::Diverged {
                    joint: states[dj.state].name().to_string(),
                });
            }
            let q = dj.track(raw);
            if !(q.is_finite() && v.is_finite()) {
                return Err(PhysicsError::Diverged {
                    joint: states[dj.state].name().to_string(),
                });
            }
            readback.push((dj.state, q, v));
        }
        for (idx, q, v) in readback {
            let state = &mut states[idx];
            state.position = q;
            state.velocity = v;
            state.enforce_bounds();
        }
        Ok(())
    }

    /// Return every body to its pose at setup, at rest.
    pub fn reset(&mut self) -> Result<(), PhysicsError> {
        for &(id, pose) in &self.initial_poses {
            self.engine.set_body_pose(id, pose)?;
            self.engine.set_body_velocity(id, BodyVelocity::default())?;
        }
        for dj in &mut self.driven {
            dj.last = dj.initial;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const fn engine_joint_kind(joint_type: JointType) -> Option<EngineJointKind> {
    match joint_type {
        JointType::Revolute | JointType::Continuous => Some(EngineJointKind::Hinge),
        JointType::Prismatic => Some(EngineJointKind::Slider),
        JointType::Fixed => Some(EngineJointKind::Weld),
        JointType::Floating | JointType::Planar => None,
    }
}

/// World pose of every link reachable from `root`, breadth first.
fn link_world_poses<'a>(
    tree: &'a KinematicTree,
    root: &'a str,
    positions: &HashMap<&str, f32>,
) -> HashMap<&'a str, Isometry3<f32>> {
    let mut poses = HashMap::new();
    poses.insert(root, Isometry3::identity());
    let mut queue = VecDeque::from([root]);
    while let Some(link) = queue.pop_front() {
        let parent_pose = poses[link];
        for joint in tree.child_joints(link) {
            if poses.contains_key(joint.child.as_str()) {
                continue;
            }
            let q = joint_coordinate(joint, positions);
            poses.insert(joint.child.as_str(), parent_pose * joint.transform_at(q));
            queue.push_back(joint.child.as_str());
        }
    }
    poses
}

fn joint_coordinate(joint: &JointData, positions: &HashMap<&str, f32>) -> f32 {
    if joint.joint_type.is_actuated() {
        positions.get(joint.name.as_str()).copied().unwrap_or(0.0)
    } else {
        0.0
    }
}

/// Body description from link inertia, or a uniform box when none is given.
fn body_desc(
    link: &LinkData,
    kind: BodyKind,
    pose: Isometry3<f32>,
    config: &PhysicsConfig,
) -> BodyDesc {
    let (mass, center_of_mass, declared) = match &link.inertial {
        Some(inertial) if inertial.mass > 0.0 => {
            let [x, y, z] = inertial.origin.xyz;
            (inertial.mass, Point3::new(x, y, z), Some(inertial.principal()))
        }
        _ => (config.default_link_mass, Point3::origin(), None),
    };
    let principal_inertia = match declared {
        Some([ixx, iyy, izz]) if ixx > 0.0 && iyy > 0.0 && izz > 0.0 => {
            Vector3::new(ixx, iyy, izz)
        }
        _ => box_inertia(mass, config.default_box_size),
    };
    BodyDesc {
        name: link.name.clone(),
        kind,
        pose,
        mass,
        center_of_mass,
        principal_inertia,
    }
}

/// Principal moments of a solid box of the given mass and edge lengths.
pub fn box_inertia(mass: f32, size: [f32; 3]) -> Vector3<f32> {
    let [x, y, z] = size.map(|s| s * s);
    Vector3::new(y + z, x + z, x + y) * (mass / 12.0)
}
