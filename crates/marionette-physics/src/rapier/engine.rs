//! [`RapierEngine`]: the [`PhysicsEngine`] implementation over rapier3d.

use nalgebra::{Isometry3, Vector3};
use rapier3d::prelude::{RigidBody, RigidBodyHandle};
use tracing::{debug, trace};

use marionette_control::engine::{
    BodyDesc, BodyId, BodyVelocity, EngineJointDesc, EngineJointId, EngineJointKind,
    PhysicsEngine, PhysicsError,
};
use marionette_core::config::PhysicsConfig;

use super::bridge::{build_body, build_joint};
use super::context::RapierContext;

struct JointEntry {
    desc: EngineJointDesc,
    parent: RigidBodyHandle,
    child: RigidBodyHandle,
}

/// Rigid-body engine backed by a private [`RapierContext`].
///
/// Bodies carry no colliders: links interact only through their joints.
pub struct RapierEngine {
    context: RapierContext,
    bodies: Vec<RigidBodyHandle>,
    joints: Vec<JointEntry>,
}

impl std::fmt::Debug for RapierEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapierEngine")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl Default for RapierEngine {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, 0.0, -9.81))
    }
}

impl RapierEngine {
    pub fn new(gravity: Vector3<f32>) -> Self {
        Self {
            context: RapierContext::new(gravity),
            bodies: Vec::new(),
            joints: Vec::new(),
        }
    }

    /// Engine with gravity taken from the physics config.
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self::new(Vector3::from(config.gravity))
    }

    /// Read access to the underlying rapier state.
    pub const fn context(&self) -> &RapierContext {
        &self.context
    }

    fn handle(&self, id: BodyId) -> Result<RigidBodyHandle, PhysicsError> {
        self.bodies
            .get(id.0)
            .copied()
            .ok_or(PhysicsError::UnknownBody(id))
    }

    fn body(&self, id: BodyId) -> Result<&RigidBody, PhysicsError> {
        let handle = self.handle(id)?;
        self.context
            .rigid_body_set
            .get(handle)
            .ok_or(PhysicsError::UnknownBody(id))
    }

    fn body_mut(&mut self, id: BodyId) -> Result<&mut RigidBody, PhysicsError> {
        let handle = self.handle(id)?;
        self.context
            .rigid_body_set
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(id))
    }

    fn joint_bodies(
        &self,
        id: EngineJointId,
    ) -> Result<(&JointEntry, &RigidBody, &RigidBody), PhysicsError> {
        let entry = self.joints.get(id.0).ok_or(PhysicsError::UnknownJoint(id))?;
        let set = &self.context.rigid_body_set;
        let parent = set.get(entry.parent).ok_or(PhysicsError::UnknownJoint(id))?;
        let child = set.get(entry.child).ok_or(PhysicsError::UnknownJoint(id))?;
        Ok((entry, parent, child))
    }
}

impl PhysicsEngine for RapierEngine {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "rapier3d"
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyId, PhysicsError> {
        if !(desc.mass.is_finite() && desc.mass > 0.0) {
            return Err(PhysicsError::Backend(format!(
                "body {} has invalid mass {}",
                desc.name, desc.mass
            )));
        }
        let handle = self.context.rigid_body_set.insert(build_body(desc));
        self.bodies.push(handle);
        trace!(body = %desc.name, kind = ?desc.kind, "rapier body created");
        Ok(BodyId(self.bodies.len() - 1))
    }

    fn create_joint(&mut self, desc: &EngineJointDesc) -> Result<EngineJointId, PhysicsError> {
        let parent = self.handle(desc.parent)?;
        let child = self.handle(desc.child)?;
        self.context
            .impulse_joint_set
            .insert(parent, child, build_joint(desc), true);
        self.joints.push(JointEntry {
            desc: desc.clone(),
            parent,
            child,
        });
        debug!(joint = %desc.name, kind = ?desc.kind, "rapier joint created");
        Ok(EngineJointId(self.joints.len() - 1))
    }

    fn body_pose(&self, body: BodyId) -> Result<Isometry3<f32>, PhysicsError> {
        Ok(*self.body(body)?.position())
    }

    fn set_body_pose(&mut self, body: BodyId, pose: Isometry3<f32>) -> Result<(), PhysicsError> {
        self.body_mut(body)?.set_position(pose, true);
        Ok(())
    }

    fn body_velocity(&self, body: BodyId) -> Result<BodyVelocity, PhysicsError> {
        let body = self.body(body)?;
        Ok(BodyVelocity {
            linear: *body.linvel(),
            angular: *body.angvel(),
        })
    }

    fn set_body_velocity(
        &mut self,
        body: BodyId,
        velocity: BodyVelocity,
    ) -> Result<(), PhysicsError> {
        let body = self.body_mut(body)?;
        body.set_linvel(velocity.linear, true);
        body.set_angvel(velocity.angular, true);
        Ok(())
    }

    fn apply_force(&mut self, body: BodyId, force: Vector3<f32>) -> Result<(), PhysicsError> {
        self.body_mut(body)?.add_force(force, true);
        Ok(())
    }

    fn apply_torque(&mut self, body: BodyId, torque: Vector3<f32>) -> Result<(), PhysicsError> {
        self.body_mut(body)?.add_torque(torque, true);
        Ok(())
    }

    fn joint_position(&self, joint: EngineJointId) -> Result<f32, PhysicsError> {
        let (entry, parent, child) = self.joint_bodies(joint)?;
        Ok(entry.desc.measure(parent.position(), child.position()))
    }

    fn joint_velocity(&self, joint: EngineJointId) -> Result<f32, PhysicsError> {
        let (entry, parent, child) = self.joint_bodies(joint)?;
        let axis = entry.desc.world_axis(parent.position());
        Ok(match entry.desc.kind {
            EngineJointKind::Hinge => (child.angvel() - parent.angvel()).dot(&axis),
            EngineJointKind::Slider => (child.linvel() - parent.linvel()).dot(&axis),
            EngineJointKind::Weld => 0.0,
        })
    }

    fn apply_joint_effort(
        &mut self,
        joint: EngineJointId,
        effort: f32,
    ) -> Result<(), PhysicsError> {
        let (entry, parent, _) = self.joint_bodies(joint)?;
        let along = entry.desc.world_axis(parent.position()) * effort;
        let (kind, parent, child) = (entry.desc.kind, entry.parent, entry.child);
        let set = &mut self.context.rigid_body_set;
        match kind {
            EngineJointKind::Hinge => {
                if let Some(body) = set.get_mut(child) {
                    body.add_torque(along, true);
                }
                if let Some(body) = set.get_mut(parent) {
                    body.add_torque(-along, true);
                }
            }
            EngineJointKind::Slider => {
                if let Some(body) = set.get_mut(child) {
                    body.add_force(along, true);
                }
                if let Some(body) = set.get_mut(parent) {
                    body.add_force(-along, true);
                }
            }
            EngineJointKind::Weld => {}
        }
        Ok(())
    }

    fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        self.context.step(dt);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
