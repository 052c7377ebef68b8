//! Stand-ins for external collaborators: a scripted rigid-body engine and a
//! render sink that records what it is given.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::{Isometry3, Point3, Similarity3, Vector3};

use marionette_control::engine::{
    BodyDesc, BodyId, BodyKind, BodyVelocity, EngineJointDesc, EngineJointId, EngineJointKind,
    PhysicsEngine, PhysicsError,
};
use marionette_control::state::wrap_angle;
use marionette_pose::{DrawItem, RenderSink};
use marionette_urdf::MeshHandle;

// ---------------------------------------------------------------------------
// ScriptedEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ScriptedBody {
    pose: Isometry3<f32>,
    velocity: BodyVelocity,
    force: Vector3<f32>,
    fixed: bool,
    inv_mass: f32,
}

#[derive(Debug, Clone)]
struct ScriptedJoint {
    desc: EngineJointDesc,
    q: f32,
    v: f32,
    effort: f32,
}

/// A deterministic fake engine.
///
/// Each joint is a unit-inertia, lightly damped 1-DoF system integrated
/// independently. Faults can be scheduled on setup or on the n-th call to
/// [`step`](PhysicsEngine::step) (zero-based, counting substeps).
#[derive(Debug)]
pub struct ScriptedEngine {
    initialized: bool,
    fail_on_setup: bool,
    fail_on_step: Option<usize>,
    panic_on_step: Option<usize>,
    nan_on_step: Option<usize>,
    damping: f32,
    bodies: Vec<ScriptedBody>,
    joints: Vec<ScriptedJoint>,
    steps: Arc<AtomicUsize>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            initialized: true,
            fail_on_setup: false,
            fail_on_step: None,
            panic_on_step: None,
            nan_on_step: None,
            damping: 0.5,
            bodies: Vec::new(),
            joints: Vec::new(),
            steps: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report `is_initialized() == false`.
    #[must_use]
    pub const fn uninitialized(mut self) -> Self {
        self.initialized = false;
        self
    }

    /// Reject the first body created.
    #[must_use]
    pub const fn fail_on_setup(mut self) -> Self {
        self.fail_on_setup = true;
        self
    }

    /// Return an error from the `n`-th step.
    #[must_use]
    pub const fn fail_on_step(mut self, n: usize) -> Self {
        self.fail_on_step = Some(n);
        self
    }

    /// Panic inside the `n`-th step.
    #[must_use]
    pub const fn panic_on_step(mut self, n: usize) -> Self {
        self.panic_on_step = Some(n);
        self
    }

    /// Make every joint read NaN after the `n`-th step.
    #[must_use]
    pub const fn nan_on_step(mut self, n: usize) -> Self {
        self.nan_on_step = Some(n);
        self
    }

    /// Shared counter of completed and attempted steps.
    pub fn step_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.steps)
    }

    fn body(&self, id: BodyId) -> Result<&ScriptedBody, PhysicsError> {
        self.bodies.get(id.0).ok_or(PhysicsError::UnknownBody(id))
    }

    fn body_mut(&mut self, id: BodyId) -> Result<&mut ScriptedBody, PhysicsError> {
        self.bodies.get_mut(id.0).ok_or(PhysicsError::UnknownBody(id))
    }

    fn joint(&self, id: EngineJointId) -> Result<&ScriptedJoint, PhysicsError> {
        self.joints.get(id.0).ok_or(PhysicsError::UnknownJoint(id))
    }

    /// Re-measure joints touching `body` after its pose was overwritten.
    fn remeasure(&mut self, body: BodyId) {
        for joint in &mut self.joints {
            if joint.desc.parent != body && joint.desc.child != body {
                continue;
            }
            let (Some(parent), Some(child)) = (
                self.bodies.get(joint.desc.parent.0),
                self.bodies.get(joint.desc.child.0),
            ) else {
                continue;
            };
            joint.q = joint.desc.measure(&parent.pose, &child.pose);
            joint.v = 0.0;
        }
    }
}

impl PhysicsEngine for ScriptedEngine {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyId, PhysicsError> {
        if self.fail_on_setup {
            return Err(PhysicsError::Backend(format!(
                "scripted setup failure at body {}",
                desc.name
            )));
        }
        self.bodies.push(ScriptedBody {
            pose: desc.pose,
            velocity: BodyVelocity::default(),
            force: Vector3::zeros(),
            fixed: desc.kind == BodyKind::Fixed,
            inv_mass: if desc.mass > 0.0 { desc.mass.recip() } else { 0.0 },
        });
        Ok(BodyId(self.bodies.len() - 1))
    }

    fn create_joint(&mut self, desc: &EngineJointDesc) -> Result<EngineJointId, PhysicsError> {
        let parent = self.body(desc.parent)?.pose;
        let child = self.body(desc.child)?.pose;
        self.joints.push(ScriptedJoint {
            q: desc.measure(&parent, &child),
            desc: desc.clone(),
            v: 0.0,
            effort: 0.0,
        });
        Ok(EngineJointId(self.joints.len() - 1))
    }

    fn body_pose(&self, body: BodyId) -> Result<Isometry3<f32>, PhysicsError> {
        Ok(self.body(body)?.pose)
    }

    fn set_body_pose(&mut self, body: BodyId, pose: Isometry3<f32>) -> Result<(), PhysicsError> {
        self.body_mut(body)?.pose = pose;
        self.remeasure(body);
        Ok(())
    }

    fn body_velocity(&self, body: BodyId) -> Result<BodyVelocity, PhysicsError> {
        Ok(self.body(body)?.velocity)
    }

    fn set_body_velocity(
        &mut self,
        body: BodyId,
        velocity: BodyVelocity,
    ) -> Result<(), PhysicsError> {
        self.body_mut(body)?.velocity = velocity;
        Ok(())
    }

    fn apply_force(&mut self, body: BodyId, force: Vector3<f32>) -> Result<(), PhysicsError> {
        self.body_mut(body)?.force += force;
        Ok(())
    }

    fn apply_torque(&mut self, body: BodyId, _torque: Vector3<f32>) -> Result<(), PhysicsError> {
        self.body(body)?;
        Ok(())
    }

    fn joint_position(&self, joint: EngineJointId) -> Result<f32, PhysicsError> {
        Ok(self.joint(joint)?.q)
    }

    fn joint_velocity(&self, joint: EngineJointId) -> Result<f32, PhysicsError> {
        Ok(self.joint(joint)?.v)
    }

    fn apply_joint_effort(
        &mut self,
        joint: EngineJointId,
        effort: f32,
    ) -> Result<(), PhysicsError> {
        let joint = self
            .joints
            .get_mut(joint.0)
            .ok_or(PhysicsError::UnknownJoint(joint))?;
        joint.effort += effort;
        Ok(())
    }

    fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        let n = self.steps.fetch_add(1, Ordering::SeqCst);
        assert!(self.panic_on_step != Some(n), "scripted panic at step {n}");
        if self.fail_on_step == Some(n) {
            return Err(PhysicsError::Backend(format!("scripted failure at step {n}")));
        }

        for joint in &mut self.joints {
            let accel = (-self.damping).mul_add(joint.v, joint.effort);
            joint.effort = 0.0;
            match joint.desc.kind {
                EngineJointKind::Weld => continue,
                EngineJointKind::Hinge | EngineJointKind::Slider => {
                    joint.v = accel.mul_add(dt, joint.v);
                    joint.q = joint.v.mul_add(dt, joint.q);
                }
            }
            if let Some((lo, hi)) = joint.desc.limits {
                if joint.q < lo || joint.q > hi {
                    joint.q = joint.q.clamp(lo, hi);
                    joint.v = 0.0;
                }
            } else if joint.desc.kind == EngineJointKind::Hinge {
                joint.q = wrap_angle(joint.q);
            }
        }

        for body in &mut self.bodies {
            if !body.fixed {
                body.velocity.linear += body.force * (body.inv_mass * dt);
                body.pose.translation.vector += body.velocity.linear * dt;
            }
            body.force = Vector3::zeros();
        }

        if self.nan_on_step == Some(n) {
            for joint in &mut self.joints {
                joint.q = f32::NAN;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Owned copy of a [`DrawItem`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub link: String,
    pub transform: Similarity3<f32>,
    pub mesh: Option<MeshHandle>,
    pub color: Option<[f32; 4]>,
}

impl RecordedDraw {
    pub fn position(&self) -> Point3<f32> {
        self.transform * Point3::origin()
    }
}

/// Render sink that keeps every draw item it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub draws: Vec<RecordedDraw>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent draw of `link`.
    pub fn last(&self, link: &str) -> Option<&RecordedDraw> {
        self.draws.iter().rev().find(|d| d.link == link)
    }

    pub fn clear(&mut self) {
        self.draws.clear();
    }
}

impl RenderSink for RecordingSink {
    fn draw(&mut self, item: DrawItem<'_>) {
        self.draws.push(RecordedDraw {
            link: item.link.to_string(),
            transform: item.transform,
            mesh: item.mesh,
            color: item.color(),
        });
    }
}
