//! End-to-end tests for the full rig: targets in, controller ticks, draw
//! items out, with tree edits and physics fallback along the way.

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use marionette_control::controller::ControlMode;
    use marionette_core::config::{BasisConfig, RigConfig};
    use marionette_test_utils::{RecordingSink, ScriptedEngine, mixed_arm, two_link_arm};
    use marionette_test_utils::fixtures::visual_link;
    use marionette_urdf::{JointData, JointLimits, JointType, MeshHandle, Origin, TreeEdit};
    use nalgebra::Point3;

    use crate::builder::RigBuilder;
    use crate::rig::Rig;

    fn identity_rig() -> Rig {
        RigBuilder::new()
            .with_config(RigConfig {
                basis: BasisConfig::identity(),
                ..RigConfig::default()
            })
            .with_tree(mixed_arm())
            .build()
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Frame loop
    // -----------------------------------------------------------------------

    #[test]
    fn frame_loop_draws_every_visual_link() {
        let mut rig = identity_rig();
        let mut sink = RecordingSink::new();
        for _ in 0..10 {
            rig.set_targets([("shoulder", 0.5), ("wrist", 2.0), ("slide", 0.1)]);
            rig.tick_fixed();
            sink.clear();
            assert_eq!(rig.render(&mut sink), 5);
        }
        assert_eq!(rig.stats().frames, 10);
        assert_eq!(rig.stats().renders, 10);
        assert_eq!(rig.stats().last_draw_count, 5);
        assert_relative_eq!(rig.stats().mean_dt().unwrap(), 0.05, epsilon = 1e-6);
    }

    #[test]
    fn joints_settle_and_pose_follows() {
        let mut rig = RigBuilder::new()
            .with_config(RigConfig {
                basis: BasisConfig::identity(),
                ..RigConfig::default()
            })
            .with_tree(two_link_arm([0.0, 0.0, 0.0]))
            .build()
            .unwrap();
        rig.set_target("joint1", std::f32::consts::FRAC_PI_2);
        for _ in 0..200 {
            rig.tick(0.05);
        }
        let mut sink = RecordingSink::new();
        rig.render(&mut sink);
        let tip = sink.last("link1").unwrap().transform * Point3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(tip, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-3);
    }

    #[test]
    fn invalid_dt_is_not_a_frame() {
        let mut rig = identity_rig();
        rig.tick(0.0);
        rig.tick(f32::INFINITY);
        assert_eq!(rig.stats().frames, 0);
    }

    #[test]
    fn default_basis_turns_model_up_into_scene_up() {
        let mut rig = RigBuilder::new()
            .with_tree(two_link_arm([0.0, 0.0, 1.0]))
            .build()
            .unwrap();
        let poses = rig.link_poses();
        assert_relative_eq!(
            poses.position("link1").unwrap(),
            Point3::new(0.0, 1.0, 0.0),
            epsilon = 1e-6
        );
        rig.tick_fixed();
        assert_eq!(rig.stats().frames, 1);
    }

    // -----------------------------------------------------------------------
    // Physics
    // -----------------------------------------------------------------------

    #[test]
    fn fallback_frame_is_recorded() {
        let mut rig = RigBuilder::new()
            .with_tree(mixed_arm())
            .with_engine(Box::new(ScriptedEngine::new().fail_on_step(3)))
            .build()
            .unwrap();
        assert_eq!(rig.mode(), ControlMode::Physics);
        for _ in 0..6 {
            rig.tick(0.05);
        }
        assert!(!rig.is_using_physics());
        assert_eq!(rig.stats().physics_fallback_frame, Some(4));
        assert_eq!(rig.stats().frames, 6);
    }

    #[test]
    fn reset_keeps_physics_loss_visible() {
        let mut rig = RigBuilder::new()
            .with_tree(mixed_arm())
            .with_engine(Box::new(ScriptedEngine::new().fail_on_step(0)))
            .build()
            .unwrap();
        rig.tick(0.05);
        assert!(!rig.is_using_physics());
        rig.reset();
        assert!(!rig.is_using_physics());
        assert_eq!(rig.stats().frames, 0);
        assert_eq!(rig.stats().physics_fallback_frame, Some(1));
    }

    #[test]
    fn healthy_engine_has_no_fallback() {
        let mut rig = RigBuilder::new()
            .with_tree(mixed_arm())
            .with_engine(Box::new(ScriptedEngine::new()))
            .build()
            .unwrap();
        for _ in 0..6 {
            rig.tick(0.05);
        }
        assert!(rig.is_using_physics());
        assert_eq!(rig.stats().physics_fallback_frame, None);
    }

    // -----------------------------------------------------------------------
    // Tree edits
    // -----------------------------------------------------------------------

    #[test]
    fn commit_adds_joint_and_keeps_existing_state() {
        let mut rig = identity_rig();
        rig.set_target("shoulder", 0.7);
        for _ in 0..100 {
            rig.tick(0.05);
        }
        let shoulder = rig.controller().position("shoulder").unwrap();

        let report = rig
            .commit(
                TreeEdit::new()
                    .add_link(visual_link("finger"))
                    .add_joint(
                        JointData::new("pinch", JointType::Revolute, "tool", "finger")
                            .with_origin(Origin::from_xyz([0.02, 0.0, 0.0]))
                            .with_axis([0.0, 0.0, 1.0])
                            .with_limits(JointLimits::position(-0.5, 0.5)),
                    ),
            )
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(rig.tree().dof(), 4);
        assert_eq!(rig.controller().joint_count(), 4);
        assert_relative_eq!(rig.controller().position("shoulder").unwrap(), shoulder);
        assert_relative_eq!(rig.controller().target("shoulder").unwrap(), 0.7);

        let mut sink = RecordingSink::new();
        assert_eq!(rig.render(&mut sink), 6);
        assert_eq!(sink.draws.last().unwrap().link, "finger");
    }

    #[test]
    fn failed_commit_changes_nothing() {
        let mut rig = identity_rig();
        let before = rig.link_poses();
        let result = rig.commit(
            TreeEdit::new()
                .remove_joint("wrist")
                .remove_joint("no_such_joint"),
        );
        assert!(result.is_err());
        assert_eq!(rig.tree().dof(), 3);
        assert_eq!(rig.link_poses().len(), before.len());
    }

    #[test]
    fn removing_a_joint_drops_its_subtree_from_the_walk() {
        let mut rig = identity_rig();
        rig.commit(TreeEdit::new().remove_joint("slide")).unwrap();
        assert!(rig.controller().state("slide").is_none());
        let poses = rig.link_poses();
        assert!(poses.get("carriage").is_none());
        assert!(poses.get("tool").is_none());
        assert_eq!(poses.len(), 3);
    }

    #[test]
    fn commit_ends_physics_mode() {
        let mut rig = RigBuilder::new()
            .with_tree(mixed_arm())
            .with_engine(Box::new(ScriptedEngine::new()))
            .build()
            .unwrap();
        rig.commit(
            TreeEdit::new().replace_joint(
                JointData::new("shoulder", JointType::Revolute, "base", "upper")
                    .with_axis([0.0, 1.0, 0.0])
                    .with_limits(JointLimits::position(-0.5, 0.5)),
            ),
        )
        .unwrap();
        assert_eq!(rig.mode(), ControlMode::Kinematic);
        assert_eq!(rig.controller().state("shoulder").unwrap().range(), Some((-0.5, 0.5)));
    }

    // -----------------------------------------------------------------------
    // Misc
    // -----------------------------------------------------------------------

    #[test]
    fn mesh_handles_flow_to_draws() {
        let mut rig = identity_rig();
        rig.set_mesh_handle("forearm", MeshHandle(7)).unwrap();
        assert!(rig.set_mesh_handle("ghost", MeshHandle(8)).is_err());
        let mut sink = RecordingSink::new();
        rig.render(&mut sink);
        assert_eq!(sink.last("forearm").unwrap().mesh, Some(MeshHandle(7)));
    }

    #[test]
    fn reset_restores_initial_pose_and_stats() {
        let mut rig = RigBuilder::new()
            .with_tree(mixed_arm())
            .with_initial_position("wrist", 1.0)
            .build()
            .unwrap();
        rig.set_target("wrist", -2.0);
        for _ in 0..50 {
            rig.tick(0.05);
        }
        rig.reset();
        assert_relative_eq!(rig.controller().position("wrist").unwrap(), 1.0);
        assert_eq!(rig.stats().frames, 0);
        let snapshot = rig.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.iter().all(|s| s.velocity == 0.0));
    }
}
