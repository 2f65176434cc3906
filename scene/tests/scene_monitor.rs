use std::sync::Arc;
use std::thread;
use std::time::Duration;

use approx::assert_relative_eq;
use kinematics::{Pose, testing};
use scene::{
    ConstraintSet, Constraints, JointConstraint, PlanningScene, PlanningSceneMonitor,
    PositionConstraint,
};

fn monitor() -> Arc<PlanningSceneMonitor> {
    let mut scene = PlanningScene::new(Arc::new(testing::six_dof_arm()));
    scene
        .transforms_mut()
        .set_transform("table", Pose::translation(0.5, 0.0, 0.0));
    Arc::new(PlanningSceneMonitor::new(scene))
}

#[test]
fn snapshot_survives_later_writes() {
    let monitor = monitor();
    let snapshot = monitor.snapshot();

    monitor.update_scene(|scene| {
        scene
            .current_state_mut()
            .set_variable_position("j1_base_yaw", 0.5);
        scene.transforms_mut().remove_transform("table");
    });

    assert_eq!(snapshot.state.variable_position("j1_base_yaw"), Some(0.0));
    assert!(snapshot.transforms.is_fixed_frame("table"));
    assert!(!monitor.snapshot().transforms.is_fixed_frame("table"));
}

#[test]
fn writer_waits_for_reader_then_proceeds() {
    let monitor = monitor();
    let reader = monitor.lock_scene_read();

    let writer_monitor = Arc::clone(&monitor);
    let writer = thread::spawn(move || {
        writer_monitor.update_scene(|scene| {
            scene
                .current_state_mut()
                .set_variable_position("j2_shoulder_pitch", 0.3);
        })
    });

    thread::sleep(Duration::from_millis(50));
    assert_eq!(
        reader.current_state().variable_position("j2_shoulder_pitch"),
        Some(0.0)
    );
    reader.release();

    writer.join().unwrap();
    assert_eq!(
        monitor.current_state().variable_position("j2_shoulder_pitch"),
        Some(0.3)
    );
}

#[test]
fn constraints_built_from_snapshot_frames() {
    let monitor = monitor();
    let snapshot = monitor.snapshot();
    let mut set = ConstraintSet::new(Arc::clone(monitor.robot_model()));

    let request = Constraints {
        joint_constraints: vec![JointConstraint {
            joint_name: "j1_base_yaw".into(),
            position: 0.0,
            tolerance_above: 0.1,
            tolerance_below: 0.1,
            weight: 1.0,
        }],
        position_constraints: vec![PositionConstraint {
            link_name: "gripper".into(),
            frame_id: "table".into(),
            // (-0.5, 0, 0.96) in the table frame is the gripper's zero-pose position.
            target_point: [-0.5, 0.0, 0.96],
            radius: 0.01,
            weight: 1.0,
        }],
        ..Default::default()
    };
    assert!(set.add(&request, &snapshot.transforms, &snapshot.state));
    assert_eq!(set.len(), 2);

    let eval = set.decide(&snapshot.state);
    assert!(eval.satisfied);
    assert_relative_eq!(eval.distance, 0.0, epsilon = 1e-9);

    let mut moved = snapshot.state.clone();
    moved.set_variable_position("j2_shoulder_pitch", 0.5);
    assert!(!set.decide(&moved).satisfied);
}
