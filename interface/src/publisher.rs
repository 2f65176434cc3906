use std::collections::VecDeque;

use kinematics_service::{Header, JointState};
use scene::PlanningSceneMonitor;

/// Simulated joint state source: replays queued waypoints into the scene.
#[derive(Debug, Default)]
pub struct StatePublisher {
    trajectory: VecDeque<JointState>,
}

impl StatePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_waypoint(&mut self, state: JointState) {
        self.trajectory.push_back(state);
    }

    /// Queue `steps` evenly spaced waypoints from `from` to `to`, ending on `to`.
    pub fn plan_motion(&mut self, names: &[String], from: &[f64], to: &[f64], steps: usize) {
        for step in 1..=steps {
            let t = step as f64 / steps as f64;
            self.add_waypoint(JointState {
                header: Header::stamped(""),
                name: names.to_vec(),
                position: from.iter().zip(to).map(|(a, b)| a + (b - a) * t).collect(),
                ..JointState::default()
            });
        }
    }

    pub fn next_step(&mut self) -> Option<JointState> {
        self.trajectory.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.trajectory.len()
    }

    /// Write the next waypoint into the scene. Returns `false` once drained.
    pub fn publish_next(&mut self, monitor: &PlanningSceneMonitor) -> bool {
        let Some(step) = self.next_step() else {
            return false;
        };
        let applied = monitor.update_scene(|scene| {
            scene
                .current_state_mut()
                .apply_joint_state(&step.name, &step.position)
        });
        log::trace!("published {applied} joint values");
        true
    }
}
