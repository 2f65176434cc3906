//! Joint configuration of a [`RobotModel`] plus its derived link transforms.

use std::sync::Arc;
use std::time::Duration;

use nalgebra::Vector3;

use crate::Pose;
use crate::model::{JointGroup, RobotModel};
use crate::solver::IkGoal;

/// A concrete value for every joint variable of a model.
///
/// Cloning a state copies the values; states are never shared between
/// requests. Global link transforms are recomputed whenever positions change,
/// so reads never observe stale transforms.
#[derive(Debug, Clone)]
pub struct RobotState {
    model: Arc<RobotModel>,
    positions: Vec<f64>,
    link_transforms: Vec<Pose>,
}

impl RobotState {
    /// State at the model's default positions.
    pub fn new(model: Arc<RobotModel>) -> Self {
        let positions = model.default_positions();
        let mut state = Self {
            link_transforms: vec![Pose::identity(); model.links().len()],
            model,
            positions,
        };
        state.update_link_transforms();
        state
    }

    pub fn model(&self) -> &Arc<RobotModel> {
        &self.model
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn variable_position(&self, joint_name: &str) -> Option<f64> {
        self.model
            .variable_index(joint_name)
            .map(|variable| self.positions[variable])
    }

    /// Set every variable at once. Ignored unless `positions` covers all variables.
    pub fn set_variable_positions(&mut self, positions: &[f64]) -> bool {
        if positions.len() != self.positions.len() {
            return false;
        }
        self.positions.copy_from_slice(positions);
        self.update_link_transforms();
        true
    }

    /// Returns `false` if `joint_name` is not an actuated joint of the model.
    pub fn set_variable_position(&mut self, joint_name: &str, value: f64) -> bool {
        let Some(variable) = self.model.variable_index(joint_name) else {
            return false;
        };
        self.positions[variable] = value;
        self.update_link_transforms();
        true
    }

    /// Merge named joint values into this state. Unknown names are skipped.
    ///
    /// Returns how many values were applied.
    pub fn apply_joint_state(&mut self, names: &[String], positions: &[f64]) -> usize {
        let mut applied = 0;
        for (name, &value) in names.iter().zip(positions) {
            match self.model.variable_index(name) {
                Some(variable) => {
                    self.positions[variable] = value;
                    applied += 1;
                }
                None => log::debug!("ignoring unknown joint {name} in joint state"),
            }
        }
        if applied > 0 {
            self.update_link_transforms();
        }
        applied
    }

    pub fn group_positions(&self, group: &JointGroup) -> Vec<f64> {
        group
            .variable_indices()
            .iter()
            .map(|&variable| self.positions[variable])
            .collect()
    }

    /// Write group-ordered values and refresh the link transforms.
    pub fn set_group_positions(&mut self, group: &JointGroup, positions: &[f64]) {
        debug_assert_eq!(positions.len(), group.variable_count());
        for (&variable, &value) in group.variable_indices().iter().zip(positions) {
            self.positions[variable] = value;
        }
        self.update_link_transforms();
    }

    pub fn satisfies_bounds(&self) -> bool {
        self.positions
            .iter()
            .enumerate()
            .all(|(variable, &value)| self.model.variable_joint(variable).limits.contains(value))
    }

    pub fn enforce_bounds(&mut self) {
        for variable in 0..self.positions.len() {
            let limits = self.model.variable_joint(variable).limits;
            self.positions[variable] = limits.clamp(self.positions[variable]);
        }
        self.update_link_transforms();
    }

    /// Pose of a link in the model frame.
    pub fn global_link_transform(&self, link_name: &str) -> Option<Pose> {
        self.model
            .link_index(link_name)
            .map(|index| self.link_transforms[index])
    }

    pub fn link_transform(&self, link: usize) -> &Pose {
        &self.link_transforms[link]
    }

    /// Origin and axis of a joint in the model frame, before its own motion.
    pub fn joint_world_frame(&self, joint: usize) -> (Vector3<f64>, Vector3<f64>) {
        let model = &self.model.joints()[joint];
        let frame = self.link_transforms[model.parent_link] * model.origin;
        (
            frame.translation.vector,
            frame.rotation * model.axis.into_inner(),
        )
    }

    fn update_link_transforms(&mut self) {
        for joint in self.model.joints() {
            let position = joint
                .variable
                .map_or(0.0, |variable| self.positions[variable]);
            self.link_transforms[joint.child_link] =
                self.link_transforms[joint.parent_link] * joint.origin * joint.motion(position);
        }
    }

    /// Solve IK for `group` and move this state to the solution on success.
    pub fn set_from_ik(&mut self, group: &JointGroup, goals: &[IkGoal], timeout: Duration) -> bool {
        self.set_from_ik_checked(group, goals, timeout, |_, _, _| true)
    }

    /// Like [`set_from_ik`](Self::set_from_ik), but every candidate must pass
    /// `validity`. The callback receives a scratch copy of this state along
    /// with the candidate group positions. On failure this state is untouched.
    pub fn set_from_ik_checked<F>(
        &mut self,
        group: &JointGroup,
        goals: &[IkGoal],
        timeout: Duration,
        mut validity: F,
    ) -> bool
    where
        F: FnMut(&mut RobotState, &JointGroup, &[f64]) -> bool,
    {
        if goals.is_empty() {
            return false;
        }
        let mut scratch = self.clone();
        let mut check = |candidate: &[f64]| validity(&mut scratch, group, candidate);
        match group.solver().search(self, group, goals, timeout, &mut check) {
            Some(solution) => {
                self.set_group_positions(group, &solution);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use approx::assert_relative_eq;

    fn arm_state() -> RobotState {
        RobotState::new(Arc::new(testing::six_dof_arm()))
    }

    #[test]
    fn fk_zero_position() {
        let state = arm_state();
        // 0.05 + 0.2 + 0.3 + 0.1 + 0.2 + 0.06 + 0.05 gripper offset
        let gripper = state.global_link_transform("gripper").unwrap();
        assert_relative_eq!(gripper.translation.z, 0.96, epsilon = 1e-9);
        assert_relative_eq!(gripper.translation.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(gripper.translation.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn fk_shoulder_pitch_tilts_arm() {
        let mut state = arm_state();
        assert!(state.set_variable_position("j2_shoulder_pitch", std::f64::consts::FRAC_PI_2));
        // Everything past the shoulder (0.25 high) now lies along +X.
        let gripper = state.global_link_transform("gripper").unwrap();
        assert_relative_eq!(gripper.translation.x, 0.71, epsilon = 1e-9);
        assert_relative_eq!(gripper.translation.z, 0.25, epsilon = 1e-9);
    }

    #[test]
    fn unknown_link_has_no_transform() {
        assert!(arm_state().global_link_transform("bogus_link").is_none());
    }

    #[test]
    fn apply_joint_state_skips_unknown_names() {
        let mut state = arm_state();
        let applied = state.apply_joint_state(
            &["j1_base_yaw".to_string(), "nope".to_string()],
            &[0.4, 1.0],
        );
        assert_eq!(applied, 1);
        assert_relative_eq!(state.variable_position("j1_base_yaw").unwrap(), 0.4);
    }

    #[test]
    fn group_positions_round_trip() {
        let mut state = arm_state();
        let wrist = state.model().group("wrist").unwrap().clone();
        state.set_group_positions(&wrist, &[0.3, -0.2]);
        assert_eq!(state.group_positions(&wrist), vec![0.3, -0.2]);
        assert_relative_eq!(state.variable_position("j5_wrist_pitch").unwrap(), 0.3);
        assert_relative_eq!(state.variable_position("j1_base_yaw").unwrap(), 0.0);
    }

    #[test]
    fn clones_do_not_alias() {
        let original = arm_state();
        let mut copy = original.clone();
        copy.set_variable_position("j1_base_yaw", 1.0);
        assert_relative_eq!(original.variable_position("j1_base_yaw").unwrap(), 0.0);
    }

    #[test]
    fn enforce_bounds_clamps_each_variable() {
        let mut state = arm_state();
        state.set_variable_positions(&[5.0, -5.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(!state.satisfies_bounds());
        state.enforce_bounds();
        assert!(state.satisfies_bounds());
        assert_relative_eq!(state.positions()[1], -1.5708);
    }

    #[test]
    fn joint_world_frame_follows_parent_motion() {
        let mut state = arm_state();
        state.set_variable_position("j1_base_yaw", std::f64::consts::FRAC_PI_2);
        let j2 = state.model().joint_index("j2_shoulder_pitch").unwrap();
        let (origin, axis) = state.joint_world_frame(j2);
        assert_relative_eq!(origin.z, 0.25, epsilon = 1e-9);
        // Pitch axis +Y rotated 90 degrees about Z points along -X.
        assert_relative_eq!(axis.x, -1.0, epsilon = 1e-9);
    }
}
