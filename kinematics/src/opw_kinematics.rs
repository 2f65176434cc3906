use std::time::Duration;

use rs_opw_kinematics::kinematic_traits::Kinematics;
use rs_opw_kinematics::kinematics_impl::OPWKinematics;
use rs_opw_kinematics::parameters::opw_kinematics::Parameters;
use serde::{Deserialize, Serialize};

use crate::Pose;
use crate::model::JointGroup;
use crate::solver::{IkGoal, IkSolver};
use crate::state::RobotState;

/// Geometry of an ortho-parallel, spherical-wrist arm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpwParameters {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub c4: f64,
    pub a1: f64,
    pub a2: f64,
    pub b: f64,
    #[serde(default)]
    pub offsets: [f64; 6],
    #[serde(default = "default_sign_corrections")]
    pub sign_corrections: [i8; 6],
}

const fn default_sign_corrections() -> [i8; 6] {
    [1; 6]
}

impl From<OpwParameters> for Parameters {
    fn from(p: OpwParameters) -> Self {
        Parameters {
            c1: p.c1,
            c2: p.c2,
            c3: p.c3,
            c4: p.c4,
            a1: p.a1,
            a2: p.a2,
            b: p.b,
            offsets: p.offsets,
            sign_corrections: p.sign_corrections,
            dof: 6,
        }
    }
}

/// Closed-form IK for six-axis groups.
///
/// The group's joints must follow the OPW convention and the group's chain
/// must start at the parent link of its first joint. Only single-goal queries
/// at the tip link are supported; anything else finds no solution.
#[derive(Debug, Clone)]
pub struct OpwSolver {
    parameters: Parameters,
}

impl OpwSolver {
    pub fn new(parameters: OpwParameters) -> Self {
        Self {
            parameters: parameters.into(),
        }
    }

    /// All analytic solutions for a pose expressed in the arm base frame.
    pub fn inverse_kinematics(&self, pose: &Pose) -> Vec<[f64; 6]> {
        let solver = OPWKinematics::new(self.parameters);
        solver.inverse(pose)
    }

    pub fn forward_kinematics(&self, joints: &[f64; 6]) -> Pose {
        let solver = OPWKinematics::new(self.parameters);
        solver.forward(joints)
    }

    /// Whether `solution` puts the flange back on `target_pose`.
    pub fn verify_solution(&self, target_pose: &Pose, solution: &[f64; 6]) -> bool {
        let fk_pose = self.forward_kinematics(solution);
        let translation_diff = (target_pose.translation.vector - fk_pose.translation.vector).norm();
        let rotation_diff = target_pose.rotation.angle_to(&fk_pose.rotation);

        translation_diff < 1e-4 && rotation_diff < 1e-4
    }
}

impl IkSolver for OpwSolver {
    fn search(
        &self,
        state: &RobotState,
        group: &JointGroup,
        goals: &[IkGoal],
        _timeout: Duration,
        check: &mut dyn FnMut(&[f64]) -> bool,
    ) -> Option<Vec<f64>> {
        let [goal] = goals else {
            log::debug!("opw solver only handles a single goal, got {}", goals.len());
            return None;
        };
        if goal.link != group.tip_link() || group.variable_count() != 6 {
            log::debug!("opw solver cannot serve group {}", group.name());
            return None;
        }
        let first_joint = group.joint_indices()[0];
        let base_link = state.model().joints()[first_joint].parent_link;
        let in_base = state.link_transform(base_link).inverse() * goal.pose;

        self.inverse_kinematics(&in_base)
            .into_iter()
            .filter(|solution| solution.iter().all(|v| v.is_finite()))
            .filter(|solution| group.within_bounds(solution.as_slice()))
            .find(|solution| check(solution.as_slice()))
            .map(|solution| solution.to_vec())
    }
}
