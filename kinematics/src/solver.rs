//! IK solver capability and the damped least squares implementation.
//!
//! Solvers receive the goals, a starting state and a validity callback. They
//! must only report a solution the callback accepted. Why a search failed
//! (deadline, unreachable goal, every candidate rejected) is not reported.

use std::fmt;
use std::time::{Duration, Instant};

use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::Pose;
use crate::model::{JointGroup, JointType, RobotModel};
use crate::state::RobotState;

/// Pose that one link of the model should reach, in the model frame.
#[derive(Debug, Clone, PartialEq)]
pub struct IkGoal {
    pub link: usize,
    pub pose: Pose,
}

impl IkGoal {
    /// Goal for a named link. `None` if the model has no such link.
    pub fn for_link(model: &RobotModel, link_name: &str, pose: Pose) -> Option<Self> {
        model.link_index(link_name).map(|link| Self { link, pose })
    }

    /// Goal for the group's tip link.
    pub fn at_tip(group: &JointGroup, pose: Pose) -> Self {
        Self {
            link: group.tip_link(),
            pose,
        }
    }
}

/// Per-group IK solver plugin.
pub trait IkSolver: Send + Sync + fmt::Debug {
    /// Search for group positions reaching every goal simultaneously.
    ///
    /// `state` provides the seed (its current group positions) and the values
    /// of all variables outside the group. Each candidate is passed to
    /// `check`; only an accepted candidate may be returned. The search gives
    /// up once `timeout` has elapsed, after at least one attempt.
    fn search(
        &self,
        state: &RobotState,
        group: &JointGroup,
        goals: &[IkGoal],
        timeout: Duration,
        check: &mut dyn FnMut(&[f64]) -> bool,
    ) -> Option<Vec<f64>>;
}

/// Configuration for the DLS solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DlsConfig {
    /// Iterations per attempt before restarting from a random seed.
    pub max_iterations: u32,
    /// Position error tolerance (meters).
    pub position_tolerance: f64,
    /// Orientation error tolerance (radians).
    pub angle_tolerance: f64,
    /// Damping factor (lambda). Higher = more robust near singularities,
    /// but slower convergence.
    pub damping: f64,
    /// Seed for the restart generator, so searches are reproducible.
    pub seed: u64,
}

impl Default for DlsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            position_tolerance: 1e-4,
            angle_tolerance: 1e-3,
            damping: 0.01,
            seed: 0,
        }
    }
}

/// Damped least squares solver with random restarts.
///
/// Handles one or more goals by stacking a 6-row Jacobian block per goal.
#[derive(Debug, Clone)]
pub struct DlsSolver {
    config: DlsConfig,
}

impl DlsSolver {
    pub const fn new(config: DlsConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(DlsConfig::default())
    }

    pub fn config(&self) -> &DlsConfig {
        &self.config
    }

    /// Run one descent from `q`. Returns the converged positions, if any.
    fn descend(
        &self,
        work: &mut RobotState,
        group: &JointGroup,
        goals: &[GoalChain],
        mut q: Vec<f64>,
    ) -> Option<Vec<f64>> {
        let rows = 6 * goals.len();
        let columns = group.variable_count();
        let lambda_sq = self.config.damping * self.config.damping;

        for _ in 0..self.config.max_iterations {
            work.set_group_positions(group, &q);

            let mut error = DVector::zeros(rows);
            let mut converged = true;
            for (block, goal) in goals.iter().enumerate() {
                let current = work.link_transform(goal.link);
                let position_error = goal.pose.translation.vector - current.translation.vector;
                let rotation_error = goal.pose.rotation * current.rotation.inverse();
                converged &= position_error.norm() < self.config.position_tolerance
                    && rotation_error.angle() < self.config.angle_tolerance;

                let angular = rotation_error.scaled_axis();
                error.fixed_rows_mut::<3>(6 * block).copy_from(&position_error);
                error.fixed_rows_mut::<3>(6 * block + 3).copy_from(&angular);
            }
            if converged {
                return Some(q);
            }

            let jacobian = stacked_jacobian(work, group, goals, rows, columns);
            // dq = J^T (J J^T + lambda^2 I)^-1 e
            let damped = &jacobian * jacobian.transpose() + DMatrix::identity(rows, rows) * lambda_sq;
            let damped_inv = damped.try_inverse()?;
            let dq = jacobian.transpose() * damped_inv * error;

            for (value, step) in q.iter_mut().zip(dq.iter()) {
                *value += step;
            }
            group.clamp(&mut q);
        }
        None
    }
}

impl IkSolver for DlsSolver {
    fn search(
        &self,
        state: &RobotState,
        group: &JointGroup,
        goals: &[IkGoal],
        timeout: Duration,
        check: &mut dyn FnMut(&[f64]) -> bool,
    ) -> Option<Vec<f64>> {
        // A timeout too large to represent has no deadline.
        let deadline = Instant::now().checked_add(timeout);
        let model = state.model();
        let chains: Vec<GoalChain> = goals
            .iter()
            .map(|goal| GoalChain::new(model, group, goal))
            .collect();

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut work = state.clone();
        let mut seed = state.group_positions(group);
        group.clamp(&mut seed);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            if let Some(candidate) = self.descend(&mut work, group, &chains, seed) {
                if check(&candidate) {
                    log::debug!(
                        "dls solved group {} after {attempts} attempt(s)",
                        group.name()
                    );
                    return Some(candidate);
                }
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                log::debug!(
                    "dls gave up on group {} after {attempts} attempt(s)",
                    group.name()
                );
                return None;
            }
            seed = group
                .bounds()
                .iter()
                .map(|limits| rng.gen_range(limits.lower..=limits.upper))
                .collect();
        }
    }
}

/// A goal plus, per group variable, the joint driving it if that joint lies
/// on the path from the root to the goal link.
struct GoalChain {
    link: usize,
    pose: Pose,
    columns: Vec<Option<(usize, bool)>>,
}

impl GoalChain {
    fn new(model: &RobotModel, group: &JointGroup, goal: &IkGoal) -> Self {
        let path = model.joint_path_to(goal.link);
        let columns = group
            .joint_indices()
            .iter()
            .map(|joint| {
                path.contains(joint).then(|| {
                    let prismatic = model.joints()[*joint].joint_type == JointType::Prismatic;
                    (*joint, prismatic)
                })
            })
            .collect();
        Self {
            link: goal.link,
            pose: goal.pose,
            columns,
        }
    }
}

/// Geometric Jacobian: linear rows then angular rows for each goal.
fn stacked_jacobian(
    state: &RobotState,
    group: &JointGroup,
    goals: &[GoalChain],
    rows: usize,
    columns: usize,
) -> DMatrix<f64> {
    debug_assert_eq!(columns, group.variable_count());
    let mut jacobian = DMatrix::zeros(rows, columns);
    for (block, goal) in goals.iter().enumerate() {
        let end = state.link_transform(goal.link).translation.vector;
        for (column, entry) in goal.columns.iter().enumerate() {
            let Some((joint, prismatic)) = *entry else {
                continue;
            };
            let (origin, axis) = state.joint_world_frame(joint);
            let row = 6 * block;
            if prismatic {
                jacobian.fixed_view_mut::<3, 1>(row, column).copy_from(&axis);
            } else {
                let linear = axis.cross(&(end - origin));
                jacobian.fixed_view_mut::<3, 1>(row, column).copy_from(&linear);
                jacobian.fixed_view_mut::<3, 1>(row + 3, column).copy_from(&axis);
            }
        }
    }
    jacobian
}
