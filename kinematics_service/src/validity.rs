//! Validity test handed to IK solvers for each candidate configuration.

use kinematics::{JointGroup, RobotState};
use scene::{ConstraintSet, PlanningScene};

enum Check<'a> {
    CollisionFree(&'a PlanningScene),
    Constraints(&'a ConstraintSet),
}

/// Ordered checks, evaluated collision first and stopping at the first failure.
pub struct StateValidity<'a> {
    checks: Vec<Check<'a>>,
}

impl<'a> StateValidity<'a> {
    /// `None` when there is nothing to check, i.e. the solve is unconstrained.
    ///
    /// `scene` enables collision checking; an empty constraint set adds nothing.
    pub fn compose(
        scene: Option<&'a PlanningScene>,
        constraints: Option<&'a ConstraintSet>,
    ) -> Option<Self> {
        let mut checks = Vec::with_capacity(2);
        if let Some(scene) = scene {
            checks.push(Check::CollisionFree(scene));
        }
        if let Some(constraints) = constraints.filter(|set| !set.is_empty()) {
            checks.push(Check::Constraints(constraints));
        }
        (!checks.is_empty()).then_some(Self { checks })
    }

    pub fn checks_collisions(&self) -> bool {
        self.checks
            .iter()
            .any(|check| matches!(check, Check::CollisionFree(_)))
    }

    pub fn checks_constraints(&self) -> bool {
        self.checks
            .iter()
            .any(|check| matches!(check, Check::Constraints(_)))
    }

    /// Move `state` to `positions` for `group` and test it.
    pub fn is_valid(&self, state: &mut RobotState, group: &JointGroup, positions: &[f64]) -> bool {
        state.set_group_positions(group, positions);
        self.checks.iter().all(|check| match check {
            Check::CollisionFree(scene) => {
                let colliding = scene.is_state_colliding(state, group.name());
                if colliding {
                    log::trace!("candidate for {} is in collision", group.name());
                }
                !colliding
            }
            Check::Constraints(constraints) => constraints.decide(state).satisfied,
        })
    }
}
