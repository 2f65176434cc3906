//! Kinematic constraints evaluated against a robot state.
//!
//! [`Constraints`] is the request-side description; a [`ConstraintSet`] is
//! built from it per request, with every target resolved into the model frame.

use std::sync::Arc;

use kinematics::{RobotModel, RobotState};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::transforms::FrameTransforms;

const fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub joint_constraints: Vec<JointConstraint>,
    #[serde(default)]
    pub position_constraints: Vec<PositionConstraint>,
    #[serde(default)]
    pub orientation_constraints: Vec<OrientationConstraint>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.joint_constraints.is_empty()
            && self.position_constraints.is_empty()
            && self.orientation_constraints.is_empty()
    }
}

/// Joint value must lie in `[position - tolerance_below, position + tolerance_above]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConstraint {
    pub joint_name: String,
    pub position: f64,
    pub tolerance_above: f64,
    pub tolerance_below: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// Link origin must lie within `radius` of `target_point` (given in `frame_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionConstraint {
    pub link_name: String,
    #[serde(default)]
    pub frame_id: String,
    pub target_point: [f64; 3],
    pub radius: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// Link orientation must match `orientation` (given in `frame_id`) within
/// per-axis roll/pitch/yaw tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationConstraint {
    pub link_name: String,
    #[serde(default)]
    pub frame_id: String,
    pub orientation: UnitQuaternion<f64>,
    pub absolute_x_axis_tolerance: f64,
    pub absolute_y_axis_tolerance: f64,
    pub absolute_z_axis_tolerance: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// Outcome of evaluating one or more constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintEvaluation {
    pub satisfied: bool,
    /// Weighted distance from satisfying the constraint(s); zero when satisfied exactly.
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Joint {
        variable: usize,
        position: f64,
        above: f64,
        below: f64,
    },
    Position {
        link: usize,
        center: Vector3<f64>,
        radius: f64,
    },
    Orientation {
        link: usize,
        target: UnitQuaternion<f64>,
        tolerance: [f64; 3],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct KinematicConstraint {
    name: String,
    weight: f64,
    kind: Kind,
}

impl KinematicConstraint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn decide(&self, state: &RobotState) -> ConstraintEvaluation {
        const MARGIN: f64 = f64::EPSILON * 100.0;
        let (satisfied, distance) = match &self.kind {
            Kind::Joint {
                variable,
                position,
                above,
                below,
            } => {
                let offset = state.positions()[*variable] - position;
                (
                    offset <= above + MARGIN && offset >= -below - MARGIN,
                    offset.abs(),
                )
            }
            Kind::Position {
                link,
                center,
                radius,
            } => {
                let distance = (state.link_transform(*link).translation.vector - center).norm();
                (distance <= radius + MARGIN, distance)
            }
            Kind::Orientation {
                link,
                target,
                tolerance,
            } => {
                let diff = target.inverse() * state.link_transform(*link).rotation;
                let (roll, pitch, yaw) = diff.euler_angles();
                let satisfied = roll.abs() <= tolerance[0] + MARGIN
                    && pitch.abs() <= tolerance[1] + MARGIN
                    && yaw.abs() <= tolerance[2] + MARGIN;
                (satisfied, roll.abs() + pitch.abs() + yaw.abs())
            }
        };
        ConstraintEvaluation {
            satisfied,
            distance: distance * self.weight,
        }
    }
}

/// Ordered constraints, all of which must hold.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    model: Arc<RobotModel>,
    constraints: Vec<KinematicConstraint>,
}

impl ConstraintSet {
    pub fn new(model: Arc<RobotModel>) -> Self {
        Self {
            model,
            constraints: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraints(&self) -> &[KinematicConstraint] {
        &self.constraints
    }

    /// Add everything in `constraints`, resolving frames against `transforms`
    /// and `state`. Invalid entries are skipped with a warning.
    ///
    /// Returns `true` if every entry was added.
    pub fn add(
        &mut self,
        constraints: &Constraints,
        transforms: &FrameTransforms,
        state: &RobotState,
    ) -> bool {
        let mut results = Vec::new();
        for c in &constraints.joint_constraints {
            results.push(self.add_joint_constraint(c));
        }
        for c in &constraints.position_constraints {
            results.push(self.add_position_constraint(c, transforms, state));
        }
        for c in &constraints.orientation_constraints {
            results.push(self.add_orientation_constraint(c, transforms, state));
        }

        let mut all_added = true;
        for result in results {
            if let Err(err) = result {
                log::warn!("skipping constraint: {err}");
                all_added = false;
            }
        }
        all_added
    }

    pub fn add_joint_constraint(&mut self, c: &JointConstraint) -> Result<(), ConstraintError> {
        let variable = self
            .model
            .variable_index(&c.joint_name)
            .ok_or_else(|| ConstraintError::UnknownJoint(c.joint_name.clone()))?;
        check_tolerance(&c.joint_name, c.tolerance_above)?;
        check_tolerance(&c.joint_name, c.tolerance_below)?;
        self.constraints.push(KinematicConstraint {
            name: c.joint_name.clone(),
            weight: c.weight,
            kind: Kind::Joint {
                variable,
                position: c.position,
                above: c.tolerance_above,
                below: c.tolerance_below,
            },
        });
        Ok(())
    }

    pub fn add_position_constraint(
        &mut self,
        c: &PositionConstraint,
        transforms: &FrameTransforms,
        state: &RobotState,
    ) -> Result<(), ConstraintError> {
        let link = self.link(&c.link_name)?;
        check_tolerance(&c.link_name, c.radius)?;
        let frame = resolve_frame(transforms, state, &c.frame_id)?;
        let center = frame * nalgebra::Point3::from(c.target_point);
        self.constraints.push(KinematicConstraint {
            name: c.link_name.clone(),
            weight: c.weight,
            kind: Kind::Position {
                link,
                center: center.coords,
                radius: c.radius,
            },
        });
        Ok(())
    }

    pub fn add_orientation_constraint(
        &mut self,
        c: &OrientationConstraint,
        transforms: &FrameTransforms,
        state: &RobotState,
    ) -> Result<(), ConstraintError> {
        let link = self.link(&c.link_name)?;
        let tolerance = [
            c.absolute_x_axis_tolerance,
            c.absolute_y_axis_tolerance,
            c.absolute_z_axis_tolerance,
        ];
        for value in tolerance {
            check_tolerance(&c.link_name, value)?;
        }
        let frame = resolve_frame(transforms, state, &c.frame_id)?;
        self.constraints.push(KinematicConstraint {
            name: c.link_name.clone(),
            weight: c.weight,
            kind: Kind::Orientation {
                link,
                target: frame.rotation * c.orientation,
                tolerance,
            },
        });
        Ok(())
    }

    /// Evaluate every constraint; satisfied only if all are.
    pub fn decide(&self, state: &RobotState) -> ConstraintEvaluation {
        self.constraints.iter().fold(
            ConstraintEvaluation {
                satisfied: true,
                distance: 0.0,
            },
            |acc, constraint| {
                let eval = constraint.decide(state);
                ConstraintEvaluation {
                    satisfied: acc.satisfied && eval.satisfied,
                    distance: acc.distance + eval.distance,
                }
            },
        )
    }

    fn link(&self, name: &str) -> Result<usize, ConstraintError> {
        self.model
            .link_index(name)
            .ok_or_else(|| ConstraintError::UnknownLink(name.to_string()))
    }
}

fn check_tolerance(name: &str, value: f64) -> Result<(), ConstraintError> {
    if value < 0.0 {
        return Err(ConstraintError::NegativeTolerance {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

fn resolve_frame(
    transforms: &FrameTransforms,
    state: &RobotState,
    frame_id: &str,
) -> Result<kinematics::Pose, ConstraintError> {
    if frame_id.is_empty() {
        return Ok(kinematics::Pose::identity());
    }
    Ok(transforms.frame_pose(state, frame_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinematics::{Pose, testing};

    fn fixture() -> (ConstraintSet, FrameTransforms, RobotState) {
        let model = Arc::new(testing::six_dof_arm());
        let state = RobotState::new(Arc::clone(&model));
        let mut transforms = FrameTransforms::new("base");
        transforms.set_transform("table", Pose::translation(0.0, 0.0, 0.5));
        (ConstraintSet::new(model), transforms, state)
    }

    fn joint(name: &str, position: f64, tolerance: f64) -> JointConstraint {
        JointConstraint {
            joint_name: name.into(),
            position,
            tolerance_above: tolerance,
            tolerance_below: tolerance,
            weight: 1.0,
        }
    }

    #[test]
    fn empty_set_is_satisfied() {
        let (set, _, state) = fixture();
        assert!(set.is_empty());
        assert!(set.decide(&state).satisfied);
    }

    #[test]
    fn joint_constraint_bounds() {
        let (mut set, transforms, mut state) = fixture();
        let request = Constraints {
            joint_constraints: vec![joint("j1_base_yaw", 0.5, 0.1)],
            ..Constraints::default()
        };
        assert!(set.add(&request, &transforms, &state));
        assert!(!set.decide(&state).satisfied);

        state.set_variable_position("j1_base_yaw", 0.55);
        assert!(set.decide(&state).satisfied);
        state.set_variable_position("j1_base_yaw", 0.61);
        assert!(!set.decide(&state).satisfied);
    }

    #[test]
    fn position_constraint_in_fixed_frame() {
        let (mut set, transforms, state) = fixture();
        // Gripper at zero pose sits 0.46 above the table frame.
        let request = Constraints {
            position_constraints: vec![PositionConstraint {
                link_name: "gripper".into(),
                frame_id: "table".into(),
                target_point: [0.0, 0.0, 0.46],
                radius: 0.01,
                weight: 1.0,
            }],
            ..Constraints::default()
        };
        assert!(set.add(&request, &transforms, &state));
        let eval = set.decide(&state);
        assert!(eval.satisfied);
        assert!(eval.distance < 1e-9);
    }

    #[test]
    fn orientation_constraint_tolerates_roll_only() {
        let (mut set, transforms, mut state) = fixture();
        let request = Constraints {
            orientation_constraints: vec![OrientationConstraint {
                link_name: "gripper".into(),
                frame_id: String::new(),
                orientation: UnitQuaternion::identity(),
                absolute_x_axis_tolerance: 0.1,
                absolute_y_axis_tolerance: 0.1,
                absolute_z_axis_tolerance: 3.2,
                weight: 1.0,
            }],
            ..Constraints::default()
        };
        assert!(set.add(&request, &transforms, &state));
        // Rolling the wrist spins about the gripper Z axis: allowed.
        state.set_variable_position("j6_wrist_roll", 1.0);
        assert!(set.decide(&state).satisfied);
        // Pitching the wrist tilts it: rejected.
        state.set_variable_position("j5_wrist_pitch", 0.5);
        assert!(!set.decide(&state).satisfied);
    }

    #[test]
    fn invalid_entries_are_skipped() {
        let (mut set, transforms, state) = fixture();
        let request = Constraints {
            joint_constraints: vec![
                joint("no_such_joint", 0.0, 0.1),
                joint("j2_shoulder_pitch", 0.0, 0.1),
            ],
            position_constraints: vec![PositionConstraint {
                link_name: "gripper".into(),
                frame_id: "moon".into(),
                target_point: [0.0; 3],
                radius: 0.1,
                weight: 1.0,
            }],
            ..Constraints::default()
        };
        assert!(!set.add(&request, &transforms, &state));
        assert_eq!(set.len(), 1);
        assert_eq!(set.constraints()[0].name(), "j2_shoulder_pitch");
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let (mut set, _, _) = fixture();
        let err = set
            .add_joint_constraint(&joint("j1_base_yaw", 0.0, -0.1))
            .unwrap_err();
        assert!(matches!(err, ConstraintError::NegativeTolerance { .. }));
    }
}
