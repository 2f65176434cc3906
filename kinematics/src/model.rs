//! Immutable kinematic model: links, joints and named joint groups.
//!
//! Links are stored in topological order (every parent link precedes its
//! children), so a single forward pass over the joints computes all global
//! link transforms. Each actuated joint owns exactly one variable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use nalgebra::{Translation3, UnitQuaternion, UnitVector3, Vector3};
use serde::{Deserialize, Serialize};

use crate::Pose;
use crate::description::{JointDescription, RobotDescription, SolverDescription};
use crate::error::ModelError;
use crate::opw_kinematics::OpwSolver;
use crate::solver::{DlsSolver, IkSolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    Revolute,
    Prismatic,
    Fixed,
}

impl JointType {
    pub fn is_actuated(self) -> bool {
        !matches!(self, Self::Fixed)
    }
}

/// Position bounds of a single joint variable (rad or m).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    pub lower: f64,
    pub upper: f64,
}

impl JointLimits {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }

    pub fn contains(&self, value: f64) -> bool {
        const MARGIN: f64 = 1e-9;
        value >= self.lower - MARGIN && value <= self.upper + MARGIN
    }
}

#[derive(Debug, Clone)]
pub struct LinkModel {
    pub name: String,
    /// Joint connecting this link to its parent; `None` for the root link.
    pub parent_joint: Option<usize>,
    pub collision_radius: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct JointModel {
    pub name: String,
    pub joint_type: JointType,
    pub parent_link: usize,
    pub child_link: usize,
    /// Static transform from the parent link frame to the joint frame.
    pub origin: Pose,
    /// Joint axis in the joint frame.
    pub axis: UnitVector3<f64>,
    pub limits: JointLimits,
    /// Index into the state's variable vector. `None` for fixed joints.
    pub variable: Option<usize>,
}

impl JointModel {
    /// Transform contributed by the joint at the given position.
    pub fn motion(&self, position: f64) -> Pose {
        match self.joint_type {
            JointType::Revolute => Pose::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&self.axis, position),
            ),
            JointType::Prismatic => Pose::from_parts(
                Translation3::from(self.axis.into_inner() * position),
                UnitQuaternion::identity(),
            ),
            JointType::Fixed => Pose::identity(),
        }
    }
}

/// A named subset of the model's actuated joints with its own IK solver.
#[derive(Debug, Clone)]
pub struct JointGroup {
    name: String,
    joints: Vec<usize>,
    variables: Vec<usize>,
    bounds: Vec<JointLimits>,
    tip_link: usize,
    /// Links whose global transform depends on at least one group variable.
    updated_links: Vec<usize>,
    solver: Arc<dyn IkSolver>,
}

impl JointGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joint_indices(&self) -> &[usize] {
        &self.joints
    }

    /// State variable indices in group order.
    pub fn variable_indices(&self) -> &[usize] {
        &self.variables
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn bounds(&self) -> &[JointLimits] {
        &self.bounds
    }

    /// Default IK link when a query names none.
    pub fn tip_link(&self) -> usize {
        self.tip_link
    }

    pub fn updated_links(&self) -> &[usize] {
        &self.updated_links
    }

    pub fn solver(&self) -> &Arc<dyn IkSolver> {
        &self.solver
    }

    /// Clamp group-ordered positions into the joint limits.
    pub fn clamp(&self, positions: &mut [f64]) {
        for (value, limits) in positions.iter_mut().zip(&self.bounds) {
            *value = limits.clamp(*value);
        }
    }

    pub fn within_bounds(&self, positions: &[f64]) -> bool {
        positions.len() == self.bounds.len()
            && positions
                .iter()
                .zip(&self.bounds)
                .all(|(value, limits)| limits.contains(*value))
    }
}

/// The robot's kinematic tree. Loaded once, shared read-only behind an `Arc`.
pub struct RobotModel {
    name: String,
    links: Vec<LinkModel>,
    joints: Vec<JointModel>,
    groups: Vec<JointGroup>,
    link_index: HashMap<String, usize>,
    joint_index: HashMap<String, usize>,
    group_index: HashMap<String, usize>,
    /// Variable index to joint index.
    variable_joints: Vec<usize>,
}

impl fmt::Debug for RobotModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotModel")
            .field("name", &self.name)
            .field("links", &self.links.len())
            .field("joints", &self.joints.len())
            .field("groups", &self.group_index.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RobotModel {
    /// Build and validate a model from a description.
    pub fn from_description(desc: &RobotDescription) -> Result<Self, ModelError> {
        let mut model = Self {
            name: desc.name.clone(),
            links: vec![LinkModel {
                name: desc.root_link.clone(),
                parent_joint: None,
                collision_radius: None,
            }],
            joints: Vec::with_capacity(desc.joints.len()),
            groups: Vec::with_capacity(desc.groups.len()),
            link_index: HashMap::from([(desc.root_link.clone(), 0)]),
            joint_index: HashMap::new(),
            group_index: HashMap::new(),
            variable_joints: Vec::new(),
        };

        for joint in &desc.joints {
            if desc.joints.iter().filter(|j| j.name == joint.name).count() > 1 {
                return Err(ModelError::DuplicateJoint(joint.name.clone()));
            }
        }

        // Attach joints whose parent is already placed until nothing moves.
        let mut pending: Vec<&JointDescription> = desc.joints.iter().collect();
        loop {
            let before = pending.len();
            let mut rest = Vec::with_capacity(pending.len());
            for joint in pending {
                if model.link_index.contains_key(&joint.parent) {
                    model.attach_joint(joint)?;
                } else {
                    rest.push(joint);
                }
            }
            pending = rest;
            if pending.is_empty() {
                break;
            }
            if pending.len() == before {
                return Err(ModelError::Disconnected(
                    pending.iter().map(|j| j.name.clone()).collect(),
                ));
            }
        }

        let mut seen_links = Vec::with_capacity(desc.links.len());
        for link in &desc.links {
            if seen_links.contains(&&link.name) {
                return Err(ModelError::DuplicateLink(link.name.clone()));
            }
            seen_links.push(&link.name);
            let index = model
                .link_index(&link.name)
                .ok_or_else(|| ModelError::UnknownLink(link.name.clone()))?;
            model.links[index].collision_radius = link.collision_radius;
        }

        for group in &desc.groups {
            if model.group_index.contains_key(&group.name) {
                return Err(ModelError::DuplicateGroup(group.name.clone()));
            }
            let solver: Arc<dyn IkSolver> = match &group.solver {
                SolverDescription::Dls(config) => Arc::new(DlsSolver::new(config.clone())),
                SolverDescription::Opw(params) => Arc::new(OpwSolver::new(*params)),
            };
            let built = model.build_group(&group.name, &group.joints, &group.tip_link, solver)?;
            model.group_index.insert(group.name.clone(), model.groups.len());
            model.groups.push(built);
        }

        Ok(model)
    }

    /// Parse a TOML description and build the model.
    pub fn from_toml_str(content: &str) -> Result<Self, ModelError> {
        Self::from_description(&RobotDescription::from_toml_str(content)?)
    }

    /// Replace the IK solver of one group.
    pub fn with_group_solver(
        mut self,
        group: &str,
        solver: Arc<dyn IkSolver>,
    ) -> Result<Self, ModelError> {
        let index = *self
            .group_index
            .get(group)
            .ok_or_else(|| ModelError::UnknownGroup(group.to_string()))?;
        self.groups[index].solver = solver;
        Ok(self)
    }

    fn attach_joint(&mut self, desc: &JointDescription) -> Result<(), ModelError> {
        if self.link_index.contains_key(&desc.child) {
            return Err(ModelError::MultipleParents(desc.child.clone()));
        }
        let axis = Vector3::from(desc.axis);
        if axis.norm() < f64::EPSILON {
            return Err(ModelError::InvalidAxis(desc.name.clone()));
        }
        let limits = match desc.limits {
            Some(l) if !(l.lower.is_finite() && l.upper.is_finite() && l.lower <= l.upper) => {
                return Err(ModelError::InvalidLimits {
                    name: desc.name.clone(),
                    lower: l.lower,
                    upper: l.upper,
                });
            }
            Some(l) => JointLimits {
                lower: l.lower,
                upper: l.upper,
            },
            None => JointLimits {
                lower: -std::f64::consts::PI,
                upper: std::f64::consts::PI,
            },
        };
        let [x, y, z] = desc.origin.xyz;
        let [roll, pitch, yaw] = desc.origin.rpy;
        let origin = Pose::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        );

        let joint_index = self.joints.len();
        let child_link = self.links.len();
        let variable = desc.joint_type.is_actuated().then(|| {
            self.variable_joints.push(joint_index);
            self.variable_joints.len() - 1
        });

        self.joints.push(JointModel {
            name: desc.name.clone(),
            joint_type: desc.joint_type,
            parent_link: self.link_index[&desc.parent],
            child_link,
            origin,
            axis: UnitVector3::new_normalize(axis),
            limits,
            variable,
        });
        self.joint_index.insert(desc.name.clone(), joint_index);
        self.links.push(LinkModel {
            name: desc.child.clone(),
            parent_joint: Some(joint_index),
            collision_radius: None,
        });
        self.link_index.insert(desc.child.clone(), child_link);
        Ok(())
    }

    fn build_group(
        &self,
        name: &str,
        joint_names: &[String],
        tip_link: &str,
        solver: Arc<dyn IkSolver>,
    ) -> Result<JointGroup, ModelError> {
        if joint_names.is_empty() {
            return Err(ModelError::EmptyGroup(name.to_string()));
        }
        let mut joints = Vec::with_capacity(joint_names.len());
        let mut variables = Vec::with_capacity(joint_names.len());
        let mut bounds = Vec::with_capacity(joint_names.len());
        for joint_name in joint_names {
            let index = self
                .joint_index(joint_name)
                .ok_or_else(|| ModelError::UnknownJoint(joint_name.clone()))?;
            let joint = &self.joints[index];
            let variable = joint.variable.ok_or_else(|| ModelError::NotActuated {
                group: name.to_string(),
                joint: joint_name.clone(),
            })?;
            joints.push(index);
            variables.push(variable);
            bounds.push(joint.limits);
        }
        let tip_link = self
            .link_index(tip_link)
            .ok_or_else(|| ModelError::UnknownLink(tip_link.to_string()))?;

        // Topological order means a parent is always classified before its children.
        let mut moved = vec![false; self.links.len()];
        for (index, link) in self.links.iter().enumerate() {
            if let Some(parent_joint) = link.parent_joint {
                moved[index] = joints.contains(&parent_joint)
                    || moved[self.joints[parent_joint].parent_link];
            }
        }
        let updated_links = (0..self.links.len()).filter(|&i| moved[i]).collect();

        Ok(JointGroup {
            name: name.to_string(),
            joints,
            variables,
            bounds,
            tip_link,
            updated_links,
            solver,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frame every global link transform is expressed in (the root link).
    pub fn model_frame(&self) -> &str {
        &self.links[0].name
    }

    pub fn links(&self) -> &[LinkModel] {
        &self.links
    }

    pub fn joints(&self) -> &[JointModel] {
        &self.joints
    }

    pub fn link_index(&self, name: &str) -> Option<usize> {
        self.link_index.get(name).copied()
    }

    pub fn has_link_model(&self, name: &str) -> bool {
        self.link_index.contains_key(name)
    }

    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joint_index.get(name).copied()
    }

    /// Variable index of an actuated joint.
    pub fn variable_index(&self, joint_name: &str) -> Option<usize> {
        self.joint_index(joint_name)
            .and_then(|index| self.joints[index].variable)
    }

    pub fn group(&self, name: &str) -> Option<&JointGroup> {
        self.group_index.get(name).map(|&index| &self.groups[index])
    }

    pub fn groups(&self) -> &[JointGroup] {
        &self.groups
    }

    pub fn variable_count(&self) -> usize {
        self.variable_joints.len()
    }

    pub fn variable_joint(&self, variable: usize) -> &JointModel {
        &self.joints[self.variable_joints[variable]]
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variable_joints
            .iter()
            .map(|&j| self.joints[j].name.as_str())
            .collect()
    }

    /// Zero for every variable, pulled into the joint limits.
    pub fn default_positions(&self) -> Vec<f64> {
        self.variable_joints
            .iter()
            .map(|&j| self.joints[j].limits.clamp(0.0))
            .collect()
    }

    /// Joints from the root down to `link`, root first.
    pub fn joint_path_to(&self, link: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = link;
        while let Some(joint) = self.links[current].parent_joint {
            path.push(joint);
            current = self.joints[joint].parent_link;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn six_dof_arm_structure() {
        let model = testing::six_dof_arm();
        assert_eq!(model.model_frame(), "base");
        assert_eq!(model.variable_count(), 6);
        assert_eq!(
            model.variable_names(),
            vec![
                "j1_base_yaw",
                "j2_shoulder_pitch",
                "j3_elbow_pitch",
                "j4_forearm_roll",
                "j5_wrist_pitch",
                "j6_wrist_roll"
            ]
        );
        assert!(model.has_link_model("gripper"));
        assert!(!model.has_link_model("bogus_link"));
        assert_eq!(model.variable_index("gripper_fixed"), None);
    }

    #[test]
    fn links_are_topologically_ordered() {
        let model = testing::six_dof_arm();
        for joint in model.joints() {
            assert!(joint.parent_link < joint.child_link, "{}", joint.name);
        }
    }

    #[test]
    fn group_tracks_moved_links() {
        let model = testing::six_dof_arm();
        let wrist = model.group("wrist").unwrap();
        let names: Vec<&str> = wrist
            .updated_links()
            .iter()
            .map(|&l| model.links()[l].name.as_str())
            .collect();
        assert_eq!(names, vec!["wrist_link", "end_effector", "gripper"]);
    }

    #[test]
    fn joint_path_runs_root_first() {
        let model = testing::six_dof_arm();
        let gripper = model.link_index("gripper").unwrap();
        let path: Vec<&str> = model
            .joint_path_to(gripper)
            .into_iter()
            .map(|j| model.joints()[j].name.as_str())
            .collect();
        assert_eq!(path.first(), Some(&"j1_base_yaw"));
        assert_eq!(path.last(), Some(&"gripper_fixed"));
        assert_eq!(path.len(), 7);
    }

    #[test]
    fn joints_listed_out_of_order_are_attached() {
        let desc = RobotDescription::from_toml_str(
            r#"
            name = "shuffled"
            root_link = "a"

            [[joints]]
            name = "bc"
            type = "revolute"
            parent = "b"
            child = "c"

            [[joints]]
            name = "ab"
            type = "revolute"
            parent = "a"
            child = "b"
            "#,
        )
        .unwrap();
        let model = RobotModel::from_description(&desc).unwrap();
        assert_eq!(model.variable_names(), vec!["ab", "bc"]);
    }

    #[test]
    fn disconnected_joint_is_rejected() {
        let err = RobotModel::from_toml_str(
            r#"
            name = "broken"
            root_link = "a"

            [[joints]]
            name = "xy"
            type = "fixed"
            parent = "x"
            child = "y"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Disconnected(names) if names == vec!["xy"]));
    }

    #[test]
    fn group_with_fixed_joint_is_rejected() {
        let err = RobotModel::from_toml_str(
            r#"
            name = "fixed_group"
            root_link = "a"

            [[joints]]
            name = "ab"
            type = "fixed"
            parent = "a"
            child = "b"

            [[groups]]
            name = "g"
            joints = ["ab"]
            tip_link = "b"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::NotActuated { .. }));
    }

    #[test]
    fn inverted_limits_are_rejected() {
        let err = RobotModel::from_toml_str(
            r#"
            name = "limits"
            root_link = "a"

            [[joints]]
            name = "ab"
            type = "revolute"
            parent = "a"
            child = "b"
            limits = { lower = 1.0, upper = -1.0 }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidLimits { .. }));
    }

    #[test]
    fn unbounded_limits_are_rejected() {
        for limits in [
            "{ lower = -inf, upper = inf }",
            "{ lower = 0.0, upper = inf }",
            "{ lower = nan, upper = 1.0 }",
        ] {
            let err = RobotModel::from_toml_str(&format!(
                r#"
                name = "limits"
                root_link = "a"

                [[joints]]
                name = "ab"
                type = "revolute"
                parent = "a"
                child = "b"
                limits = {limits}
                "#
            ))
            .unwrap_err();
            assert!(matches!(err, ModelError::InvalidLimits { .. }), "{limits}");
        }
    }

    #[test]
    fn replacing_solver_of_unknown_group_fails() {
        let model = testing::six_dof_arm();
        let solver = Arc::new(DlsSolver::with_defaults());
        assert!(matches!(
            model.with_group_solver("legs", solver),
            Err(ModelError::UnknownGroup(_))
        ));
    }

    #[test]
    fn default_positions_respect_limits() {
        let model = RobotModel::from_toml_str(
            r#"
            name = "offset"
            root_link = "a"

            [[joints]]
            name = "ab"
            type = "prismatic"
            parent = "a"
            child = "b"
            limits = { lower = 0.2, upper = 0.5 }
            "#,
        )
        .unwrap();
        assert_eq!(model.default_positions(), vec![0.2]);
    }
}
