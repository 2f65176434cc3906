//! Serializable robot descriptions.
//!
//! A [`RobotDescription`] is the on-disk (TOML) form of a robot: a root link,
//! the joints hanging off it, optional collision spheres per link, and the
//! joint groups that IK queries address by name. [`RobotModel::from_description`]
//! turns it into a validated, immutable model.
//!
//! [`RobotModel::from_description`]: crate::RobotModel::from_description

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::JointType;
use crate::opw_kinematics::OpwParameters;
use crate::solver::DlsConfig;

const fn default_axis() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

/// Top-level robot description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotDescription {
    pub name: String,
    /// Root link; its name is the model frame.
    pub root_link: String,
    /// Per-link extras. Links only need an entry when they carry collision geometry.
    #[serde(default)]
    pub links: Vec<LinkDescription>,
    #[serde(default)]
    pub joints: Vec<JointDescription>,
    #[serde(default)]
    pub groups: Vec<GroupDescription>,
}

impl RobotDescription {
    /// Parse a description from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ModelError> {
        Ok(toml::from_str(content)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDescription {
    pub name: String,
    /// Radius of the collision sphere centred on the link origin.
    #[serde(default)]
    pub collision_radius: Option<f64>,
}

/// Static placement of a joint frame in its parent link frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginDescription {
    #[serde(default)]
    pub xyz: [f64; 3],
    /// Roll, pitch, yaw in radians.
    #[serde(default)]
    pub rpy: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitsDescription {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    #[serde(default)]
    pub origin: OriginDescription,
    #[serde(default = "default_axis")]
    pub axis: [f64; 3],
    /// Position limits. Actuated joints without limits get `[-pi, pi]`.
    #[serde(default)]
    pub limits: Option<LimitsDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDescription {
    pub name: String,
    pub joints: Vec<String>,
    /// Link that single-pose queries without an explicit link name target.
    pub tip_link: String,
    #[serde(default)]
    pub solver: SolverDescription,
}

/// IK solver plugin configured for a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SolverDescription {
    /// Iterative damped least squares, works for any chain or tree.
    Dls(DlsConfig),
    /// Closed-form solver for six-axis ortho-parallel wrist arms.
    Opw(OpwParameters),
}

impl Default for SolverDescription {
    fn default() -> Self {
        Self::Dls(DlsConfig::default())
    }
}
