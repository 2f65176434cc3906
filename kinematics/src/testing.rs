//! Fixture robots shared by unit and integration tests.

use crate::model::RobotModel;

/// Six revolute joints stacked along +Z, a fixed gripper 5 cm past the flange.
///
/// Groups: `arm` (all six joints, tip `gripper`) and `wrist` (j5, j6).
pub const SIX_DOF_ARM: &str = r#"
name = "six_dof_arm"
root_link = "base"

[[links]]
name = "forearm"
collision_radius = 0.04

[[links]]
name = "gripper"
collision_radius = 0.03

[[joints]]
name = "j1_base_yaw"
type = "revolute"
parent = "base"
child = "shoulder_link"
origin = { xyz = [0.0, 0.0, 0.05] }
axis = [0.0, 0.0, 1.0]
limits = { lower = -3.14159, upper = 3.14159 }

[[joints]]
name = "j2_shoulder_pitch"
type = "revolute"
parent = "shoulder_link"
child = "upper_arm"
origin = { xyz = [0.0, 0.0, 0.2] }
axis = [0.0, 1.0, 0.0]
limits = { lower = -1.5708, upper = 2.356 }

[[joints]]
name = "j3_elbow_pitch"
type = "revolute"
parent = "upper_arm"
child = "elbow_link"
origin = { xyz = [0.0, 0.0, 0.3] }
axis = [0.0, 1.0, 0.0]
limits = { lower = -2.356, upper = 2.356 }

[[joints]]
name = "j4_forearm_roll"
type = "revolute"
parent = "elbow_link"
child = "forearm"
origin = { xyz = [0.0, 0.0, 0.1] }
axis = [0.0, 0.0, 1.0]
limits = { lower = -3.14159, upper = 3.14159 }

[[joints]]
name = "j5_wrist_pitch"
type = "revolute"
parent = "forearm"
child = "wrist_link"
origin = { xyz = [0.0, 0.0, 0.2] }
axis = [0.0, 1.0, 0.0]
limits = { lower = -2.094, upper = 2.094 }

[[joints]]
name = "j6_wrist_roll"
type = "revolute"
parent = "wrist_link"
child = "end_effector"
origin = { xyz = [0.0, 0.0, 0.06] }
axis = [0.0, 0.0, 1.0]
limits = { lower = -3.14159, upper = 3.14159 }

[[joints]]
name = "gripper_fixed"
type = "fixed"
parent = "end_effector"
child = "gripper"
origin = { xyz = [0.0, 0.0, 0.05] }

[[groups]]
name = "arm"
joints = [
    "j1_base_yaw",
    "j2_shoulder_pitch",
    "j3_elbow_pitch",
    "j4_forearm_roll",
    "j5_wrist_pitch",
    "j6_wrist_roll",
]
tip_link = "gripper"

[groups.solver]
kind = "dls"
max_iterations = 200

[[groups]]
name = "wrist"
joints = ["j5_wrist_pitch", "j6_wrist_roll"]
tip_link = "gripper"
"#;

/// Two yaw joints about Z with links along Z: the tip never leaves `(0, 0, 0.6)`.
pub const TWO_LINK_ARM: &str = r#"
name = "two_link_arm"
root_link = "base"

[[joints]]
name = "shoulder"
type = "revolute"
parent = "base"
child = "upper_arm"
origin = { xyz = [0.0, 0.0, 0.05] }
axis = [0.0, 0.0, 1.0]
limits = { lower = -2.617, upper = 2.617 }

[[joints]]
name = "elbow"
type = "revolute"
parent = "upper_arm"
child = "forearm"
origin = { xyz = [0.0, 0.0, 0.3] }
axis = [0.0, 0.0, 1.0]
limits = { lower = -2.094, upper = 2.094 }

[[joints]]
name = "ee_fixed"
type = "fixed"
parent = "forearm"
child = "end_effector"
origin = { xyz = [0.0, 0.0, 0.25] }

[[groups]]
name = "arm"
joints = ["shoulder", "elbow"]
tip_link = "end_effector"
"#;

/// Two pitch joints about Y; moves in the XZ plane.
pub const PLANAR_ARM: &str = r#"
name = "planar_arm"
root_link = "base"

[[joints]]
name = "shoulder"
type = "revolute"
parent = "base"
child = "upper_arm"
origin = { xyz = [0.0, 0.0, 0.1] }
axis = [0.0, 1.0, 0.0]
limits = { lower = -2.5, upper = 2.5 }

[[joints]]
name = "elbow"
type = "revolute"
parent = "upper_arm"
child = "forearm"
origin = { xyz = [0.0, 0.0, 0.3] }
axis = [0.0, 1.0, 0.0]
limits = { lower = -2.5, upper = 2.5 }

[[joints]]
name = "tool_fixed"
type = "fixed"
parent = "forearm"
child = "tool"
origin = { xyz = [0.0, 0.0, 0.25] }

[[groups]]
name = "arm"
joints = ["shoulder", "elbow"]
tip_link = "tool"
"#;

fn build(description: &str) -> RobotModel {
    match RobotModel::from_toml_str(description) {
        Ok(model) => model,
        Err(err) => panic!("fixture robot failed to load: {err}"),
    }
}

pub fn six_dof_arm() -> RobotModel {
    build(SIX_DOF_ARM)
}

pub fn two_link_arm() -> RobotModel {
    build(TWO_LINK_ARM)
}

pub fn planar_arm() -> RobotModel {
    build(PLANAR_ARM)
}
