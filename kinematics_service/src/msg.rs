//! Request and response messages of the IK and FK queries.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use kinematics::{Pose, RobotState};
use scene::Constraints;
use serde::{Deserialize, Serialize};

use crate::error_code::ErrorCode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    pub fn new(sec: i32, nanosec: u32) -> Self {
        Self { sec, nanosec }
    }

    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::since_epoch(now)
    }

    /// Seconds saturate at `i32::MAX`.
    pub fn since_epoch(elapsed: Duration) -> Self {
        let sec = i32::try_from(elapsed.as_secs()).unwrap_or(i32::MAX);
        Self::new(sec, elapsed.subsec_nanos())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Time,
    /// Empty means "the frame the receiver expects".
    pub frame_id: String,
}

impl Header {
    /// Header for `frame_id` stamped with the current time.
    pub fn stamped(frame_id: impl Into<String>) -> Self {
        Self {
            stamp: Time::now(),
            frame_id: frame_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    #[serde(default)]
    pub header: Header,
    pub pose: Pose,
}

impl PoseStamped {
    pub fn new(frame_id: impl Into<String>, pose: Pose) -> Self {
        Self {
            header: Header {
                stamp: Time::default(),
                frame_id: frame_id.into(),
            },
            pose,
        }
    }
}

impl Default for PoseStamped {
    fn default() -> Self {
        Self {
            header: Header::default(),
            pose: Pose::identity(),
        }
    }
}

/// Named joint values. Velocity and effort are carried but not interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointState {
    pub header: Header,
    pub name: Vec<String>,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub effort: Vec<f64>,
}

/// Robot configuration as carried in requests and responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotStateMsg {
    #[serde(default)]
    pub joint_state: JointState,
}

impl RobotStateMsg {
    pub fn is_empty(&self) -> bool {
        self.joint_state.name.is_empty()
    }

    /// Every variable of `state`, in model order.
    pub fn from_state(state: &RobotState) -> Self {
        let model = state.model();
        Self {
            joint_state: JointState {
                header: Header::stamped(model.model_frame()),
                name: model
                    .variable_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                position: state.positions().to_vec(),
                ..JointState::default()
            },
        }
    }

    /// Merge the named values into `state`; returns how many were applied.
    pub fn apply_to(&self, state: &mut RobotState) -> usize {
        if self.joint_state.name.len() != self.joint_state.position.len() {
            log::warn!(
                "joint state has {} names but {} positions",
                self.joint_state.name.len(),
                self.joint_state.position.len()
            );
        }
        state.apply_joint_state(&self.joint_state.name, &self.joint_state.position)
    }
}

/// One IK query.
///
/// Either a single target (`pose_stamped`, optional `ik_link_name`) or, when
/// `pose_stamped_vector` holds more than one pose, one pose per entry of
/// `ik_link_names`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionIkRequest {
    pub group_name: String,
    /// Seed values merged over the current scene state. May be empty.
    pub robot_state: RobotStateMsg,
    pub constraints: Constraints,
    pub avoid_collisions: bool,
    pub ik_link_name: String,
    pub pose_stamped: PoseStamped,
    pub ik_link_names: Vec<String>,
    pub pose_stamped_vector: Vec<PoseStamped>,
    /// Zero selects the service default.
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPositionIkResponse {
    pub solution: RobotStateMsg,
    pub error_code: ErrorCode,
}

/// One FK query. `header.frame_id` selects the output frame (empty for the
/// model frame).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetPositionFkRequest {
    pub header: Header,
    pub fk_link_names: Vec<String>,
    pub robot_state: RobotStateMsg,
}

/// `pose_stamped[i]` belongs to `fk_link_names[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPositionFkResponse {
    pub pose_stamped: Vec<PoseStamped>,
    pub fk_link_names: Vec<String>,
    pub error_code: ErrorCode,
}
