//! Named frames and pose re-expression between them.
//!
//! A frame resolves to a pose in the model frame if it is the model frame
//! itself, a fixed frame registered here, or a link of the robot (resolved
//! through the state being queried).

use std::collections::HashMap;

use kinematics::{Pose, RobotState};

use crate::error::TransformError;

/// Frame names compare equal regardless of a leading `/`.
pub fn same_frame(a: &str, b: &str) -> bool {
    a.trim_start_matches('/') == b.trim_start_matches('/')
}

#[derive(Debug, Clone)]
pub struct FrameTransforms {
    model_frame: String,
    fixed: HashMap<String, Pose>,
}

impl FrameTransforms {
    pub fn new(model_frame: impl Into<String>) -> Self {
        Self {
            model_frame: model_frame.into(),
            fixed: HashMap::new(),
        }
    }

    pub fn model_frame(&self) -> &str {
        &self.model_frame
    }

    /// Register (or move) a fixed frame, posed in the model frame.
    pub fn set_transform(&mut self, frame: impl Into<String>, pose: Pose) {
        let frame = frame.into();
        self.fixed
            .insert(frame.trim_start_matches('/').to_string(), pose);
    }

    pub fn remove_transform(&mut self, frame: &str) -> bool {
        self.fixed.remove(frame.trim_start_matches('/')).is_some()
    }

    pub fn is_fixed_frame(&self, frame: &str) -> bool {
        self.fixed.contains_key(frame.trim_start_matches('/'))
    }

    /// Pose of `frame` in the model frame.
    pub fn frame_pose(&self, state: &RobotState, frame: &str) -> Result<Pose, TransformError> {
        let name = frame.trim_start_matches('/');
        if same_frame(name, &self.model_frame) {
            return Ok(Pose::identity());
        }
        if let Some(pose) = self.fixed.get(name) {
            return Ok(*pose);
        }
        state
            .global_link_transform(name)
            .ok_or_else(|| TransformError::UnknownFrame(frame.to_string()))
    }

    /// Re-express `pose`, given in `from`, in frame `to`.
    ///
    /// An empty `from` means the pose is already in `to`.
    pub fn transform_pose(
        &self,
        state: &RobotState,
        pose: &Pose,
        from: &str,
        to: &str,
    ) -> Result<Pose, TransformError> {
        if from.is_empty() || same_frame(from, to) {
            return Ok(*pose);
        }
        let from_pose = self.frame_pose(state, from)?;
        let to_pose = self.frame_pose(state, to)?;
        Ok(to_pose.inverse() * from_pose * pose)
    }
}
