//! Re-expressing request and response poses between frames.

use kinematics::{Pose, RobotState};
use scene::{FrameTransforms, TransformError};

use crate::msg::PoseStamped;

/// Resolves stamped poses against one frame tree and one robot configuration.
pub struct PoseTransformResolver<'a> {
    transforms: &'a FrameTransforms,
    state: &'a RobotState,
}

impl<'a> PoseTransformResolver<'a> {
    pub fn new(transforms: &'a FrameTransforms, state: &'a RobotState) -> Self {
        Self { transforms, state }
    }

    pub fn model_frame(&self) -> &str {
        self.transforms.model_frame()
    }

    /// The pose in the model frame. An empty frame id is taken as the model frame.
    pub fn to_model_frame(&self, pose: &PoseStamped) -> Result<Pose, TransformError> {
        self.transforms.transform_pose(
            self.state,
            &pose.pose,
            &pose.header.frame_id,
            self.transforms.model_frame(),
        )
    }

    /// Every pose in the model frame, stopping at the first failure.
    pub fn all_to_model_frame<'p, I>(&self, poses: I) -> Result<Vec<Pose>, TransformError>
    where
        I: IntoIterator<Item = &'p PoseStamped>,
    {
        poses
            .into_iter()
            .map(|pose| self.to_model_frame(pose))
            .collect()
    }

    /// A model-frame pose re-expressed in `frame`.
    pub fn express_in(&self, pose: &Pose, frame: &str) -> Result<Pose, TransformError> {
        self.transforms
            .transform_pose(self.state, pose, self.transforms.model_frame(), frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kinematics::testing;
    use std::sync::Arc;

    fn fixture() -> (FrameTransforms, RobotState) {
        let mut transforms = FrameTransforms::new("base");
        transforms.set_transform("table", Pose::translation(0.5, 0.0, 0.0));
        (transforms, RobotState::new(Arc::new(testing::six_dof_arm())))
    }

    #[test]
    fn empty_frame_passes_through() {
        let (transforms, state) = fixture();
        let resolver = PoseTransformResolver::new(&transforms, &state);
        let pose = PoseStamped::new("", Pose::translation(0.1, 0.0, 0.0));
        assert_eq!(resolver.to_model_frame(&pose).unwrap(), pose.pose);
    }

    #[test]
    fn first_failure_aborts_batch() {
        let (transforms, state) = fixture();
        let resolver = PoseTransformResolver::new(&transforms, &state);
        let poses = [
            PoseStamped::new("table", Pose::identity()),
            PoseStamped::new("moon", Pose::identity()),
            PoseStamped::new("base", Pose::identity()),
        ];
        let err = resolver.all_to_model_frame(&poses).unwrap_err();
        assert_eq!(err, TransformError::UnknownFrame("moon".into()));

        let resolved = resolver.all_to_model_frame(&poses[..1]).unwrap();
        assert_relative_eq!(resolved[0].translation.x, 0.5);
    }

    #[test]
    fn link_frames_follow_the_configuration() {
        let (transforms, mut state) = fixture();
        state.set_variable_position("j2_shoulder_pitch", std::f64::consts::FRAC_PI_2);
        let resolver = PoseTransformResolver::new(&transforms, &state);
        // The gripper now points along +X, 0.71 out at shoulder height.
        let pose = resolver
            .to_model_frame(&PoseStamped::new("gripper", Pose::identity()))
            .unwrap();
        assert_relative_eq!(pose.translation.x, 0.71, epsilon = 1e-9);
        assert_relative_eq!(pose.translation.z, 0.25, epsilon = 1e-9);
    }

    #[test]
    fn model_frame_into_fixed_frame() {
        let (transforms, state) = fixture();
        let resolver = PoseTransformResolver::new(&transforms, &state);
        let out = resolver
            .express_in(&Pose::translation(0.5, 0.2, 0.0), "table")
            .unwrap();
        assert_relative_eq!(out.translation.x, 0.0);
        assert_relative_eq!(out.translation.y, 0.2);
    }
}
