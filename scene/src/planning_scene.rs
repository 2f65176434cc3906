//! The world model read by kinematics queries and written by state updates.

use std::sync::Arc;

use kinematics::{RobotModel, RobotState};

use crate::collision::CollisionWorld;
use crate::transforms::FrameTransforms;

/// The world model: current robot state, collision geometry and frames.
///
/// Frames sit behind an `Arc` so snapshots share them until a writer
/// modifies them (copy-on-write through [`PlanningScene::transforms_mut`]).
#[derive(Debug, Clone)]
pub struct PlanningScene {
    robot_model: Arc<RobotModel>,
    current_state: RobotState,
    world: CollisionWorld,
    transforms: Arc<FrameTransforms>,
}

impl PlanningScene {
    pub fn new(robot_model: Arc<RobotModel>) -> Self {
        let transforms = FrameTransforms::new(robot_model.model_frame());
        Self {
            current_state: RobotState::new(Arc::clone(&robot_model)),
            robot_model,
            world: CollisionWorld::new(),
            transforms: Arc::new(transforms),
        }
    }

    pub fn robot_model(&self) -> &Arc<RobotModel> {
        &self.robot_model
    }

    pub fn current_state(&self) -> &RobotState {
        &self.current_state
    }

    pub fn current_state_mut(&mut self) -> &mut RobotState {
        &mut self.current_state
    }

    pub fn set_current_state(&mut self, state: RobotState) {
        self.current_state = state;
    }

    pub fn world(&self) -> &CollisionWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut CollisionWorld {
        &mut self.world
    }

    pub fn transforms(&self) -> &FrameTransforms {
        &self.transforms
    }

    pub fn shared_transforms(&self) -> Arc<FrameTransforms> {
        Arc::clone(&self.transforms)
    }

    pub fn transforms_mut(&mut self) -> &mut FrameTransforms {
        Arc::make_mut(&mut self.transforms)
    }

    /// Whether the links moved by `group` touch the world in `state`.
    ///
    /// An unknown group name checks every link.
    pub fn is_state_colliding(&self, state: &RobotState, group: &str) -> bool {
        match self.robot_model.group(group) {
            Some(group) => self.world.links_in_contact(state, group.updated_links()),
            None => {
                let all: Vec<usize> = (0..self.robot_model.links().len()).collect();
                self.world.links_in_contact(state, &all)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{Shape, WorldObject};
    use kinematics::{Pose, testing};

    fn scene_with_obstacle_at(x: f64, y: f64, z: f64) -> PlanningScene {
        let mut scene = PlanningScene::new(Arc::new(testing::six_dof_arm()));
        scene.world_mut().add_object(WorldObject {
            id: "ball".into(),
            shape: Shape::Sphere { radius: 0.05 },
            pose: Pose::translation(x, y, z),
        });
        scene
    }

    #[test]
    fn gripper_touching_obstacle_collides() {
        // Gripper sphere (r = 0.03) sits at z = 0.96 in the zero pose.
        let scene = scene_with_obstacle_at(0.0, 0.0, 1.0);
        assert!(scene.is_state_colliding(scene.current_state(), "arm"));
    }

    #[test]
    fn only_links_moved_by_group_are_checked() {
        // Forearm sphere (r = 0.04) sits at z = 0.65, outside the wrist group.
        let scene = scene_with_obstacle_at(0.0, 0.0, 0.7);
        assert!(scene.is_state_colliding(scene.current_state(), "arm"));
        assert!(!scene.is_state_colliding(scene.current_state(), "wrist"));
    }

    #[test]
    fn clear_world_never_collides() {
        let scene = PlanningScene::new(Arc::new(testing::six_dof_arm()));
        assert!(!scene.is_state_colliding(scene.current_state(), "arm"));
    }

    #[test]
    fn transforms_are_copy_on_write() {
        let mut scene = PlanningScene::new(Arc::new(testing::six_dof_arm()));
        let before = scene.shared_transforms();
        scene
            .transforms_mut()
            .set_transform("table", Pose::translation(1.0, 0.0, 0.0));
        assert!(!before.is_fixed_frame("table"));
        assert!(scene.transforms().is_fixed_frame("table"));
    }
}
