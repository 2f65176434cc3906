//! The shared world model queried by kinematics requests.
//!
//! A [`PlanningScene`] holds the current robot state, world geometry and
//! named frames. The [`PlanningSceneMonitor`] owns the single process-wide
//! scene behind a read/write lock.

pub mod collision;
pub mod constraints;
pub mod error;
pub mod monitor;
pub mod planning_scene;
pub mod transforms;

pub use collision::{CollisionWorld, Shape, WorldObject};
pub use constraints::{
    ConstraintEvaluation, ConstraintSet, Constraints, JointConstraint, KinematicConstraint,
    OrientationConstraint, PositionConstraint,
};
pub use error::{ConstraintError, TransformError};
pub use monitor::{LockedSceneRead, PlanningSceneMonitor, SceneSnapshot};
pub use planning_scene::PlanningScene;
pub use transforms::{FrameTransforms, same_frame};
