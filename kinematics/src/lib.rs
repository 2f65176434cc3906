//! Robot kinematics: model, joint configurations, FK and pluggable IK solvers.
//!
//! ```text
//! RobotDescription ──► RobotModel ──► RobotState ──► set_from_ik ──► IkSolver
//!                        (shared)      (per request)
//! ```

use nalgebra::Isometry3;

/// Rigid transform of a frame, expressed in some parent frame.
pub type Pose = Isometry3<f64>;

pub mod description;
pub mod error;
pub mod model;
pub mod opw_kinematics;
pub mod solver;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use description::RobotDescription;
pub use error::ModelError;
pub use model::{JointGroup, JointLimits, JointModel, JointType, LinkModel, RobotModel};
pub use opw_kinematics::{OpwParameters, OpwSolver};
pub use solver::{DlsConfig, DlsSolver, IkGoal, IkSolver};
pub use state::RobotState;
