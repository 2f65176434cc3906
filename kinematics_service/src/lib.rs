//! IK and FK queries against the shared planning scene.
//!
//! ```text
//! request ──► validate ──► lock policy ──► resolve frames ──► validity ──► solver
//!            (no lock)    (held | snapshot)                  (collision, constraints)
//! ```

pub mod access;
pub mod config;
pub mod error_code;
pub mod instrumentation;
pub mod msg;
pub mod service;
pub mod transform;
pub mod validity;

pub use access::{LockPolicy, SceneAccess};
pub use config::{ConfigError, ServiceConfig};
pub use error_code::ErrorCode;
pub use instrumentation::{CountingInstrumentation, Instrumentation, NoopInstrumentation};
pub use msg::{
    GetPositionFkRequest, GetPositionFkResponse, GetPositionIkResponse, Header, JointState,
    PoseStamped, PositionIkRequest, RobotStateMsg, Time,
};
pub use service::KinematicsService;
pub use transform::PoseTransformResolver;
pub use validity::StateValidity;
