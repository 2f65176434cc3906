//! Errors raised while building a [`RobotModel`](crate::RobotModel).

/// Errors that can occur while loading a robot description or building a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The description could not be parsed as TOML.
    #[error("robot description parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate link: {0}")]
    DuplicateLink(String),

    #[error("duplicate joint: {0}")]
    DuplicateJoint(String),

    #[error("duplicate group: {0}")]
    DuplicateGroup(String),

    /// A referenced link was not found in the model.
    #[error("unknown link: {0}")]
    UnknownLink(String),

    /// A referenced joint was not found in the model.
    #[error("unknown joint: {0}")]
    UnknownJoint(String),

    #[error("unknown group: {0}")]
    UnknownGroup(String),

    /// A link is the child of more than one joint.
    #[error("link {0} has more than one parent joint")]
    MultipleParents(String),

    /// Joints whose parent link can never be reached from the root link.
    #[error("joints not connected to the root link: {0:?}")]
    Disconnected(Vec<String>),

    /// A group names a fixed joint; groups hold actuated joints only.
    #[error("joint {joint} in group {group} is not actuated")]
    NotActuated { group: String, joint: String },

    #[error("joint {0} has a zero-length axis")]
    InvalidAxis(String),

    #[error("joint {name} has invalid limits [{lower}, {upper}]")]
    InvalidLimits { name: String, lower: f64, upper: f64 },

    #[error("group {0} has no joints")]
    EmptyGroup(String),
}
