use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome reported in every kinematics response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    Success,
    InvalidGroupName,
    InvalidLinkName,
    NoIkSolution,
    FrameTransformFailure,
}

impl ErrorCode {
    /// Wire value of the code.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 1,
            Self::InvalidGroupName => -15,
            Self::InvalidLinkName => -18,
            Self::FrameTransformFailure => -21,
            Self::NoIkSolution => -31,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        [
            Self::Success,
            Self::InvalidGroupName,
            Self::InvalidLinkName,
            Self::NoIkSolution,
            Self::FrameTransformFailure,
        ]
        .into_iter()
        .find(|candidate| candidate.code() == code)
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::InvalidGroupName => "INVALID_GROUP_NAME",
            Self::InvalidLinkName => "INVALID_LINK_NAME",
            Self::NoIkSolution => "NO_IK_SOLUTION",
            Self::FrameTransformFailure => "FRAME_TRANSFORM_FAILURE",
        };
        write!(f, "{name} ({})", self.code())
    }
}
