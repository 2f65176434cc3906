use thiserror::Error;

/// A frame could not be expressed relative to another one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("unknown frame: {0}")]
    UnknownFrame(String),
}

/// A requested constraint could not be built against the current model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    #[error("constraint references unknown joint {0}")]
    UnknownJoint(String),

    #[error("constraint references unknown link {0}")]
    UnknownLink(String),

    #[error("constraint frame cannot be resolved: {0}")]
    Frame(#[from] TransformError),

    #[error("negative tolerance {value} on {name}")]
    NegativeTolerance { name: String, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_convert_into_constraint_errors() {
        let err: ConstraintError = TransformError::UnknownFrame("table".into()).into();
        assert_eq!(
            err.to_string(),
            "constraint frame cannot be resolved: unknown frame: table"
        );
    }
}
