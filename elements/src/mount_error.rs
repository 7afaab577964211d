// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use canonical_error::{
    aborted_error, deadline_exceeded_error, failed_precondition_error,
    invalid_argument_error, out_of_range_error, CanonicalError,
};
use thiserror::Error;

/// Failures surfaced by the mount geometry and motion engine. OutOfRange and
/// Unreachable are routine outcomes of a conversion request; callers are
/// expected to handle them without treating them as faults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MountError {
    #[error("{axis} axis position {ticks} outside [{min}, {max}]")]
    OutOfRange {
        axis: String,
        ticks: i64,
        min: i32,
        max: i32,
    },

    #[error("target unreachable: {0}")]
    Unreachable(String),

    #[error("pointing model line {line}, {field}: {message}")]
    ModelParse {
        line: usize,
        field: String,
        message: String,
    },

    #[error("singular geometry: {0}")]
    SingularGeometry(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("slew did not converge within {elapsed:.1} seconds")]
    SlewTimeout { elapsed: f64 },
}

pub type MountResult<T> = Result<T, MountError>;

impl MountError {
    pub fn model_parse(line: usize, field: &str, message: &str) -> Self {
        MountError::ModelParse {
            line,
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

// Lets the device driver forward engine failures across its collaborator
// boundary, which speaks CanonicalError.
impl From<MountError> for CanonicalError {
    fn from(err: MountError) -> Self {
        let msg = err.to_string();
        match err {
            MountError::OutOfRange { .. } => out_of_range_error(&msg),
            MountError::Unreachable(_) => failed_precondition_error(&msg),
            MountError::ModelParse { .. } => invalid_argument_error(&msg),
            MountError::SingularGeometry(_) => aborted_error(&msg),
            MountError::InvalidArgument(_) => invalid_argument_error(&msg),
            MountError::SlewTimeout { .. } => deadline_exceeded_error(&msg),
        }
    }
}

// mod tests.
