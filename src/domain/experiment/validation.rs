//! Experiment validation utilities

use thiserror::Error;

/// Validation errors for experiments
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExperimentValidationError {
    #[error("Missing argument: id")]
    EmptyId,

    #[error("Invalid experiment status transition from {0} to {1}")]
    InvalidStatusTransition(String, String),
}

/// Validate an experiment ID
///
/// Any non-empty string is accepted; platform identifiers such as `FROG` or
/// `checkout_button-v2` are used verbatim.
pub fn validate_experiment_id(id: &str) -> Result<(), ExperimentValidationError> {
    if id.is_empty() {
        return Err(ExperimentValidationError::EmptyId);
    }

    Ok(())
}
