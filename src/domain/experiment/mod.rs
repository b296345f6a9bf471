//! Experiment domain module for A/B testing
//!
//! An [`Experiment`] carries its identity, activation status and assigned
//! group, and broadcasts lifecycle [`Signal`]s to its observers. The
//! [`ExperimentHelper`] trait is the boundary to the experimentation platform.

mod entity;
mod helper;
mod signal;
mod validation;

// Re-export all public types
pub use entity::{Experiment, ExperimentId, ExperimentStatus, Group};
pub use helper::{AssignmentCallback, ExperimentHelper, TriggerOutcome};
pub use signal::{ExperimentObserver, ObserverRef, Signal, SignalKind};
pub use validation::{validate_experiment_id, ExperimentValidationError};

#[cfg(test)]
pub use helper::MockExperimentHelper;
#[cfg(test)]
pub use signal::MockExperimentObserver;
