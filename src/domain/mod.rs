//! Domain layer - Core business logic and entities

pub mod error;
pub mod experiment;

pub use error::DomainError;
pub use experiment::{
    AssignmentCallback, Experiment, ExperimentHelper, ExperimentId, ExperimentObserver,
    ExperimentStatus, ExperimentValidationError, Group, ObserverRef, Signal, SignalKind,
    TriggerOutcome,
};
