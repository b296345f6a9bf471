//! Infrastructure services

mod experiment_manager;

pub use experiment_manager::{ActivationOutcome, ExperimentManager};
