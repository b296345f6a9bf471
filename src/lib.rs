//! Canvass experiments
//!
//! Client-side orchestration of A/B test experiments:
//! - Experiments that broadcast their lifecycle signals to observers
//! - A registry that activates enrolled experiments through a pluggable helper
//! - Built-in helpers for setups without a live experimentation platform

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    DomainError, Experiment, ExperimentHelper, ExperimentId, ExperimentObserver,
    ExperimentStatus, Group, Signal, SignalKind, TriggerOutcome,
};
pub use infrastructure::services::{ActivationOutcome, ExperimentManager};
