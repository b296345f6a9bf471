//! Configuration loading

mod app_config;

pub use app_config::{
    AppConfig, DuplicatePolicy, HelperConfig, HelperKind, LogFormat, LoggingConfig,
    ManagerConfig, StaticAssignment, UnknownExperimentPolicy,
};
