//! Infrastructure layer - Helpers, the experiment manager and ambient services

pub mod helper;
pub mod logging;
pub mod metrics;
pub mod services;
