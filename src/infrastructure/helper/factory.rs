//! Helper factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use crate::config::{HelperConfig, HelperKind};
use crate::domain::experiment::ExperimentHelper;
use crate::domain::DomainError;

use super::delayed::DelayedHelper;
use super::static_assignment::StaticAssignmentHelper;
use super::unavailable::UnavailableHelper;

/// Build the helper described by configuration
pub fn build_helper(config: &HelperConfig) -> Result<Arc<dyn ExperimentHelper>, DomainError> {
    let helper: Arc<dyn ExperimentHelper> = match config.kind {
        HelperKind::Unavailable => Arc::new(UnavailableHelper::new()),
        HelperKind::Static => Arc::new(StaticAssignmentHelper::from_assignments(
            &config.assignments,
        )?),
    };

    Ok(match config.delay_ms {
        Some(delay_ms) => Arc::new(DelayedHelper::new(helper, Duration::from_millis(delay_ms))),
        None => helper,
    })
}
