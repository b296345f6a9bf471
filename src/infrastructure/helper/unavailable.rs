//! Helper used when no experimentation platform is configured

use std::sync::Arc;

use tracing::warn;

use crate::domain::experiment::{AssignmentCallback, Experiment, ExperimentHelper, TriggerOutcome};

/// Helper that never reaches a platform
///
/// Every trigger is reported as unavailable and the callback is dropped, so
/// experiments keep their default group.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableHelper;

impl UnavailableHelper {
    pub fn new() -> Self {
        Self
    }
}

impl ExperimentHelper for UnavailableHelper {
    fn trigger_experiment(
        &self,
        experiment: Arc<Experiment>,
        _callback: AssignmentCallback,
    ) -> TriggerOutcome {
        warn!(
            experiment_id = %experiment.id(),
            "Experimentation platform not available. Unable to continue."
        );

        TriggerOutcome::unavailable("experimentation platform not available")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::Group;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_never_calls_back() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let experiment = Arc::new(Experiment::create("FROG").unwrap());

        let outcome = UnavailableHelper::new().trigger_experiment(
            experiment.clone(),
            Box::new(move |_| flag.store(true, Ordering::SeqCst)),
        );

        assert!(!outcome.is_triggered());
        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(experiment.group(), Group::default());
    }
}
