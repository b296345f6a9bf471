//! Helper wrapper that delivers assignments after a delay

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::domain::experiment::{AssignmentCallback, Experiment, ExperimentHelper, TriggerOutcome};

/// Wraps another helper and runs its callback on the tokio runtime once
/// `delay` has elapsed
///
/// The wrapped helper is triggered immediately. Only the delivery of the group
/// is postponed, which models a platform that answers asynchronously.
#[derive(Debug)]
pub struct DelayedHelper {
    inner: Arc<dyn ExperimentHelper>,
    delay: Duration,
}

impl DelayedHelper {
    pub fn new(inner: Arc<dyn ExperimentHelper>, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl ExperimentHelper for DelayedHelper {
    fn trigger_experiment(
        &self,
        experiment: Arc<Experiment>,
        callback: AssignmentCallback,
    ) -> TriggerOutcome {
        let Ok(handle) = Handle::try_current() else {
            warn!(
                experiment_id = %experiment.id(),
                "No tokio runtime available to deliver delayed assignment"
            );
            return TriggerOutcome::unavailable("no tokio runtime available");
        };

        let delay = self.delay;
        let experiment_id = experiment.id().clone();

        self.inner.trigger_experiment(
            experiment,
            Box::new(move |group| {
                debug!(
                    experiment_id = %experiment_id,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling delayed assignment"
                );

                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    callback(group);
                });
            }),
        )
    }
}
