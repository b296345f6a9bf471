//! Helper capability: the collaborator that asks the experimentation
//! platform for a group

use std::fmt::{self, Debug};
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use super::entity::{Experiment, Group};

/// Receives the group chosen by the platform; can run at most once
pub type AssignmentCallback = Box<dyn FnOnce(Group) + Send + 'static>;

/// Result of handing an experiment to a helper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The platform accepted the experiment; the callback may run now, later
    /// or never
    Triggered,
    /// The platform could not be reached; the callback was dropped
    Unavailable { reason: String },
}

impl TriggerOutcome {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self, Self::Triggered)
    }
}

impl fmt::Display for TriggerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triggered => write!(f, "triggered"),
            Self::Unavailable { reason } => write!(f, "unavailable: {}", reason),
        }
    }
}

/// Platform integration used by the manager to activate experiments
///
/// Implementations report an unreachable platform through
/// [`TriggerOutcome::Unavailable`] instead of failing.
#[cfg_attr(test, automock)]
pub trait ExperimentHelper: Send + Sync + Debug {
    /// Ask the platform for a group and hand it to `callback`
    fn trigger_experiment(
        &self,
        experiment: Arc<Experiment>,
        callback: AssignmentCallback,
    ) -> TriggerOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::ExperimentStatus;

    #[test]
    fn test_outcome_display() {
        assert_eq!(TriggerOutcome::Triggered.to_string(), "triggered");
        assert_eq!(
            TriggerOutcome::unavailable("no platform").to_string(),
            "unavailable: no platform"
        );
    }

    #[test]
    fn test_mock_helper_invokes_callback() {
        let mut helper = MockExperimentHelper::new();
        helper
            .expect_trigger_experiment()
            .times(1)
            .returning(|_, callback| {
                callback(Group::new(4));
                TriggerOutcome::Triggered
            });

        let experiment = Arc::new(Experiment::create("FROG").unwrap());
        let target = experiment.clone();
        let outcome = helper.trigger_experiment(
            experiment.clone(),
            Box::new(move |group| target.set_group(group)),
        );

        assert!(outcome.is_triggered());
        assert_eq!(experiment.group(), Group::new(4));
        assert_eq!(experiment.status(), ExperimentStatus::Activated);
    }
}
