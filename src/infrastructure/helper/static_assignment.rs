//! Helper serving fixed groups from a lookup table

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::StaticAssignment;
use crate::domain::experiment::{
    AssignmentCallback, Experiment, ExperimentHelper, ExperimentId, Group, TriggerOutcome,
};
use crate::domain::DomainError;

/// Helper that assigns every known experiment a fixed group
///
/// The callback runs synchronously inside `trigger_experiment`. Experiments
/// missing from the table are reported as unavailable, the way a platform
/// without a trigger for the experiment would be.
#[derive(Debug, Default, Clone)]
pub struct StaticAssignmentHelper {
    assignments: HashMap<ExperimentId, Group>,
}

impl StaticAssignmentHelper {
    /// Create a helper with an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from configuration entries
    pub fn from_assignments(assignments: &[StaticAssignment]) -> Result<Self, DomainError> {
        let mut helper = Self::new();

        for assignment in assignments {
            let id = ExperimentId::new(assignment.experiment.as_str())?;
            helper
                .assignments
                .insert(id, Group::new(assignment.group));
        }

        Ok(helper)
    }

    /// Add or replace the group for an experiment
    pub fn with_assignment(mut self, id: ExperimentId, group: Group) -> Self {
        self.assignments.insert(id, group);
        self
    }

    /// Get the configured group for an experiment
    pub fn group_for(&self, id: &str) -> Option<Group> {
        self.assignments.get(id).copied()
    }
}

impl ExperimentHelper for StaticAssignmentHelper {
    fn trigger_experiment(
        &self,
        experiment: Arc<Experiment>,
        callback: AssignmentCallback,
    ) -> TriggerOutcome {
        let Some(group) = self.group_for(experiment.id().as_str()) else {
            warn!(
                experiment_id = %experiment.id(),
                "Experiment trigger could not be found, so could not be triggered"
            );
            return TriggerOutcome::unavailable(format!(
                "no assignment configured for '{}'",
                experiment.id()
            ));
        };

        debug!(experiment_id = %experiment.id(), group = %group, "Serving static assignment");
        callback(group);

        TriggerOutcome::Triggered
    }
}
