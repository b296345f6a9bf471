//! Experiment lifecycle metrics
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding application installs a recorder.

use metrics::{counter, gauge};

/// Record a registry change and the resulting registry size
pub fn record_registry_change(action: &'static str, registered: usize) {
    counter!("experiment_registry_changes_total", "action" => action).increment(1);
    gauge!("experiment_registry_size").set(registered as f64);
}

/// Record the outcome of an activation request
pub fn record_activation(outcome: &'static str) {
    counter!("experiment_activations_total", "outcome" => outcome).increment(1);
}

/// Record a group applied by a helper callback
///
/// `late` marks callbacks that arrived after the experiment left the registry.
pub fn record_group_assignment(group: u32, late: bool) {
    let labels = [
        ("group", group.to_string()),
        ("late", late.to_string()),
    ];

    counter!("experiment_group_assignments_total", &labels).increment(1);
}
