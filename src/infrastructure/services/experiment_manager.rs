//! Experiment manager
//!
//! Keeps the registry of experiments, turns their `ENROLLED` signal into an
//! activation request, and applies the group chosen by the helper back onto
//! the experiment.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, DuplicatePolicy, ManagerConfig, UnknownExperimentPolicy};
use crate::domain::experiment::{
    AssignmentCallback, Experiment, ExperimentHelper, ExperimentId, ExperimentObserver,
    ObserverRef, Signal, SignalKind, TriggerOutcome,
};
use crate::domain::DomainError;
use crate::infrastructure::helper::{build_helper, UnavailableHelper};
use crate::infrastructure::metrics::{
    record_activation, record_group_assignment, record_registry_change,
};

static DEFAULT_MANAGER: Lazy<Arc<ExperimentManager>> =
    Lazy::new(|| ExperimentManager::new(Arc::new(UnavailableHelper::new())));

// ============================================================================
// ActivationOutcome
// ============================================================================

/// Result of an activation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The helper accepted the experiment; the group arrives through its
    /// callback
    Delegated,
    /// The helper could not reach the platform
    Unavailable { reason: String },
    /// A group was already assigned; the helper was not called
    AlreadyActivated,
    /// No experiment is registered under the id
    NotRegistered,
}

impl ActivationOutcome {
    fn metric_label(&self) -> &'static str {
        match self {
            Self::Delegated => "delegated",
            Self::Unavailable { .. } => "unavailable",
            Self::AlreadyActivated => "already_activated",
            Self::NotRegistered => "not_registered",
        }
    }
}

// ============================================================================
// ExperimentManager
// ============================================================================

struct RegistryEntry {
    experiment: Arc<Experiment>,
    listener: ObserverRef,
}

/// Registry of experiments and bridge to the experimentation platform
///
/// Managers are always handed out as `Arc<ExperimentManager>`; the listeners
/// they attach to experiments hold a weak reference back. Use
/// [`ExperimentManager::global`] for the shared process-wide instance or
/// construct one with an explicit helper.
pub struct ExperimentManager {
    helper: RwLock<Arc<dyn ExperimentHelper>>,
    register: RwLock<HashMap<ExperimentId, RegistryEntry>>,
    config: ManagerConfig,
    this: Weak<ExperimentManager>,
}

impl ExperimentManager {
    /// Create a manager with default policies
    pub fn new(helper: Arc<dyn ExperimentHelper>) -> Arc<Self> {
        Self::with_config(helper, ManagerConfig::default())
    }

    /// Create a manager with explicit policies
    pub fn with_config(helper: Arc<dyn ExperimentHelper>, config: ManagerConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            helper: RwLock::new(helper),
            register: RwLock::new(HashMap::new()),
            config,
            this: this.clone(),
        })
    }

    /// Create a manager and its helper from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Arc<Self>, DomainError> {
        let helper = build_helper(&config.helper)?;
        Ok(Self::with_config(helper, config.manager.clone()))
    }

    /// Shared process-wide manager
    ///
    /// Starts with an [`UnavailableHelper`]; install the platform integration
    /// with [`set_helper`](Self::set_helper).
    pub fn global() -> Arc<Self> {
        DEFAULT_MANAGER.clone()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // ========================================================================
    // Helper
    // ========================================================================

    /// Get the current helper
    pub fn helper(&self) -> Arc<dyn ExperimentHelper> {
        self.helper
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the helper used for future activations
    pub fn set_helper(&self, helper: Arc<dyn ExperimentHelper>) {
        debug!(helper = ?helper, "Replacing experiment helper");
        *self.helper.write().unwrap_or_else(PoisonError::into_inner) = helper;
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Register an experiment and listen for its enrollment
    pub fn add_experiment(&self, experiment: Arc<Experiment>) -> Result<(), DomainError> {
        let id = experiment.id().clone();
        let listener: ObserverRef = Arc::new(EnrollmentListener {
            manager: self.this.clone(),
        });

        let registered = {
            let mut register = self.register_mut();

            if register.contains_key(&id) && self.config.duplicate_policy == DuplicatePolicy::Reject
            {
                warn!(experiment_id = %id, "Experiment already registered");
                return Err(DomainError::conflict(format!(
                    "Experiment '{}' is already registered",
                    id
                )));
            }

            let entry = RegistryEntry {
                experiment: experiment.clone(),
                listener: listener.clone(),
            };

            if let Some(previous) = register.insert(id.clone(), entry) {
                previous.experiment.unsubscribe(&previous.listener);
                info!(experiment_id = %id, "Replaced registered experiment");
            }

            experiment.subscribe(listener);
            register.len()
        };

        debug!(experiment_id = %id, "Experiment registered");
        record_registry_change("add", registered);

        Ok(())
    }

    /// Unregister an experiment and detach its enrollment listener
    ///
    /// Unknown ids are ignored. The experiment itself stays usable, so a
    /// helper callback that arrives later still applies its group.
    pub fn remove_experiment(&self, id: &str) -> Option<Arc<Experiment>> {
        let (entry, registered) = {
            let mut register = self.register_mut();
            let entry = register.remove(id)?;
            entry.experiment.unsubscribe(&entry.listener);
            (entry, register.len())
        };

        debug!(experiment_id = %id, "Experiment removed");
        record_registry_change("remove", registered);

        Some(entry.experiment)
    }

    /// Get a registered experiment
    pub fn get_experiment(&self, id: &str) -> Option<Arc<Experiment>> {
        self.register()
            .get(id)
            .map(|entry| entry.experiment.clone())
    }

    /// Snapshot of the registry
    pub fn experiments(&self) -> HashMap<ExperimentId, Arc<Experiment>> {
        self.register()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.experiment.clone()))
            .collect()
    }

    /// Registered ids in sorted order
    pub fn experiment_ids(&self) -> Vec<ExperimentId> {
        let mut ids: Vec<_> = self.register().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.register().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.register().len()
    }

    pub fn is_empty(&self) -> bool {
        self.register().is_empty()
    }

    // ========================================================================
    // Activation
    // ========================================================================

    /// Ask the helper for a group for a registered experiment
    ///
    /// The helper decides if and when the group is delivered; this call
    /// returns as soon as the helper has been triggered.
    pub fn activate_experiment(&self, id: &str) -> Result<ActivationOutcome, DomainError> {
        let outcome = self.try_activate(id)?;
        record_activation(outcome.metric_label());
        Ok(outcome)
    }

    fn try_activate(&self, id: &str) -> Result<ActivationOutcome, DomainError> {
        let Some(experiment) = self.get_experiment(id) else {
            return match self.config.unknown_experiment_policy {
                UnknownExperimentPolicy::Ignore => {
                    debug!(experiment_id = %id, "Ignoring activation of unregistered experiment");
                    Ok(ActivationOutcome::NotRegistered)
                }
                UnknownExperimentPolicy::Report => {
                    record_activation(ActivationOutcome::NotRegistered.metric_label());
                    Err(DomainError::not_found(format!(
                        "Experiment '{}' is not registered",
                        id
                    )))
                }
            };
        };

        if experiment.begin_activation().is_err() {
            debug!(
                experiment_id = %id,
                group = %experiment.group(),
                "Experiment already activated"
            );
            return Ok(ActivationOutcome::AlreadyActivated);
        }

        info!(experiment_id = %id, "Activating experiment");

        let callback = self.assignment_callback(&experiment);

        match self.helper().trigger_experiment(experiment, callback) {
            TriggerOutcome::Triggered => Ok(ActivationOutcome::Delegated),
            TriggerOutcome::Unavailable { reason } => {
                warn!(experiment_id = %id, reason = %reason, "Experiment could not be activated");
                Ok(ActivationOutcome::Unavailable { reason })
            }
        }
    }

    fn assignment_callback(&self, experiment: &Arc<Experiment>) -> AssignmentCallback {
        let manager = self.this.clone();
        let experiment = experiment.clone();

        Box::new(move |group| {
            let registered = manager
                .upgrade()
                .is_some_and(|manager| manager.holds(&experiment));

            experiment.set_group(group);
            record_group_assignment(group.value(), !registered);

            if registered {
                info!(experiment_id = %experiment.id(), group = %group, "Experiment activated");
            } else {
                debug!(
                    experiment_id = %experiment.id(),
                    group = %group,
                    "Group assigned after experiment left the registry"
                );
            }
        })
    }

    /// Whether this exact experiment instance is registered
    fn holds(&self, experiment: &Arc<Experiment>) -> bool {
        self.register()
            .get(experiment.id().as_str())
            .is_some_and(|entry| Arc::ptr_eq(&entry.experiment, experiment))
    }

    // Private helpers

    fn register(&self) -> RwLockReadGuard<'_, HashMap<ExperimentId, RegistryEntry>> {
        self.register.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn register_mut(&self) -> RwLockWriteGuard<'_, HashMap<ExperimentId, RegistryEntry>> {
        self.register.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ExperimentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentManager")
            .field("helper", &self.helper())
            .field("experiments", &self.experiment_ids())
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// EnrollmentListener
// ============================================================================

/// Observer attached to every registered experiment
struct EnrollmentListener {
    manager: Weak<ExperimentManager>,
}

impl ExperimentObserver for EnrollmentListener {
    fn notify(&self, signal: &Signal) {
        if !signal.is(SignalKind::Enrolled) {
            return;
        }

        let Some(manager) = self.manager.upgrade() else {
            return;
        };

        let id = signal.experiment_id();

        if let Err(e) = manager.activate_experiment(id.as_str()) {
            warn!(experiment_id = %id, error = %e, "Enrollment could not be processed");
        }
    }
}
