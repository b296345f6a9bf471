//! Experiment domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::signal::{same_observer, ObserverRef, Signal, SignalKind};
use super::validation::{validate_experiment_id, ExperimentValidationError};

// ============================================================================
// ExperimentId
// ============================================================================

/// Unique identifier for an experiment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExperimentId(String);

impl ExperimentId {
    /// Create a new experiment ID with validation
    pub fn new(id: impl Into<String>) -> Result<Self, ExperimentValidationError> {
        let id = id.into();
        validate_experiment_id(&id)?;
        Ok(Self(id))
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExperimentId {
    type Error = ExperimentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ExperimentId {
    type Error = ExperimentValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExperimentId> for String {
    fn from(id: ExperimentId) -> Self {
        id.0
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ExperimentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for ExperimentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Group
// ============================================================================

/// Variant a user has been bucketed into; `0` until a group is assigned
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Group(u32);

impl Group {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Group {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ExperimentStatus
// ============================================================================

/// Activation status of an experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperimentStatus {
    /// Created, waiting for enrollment
    #[default]
    Initializing,
    /// Delegated to the helper, waiting for a group
    Activating,
    /// A group has been assigned
    Activated,
}

impl ExperimentStatus {
    /// Check if a group has been assigned
    pub fn is_activated(&self) -> bool {
        matches!(self, Self::Activated)
    }

    /// Check if a transition to the target status is valid
    pub fn can_transition_to(&self, target: ExperimentStatus) -> bool {
        match (self, target) {
            (Self::Initializing, Self::Activating) => true,
            (Self::Initializing, Self::Activated) => true,
            (Self::Activating, Self::Activated) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "INITIALIZING"),
            Self::Activating => write!(f, "ACTIVATING"),
            Self::Activated => write!(f, "ACTIVATED"),
        }
    }
}

// ============================================================================
// Experiment
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct ExperimentState {
    status: ExperimentStatus,
    group: Group,
    activated_at: Option<DateTime<Utc>>,
}

/// An A/B test experiment and its signal subscribers
///
/// Experiments are shared as `Arc<Experiment>` between the caller, the
/// [`ExperimentManager`](crate::infrastructure::services::ExperimentManager)
/// and any pending helper callback, so state lives behind interior locks.
pub struct Experiment {
    id: ExperimentId,
    created_at: DateTime<Utc>,
    state: RwLock<ExperimentState>,
    observers: RwLock<Vec<ObserverRef>>,
}

impl Experiment {
    /// Create a new experiment in Initializing status
    pub fn new(id: ExperimentId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            state: RwLock::new(ExperimentState::default()),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Validate a raw id and create an experiment for it
    pub fn create(id: impl Into<String>) -> Result<Self, ExperimentValidationError> {
        Ok(Self::new(ExperimentId::new(id)?))
    }

    // Getters

    /// Get the experiment ID
    pub fn id(&self) -> &ExperimentId {
        &self.id
    }

    /// Get the current status
    pub fn status(&self) -> ExperimentStatus {
        self.state().status
    }

    /// Get the assigned group
    pub fn group(&self) -> Group {
        self.state().group
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the first group was assigned
    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.state().activated_at
    }

    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }

    pub fn is_subscribed(&self, observer: &ObserverRef) -> bool {
        self.observers().iter().any(|o| same_observer(o, observer))
    }

    // Subscriptions

    /// Add an observer; returns false if it was already subscribed
    pub fn subscribe(&self, observer: ObserverRef) -> bool {
        let mut observers = self.observers_mut();

        if observers.iter().any(|o| same_observer(o, &observer)) {
            return false;
        }

        observers.push(observer);
        true
    }

    /// Remove an observer; returns false if it was not subscribed
    pub fn unsubscribe(&self, observer: &ObserverRef) -> bool {
        let mut observers = self.observers_mut();

        match observers.iter().position(|o| same_observer(o, observer)) {
            Some(position) => {
                observers.remove(position);
                true
            }
            None => false,
        }
    }

    /// Notify every current subscriber, in subscription order
    ///
    /// Observers subscribed while the signal is being delivered are not
    /// notified of it.
    pub fn emit(&self, kind: SignalKind, payload: Value) {
        let observers = self.observers().clone();

        if observers.is_empty() {
            return;
        }

        let signal = Signal::new(kind, self.id.clone(), payload);

        for observer in &observers {
            observer.notify(&signal);
        }
    }

    // Lifecycle

    /// Request activation by emitting `ENROLLED`
    pub fn enroll(&self) {
        self.emit(SignalKind::Enrolled, Value::Null);
    }

    /// Mark the experiment as delegated to a helper
    ///
    /// Emits `ACTIVATING` on the first call. Calling again while still
    /// activating is accepted so a helper that never answered can be retried.
    pub fn begin_activation(&self) -> Result<(), ExperimentValidationError> {
        let transitioned = {
            let mut state = self.state_mut();
            let current = state.status;

            match current {
                ExperimentStatus::Activating => false,
                status if status.can_transition_to(ExperimentStatus::Activating) => {
                    state.status = ExperimentStatus::Activating;
                    true
                }
                status => {
                    return Err(ExperimentValidationError::InvalidStatusTransition(
                        status.to_string(),
                        ExperimentStatus::Activating.to_string(),
                    ));
                }
            }
        };

        if transitioned {
            self.emit(SignalKind::Activating, Value::Null);
        }

        Ok(())
    }

    /// Apply the group chosen by the helper and emit `ACTIVATED`
    pub fn set_group(&self, group: Group) {
        {
            let mut state = self.state_mut();
            state.group = group;

            if state.status.can_transition_to(ExperimentStatus::Activated) {
                state.status = ExperimentStatus::Activated;
                state.activated_at = Some(Utc::now());
            }
        }

        self.emit(SignalKind::Activated, json!({ "group": group.value() }));
    }

    // Private helpers

    fn state(&self) -> RwLockReadGuard<'_, ExperimentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, ExperimentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> RwLockReadGuard<'_, Vec<ObserverRef>> {
        self.observers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers_mut(&self) -> RwLockWriteGuard<'_, Vec<ObserverRef>> {
        self.observers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = *self.state();

        f.debug_struct("Experiment")
            .field("id", &self.id)
            .field("status", &state.status)
            .field("group", &state.group)
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::signal::MockExperimentObserver;
    use std::sync::{Arc, Mutex};

    type SignalLog = Arc<Mutex<Vec<(&'static str, SignalKind)>>>;

    /// Observer that appends `(label, kind)` to a shared log
    fn recorder(label: &'static str, log: &SignalLog) -> ObserverRef {
        let log = log.clone();
        Arc::new(move |signal: &Signal| {
            log.lock().unwrap().push((label, signal.kind()));
        })
    }

    mod experiment_id_tests {
        use super::*;

        #[test]
        fn test_valid_experiment_id() {
            let id = ExperimentId::new("FROG").unwrap();
            assert_eq!(id.as_str(), "FROG");
            assert_eq!(id.to_string(), "FROG");
        }

        #[test]
        fn test_experiment_id_serialization() {
            let id = ExperimentId::new("FROG").unwrap();
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, "\"FROG\"");

            let parsed: ExperimentId = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, id);
        }

        #[test]
        fn test_empty_experiment_id_rejected() {
            assert_eq!(
                ExperimentId::new(""),
                Err(ExperimentValidationError::EmptyId)
            );
            assert!(serde_json::from_str::<ExperimentId>("\"\"").is_err());
        }
    }

    mod group_tests {
        use super::*;

        #[test]
        fn test_default_group_is_zero() {
            assert_eq!(Group::default().value(), 0);
        }

        #[test]
        fn test_group_serializes_as_integer() {
            assert_eq!(serde_json::to_string(&Group::new(3)).unwrap(), "3");
        }
    }

    mod experiment_status_tests {
        use super::*;

        #[test]
        fn test_default_status() {
            assert_eq!(ExperimentStatus::default(), ExperimentStatus::Initializing);
        }

        #[test]
        fn test_status_transitions() {
            assert!(ExperimentStatus::Initializing.can_transition_to(ExperimentStatus::Activating));
            assert!(ExperimentStatus::Activating.can_transition_to(ExperimentStatus::Activated));
            assert!(ExperimentStatus::Initializing.can_transition_to(ExperimentStatus::Activated));

            // Never back to Initializing
            assert!(
                !ExperimentStatus::Activating.can_transition_to(ExperimentStatus::Initializing)
            );
            assert!(!ExperimentStatus::Activated.can_transition_to(ExperimentStatus::Initializing));
            assert!(!ExperimentStatus::Activated.can_transition_to(ExperimentStatus::Activating));
        }

        #[test]
        fn test_status_display() {
            assert_eq!(ExperimentStatus::Initializing.to_string(), "INITIALIZING");
            assert_eq!(ExperimentStatus::Activating.to_string(), "ACTIVATING");
            assert_eq!(ExperimentStatus::Activated.to_string(), "ACTIVATED");
        }
    }

    mod experiment_tests {
        use super::*;

        #[test]
        fn test_experiment_creation() {
            let exp = Experiment::create("FROG").unwrap();
            assert_eq!(exp.id().as_str(), "FROG");
            assert_eq!(exp.status(), ExperimentStatus::Initializing);
            assert_eq!(exp.group(), Group::new(0));
            assert_eq!(exp.observer_count(), 0);
            assert!(exp.activated_at().is_none());
        }

        #[test]
        fn test_experiment_requires_id() {
            assert_eq!(
                Experiment::create("").unwrap_err(),
                ExperimentValidationError::EmptyId
            );
        }

        #[test]
        fn test_subscribe_is_idempotent() {
            let exp = Experiment::create("FROG").unwrap();
            let log = Arc::new(Mutex::new(Vec::new()));
            let observer = recorder("a", &log);

            assert!(exp.subscribe(observer.clone()));
            assert!(!exp.subscribe(observer.clone()));
            assert_eq!(exp.observer_count(), 1);

            exp.enroll();
            assert_eq!(*log.lock().unwrap(), vec![("a", SignalKind::Enrolled)]);
        }

        #[test]
        fn test_unsubscribe_keeps_order_of_others() {
            let exp = Experiment::create("FROG").unwrap();
            let log = Arc::new(Mutex::new(Vec::new()));
            let a = recorder("a", &log);
            let b = recorder("b", &log);
            let c = recorder("c", &log);

            exp.subscribe(a.clone());
            exp.subscribe(b.clone());
            exp.subscribe(c.clone());

            assert!(exp.unsubscribe(&b));
            assert!(!exp.unsubscribe(&b));
            assert!(exp.is_subscribed(&a));
            assert!(!exp.is_subscribed(&b));

            exp.enroll();
            assert_eq!(
                *log.lock().unwrap(),
                vec![("a", SignalKind::Enrolled), ("c", SignalKind::Enrolled)]
            );
        }

        #[test]
        fn test_emit_without_subscribers() {
            let exp = Experiment::create("FROG").unwrap();
            exp.emit(SignalKind::Enrolled, Value::Null);
            assert_eq!(exp.status(), ExperimentStatus::Initializing);
        }

        #[test]
        fn test_emit_delivers_id_and_payload() {
            let exp = Experiment::create("FROG").unwrap();
            let mut mock = MockExperimentObserver::new();
            mock.expect_notify()
                .withf(|signal| {
                    signal.is(SignalKind::Enrolled)
                        && signal.experiment_id().as_str() == "FROG"
                        && signal.payload() == &json!({ "source": "test" })
                })
                .times(1)
                .return_const(());

            exp.subscribe(Arc::new(mock));
            exp.emit(SignalKind::Enrolled, json!({ "source": "test" }));
        }

        #[test]
        fn test_observer_subscribed_during_emit_misses_current_signal() {
            let exp = Arc::new(Experiment::create("FROG").unwrap());
            let log = Arc::new(Mutex::new(Vec::new()));
            let late = recorder("late", &log);

            let target = exp.clone();
            let late_handle = late.clone();
            exp.subscribe(Arc::new(move |_: &Signal| {
                target.subscribe(late_handle.clone());
            }));

            exp.enroll();
            assert!(log.lock().unwrap().is_empty());
            assert!(exp.is_subscribed(&late));

            exp.enroll();
            assert_eq!(*log.lock().unwrap(), vec![("late", SignalKind::Enrolled)]);
        }

        #[test]
        fn test_activation_lifecycle() {
            let exp = Experiment::create("FROG").unwrap();
            let log = Arc::new(Mutex::new(Vec::new()));
            exp.subscribe(recorder("a", &log));

            exp.begin_activation().unwrap();
            assert_eq!(exp.status(), ExperimentStatus::Activating);

            // Retrying while activating does not emit again
            exp.begin_activation().unwrap();

            exp.set_group(Group::new(2));
            assert_eq!(exp.status(), ExperimentStatus::Activated);
            assert_eq!(exp.group(), Group::new(2));
            assert!(exp.activated_at().is_some());

            assert_eq!(
                *log.lock().unwrap(),
                vec![("a", SignalKind::Activating), ("a", SignalKind::Activated)]
            );
        }

        #[test]
        fn test_begin_activation_after_activated_fails() {
            let exp = Experiment::create("FROG").unwrap();
            exp.set_group(Group::new(1));

            assert_eq!(
                exp.begin_activation(),
                Err(ExperimentValidationError::InvalidStatusTransition(
                    "ACTIVATED".to_string(),
                    "ACTIVATING".to_string(),
                ))
            );
            assert_eq!(exp.status(), ExperimentStatus::Activated);
        }

        #[test]
        fn test_set_group_payload() {
            let exp = Experiment::create("FROG").unwrap();
            let mut mock = MockExperimentObserver::new();
            mock.expect_notify()
                .withf(|signal| {
                    signal.is(SignalKind::Activated) && signal.payload() == &json!({ "group": 0 })
                })
                .times(1)
                .return_const(());

            exp.subscribe(Arc::new(mock));
            exp.set_group(Group::new(0));
        }

        #[test]
        fn test_reassigning_group_keeps_first_activation_time() {
            let exp = Experiment::create("FROG").unwrap();
            exp.set_group(Group::new(1));
            let first = exp.activated_at();

            exp.set_group(Group::new(2));
            assert_eq!(exp.group(), Group::new(2));
            assert_eq!(exp.activated_at(), first);
        }

        #[test]
        fn test_debug_output() {
            let exp = Experiment::create("FROG").unwrap();
            let debug = format!("{:?}", exp);
            assert!(debug.contains("FROG"));
            assert!(debug.contains("Initializing"));
        }
    }
}
