//! Lifecycle signals emitted by experiments and the observer contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use super::entity::ExperimentId;

// ============================================================================
// SignalKind
// ============================================================================

/// Named lifecycle signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    /// The experiment asks to be activated
    Enrolled,
    /// Activation was delegated to the helper
    Activating,
    /// A group has been applied
    Activated,
}

impl SignalKind {
    /// Wire name of the signal
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enrolled => "ENROLLED",
            Self::Activating => "ACTIVATING",
            Self::Activated => "ACTIVATED",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Signal
// ============================================================================

/// A signal as delivered to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    kind: SignalKind,
    experiment_id: ExperimentId,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
    emitted_at: DateTime<Utc>,
}

impl Signal {
    pub fn new(kind: SignalKind, experiment_id: ExperimentId, payload: Value) -> Self {
        Self {
            kind,
            experiment_id,
            payload,
            emitted_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    /// Id of the experiment that emitted the signal
    pub fn experiment_id(&self) -> &ExperimentId {
        &self.experiment_id
    }

    /// Signal payload, `Value::Null` when the signal carries none
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn emitted_at(&self) -> DateTime<Utc> {
        self.emitted_at
    }

    pub fn is(&self, kind: SignalKind) -> bool {
        self.kind == kind
    }
}

// ============================================================================
// ExperimentObserver
// ============================================================================

/// Subscriber to an experiment's lifecycle signals
///
/// Observers are notified synchronously, in subscription order, before
/// [`Experiment::emit`](super::Experiment::emit) returns. No experiment lock is
/// held during a notification, so an observer may subscribe, unsubscribe or
/// re-enter the manager.
#[cfg_attr(test, automock)]
pub trait ExperimentObserver: Send + Sync {
    fn notify(&self, signal: &Signal);
}

impl<F> ExperimentObserver for F
where
    F: Fn(&Signal) + Send + Sync,
{
    fn notify(&self, signal: &Signal) {
        self(signal)
    }
}

/// Shared observer handle; identity is the allocation it points to
pub type ObserverRef = Arc<dyn ExperimentObserver>;

/// Whether two handles refer to the same observer
pub(crate) fn same_observer(a: &ObserverRef, b: &ObserverRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
