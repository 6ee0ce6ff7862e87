//! Lifecycle events emitted by tracked operations.

use std::fmt;

/// Namespace of ordinary data operations (account, profile)
pub const API_NAMESPACE: &str = "api";

/// Namespace of scan data operations (job list, job detail, submission)
pub const SCAN_NAMESPACE: &str = "scanApi";

/// Name of a tracked operation: `namespace/endpoint`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationName {
    pub namespace: String,
    pub endpoint: String,
}

impl OperationName {
    pub fn new(namespace: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Operation in the ordinary data namespace
    pub fn api(endpoint: impl Into<String>) -> Self {
        Self::new(API_NAMESPACE, endpoint)
    }

    /// Operation in the scan data namespace
    pub fn scan(endpoint: impl Into<String>) -> Self {
        Self::new(SCAN_NAMESPACE, endpoint)
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.endpoint)
    }
}

/// Where an operation is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Fulfilled,
    Rejected,
}

impl Phase {
    pub fn suffix(&self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Fulfilled => "fulfilled",
            Phase::Rejected => "rejected",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "pending" => Some(Phase::Pending),
            "fulfilled" => Some(Phase::Fulfilled),
            "rejected" => Some(Phase::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Phase::Pending)
    }
}

/// One lifecycle notification.
///
/// Every tracked call emits exactly one `Pending`, then exactly one terminal
/// event carrying the same `request_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub operation: OperationName,
    pub request_id: String,
    pub phase: Phase,
}

impl LifecycleEvent {
    pub fn new(operation: OperationName, request_id: impl Into<String>, phase: Phase) -> Self {
        Self {
            operation,
            request_id: request_id.into(),
            phase,
        }
    }

    pub fn pending(operation: OperationName, request_id: impl Into<String>) -> Self {
        Self::new(operation, request_id, Phase::Pending)
    }

    pub fn fulfilled(operation: OperationName, request_id: impl Into<String>) -> Self {
        Self::new(operation, request_id, Phase::Fulfilled)
    }

    pub fn rejected(operation: OperationName, request_id: impl Into<String>) -> Self {
        Self::new(operation, request_id, Phase::Rejected)
    }

    /// Namespace of the emitting operation
    pub fn namespace(&self) -> &str {
        &self.operation.namespace
    }

    /// Rendered as `namespace/endpoint/phase`
    pub fn action_type(&self) -> String {
        format!("{}/{}", self.operation, self.phase.suffix())
    }

    /// Parse a `namespace/endpoint/phase` action type.
    ///
    /// The endpoint may itself contain slashes; the namespace is everything
    /// before the first one and the phase everything after the last one.
    pub fn parse(action_type: &str, request_id: impl Into<String>) -> Option<Self> {
        let (name, suffix) = action_type.rsplit_once('/')?;
        let phase = Phase::from_suffix(suffix)?;
        let (namespace, endpoint) = name.split_once('/')?;
        if namespace.is_empty() || endpoint.is_empty() {
            return None;
        }
        Some(Self::new(OperationName::new(namespace, endpoint), request_id, phase))
    }
}

/// Receives lifecycle events synchronously, in emission order.
pub trait LifecycleObserver: Send + Sync {
    fn observe(&self, event: &LifecycleEvent);
}
