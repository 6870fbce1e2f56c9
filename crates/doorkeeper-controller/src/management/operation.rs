use std::fmt;
use std::time::Duration;

use doorkeeper_core::{Error, Uid};
use tokio::time::Instant;

/// What an armed operation will do with the next card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    /// Enroll the next card presented.
    Register,
    /// Wipe `target` back to factory keys and revoke it.
    Erase { target: Uid },
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Register => f.write_str("register"),
            OperationKind::Erase { target } => write!(f, "erase {target}"),
        }
    }
}

/// An armed, not yet completed, lifecycle operation.
#[derive(Debug, Clone)]
pub struct LifecycleOperation {
    pub kind: OperationKind,
    pub started_at: Instant,
}

impl LifecycleOperation {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            started_at: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.elapsed() >= timeout
    }
}

/// Result of a completed lifecycle operation.
#[derive(Debug)]
pub struct OperationOutcome {
    pub kind: OperationKind,
    /// Card the operation acted on, when one was read.
    pub uid: Option<Uid>,
    pub error: Option<Error>,
}

impl OperationOutcome {
    pub fn succeeded(kind: OperationKind, uid: Uid) -> Self {
        Self {
            kind,
            uid: Some(uid),
            error: None,
        }
    }

    pub fn failed(kind: OperationKind, uid: Option<Uid>, error: Error) -> Self {
        Self {
            kind,
            uid,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, &self.uid) {
            (None, Some(uid)) => write!(f, "{} succeeded for {uid}", self.kind),
            (None, None) => write!(f, "{} succeeded", self.kind),
            (Some(error), _) => write!(f, "{} failed: {error}", self.kind),
        }
    }
}
