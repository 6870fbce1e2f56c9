use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Boot errors
    #[error("Hardware initialization failed: {0}")]
    HardwareInit(String),

    #[error("Hardware operation failed: {0}")]
    Hardware(String),

    // Credential errors
    #[error("Authentication failed: {reason}")]
    AuthenticationFailure { reason: String },

    #[error("Credential already registered: {uid}")]
    AlreadyRegistered { uid: String },

    #[error("Credential not found: {uid}")]
    NotFound { uid: String },

    #[error("Wrong card presented: expected {expected}, got {actual}")]
    WrongCard { expected: String, actual: String },

    #[error("Invalid UID: {0}")]
    InvalidUid(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // Management errors
    #[error("Operation timed out after {elapsed_ms}ms")]
    OperationTimeout { elapsed_ms: u64 },

    #[error("Another management operation is already in progress")]
    OperationInProgress,

    #[error("Unknown management type '{requested}', available: {available}")]
    UnknownManagementType { requested: String, available: String },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Storage errors
    #[error("Persistence failed: {0}")]
    Persistence(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an authentication failure with a reason.
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::AuthenticationFailure {
            reason: reason.into(),
        }
    }

    /// Create an already-registered error for a UID.
    pub fn already_registered(uid: impl ToString) -> Self {
        Self::AlreadyRegistered {
            uid: uid.to_string(),
        }
    }

    /// Create a not-found error for a UID.
    pub fn not_found(uid: impl ToString) -> Self {
        Self::NotFound {
            uid: uid.to_string(),
        }
    }

    /// Whether the error must halt the device instead of being reported.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::HardwareInit(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
