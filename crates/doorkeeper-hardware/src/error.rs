//! Error types for hardware operations.
//!
//! These cover radio communication failures, rejected block operations and
//! initialization problems. [`HardwareError`] converts into
//! [`doorkeeper_core::Error`] so controller code can propagate with `?`.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has not been started.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// No card answered the request.
    #[error("No card in field")]
    NoCard,

    /// Card UID could not be read.
    #[error("Card read error: {message}")]
    CardReadError { message: String },

    /// The card refused the supplied sector key.
    #[error("Authentication rejected for block {block}")]
    AuthenticationRejected { block: u8 },

    /// A block write did not complete.
    #[error("Write to block {block} failed: {message}")]
    WriteFailed { block: u8, message: String },
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new card read error.
    pub fn card_read(message: impl Into<String>) -> Self {
        Self::CardReadError {
            message: message.into(),
        }
    }

    /// Create a new write failure for a block.
    pub fn write_failed(block: u8, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            block,
            message: message.into(),
        }
    }
}

impl From<HardwareError> for doorkeeper_core::Error {
    fn from(error: HardwareError) -> Self {
        match error {
            HardwareError::InitializationFailed { message } => Self::HardwareInit(message),
            HardwareError::AuthenticationRejected { block } => {
                Self::authentication(format!("card rejected key for block {block}"))
            }
            other => Self::Hardware(other.to_string()),
        }
    }
}
