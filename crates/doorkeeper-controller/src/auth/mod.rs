//! Authenticators polled while the controller is in Authentication mode.
//!
//! An authenticator turns a physical event into an access decision. The
//! coordinator asks each one in turn whether a request is pending and, for
//! the first that says yes, runs [`Authenticator::authenticate`] and drives
//! the actuation from the result.
//!
//! Authenticators that finish work on their own schedule advertise it via
//! [`Authenticator::supports_async_operations`]; the coordinator drains
//! their completed results before polling for fresh requests.

#![allow(async_fn_in_trait)]

pub mod card;
pub mod manual;

pub use card::{CardAuthenticator, CardAuthenticatorConfig};
pub use manual::{ManualTrigger, ManualTriggerConfig};

use doorkeeper_core::Result;

use crate::context::AccessContext;

/// Source of access requests.
pub trait Authenticator: Send {
    fn name(&self) -> &str;

    /// Prepare the underlying device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareInit`](doorkeeper_core::Error::HardwareInit)
    /// when the device does not answer; the controller halts.
    async fn initialize(&mut self, ctx: &mut AccessContext) -> Result<()>;

    /// Poll for a fresh access request.
    async fn has_authentication_request(&mut self, ctx: &mut AccessContext) -> bool;

    /// Decide the pending request.
    ///
    /// # Errors
    ///
    /// Any error denies access.
    async fn authenticate(&mut self, ctx: &mut AccessContext) -> Result<()>;

    /// Drop pending requests and transient state.
    fn reset(&mut self);

    fn supports_async_operations(&self) -> bool {
        false
    }

    /// Whether a background authentication has finished.
    fn has_completed_operation(&self) -> bool {
        false
    }

    /// Outcome of the finished background authentication.
    fn operation_result(&self) -> bool {
        false
    }

    /// Acknowledge the finished background authentication.
    fn clear_operation_flag(&mut self) {}
}

/// Enum wrapper for authenticator dispatch.
pub enum AnyAuthenticator {
    Card(CardAuthenticator),
    Manual(ManualTrigger),
}

impl From<CardAuthenticator> for AnyAuthenticator {
    fn from(authenticator: CardAuthenticator) -> Self {
        Self::Card(authenticator)
    }
}

impl From<ManualTrigger> for AnyAuthenticator {
    fn from(authenticator: ManualTrigger) -> Self {
        Self::Manual(authenticator)
    }
}

impl Authenticator for AnyAuthenticator {
    fn name(&self) -> &str {
        match self {
            Self::Card(auth) => auth.name(),
            Self::Manual(auth) => auth.name(),
        }
    }

    async fn initialize(&mut self, ctx: &mut AccessContext) -> Result<()> {
        match self {
            Self::Card(auth) => auth.initialize(ctx).await,
            Self::Manual(auth) => auth.initialize(ctx).await,
        }
    }

    async fn has_authentication_request(&mut self, ctx: &mut AccessContext) -> bool {
        match self {
            Self::Card(auth) => auth.has_authentication_request(ctx).await,
            Self::Manual(auth) => auth.has_authentication_request(ctx).await,
        }
    }

    async fn authenticate(&mut self, ctx: &mut AccessContext) -> Result<()> {
        match self {
            Self::Card(auth) => auth.authenticate(ctx).await,
            Self::Manual(auth) => auth.authenticate(ctx).await,
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Card(auth) => auth.reset(),
            Self::Manual(auth) => auth.reset(),
        }
    }

    fn supports_async_operations(&self) -> bool {
        match self {
            Self::Card(auth) => auth.supports_async_operations(),
            Self::Manual(auth) => auth.supports_async_operations(),
        }
    }

    fn has_completed_operation(&self) -> bool {
        match self {
            Self::Card(auth) => auth.has_completed_operation(),
            Self::Manual(auth) => auth.has_completed_operation(),
        }
    }

    fn operation_result(&self) -> bool {
        match self {
            Self::Card(auth) => auth.operation_result(),
            Self::Manual(auth) => auth.operation_result(),
        }
    }

    fn clear_operation_flag(&mut self) {
        match self {
            Self::Card(auth) => auth.clear_operation_flag(),
            Self::Manual(auth) => auth.clear_operation_flag(),
        }
    }
}
