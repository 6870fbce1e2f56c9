//! Management operations run while the controller is in Management mode.
//!
//! A management operation is registered with the coordinator under a type
//! name (`card` for [`CardManager`]). Commands addressed to that type arm,
//! list or cancel its operations; while one is armed the coordinator hands
//! it the radio every tick through [`ManagementOperation::handle_operations`].

#![allow(async_fn_in_trait)]

pub mod card_manager;
pub mod operation;

pub use card_manager::{CardManager, CardManagerConfig};
pub use operation::{LifecycleOperation, OperationKind, OperationOutcome};

use doorkeeper_core::Result;

use crate::context::AccessContext;

/// Credential lifecycle driven by commands.
pub trait ManagementOperation: Send {
    fn name(&self) -> &str;

    /// Arm an enrollment of the next card presented.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationInProgress`](doorkeeper_core::Error::OperationInProgress)
    /// if an operation is already armed.
    fn register_new(&mut self, ctx: &mut AccessContext) -> Result<()>;

    /// Remove a credential from the store without touching the card.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a valid stored UID or the store
    /// cannot be saved.
    async fn delete_item(&mut self, ctx: &mut AccessContext, id: &str) -> Result<()>;

    /// Arm an erase of the card `id`: keys back to factory, record removed.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is invalid or unknown, or another operation
    /// is armed.
    fn erase_and_delete_item(&mut self, ctx: &mut AccessContext, id: &str) -> Result<()>;

    /// One line per stored credential.
    fn list_registered_items(&self, ctx: &AccessContext) -> Vec<String>;

    fn has_ongoing_operation(&self) -> bool;

    /// Whether an operation finished and its outcome is not yet taken.
    fn has_completed_operation(&self) -> bool;

    /// Take the outcome of the finished operation, clearing the flag.
    fn take_completed_operation(&mut self) -> Option<OperationOutcome>;

    /// Advance the armed operation by one step.
    async fn handle_operations(&mut self, ctx: &mut AccessContext);

    /// Cancel any armed operation and forget pending outcomes.
    fn reset(&mut self);
}

/// Enum wrapper for management operation dispatch.
#[non_exhaustive]
pub enum AnyManagementOperation {
    Card(CardManager),
}

impl From<CardManager> for AnyManagementOperation {
    fn from(manager: CardManager) -> Self {
        Self::Card(manager)
    }
}

impl ManagementOperation for AnyManagementOperation {
    fn name(&self) -> &str {
        match self {
            Self::Card(manager) => manager.name(),
        }
    }

    fn register_new(&mut self, ctx: &mut AccessContext) -> Result<()> {
        match self {
            Self::Card(manager) => manager.register_new(ctx),
        }
    }

    async fn delete_item(&mut self, ctx: &mut AccessContext, id: &str) -> Result<()> {
        match self {
            Self::Card(manager) => manager.delete_item(ctx, id).await,
        }
    }

    fn erase_and_delete_item(&mut self, ctx: &mut AccessContext, id: &str) -> Result<()> {
        match self {
            Self::Card(manager) => manager.erase_and_delete_item(ctx, id),
        }
    }

    fn list_registered_items(&self, ctx: &AccessContext) -> Vec<String> {
        match self {
            Self::Card(manager) => manager.list_registered_items(ctx),
        }
    }

    fn has_ongoing_operation(&self) -> bool {
        match self {
            Self::Card(manager) => manager.has_ongoing_operation(),
        }
    }

    fn has_completed_operation(&self) -> bool {
        match self {
            Self::Card(manager) => manager.has_completed_operation(),
        }
    }

    fn take_completed_operation(&mut self) -> Option<OperationOutcome> {
        match self {
            Self::Card(manager) => manager.take_completed_operation(),
        }
    }

    async fn handle_operations(&mut self, ctx: &mut AccessContext) {
        match self {
            Self::Card(manager) => manager.handle_operations(ctx).await,
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Card(manager) => manager.reset(),
        }
    }
}
