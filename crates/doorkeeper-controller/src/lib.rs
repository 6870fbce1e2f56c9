//! Access control core: authenticators, credential management and the
//! coordinator that switches between them.
//!
//! The [`SystemCoordinator`] owns an [`AccessContext`] (radio engine,
//! credential store, persistence gateway and door outputs) and is driven by
//! two entry points:
//!
//! - [`SystemCoordinator::tick`], called periodically by the control loop
//! - [`SystemCoordinator::handle_command`], called with each console line
//!
//! In Authentication mode every registered [`Authenticator`] is polled and
//! the first request is decided and actuated. A management command such as
//! `card:register` arms a [`ManagementOperation`] and switches to
//! Management mode until that operation completes or times out.
//!
//! ```no_run
//! use doorkeeper_actuation::{DoorAccessExecutor, LedExecutor};
//! use doorkeeper_controller::{AccessContext, CardAuthenticator, CardManager, SystemCoordinator};
//! use doorkeeper_hardware::mock::{MockOutputPin, MockRadio};
//! use doorkeeper_rfid::RadioEngine;
//! use doorkeeper_storage::JsonFilePersistence;
//!
//! # #[tokio::main]
//! # async fn main() -> doorkeeper_core::Result<()> {
//! let (radio, handle) = MockRadio::new();
//! let (led, _) = MockOutputPin::new();
//! let context = AccessContext::load(
//!     RadioEngine::new(radio.into(), handle.irq_pin()),
//!     JsonFilePersistence::new("cards.json"),
//!     DoorAccessExecutor::new().with_executor(LedExecutor::new(led)),
//! )
//! .await?;
//!
//! let mut coordinator = SystemCoordinator::new(context);
//! coordinator.add_authenticator(CardAuthenticator::new());
//! coordinator.add_management_operation("card", CardManager::new());
//! coordinator.initialize().await?;
//!
//! println!("{}", coordinator.handle_command("card:register").await?);
//! loop {
//!     if let Some(event) = coordinator.tick().await {
//!         println!("{event}");
//!     }
//!     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//! }
//! # }
//! ```

pub mod auth;
pub mod command;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod management;
pub mod state_machine;

#[cfg(test)]
mod test_support;

pub use auth::{
    AnyAuthenticator, Authenticator, CardAuthenticator, CardAuthenticatorConfig, ManualTrigger,
    ManualTriggerConfig,
};
pub use command::{Command, ManagementAction};
pub use config::DeviceConfig;
pub use context::AccessContext;
pub use coordinator::{CoordinatorConfig, SystemCoordinator, TickEvent};
pub use management::{
    AnyManagementOperation, CardManager, CardManagerConfig, LifecycleOperation, ManagementOperation,
    OperationKind, OperationOutcome,
};
pub use state_machine::{StateMachine, StateTransition, SystemState};
