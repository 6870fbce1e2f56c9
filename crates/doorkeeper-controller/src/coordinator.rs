//! The control loop's top-level state machine.
//!
//! [`SystemCoordinator::tick`] is called periodically. In Authentication mode
//! it polls every authenticator and turns the first request into a door
//! action; in Management mode it drives the armed management operation until
//! it completes or its deadline passes. Commands arrive through
//! [`SystemCoordinator::handle_command`] between ticks.
//!
//! A granted access opens the door at most once per cooldown window: a grant
//! inside the window is logged, refreshes the window and leaves the door
//! alone, so a card held on the reader cannot keep the latch open forever.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use doorkeeper_actuation::ActionExecutor;
use doorkeeper_core::constants::{DEFAULT_AUTH_COOLDOWN, DEFAULT_MANAGEMENT_TIMEOUT};
use doorkeeper_core::{Error, Result};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::auth::{AnyAuthenticator, Authenticator};
use crate::command::{Command, ManagementAction};
use crate::context::AccessContext;
use crate::management::{AnyManagementOperation, ManagementOperation, OperationOutcome};
use crate::state_machine::{StateMachine, SystemState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Grants inside this window after the previous one do not open the door.
    pub auth_cooldown: Duration,

    /// Hard deadline for Management mode.
    pub management_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            auth_cooldown: DEFAULT_AUTH_COOLDOWN,
            management_timeout: DEFAULT_MANAGEMENT_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_auth_cooldown(mut self, cooldown: Duration) -> Self {
        self.auth_cooldown = cooldown;
        self
    }

    pub fn with_management_timeout(mut self, timeout: Duration) -> Self {
        self.management_timeout = timeout;
        self
    }
}

/// What a tick did, for the console.
#[derive(Debug)]
pub enum TickEvent {
    AccessGranted { source: String },
    /// Granted, but the door was opened moments ago.
    CooldownSuppressed { source: String },
    AccessDenied { source: String, reason: String },
    ManagementCompleted { type_name: String, outcome: OperationOutcome },
    ManagementCancelled { type_name: String },
    ManagementTimedOut { type_name: String },
}

impl fmt::Display for TickEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickEvent::AccessGranted { source } => write!(f, "Access granted ({source})"),
            TickEvent::CooldownSuppressed { source } => {
                write!(f, "Access granted within cooldown, door not re-opened ({source})")
            }
            TickEvent::AccessDenied { source, reason } => {
                write!(f, "Access denied ({source}): {reason}")
            }
            TickEvent::ManagementCompleted { type_name, outcome } => {
                write!(f, "{type_name}: {outcome}")
            }
            TickEvent::ManagementCancelled { type_name } => {
                write!(f, "{type_name}: operation cancelled")
            }
            TickEvent::ManagementTimedOut { type_name } => {
                write!(f, "{type_name}: operation timed out")
            }
        }
    }
}

/// Owns the shared context, the authenticators and the management
/// operations, and switches between them.
///
/// Generic over the authenticator and operation types; the defaults are the
/// enum wrappers over every built-in implementation.
pub struct SystemCoordinator<A = AnyAuthenticator, M = AnyManagementOperation> {
    config: CoordinatorConfig,
    context: AccessContext,
    machine: StateMachine,
    authenticators: Vec<A>,
    operations: BTreeMap<String, M>,
    active_operation: Option<String>,
    last_grant: Option<Instant>,
    initialized: bool,
}

impl SystemCoordinator {
    pub fn new(context: AccessContext) -> Self {
        Self::with_config(context, CoordinatorConfig::default())
    }
}

impl<A: Authenticator, M: ManagementOperation> SystemCoordinator<A, M> {
    pub fn with_config(context: AccessContext, config: CoordinatorConfig) -> Self {
        Self {
            config,
            context,
            machine: StateMachine::new(),
            authenticators: Vec::new(),
            operations: BTreeMap::new(),
            active_operation: None,
            last_grant: None,
            initialized: false,
        }
    }

    /// Add an authenticator; they are polled in insertion order.
    pub fn add_authenticator(&mut self, authenticator: impl Into<A>) {
        self.authenticators.push(authenticator.into());
    }

    /// Register a management operation under `type_name` (case-insensitive).
    ///
    /// A second registration under the same name replaces the first.
    pub fn add_management_operation(&mut self, type_name: impl Into<String>, operation: impl Into<M>) {
        let type_name = type_name.into().to_ascii_lowercase();
        if self.operations.insert(type_name.clone(), operation.into()).is_some() {
            warn!(%type_name, "Management type registered twice, keeping the latest");
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn context(&self) -> &AccessContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AccessContext {
        &mut self.context
    }

    pub fn state(&self) -> SystemState {
        self.machine.current_state()
    }

    /// Mode state machine, for its transition history.
    pub fn state_machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Registered management type names, sorted.
    pub fn management_types(&self) -> Vec<&str> {
        self.operations.keys().map(String::as_str).collect()
    }

    pub fn authenticator_names(&self) -> Vec<&str> {
        self.authenticators.iter().map(|a| a.name()).collect()
    }

    /// Bring up the outputs and every authenticator, then start polling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareInit`] if any device fails; the coordinator
    /// stays Idle and the caller is expected to halt.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        self.context.door.initialize()?;
        for authenticator in &mut self.authenticators {
            if let Err(e) = authenticator.initialize(&mut self.context).await {
                error!(authenticator = authenticator.name(), error = %e, "Authenticator failed to initialize");
                return Err(match e {
                    Error::HardwareInit(_) => e,
                    other => Error::HardwareInit(format!("{}: {other}", authenticator.name())),
                });
            }
        }

        self.machine.transition_to(SystemState::Authentication)?;
        self.initialized = true;
        info!(
            authenticators = ?self.authenticator_names(),
            management_types = ?self.management_types(),
            "System coordinator ready"
        );
        Ok(())
    }

    /// Advance the control loop by one step.
    pub async fn tick(&mut self) -> Option<TickEvent> {
        match self.machine.current_state() {
            SystemState::Idle => None,
            SystemState::Authentication => self.tick_authentication().await,
            SystemState::Management => self.tick_management().await,
        }
    }

    async fn tick_authentication(&mut self) -> Option<TickEvent> {
        let mut decided = None;

        for authenticator in &mut self.authenticators {
            if authenticator.supports_async_operations() && authenticator.has_completed_operation() {
                let granted = authenticator.operation_result();
                authenticator.clear_operation_flag();
                let result = if granted {
                    Ok(())
                } else {
                    Err(Error::authentication("rejected by background check"))
                };
                decided = Some((authenticator.name().to_string(), result));
                break;
            }
        }

        if decided.is_none() {
            for authenticator in &mut self.authenticators {
                if authenticator.has_authentication_request(&mut self.context).await {
                    let result = authenticator.authenticate(&mut self.context).await;
                    decided = Some((authenticator.name().to_string(), result));
                    break;
                }
            }
        }

        let (source, result) = decided?;
        Some(self.conclude(source, result))
    }

    fn conclude(&mut self, source: String, result: Result<()>) -> TickEvent {
        match result {
            Ok(()) => {
                let now = Instant::now();
                let cooling = self
                    .last_grant
                    .is_some_and(|at| now.duration_since(at) < self.config.auth_cooldown);
                self.last_grant = Some(now);

                if cooling {
                    info!(%source, "Access granted within cooldown, door action suppressed");
                    TickEvent::CooldownSuppressed { source }
                } else {
                    info!(%source, "Access granted");
                    self.context.door.execute_success_action();
                    TickEvent::AccessGranted { source }
                }
            }
            Err(e) => {
                warn!(%source, error = %e, "Access denied");
                self.context.door.execute_failure_action();
                TickEvent::AccessDenied {
                    source,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn tick_management(&mut self) -> Option<TickEvent> {
        let Some(type_name) = self.active_operation.clone() else {
            warn!("Management mode without an active operation");
            self.enter_authentication();
            return None;
        };
        let Some(operation) = self.operations.get_mut(&type_name) else {
            warn!(%type_name, "Active management type vanished");
            self.enter_authentication();
            return None;
        };

        operation.handle_operations(&mut self.context).await;

        if let Some(outcome) = operation.take_completed_operation() {
            self.enter_authentication();
            return Some(TickEvent::ManagementCompleted { type_name, outcome });
        }
        if !operation.has_ongoing_operation() {
            self.enter_authentication();
            return Some(TickEvent::ManagementCancelled { type_name });
        }
        if self.machine.has_timed_out() {
            operation.reset();
            error!(
                %type_name,
                timeout_ms = self.config.management_timeout.as_millis() as u64,
                "Management operation timed out"
            );
            self.context.door.execute_failure_action();
            self.enter_authentication();
            return Some(TickEvent::ManagementTimedOut { type_name });
        }
        None
    }

    fn enter_management(&mut self, type_name: &str) -> Result<()> {
        self.machine.transition_to(SystemState::Management)?;
        self.machine.set_timeout(self.config.management_timeout);
        self.active_operation = Some(type_name.to_string());
        self.context.radio.reset();
        info!(%type_name, "Entered management mode");
        Ok(())
    }

    fn enter_authentication(&mut self) {
        self.active_operation = None;
        self.context.radio.reset();
        match self.machine.transition_to(SystemState::Authentication) {
            Ok(transition) => info!(from = %transition.from, "Entered authentication mode"),
            Err(e) => warn!(error = %e, "Could not return to authentication mode"),
        }
    }

    /// Parse and execute one console line.
    ///
    /// Returns the text to show the user.
    ///
    /// # Errors
    ///
    /// Rejected commands leave the mode and every operation unchanged.
    pub async fn handle_command(&mut self, line: &str) -> Result<String> {
        let result = match Command::parse(line) {
            Ok(command) => self.execute(command).await,
            Err(e) => Err(e),
        };
        match &result {
            Ok(_) => debug!(command = line.trim(), "Command accepted"),
            Err(e) => warn!(command = line.trim(), error = %e, "Command rejected"),
        }
        result
    }

    async fn execute(&mut self, command: Command) -> Result<String> {
        match command {
            Command::Reset => {
                self.reset_all();
                Ok("All operations reset".to_string())
            }
            Command::Help => Ok(self.help_text()),
            Command::Management { type_name, action } => {
                self.execute_management(type_name, action).await
            }
        }
    }

    async fn execute_management(&mut self, type_name: String, action: ManagementAction) -> Result<String> {
        let Some(operation) = self.operations.get_mut(&type_name) else {
            return Err(Error::UnknownManagementType {
                available: self.management_types().join(", "),
                requested: type_name,
            });
        };

        let state = self.machine.current_state();
        let mutates = action.arms_operation() || matches!(action, ManagementAction::Delete(_));
        if mutates && state == SystemState::Management {
            return Err(Error::OperationInProgress);
        }
        if action.arms_operation() && state != SystemState::Authentication {
            return Err(Error::InvalidStateTransition {
                from: state.to_string(),
                to: SystemState::Management.to_string(),
            });
        }

        let timeout_secs = self.config.management_timeout.as_secs();
        match action {
            ManagementAction::Register => {
                operation.register_new(&mut self.context)?;
                self.enter_management(&type_name)?;
                Ok(format!("Present a blank card to register ({timeout_secs}s timeout)"))
            }
            ManagementAction::Erase(id) => {
                operation.erase_and_delete_item(&mut self.context, &id)?;
                self.enter_management(&type_name)?;
                Ok(format!(
                    "Present card {} to erase ({timeout_secs}s timeout)",
                    id.trim().to_ascii_uppercase()
                ))
            }
            ManagementAction::Delete(id) => {
                operation.delete_item(&mut self.context, &id).await?;
                Ok(format!("Deleted {}", id.trim().to_ascii_uppercase()))
            }
            ManagementAction::List => {
                let items = operation.list_registered_items(&self.context);
                if items.is_empty() {
                    Ok(format!("No {type_name} credentials registered"))
                } else {
                    Ok(format!("{} registered:\n{}", items.len(), items.join("\n")))
                }
            }
            ManagementAction::Reset => {
                operation.reset();
                Ok(format!("{type_name} operations reset"))
            }
        }
    }

    /// Cancel every pending request and armed operation.
    ///
    /// An initialized coordinator ends up in Authentication mode. The grant
    /// cooldown is kept.
    pub fn reset_all(&mut self) {
        for authenticator in &mut self.authenticators {
            authenticator.reset();
        }
        for operation in self.operations.values_mut() {
            operation.reset();
        }
        self.context.radio.reset();
        self.active_operation = None;

        if self.initialized && self.machine.current_state() != SystemState::Authentication {
            let transition = self.machine.force_state(SystemState::Authentication);
            info!(from = %transition.from, "Forced back to authentication mode");
        }
        info!("All authenticators and management operations reset");
    }

    /// Drive every output to its fail-safe halt signature.
    pub fn enter_fault_state(&mut self) {
        self.context.door.enter_fault_state();
    }

    /// Stop the outputs and stop polling.
    pub fn shutdown(&mut self) {
        self.context.door.stop_execution();
        for operation in self.operations.values_mut() {
            operation.reset();
        }
        self.active_operation = None;
        if self.machine.current_state() != SystemState::Idle {
            self.machine.force_state(SystemState::Idle);
        }
        self.initialized = false;
        info!("System coordinator stopped");
    }

    pub fn help_text(&self) -> String {
        let types = self.management_types();
        let example = types.first().copied().unwrap_or("card");
        format!(
            "Commands:\n\
             \x20 help                      show this text\n\
             \x20 reset                     cancel everything, back to authentication\n\
             \x20 <type>:register           enroll the next card presented\n\
             \x20 <type>:erase:<uid>        wipe a card back to factory keys and revoke it\n\
             \x20 <type>:delete:<uid>       revoke a credential, card untouched\n\
             \x20 <type>:list               list stored credentials\n\
             \x20 <type>:reset              cancel the armed operation\n\
             Management types: {}\n\
             Example: {example}:register",
            if types.is_empty() { "none".to_string() } else { types.join(", ") }
        )
    }
}
