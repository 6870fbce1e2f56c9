//! Operating mode state machine for the access controller.
//!
//! The controller is always in exactly one [`SystemState`]:
//!
//! - `Idle`: bootstrap (or halted) state; nothing is polled.
//! - `Authentication`: authenticators are polled for access requests.
//! - `Management`: one management operation owns the radio until it
//!   completes or the deadline passes.
//!
//! # Valid Transitions
//!
//! - Idle → Authentication (successful boot)
//! - Authentication ⇄ Management
//! - Authentication / Management → Idle (shutdown)
//!
//! # Examples
//!
//! ```
//! use doorkeeper_controller::{StateMachine, SystemState};
//!
//! let mut machine = StateMachine::new();
//! assert_eq!(machine.current_state(), SystemState::Idle);
//!
//! machine.transition_to(SystemState::Authentication).unwrap();
//! assert!(machine.transition_to(SystemState::Idle).is_ok());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use doorkeeper_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Maximum number of state transitions to keep in history.
///
/// Each transition is a couple of bytes plus an `Instant`; 100 entries cover
/// several hours of ordinary mode switching.
const MAX_HISTORY_SIZE: usize = 100;

/// Operating mode of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    /// Not polling; initial and shutdown state.
    Idle,

    /// Polling authenticators for access requests.
    Authentication,

    /// Driving an armed management operation.
    Management,
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SystemState::Idle => "Idle",
            SystemState::Authentication => "Authentication",
            SystemState::Management => "Management",
        };
        write!(f, "{}", state_str)
    }
}

impl SystemState {
    /// Check if transition to target state is valid from this state.
    ///
    /// ```
    /// use doorkeeper_controller::SystemState;
    ///
    /// assert!(SystemState::Idle.can_transition_to(&SystemState::Authentication));
    /// assert!(!SystemState::Idle.can_transition_to(&SystemState::Management));
    /// ```
    pub fn can_transition_to(&self, target: &SystemState) -> bool {
        matches!(
            (self, target),
            // Boot
            (SystemState::Idle, SystemState::Authentication)
            // Management entry and exit
            | (SystemState::Authentication, SystemState::Management)
            | (SystemState::Management, SystemState::Authentication)
            // Shutdown
            | (SystemState::Authentication | SystemState::Management, SystemState::Idle)
        )
    }
}

/// Represents a single state transition with timestamp.
///
/// The `timestamp` field is not serialized as `Instant` is process-specific.
/// When deserializing, the timestamp will be set to the current time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: SystemState,
    pub to: SystemState,

    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: SystemState, to: SystemState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    /// Get the duration since this transition occurred.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Mode state machine with bounded history and an optional deadline.
///
/// This struct is not thread-safe; the coordinator owns it exclusively.
#[derive(Debug)]
pub struct StateMachine {
    current_state: SystemState,
    state_entered_at: Instant,
    history: VecDeque<StateTransition>,
    current_timeout: Option<Duration>,
}

impl StateMachine {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self {
            current_state: SystemState::Idle,
            state_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            current_timeout: None,
        }
    }

    pub fn current_state(&self) -> SystemState {
        self.current_state
    }

    /// Get the time elapsed in the current state.
    pub fn time_in_current_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    /// Returns `true` if a timeout is set and has been exceeded.
    pub fn has_timed_out(&self) -> bool {
        self.current_timeout
            .is_some_and(|timeout| self.time_in_current_state() >= timeout)
    }

    /// Remaining time before the deadline, `None` without one or once expired.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.current_timeout.and_then(|timeout| {
            let elapsed = self.time_in_current_state();
            timeout.checked_sub(elapsed)
        })
    }

    /// Set a deadline for the current state; cleared on the next transition.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.current_timeout = Some(timeout);
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Get the last N state transitions.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] if the move is not allowed
    /// from the current state. The machine is left unchanged.
    pub fn transition_to(&mut self, new_state: SystemState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.perform_state_change(new_state, transition.clone());
        Ok(transition)
    }

    /// Move to `new_state` regardless of the transition rules.
    ///
    /// Used for recovery resets; still recorded in history.
    pub fn force_state(&mut self, new_state: SystemState) -> StateTransition {
        let transition = StateTransition::new(self.current_state, new_state);
        self.perform_state_change(new_state, transition.clone());
        transition
    }

    fn perform_state_change(&mut self, new_state: SystemState, transition: StateTransition) {
        self.current_state = new_state;
        self.state_entered_at = Instant::now();
        self.current_timeout = None;
        self.add_to_history(transition);
    }

    fn add_to_history(&mut self, transition: StateTransition) {
        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
