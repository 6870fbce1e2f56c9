use std::fmt;

use doorkeeper_core::Result;
use serde::{Deserialize, Serialize};

/// Feedback signature requested from the output devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPattern {
    /// Access granted: the latch opens.
    Success,
    /// Access denied or a management step failed.
    Failure,
    /// A credential was enrolled.
    Registered,
    /// A credential was revoked or deleted.
    Deleted,
    /// Boot failed; the indicator keeps blinking until stopped.
    Fault,
}

impl fmt::Display for ActionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionPattern::Success => "success",
            ActionPattern::Failure => "failure",
            ActionPattern::Registered => "registered",
            ActionPattern::Deleted => "deleted",
            ActionPattern::Fault => "fault",
        };
        f.write_str(name)
    }
}

/// Output device able to play timed feedback patterns.
///
/// `execute` must return as soon as the pattern is armed. Arming while a
/// pattern runs replaces it; `stop_execution` cancels it and leaves the
/// output at its safe level.
pub trait ActionExecutor: Send {
    fn name(&self) -> &str;

    /// Claim the output and drive it to its safe level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareInit`](doorkeeper_core::Error::HardwareInit)
    /// if the output cannot be attached.
    fn initialize(&mut self) -> Result<()>;

    /// Arm `pattern` on this device.
    fn execute(&mut self, pattern: ActionPattern);

    fn execute_success_action(&mut self) {
        self.execute(ActionPattern::Success);
    }

    fn execute_failure_action(&mut self) {
        self.execute(ActionPattern::Failure);
    }

    /// Whether a pattern is still running.
    fn is_executing(&self) -> bool;

    /// Cancel the running pattern and return the output to its safe level.
    fn stop_execution(&mut self);
}
