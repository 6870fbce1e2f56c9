//! Text command grammar accepted on the management console.
//!
//! ```text
//! reset                     cancel everything, back to Authentication
//! help                      list commands
//! <type>:register           enroll the next card presented
//! <type>:delete:<uid>       revoke a credential (card untouched)
//! <type>:erase:<uid>        wipe the card back to factory keys, then revoke
//! <type>:list               list stored credentials
//! <type>:reset              cancel the operation armed for <type>
//! ```
//!
//! Keywords are case-insensitive and surrounding whitespace is ignored.
//! Whether `<type>` exists is decided by the coordinator, and whether
//! `<uid>` is well formed by the management operation.

use std::fmt;
use std::str::FromStr;

use doorkeeper_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagementAction {
    Register,
    Delete(String),
    Erase(String),
    List,
    Reset,
}

impl ManagementAction {
    /// Whether the action arms an operation that needs Management mode.
    pub fn arms_operation(&self) -> bool {
        matches!(self, ManagementAction::Register | ManagementAction::Erase(_))
    }
}

impl fmt::Display for ManagementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagementAction::Register => f.write_str("register"),
            ManagementAction::Delete(id) => write!(f, "delete:{id}"),
            ManagementAction::Erase(id) => write!(f, "erase:{id}"),
            ManagementAction::List => f.write_str("list"),
            ManagementAction::Reset => f.write_str("reset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Global reset of every authenticator and operation.
    Reset,
    Help,
    Management {
        type_name: String,
        action: ManagementAction,
    },
}

impl Command {
    /// Parse one console line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCommand`] for empty input, a missing or
    /// unknown action, or a missing parameter.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Err(Error::InvalidCommand("empty command".into()));
        }
        if line.eq_ignore_ascii_case("reset") {
            return Ok(Command::Reset);
        }
        if line.eq_ignore_ascii_case("help") {
            return Ok(Command::Help);
        }

        let mut parts = line.splitn(3, ':').map(str::trim);
        let type_name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let Some(action) = parts.next() else {
            return Err(Error::InvalidCommand(format!(
                "'{line}' is not a command; expected <type>:<action>[:<param>], try 'help'"
            )));
        };
        if type_name.is_empty() {
            return Err(Error::InvalidCommand("missing management type".into()));
        }
        let param = parts.next().filter(|p| !p.is_empty()).map(str::to_string);

        let action = match action.to_ascii_lowercase().as_str() {
            "register" => ManagementAction::Register,
            "list" => ManagementAction::List,
            "reset" => ManagementAction::Reset,
            "delete" => ManagementAction::Delete(require_param("delete", &type_name, param)?),
            "erase" => ManagementAction::Erase(require_param("erase", &type_name, param)?),
            "" => return Err(Error::InvalidCommand("missing action".into())),
            other => {
                return Err(Error::InvalidCommand(format!(
                    "unknown action '{other}'; expected register, delete, erase, list or reset"
                )));
            }
        };

        Ok(Command::Management { type_name, action })
    }
}

fn require_param(action: &str, type_name: &str, param: Option<String>) -> Result<String> {
    param.ok_or_else(|| {
        Error::InvalidCommand(format!(
            "'{action}' needs a UID: {type_name}:{action}:<uid>"
        ))
    })
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
