//! Device configuration file.
//!
//! Every timing value is given in milliseconds. Fields left out of the file
//! keep their defaults, so `{}` is a complete configuration:
//!
//! ```json
//! {
//!   "auth_cooldown_ms": 2000,
//!   "management_timeout_ms": 10000,
//!   "persistence_delay_ms": 500,
//!   "replay_window_ms": 1000,
//!   "debounce_ms": 50,
//!   "servo_open_angle": 0,
//!   "servo_closed_angle": 180,
//!   "servo_dwell_ms": 3000,
//!   "tick_interval_ms": 10
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use doorkeeper_actuation::ServoConfig;
use doorkeeper_core::{Error, Result};
use doorkeeper_rfid::RadioConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{CardAuthenticatorConfig, ManualTriggerConfig};
use crate::coordinator::CoordinatorConfig;
use crate::management::CardManagerConfig;

/// Largest angle a hobby servo accepts.
const MAX_SERVO_ANGLE: u16 = 180;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Global window after a granted access during which further grants are dropped.
    pub auth_cooldown_ms: u64,

    /// Deadline for a management operation, also used by the card manager.
    pub management_timeout_ms: u64,

    /// Window during which a held card is reported as persistent.
    pub persistence_delay_ms: u64,

    /// Per-card replay window of the card authenticator.
    pub replay_window_ms: u64,

    /// Manual override debounce.
    pub debounce_ms: u64,

    pub servo_open_angle: u16,
    pub servo_closed_angle: u16,

    /// How long the latch stays open after a grant.
    pub servo_dwell_ms: u64,

    /// Control loop period.
    pub tick_interval_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let coordinator = CoordinatorConfig::default();
        let servo = ServoConfig::default();
        Self {
            auth_cooldown_ms: millis(coordinator.auth_cooldown),
            management_timeout_ms: millis(coordinator.management_timeout),
            persistence_delay_ms: millis(RadioConfig::default().persistence_delay),
            replay_window_ms: millis(CardAuthenticatorConfig::default().replay_window),
            debounce_ms: millis(ManualTriggerConfig::default().debounce),
            servo_open_angle: servo.open_angle,
            servo_closed_angle: servo.closed_angle,
            servo_dwell_ms: millis(servo.dwell),
            tick_interval_ms: 10,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl DeviceConfig {
    /// Parse a JSON document and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed JSON, unknown fields or
    /// out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or is invalid.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_json(&json)?;
        debug!(path = %path.display(), ?config, "Device configuration loaded");
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        for (field, angle) in [
            ("servo_open_angle", self.servo_open_angle),
            ("servo_closed_angle", self.servo_closed_angle),
        ] {
            if angle > MAX_SERVO_ANGLE {
                return Err(Error::Config(format!(
                    "{field} must be at most {MAX_SERVO_ANGLE}, got {angle}"
                )));
            }
        }
        if self.management_timeout_ms == 0 {
            return Err(Error::Config("management_timeout_ms must be positive".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_auth_cooldown(Duration::from_millis(self.auth_cooldown_ms))
            .with_management_timeout(Duration::from_millis(self.management_timeout_ms))
    }

    pub fn radio(&self) -> RadioConfig {
        RadioConfig::default()
            .with_persistence_delay(Duration::from_millis(self.persistence_delay_ms))
    }

    pub fn card_authenticator(&self) -> CardAuthenticatorConfig {
        CardAuthenticatorConfig::default()
            .with_replay_window(Duration::from_millis(self.replay_window_ms))
    }

    pub fn card_manager(&self) -> CardManagerConfig {
        CardManagerConfig::default()
            .with_operation_timeout(Duration::from_millis(self.management_timeout_ms))
    }

    pub fn manual_trigger(&self) -> ManualTriggerConfig {
        ManualTriggerConfig::default().with_debounce(Duration::from_millis(self.debounce_ms))
    }

    pub fn servo(&self) -> ServoConfig {
        ServoConfig::default()
            .with_angles(self.servo_open_angle, self.servo_closed_angle)
            .with_dwell(Duration::from_millis(self.servo_dwell_ms))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
