use std::time::Duration;

use doorkeeper_core::constants::DEFAULT_DEBOUNCE;
use doorkeeper_core::{Level, Result};
use doorkeeper_hardware::InputPin;
use tokio::time::Instant;
use tracing::info;

use super::Authenticator;
use crate::context::AccessContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualTriggerConfig {
    /// How long a new level must hold before it counts.
    pub debounce: Duration,
}

impl Default for ManualTriggerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl ManualTriggerConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Exit button: a debounced press always grants access.
///
/// The input idles high; a press pulls it low.
pub struct ManualTrigger {
    pin: Box<dyn InputPin>,
    config: ManualTriggerConfig,
    stable: Level,
    raw: Level,
    changed_at: Instant,
}

impl ManualTrigger {
    pub fn new(pin: impl InputPin + 'static) -> Self {
        Self::with_config(pin, ManualTriggerConfig::default())
    }

    pub fn with_config(pin: impl InputPin + 'static, config: ManualTriggerConfig) -> Self {
        Self {
            pin: Box::new(pin),
            config,
            stable: Level::High,
            raw: Level::High,
            changed_at: Instant::now(),
        }
    }

    /// Sample the pin; returns `true` on a debounced falling edge.
    fn sample(&mut self) -> bool {
        let level = self.pin.read();
        let now = Instant::now();
        if level != self.raw {
            self.raw = level;
            self.changed_at = now;
        }

        if self.raw == self.stable || now.duration_since(self.changed_at) < self.config.debounce {
            return false;
        }
        let pressed = self.stable.is_high() && self.raw.is_low();
        self.stable = self.raw;
        pressed
    }
}

impl Authenticator for ManualTrigger {
    fn name(&self) -> &str {
        "Manual Trigger"
    }

    async fn initialize(&mut self, _ctx: &mut AccessContext) -> Result<()> {
        self.reset();
        Ok(())
    }

    async fn has_authentication_request(&mut self, _ctx: &mut AccessContext) -> bool {
        self.sample()
    }

    async fn authenticate(&mut self, _ctx: &mut AccessContext) -> Result<()> {
        info!("Manual override pressed");
        Ok(())
    }

    fn reset(&mut self) {
        let level = self.pin.read();
        self.stable = level;
        self.raw = level;
        self.changed_at = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::rig;
    use doorkeeper_hardware::mock::MockInputPin;

    #[tokio::test(start_paused = true)]
    async fn test_press_is_reported_once_after_debounce() {
        let (mut ctx, _rig) = rig().await;
        let (pin, button) = MockInputPin::new();
        let mut trigger = ManualTrigger::new(pin);
        trigger.initialize(&mut ctx).await.unwrap();

        button.press();
        assert!(!trigger.has_authentication_request(&mut ctx).await);

        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(trigger.has_authentication_request(&mut ctx).await);
        assert!(trigger.authenticate(&mut ctx).await.is_ok());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(!trigger.has_authentication_request(&mut ctx).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_glitch_shorter_than_debounce_is_ignored() {
        let (mut ctx, _rig) = rig().await;
        let (pin, button) = MockInputPin::new();
        let mut trigger = ManualTrigger::new(pin);
        trigger.initialize(&mut ctx).await.unwrap();

        button.press();
        assert!(!trigger.has_authentication_request(&mut ctx).await);
        tokio::time::advance(Duration::from_millis(20)).await;
        button.release();
        assert!(!trigger.has_authentication_request(&mut ctx).await);

        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(!trigger.has_authentication_request(&mut ctx).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_then_press_again() {
        let (mut ctx, _rig) = rig().await;
        let (pin, button) = MockInputPin::new();
        let mut trigger = ManualTrigger::new(pin);
        trigger.initialize(&mut ctx).await.unwrap();

        for _ in 0..2 {
            button.press();
            trigger.has_authentication_request(&mut ctx).await;
            tokio::time::advance(Duration::from_millis(60)).await;
            assert!(trigger.has_authentication_request(&mut ctx).await);

            button.release();
            trigger.has_authentication_request(&mut ctx).await;
            tokio::time::advance(Duration::from_millis(60)).await;
            assert!(!trigger.has_authentication_request(&mut ctx).await);
        }
    }
}
