use std::time::Duration;

use doorkeeper_core::{Level, Result};
use doorkeeper_hardware::OutputPin;
use tracing::{debug, info};

use crate::executor::{ActionExecutor, ActionPattern};
use crate::task::PatternTask;

/// On/off timing of one indicator pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlinkPlan {
    /// `None` blinks until stopped.
    count: Option<u32>,
    on: Duration,
    off: Duration,
}

impl BlinkPlan {
    const fn new(count: Option<u32>, on_ms: u64, off_ms: u64) -> Self {
        Self {
            count,
            on: Duration::from_millis(on_ms),
            off: Duration::from_millis(off_ms),
        }
    }

    fn for_pattern(pattern: ActionPattern) -> Self {
        match pattern {
            ActionPattern::Success => Self::new(Some(2), 200, 200),
            ActionPattern::Failure => Self::new(Some(3), 500, 500),
            ActionPattern::Registered => Self::new(Some(1), 1000, 200),
            ActionPattern::Deleted => Self::new(Some(4), 100, 100),
            ActionPattern::Fault => Self::new(None, 250, 250),
        }
    }
}

/// Indicator LED: quick double blink on success, slow triple blink on failure.
pub struct LedExecutor {
    task: PatternTask<Box<dyn OutputPin>>,
}

impl LedExecutor {
    pub fn new(pin: impl OutputPin + 'static) -> Self {
        let pin: Box<dyn OutputPin> = Box::new(pin);
        Self {
            task: PatternTask::new(pin, |pin: &mut Box<dyn OutputPin>| {
                pin.set_level(Level::Low)
            }),
        }
    }
}

impl ActionExecutor for LedExecutor {
    fn name(&self) -> &str {
        "LED Executor"
    }

    fn initialize(&mut self) -> Result<()> {
        self.task.with_output(|pin| {
            pin.attach()?;
            pin.set_level(Level::Low);
            Ok::<_, doorkeeper_hardware::HardwareError>(())
        })?;
        info!("LED executor initialized");
        Ok(())
    }

    fn execute(&mut self, pattern: ActionPattern) {
        let plan = BlinkPlan::for_pattern(pattern);
        debug!(%pattern, ?plan, "LED pattern armed");
        self.task.arm(move |ctx| async move {
            let mut remaining = plan.count;
            while remaining != Some(0) {
                if !ctx.apply(|pin| pin.set_level(Level::High)) || !ctx.hold(plan.on).await {
                    return;
                }
                if !ctx.apply(|pin| pin.set_level(Level::Low)) || !ctx.hold(plan.off).await {
                    return;
                }
                remaining = remaining.map(|n| n - 1);
            }
        });
    }

    fn is_executing(&self) -> bool {
        self.task.is_running()
    }

    fn stop_execution(&mut self) {
        self.task.stop();
        debug!("LED pattern stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorkeeper_hardware::mock::MockOutputPin;

    #[tokio::test(start_paused = true)]
    async fn test_success_blinks_twice() {
        let (pin, handle) = MockOutputPin::new();
        let mut led = LedExecutor::new(pin);
        led.initialize().unwrap();
        handle.clear_history();

        led.execute_success_action();
        tokio::time::sleep(Duration::from_millis(900)).await;

        assert!(!led.is_executing());
        assert_eq!(
            handle.values(),
            vec![Level::Low, Level::High, Level::Low, Level::High, Level::Low]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_blinks_three_times() {
        let (pin, handle) = MockOutputPin::new();
        let mut led = LedExecutor::new(pin);
        led.initialize().unwrap();
        handle.clear_history();

        led.execute_failure_action();
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(led.is_executing());
        tokio::time::sleep(Duration::from_millis(2000)).await;

        let highs = handle.values().iter().filter(|l| l.is_high()).count();
        assert_eq!(highs, 3);
        assert_eq!(handle.current(), Some(Level::Low));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_blinks_until_stopped() {
        let (pin, handle) = MockOutputPin::new();
        let mut led = LedExecutor::new(pin);
        led.initialize().unwrap();

        led.execute(ActionPattern::Fault);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(led.is_executing());

        led.stop_execution();
        assert!(!led.is_executing());
        assert_eq!(handle.current(), Some(Level::Low));
    }

    #[test]
    fn test_attach_failure_is_init_error() {
        let (pin, handle) = MockOutputPin::new();
        handle.set_attach_failure(true);
        let mut led = LedExecutor::new(pin);
        let error = led.initialize().unwrap_err();
        assert!(error.is_fatal());
    }
}
