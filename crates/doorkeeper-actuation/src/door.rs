use doorkeeper_core::{Error, Result};
use tracing::{error, info, warn};

use crate::executor::{ActionExecutor, ActionPattern};

/// Fans one trigger out to every registered output device.
///
/// Holds the devices only as [`ActionExecutor`]s; it never reaches into
/// their pattern tasks.
#[derive(Default)]
pub struct DoorAccessExecutor {
    executors: Vec<Box<dyn ActionExecutor>>,
}

impl DoorAccessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device, builder style.
    pub fn with_executor(mut self, executor: impl ActionExecutor + 'static) -> Self {
        self.add_executor(executor);
        self
    }

    pub fn add_executor(&mut self, executor: impl ActionExecutor + 'static) {
        self.executors.push(Box::new(executor));
    }

    /// Names of the registered devices, in trigger order.
    pub fn executor_names(&self) -> Vec<&str> {
        self.executors.iter().map(|e| e.name()).collect()
    }

    /// Signal an enrolled credential (no latch movement).
    pub fn execute_registration_success_action(&mut self) {
        self.execute(ActionPattern::Registered);
    }

    /// Signal a revoked or deleted credential (no latch movement).
    pub fn execute_deletion_success_action(&mut self) {
        self.execute(ActionPattern::Deleted);
    }

    /// Enter the fail-safe halt signature: latch closed, indicator blinking.
    pub fn enter_fault_state(&mut self) {
        error!("Entering fault state");
        self.execute(ActionPattern::Fault);
    }
}

impl ActionExecutor for DoorAccessExecutor {
    fn name(&self) -> &str {
        "Door Access Executor"
    }

    fn initialize(&mut self) -> Result<()> {
        if self.executors.is_empty() {
            warn!("Door access executor has no output devices");
        }

        let mut failed = Vec::new();
        for executor in &mut self.executors {
            if let Err(e) = executor.initialize() {
                error!(executor = executor.name(), error = %e, "Output device failed to initialize");
                failed.push(format!("{}: {e}", executor.name()));
            }
        }

        if !failed.is_empty() {
            return Err(Error::HardwareInit(failed.join("; ")));
        }
        info!(devices = self.executors.len(), "Door access executor initialized");
        Ok(())
    }

    fn execute(&mut self, pattern: ActionPattern) {
        match pattern {
            ActionPattern::Success => info!("Access action: open door"),
            ActionPattern::Failure => info!("Access action: denied"),
            other => info!(pattern = %other, "Access action"),
        }
        for executor in &mut self.executors {
            executor.execute(pattern);
        }
    }

    fn is_executing(&self) -> bool {
        self.executors.iter().any(|e| e.is_executing())
    }

    fn stop_execution(&mut self) {
        for executor in &mut self.executors {
            executor.stop_execution();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuzzerExecutor, LedExecutor, ServoExecutor};
    use doorkeeper_core::Level;
    use doorkeeper_hardware::mock::{MockOutputPin, MockServo, MockTone};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_success_reaches_every_device() {
        let (led, led_handle) = MockOutputPin::new();
        let (tone, tone_handle) = MockTone::new();
        let (servo, servo_handle) = MockServo::new();
        let mut door = DoorAccessExecutor::new()
            .with_executor(LedExecutor::new(led))
            .with_executor(BuzzerExecutor::new(tone))
            .with_executor(ServoExecutor::new(servo));
        door.initialize().unwrap();

        door.execute_success_action();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(door.is_executing());
        assert_eq!(led_handle.current(), Some(Level::High));
        assert_eq!(tone_handle.current(), Some(784));
        assert_eq!(servo_handle.current(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_keeps_latch_closed() {
        let (led, _led_handle) = MockOutputPin::new();
        let (servo, servo_handle) = MockServo::new();
        let mut door = DoorAccessExecutor::new()
            .with_executor(LedExecutor::new(led))
            .with_executor(ServoExecutor::new(servo));
        door.initialize().unwrap();
        servo_handle.clear_history();

        door.execute_registration_success_action();
        door.execute_deletion_success_action();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(servo_handle.history().is_empty());
    }

    #[test]
    fn test_initialize_reports_every_failure() {
        let (led, led_handle) = MockOutputPin::new();
        let (servo, servo_handle) = MockServo::new();
        led_handle.set_attach_failure(true);
        servo_handle.set_attach_failure(true);
        let mut door = DoorAccessExecutor::new()
            .with_executor(LedExecutor::new(led))
            .with_executor(ServoExecutor::new(servo));

        let error = door.initialize().unwrap_err();
        let message = error.to_string();
        assert!(error.is_fatal());
        assert!(message.contains("LED Executor"));
        assert!(message.contains("Servo Executor"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_returns_all_to_safe_levels() {
        let (led, led_handle) = MockOutputPin::new();
        let (servo, servo_handle) = MockServo::new();
        let mut door = DoorAccessExecutor::new()
            .with_executor(LedExecutor::new(led))
            .with_executor(ServoExecutor::new(servo));
        door.initialize().unwrap();

        door.execute_success_action();
        tokio::time::sleep(Duration::from_millis(100)).await;
        door.stop_execution();

        assert!(!door.is_executing());
        assert_eq!(led_handle.current(), Some(Level::Low));
        assert_eq!(servo_handle.current(), Some(180));
    }
}
