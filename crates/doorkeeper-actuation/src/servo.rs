use std::time::Duration;

use doorkeeper_core::Result;
use doorkeeper_hardware::{HardwareError, ServoOutput};
use tracing::{debug, info};

use crate::executor::{ActionExecutor, ActionPattern};
use crate::task::PatternTask;

/// Latch geometry and timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoConfig {
    pub open_angle: u16,
    pub closed_angle: u16,
    /// How long the latch stays open before returning.
    pub dwell: Duration,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            open_angle: 0,
            closed_angle: 180,
            dwell: Duration::from_millis(3000),
        }
    }
}

impl ServoConfig {
    pub fn with_angles(mut self, open: u16, closed: u16) -> Self {
        self.open_angle = open;
        self.closed_angle = closed;
        self
    }

    pub fn with_dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell;
        self
    }
}

/// Door latch: opens on success, holds for the dwell time, then closes.
///
/// Every other pattern leaves the latch closed.
pub struct ServoExecutor {
    config: ServoConfig,
    task: PatternTask<Box<dyn ServoOutput>>,
}

impl ServoExecutor {
    pub fn new(servo: impl ServoOutput + 'static) -> Self {
        Self::with_config(servo, ServoConfig::default())
    }

    pub fn with_config(servo: impl ServoOutput + 'static, config: ServoConfig) -> Self {
        let servo: Box<dyn ServoOutput> = Box::new(servo);
        let closed = config.closed_angle;
        Self {
            config,
            task: PatternTask::new(servo, move |servo: &mut Box<dyn ServoOutput>| {
                servo.set_angle(closed)
            }),
        }
    }

    pub fn config(&self) -> &ServoConfig {
        &self.config
    }
}

impl ActionExecutor for ServoExecutor {
    fn name(&self) -> &str {
        "Servo Executor"
    }

    fn initialize(&mut self) -> Result<()> {
        let closed = self.config.closed_angle;
        self.task.with_output(|servo| {
            servo.attach()?;
            servo.set_angle(closed);
            Ok::<_, HardwareError>(())
        })?;
        info!(closed_angle = closed, "Servo executor initialized");
        Ok(())
    }

    fn execute(&mut self, pattern: ActionPattern) {
        match pattern {
            ActionPattern::Success => {
                let ServoConfig {
                    open_angle,
                    closed_angle,
                    dwell,
                } = self.config;
                debug!(?dwell, "Opening latch");
                self.task.arm(move |ctx| async move {
                    if !ctx.apply(|servo| servo.set_angle(open_angle)) || !ctx.hold(dwell).await {
                        return;
                    }
                    ctx.apply(|servo| servo.set_angle(closed_angle));
                    debug!("Latch closed after dwell");
                });
            }
            ActionPattern::Fault => self.stop_execution(),
            other => debug!(pattern = %other, "No latch movement"),
        }
    }

    fn is_executing(&self) -> bool {
        self.task.is_running()
    }

    fn stop_execution(&mut self) {
        self.task.stop();
        debug!("Latch returned to closed");
    }
}
