use std::time::Duration;

use doorkeeper_core::Result;
use doorkeeper_hardware::{HardwareError, ToneOutput};
use tracing::{debug, info};

use crate::executor::{ActionExecutor, ActionPattern};
use crate::task::PatternTask;

/// `(frequency Hz, duration ms)` steps of a melody.
type Melody = &'static [(u32, u64)];

const RISING: Melody = &[(784, 100), (880, 100), (980, 100)];
const LOW_DOUBLE: Melody = &[(262, 150), (0, 50), (262, 150)];
const ENROLLED: Melody = &[(784, 100), (880, 100), (980, 100), (1175, 200)];
const FALLING: Melody = &[(980, 100), (880, 100), (784, 100)];
const ALARM: Melody = &[(262, 600)];

fn melody_for(pattern: ActionPattern) -> Melody {
    match pattern {
        ActionPattern::Success => RISING,
        ActionPattern::Failure => LOW_DOUBLE,
        ActionPattern::Registered => ENROLLED,
        ActionPattern::Deleted => FALLING,
        ActionPattern::Fault => ALARM,
    }
}

/// Passive buzzer: rising tones on success, a low double beep on failure.
pub struct BuzzerExecutor {
    task: PatternTask<Box<dyn ToneOutput>>,
}

impl BuzzerExecutor {
    pub fn new(buzzer: impl ToneOutput + 'static) -> Self {
        let buzzer: Box<dyn ToneOutput> = Box::new(buzzer);
        Self {
            task: PatternTask::new(buzzer, |buzzer: &mut Box<dyn ToneOutput>| {
                buzzer.silence()
            }),
        }
    }
}

impl ActionExecutor for BuzzerExecutor {
    fn name(&self) -> &str {
        "Buzzer Executor"
    }

    fn initialize(&mut self) -> Result<()> {
        self.task.with_output(|buzzer| {
            buzzer.attach()?;
            buzzer.silence();
            Ok::<_, HardwareError>(())
        })?;
        info!("Buzzer executor initialized");
        Ok(())
    }

    fn execute(&mut self, pattern: ActionPattern) {
        let melody = melody_for(pattern);
        debug!(%pattern, steps = melody.len(), "Buzzer pattern armed");
        self.task.arm(move |ctx| async move {
            for &(frequency, millis) in melody {
                let played = ctx.apply(|buzzer| {
                    if frequency == 0 {
                        buzzer.silence();
                    } else {
                        buzzer.tone(frequency);
                    }
                });
                if !played || !ctx.hold(Duration::from_millis(millis)).await {
                    return;
                }
            }
            ctx.apply(|buzzer| buzzer.silence());
        });
    }

    fn is_executing(&self) -> bool {
        self.task.is_running()
    }

    fn stop_execution(&mut self) {
        self.task.stop();
        debug!("Buzzer pattern stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorkeeper_hardware::mock::MockTone;

    #[tokio::test(start_paused = true)]
    async fn test_success_plays_rising_tones() {
        let (tone, handle) = MockTone::new();
        let mut buzzer = BuzzerExecutor::new(tone);
        buzzer.initialize().unwrap();
        handle.clear_history();

        buzzer.execute_success_action();
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert!(!buzzer.is_executing());
        assert_eq!(handle.values(), vec![784, 880, 980]);
        assert_eq!(handle.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_plays_falling_tones() {
        let (tone, handle) = MockTone::new();
        let mut buzzer = BuzzerExecutor::new(tone);
        buzzer.initialize().unwrap();
        handle.clear_history();

        buzzer.execute(ActionPattern::Deleted);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(handle.values(), vec![980, 880, 784]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_interrupting_success_silences_first() {
        let (tone, handle) = MockTone::new();
        let mut buzzer = BuzzerExecutor::new(tone);
        buzzer.initialize().unwrap();
        handle.clear_history();

        buzzer.execute_success_action();
        tokio::time::sleep(Duration::from_millis(150)).await;
        buzzer.execute_failure_action();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(
            handle.history(),
            vec![None, Some(784), Some(880), None, Some(262), None, Some(262), None]
        );
    }
}
