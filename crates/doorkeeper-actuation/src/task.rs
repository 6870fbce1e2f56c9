//! Cancellable pattern task owning one output device.
//!
//! The output lives behind a mutex shared between the executor and the
//! spawned pattern. Every write from the pattern goes through
//! [`PatternContext::apply`], which checks a generation counter under the same
//! lock that `stop` bumps it with. A pattern that has been replaced can
//! therefore never touch the output again, even if it is mid-step on another
//! worker thread when the abort lands.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

struct Slot<O> {
    output: O,
    generation: u64,
}

type SafeState<O> = Box<dyn Fn(&mut O) + Send + Sync>;

/// Single running pattern for one output.
pub struct PatternTask<O> {
    slot: Arc<Mutex<Slot<O>>>,
    handle: Option<JoinHandle<()>>,
    safe_state: SafeState<O>,
}

impl<O: Send + 'static> PatternTask<O> {
    /// Wrap `output`; `safe_state` drives it to its idle level.
    pub fn new(output: O, safe_state: impl Fn(&mut O) + Send + Sync + 'static) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                output,
                generation: 0,
            })),
            handle: None,
            safe_state: Box::new(safe_state),
        }
    }

    /// Run `f` against the output outside of any pattern.
    pub fn with_output<R>(&self, f: impl FnOnce(&mut O) -> R) -> R {
        f(&mut self.slot.lock().output)
    }

    /// Stop the current pattern and spawn a new one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F, Fut>(&mut self, pattern: F)
    where
        F: FnOnce(PatternContext<O>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        let context = PatternContext {
            slot: Arc::clone(&self.slot),
            generation: self.slot.lock().generation,
        };
        self.handle = Some(tokio::spawn(pattern(context)));
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the running pattern and apply the safe state.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        let mut slot = self.slot.lock();
        slot.generation = slot.generation.wrapping_add(1);
        (self.safe_state)(&mut slot.output);
    }
}

impl<O> Drop for PatternTask<O> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Access to the output from inside a running pattern.
pub struct PatternContext<O> {
    slot: Arc<Mutex<Slot<O>>>,
    generation: u64,
}

impl<O> PatternContext<O> {
    /// Apply `f` to the output unless this pattern has been replaced.
    ///
    /// Returns `false` when the pattern should end.
    pub fn apply(&self, f: impl FnOnce(&mut O)) -> bool {
        let mut slot = self.slot.lock();
        if slot.generation != self.generation {
            return false;
        }
        f(&mut slot.output);
        true
    }

    /// Sleep for `duration`; returns whether the pattern is still current.
    pub async fn hold(&self, duration: Duration) -> bool {
        tokio::time::sleep(duration).await;
        self.is_current()
    }

    pub fn is_current(&self) -> bool {
        self.slot.lock().generation == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(100);

    fn counting_pattern(
        label: &'static str,
        steps: usize,
    ) -> impl FnOnce(PatternContext<Vec<&'static str>>) -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>>
    {
        move |ctx| {
            Box::pin(async move {
                for _ in 0..steps {
                    if !ctx.apply(|log| log.push(label)) || !ctx.hold(STEP).await {
                        return;
                    }
                }
            })
        }
    }

    fn new_task() -> PatternTask<Vec<&'static str>> {
        PatternTask::new(Vec::new(), |log: &mut Vec<&'static str>| log.push("safe"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_pattern_runs_to_completion() {
        let mut task = new_task();
        task.arm(counting_pattern("a", 3));
        assert!(task.is_running());

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(!task.is_running());
        assert_eq!(task.with_output(|log| log.clone()), vec!["safe", "a", "a", "a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_without_interleaving() {
        let mut task = new_task();
        task.arm(counting_pattern("a", 5));
        tokio::time::sleep(Duration::from_millis(150)).await;

        task.arm(counting_pattern("b", 2));
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let log = task.with_output(|log| log.clone());
        assert_eq!(log, vec!["safe", "a", "a", "safe", "b", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_applies_safe_state() {
        let mut task = new_task();
        task.arm(counting_pattern("a", 10));
        tokio::time::sleep(Duration::from_millis(50)).await;

        task.stop();
        assert!(!task.is_running());
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(task.with_output(|log| log.clone()), vec!["safe", "a", "safe"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_context_cannot_write() {
        let mut task = new_task();
        let stale = PatternContext {
            slot: Arc::clone(&task.slot),
            generation: 0,
        };
        task.stop();
        assert!(!stale.apply(|log| log.push("late")));
        assert!(!stale.is_current());
    }
}
