//! Mock digital input for buttons and other sampled lines.

use std::sync::Arc;

use doorkeeper_core::Level;
use parking_lot::Mutex;

use crate::traits::InputPin;

/// Input pin whose level is set through a [`MockInputHandle`].
///
/// Lines idle high (pull-up), so a pressed button reads low.
///
/// # Examples
///
/// ```
/// use doorkeeper_core::Level;
/// use doorkeeper_hardware::InputPin;
/// use doorkeeper_hardware::mock::MockInputPin;
///
/// let (pin, handle) = MockInputPin::new();
/// assert_eq!(pin.read(), Level::High);
/// handle.press();
/// assert_eq!(pin.read(), Level::Low);
/// ```
#[derive(Debug, Clone)]
pub struct MockInputPin {
    level: Arc<Mutex<Level>>,
}

impl MockInputPin {
    pub fn new() -> (Self, MockInputHandle) {
        let level = Arc::new(Mutex::new(Level::High));
        (
            Self {
                level: Arc::clone(&level),
            },
            MockInputHandle { level },
        )
    }
}

impl InputPin for MockInputPin {
    fn read(&self) -> Level {
        *self.level.lock()
    }
}

/// Handle driving a [`MockInputPin`].
#[derive(Debug, Clone)]
pub struct MockInputHandle {
    level: Arc<Mutex<Level>>,
}

impl MockInputHandle {
    pub fn set_level(&self, level: Level) {
        *self.level.lock() = level;
    }

    /// Pull the line low.
    pub fn press(&self) {
        self.set_level(Level::Low);
    }

    /// Let the line float back high.
    pub fn release(&self) {
        self.set_level(Level::High);
    }
}
