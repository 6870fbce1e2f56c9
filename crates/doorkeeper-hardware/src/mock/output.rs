//! Mock outputs that record every value they are driven to.
//!
//! Each history entry is `Some(value)` for an active write and `None` for a
//! release (`silence` on the buzzer). Tests use the history to check pattern
//! timing and that cancelled patterns end on the safe level.

use std::sync::Arc;

use doorkeeper_core::Level;
use parking_lot::Mutex;

use crate::traits::{OutputPin, ServoOutput, ToneOutput};
use crate::{HardwareError, Result};

#[derive(Debug)]
struct OutputState<T> {
    attached: bool,
    fail_attach: bool,
    current: Option<T>,
    history: Vec<Option<T>>,
}

impl<T> Default for OutputState<T> {
    fn default() -> Self {
        Self {
            attached: false,
            fail_attach: false,
            current: None,
            history: Vec::new(),
        }
    }
}

type Shared<T> = Arc<Mutex<OutputState<T>>>;

fn attach<T>(state: &Shared<T>, device: &str) -> Result<()> {
    let mut state = state.lock();
    if state.fail_attach {
        return Err(HardwareError::initialization_failed(format!(
            "{device} could not be attached"
        )));
    }
    state.attached = true;
    Ok(())
}

fn record<T: Copy>(state: &Shared<T>, value: Option<T>) {
    let mut state = state.lock();
    state.current = value;
    state.history.push(value);
}

/// Handle inspecting a mock output.
#[derive(Debug)]
pub struct MockOutputHandle<T> {
    state: Shared<T>,
}

impl<T> Clone for MockOutputHandle<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Copy> MockOutputHandle<T> {
    /// Last value written, `None` if released or never driven.
    pub fn current(&self) -> Option<T> {
        self.state.lock().current
    }

    pub fn history(&self) -> Vec<Option<T>> {
        self.state.lock().history.clone()
    }

    /// Active values written so far, skipping releases.
    pub fn values(&self) -> Vec<T> {
        self.state.lock().history.iter().flatten().copied().collect()
    }

    pub fn clear_history(&self) {
        self.state.lock().history.clear();
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().attached
    }

    /// Make the next `attach` fail.
    pub fn set_attach_failure(&self, fail: bool) {
        self.state.lock().fail_attach = fail;
    }
}

fn shared<T>() -> (Shared<T>, MockOutputHandle<T>) {
    let state = Arc::new(Mutex::new(OutputState::default()));
    let handle = MockOutputHandle {
        state: Arc::clone(&state),
    };
    (state, handle)
}

/// Mock indicator LED.
#[derive(Debug)]
pub struct MockOutputPin {
    state: Shared<Level>,
}

impl MockOutputPin {
    pub fn new() -> (Self, MockOutputHandle<Level>) {
        let (state, handle) = shared();
        (Self { state }, handle)
    }
}

impl OutputPin for MockOutputPin {
    fn attach(&mut self) -> Result<()> {
        attach(&self.state, "output pin")
    }

    fn set_level(&mut self, level: Level) {
        record(&self.state, Some(level));
    }
}

/// Mock passive buzzer; values are frequencies in Hz.
#[derive(Debug)]
pub struct MockTone {
    state: Shared<u32>,
}

impl MockTone {
    pub fn new() -> (Self, MockOutputHandle<u32>) {
        let (state, handle) = shared();
        (Self { state }, handle)
    }
}

impl ToneOutput for MockTone {
    fn attach(&mut self) -> Result<()> {
        attach(&self.state, "buzzer")
    }

    fn tone(&mut self, frequency_hz: u32) {
        record(&self.state, Some(frequency_hz));
    }

    fn silence(&mut self) {
        record(&self.state, None);
    }
}

/// Mock latch servo; values are angles in degrees.
#[derive(Debug)]
pub struct MockServo {
    state: Shared<u16>,
}

impl MockServo {
    pub fn new() -> (Self, MockOutputHandle<u16>) {
        let (state, handle) = shared();
        (Self { state }, handle)
    }
}

impl ServoOutput for MockServo {
    fn attach(&mut self) -> Result<()> {
        attach(&self.state, "servo")
    }

    fn set_angle(&mut self, degrees: u16) {
        record(&self.state, Some(degrees));
    }
}
