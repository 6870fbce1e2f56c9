//! Mock device implementations for testing and development.
//!
//! Every mock is returned together with a handle sharing its state, so the
//! device can be moved into the controller while tests (or the CLI
//! simulator) keep driving and inspecting it.

pub mod output;
pub mod pin;
pub mod radio;

// Re-export commonly used types
pub use output::{MockOutputHandle, MockOutputPin, MockServo, MockTone};
pub use pin::{MockInputHandle, MockInputPin};
pub use radio::{MockIrqPin, MockRadio, MockRadioHandle, PN532_FIRMWARE, RadioOp};
