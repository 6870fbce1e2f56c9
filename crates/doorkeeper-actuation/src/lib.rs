//! Non-blocking actuation for the doorkeeper access controller.
//!
//! Every output device (indicator LED, buzzer, latch servo) is wrapped in an
//! [`ActionExecutor`]. Triggering an action only arms a pattern on a tokio
//! task and returns; blink counts, tone sequences and the latch dwell run
//! on their own schedule while the control loop keeps ticking.
//!
//! Each executor owns exactly one [`PatternTask`]. Arming a new pattern
//! stops the running one first and drives the output back to its safe
//! level, so two patterns never interleave on the same device.
//!
//! [`DoorAccessExecutor`] fans a single trigger out to every device.
//!
//! ```no_run
//! use doorkeeper_actuation::{ActionExecutor, BuzzerExecutor, DoorAccessExecutor, LedExecutor};
//! use doorkeeper_hardware::mock::{MockOutputPin, MockTone};
//!
//! # #[tokio::main]
//! # async fn main() -> doorkeeper_core::Result<()> {
//! let (led, _) = MockOutputPin::new();
//! let (buzzer, _) = MockTone::new();
//! let mut door = DoorAccessExecutor::new()
//!     .with_executor(LedExecutor::new(led))
//!     .with_executor(BuzzerExecutor::new(buzzer));
//!
//! door.initialize()?;
//! door.execute_success_action();
//! assert!(door.is_executing());
//! # Ok(())
//! # }
//! ```

pub mod buzzer;
pub mod door;
pub mod executor;
pub mod led;
pub mod servo;
pub mod task;

pub use buzzer::BuzzerExecutor;
pub use door::DoorAccessExecutor;
pub use executor::{ActionExecutor, ActionPattern};
pub use led::LedExecutor;
pub use servo::{ServoConfig, ServoExecutor};
pub use task::{PatternContext, PatternTask};
