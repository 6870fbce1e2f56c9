//! Hardware abstraction layer for the doorkeeper access controller.
//!
//! The controller talks to two kinds of hardware:
//!
//! - a proximity-card radio (PN532-class), driven through the async
//!   [`RadioDriver`] trait with "detect / read UID / authenticate block /
//!   write block" primitives;
//! - plain digital lines and PWM outputs (interrupt pin, release button,
//!   indicator LED, buzzer, latch servo), driven through the synchronous
//!   [`InputPin`], [`OutputPin`], [`ToneOutput`] and [`ServoOutput`] traits.
//!
//! # Dispatch
//!
//! `RadioDriver` uses native `async fn` in traits and is therefore not
//! object-safe. Consumers hold the [`AnyRadioDriver`] enum wrapper instead of a
//! trait object. The pin traits are synchronous and used as `Box<dyn _>`.
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides programmable devices for development and
//! tests. Each mock comes with a handle sharing its state so a test (or the
//! CLI simulator) can present cards, press buttons and inspect outputs while
//! the controller owns the device itself.
//!
//! ```
//! use doorkeeper_hardware::mock::MockRadio;
//! use doorkeeper_hardware::RadioDriver;
//!
//! # #[tokio::main]
//! # async fn main() -> doorkeeper_hardware::Result<()> {
//! let (mut radio, handle) = MockRadio::new();
//! let uid = handle.add_blank_card("04A1B2C3".parse().unwrap());
//!
//! handle.present_card(&uid);
//! radio.begin().await?;
//! assert!(radio.start_passive_detection().await?);
//! assert_eq!(radio.read_detected_uid().await?, uid);
//! # Ok(())
//! # }
//! ```

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;

pub use devices::AnyRadioDriver;
pub use error::{HardwareError, Result};
pub use traits::{InputPin, OutputPin, RadioDriver, ServoOutput, ToneOutput};
