//! Hardware device trait definitions.
//!
//! The radio trait uses native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT). Digital lines and PWM outputs are synchronous: sampling a pin or
//! setting a duty cycle never waits.

#![allow(async_fn_in_trait)]

use doorkeeper_core::constants::BLOCK_SIZE;
use doorkeeper_core::{CardKey, KeyType, Level, Uid};

use crate::error::Result;

/// Low-level proximity-card radio (PN532-class reader).
///
/// The ISO14443A anticollision exchange happens below this trait. What is
/// exposed is the small set of primitives the detection engine and the card
/// lifecycle need.
///
/// # Object Safety and Dynamic Dispatch
///
/// This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generics or the [`AnyRadioDriver`](crate::devices::AnyRadioDriver)
/// enum wrapper.
///
/// # Examples
///
/// ```no_run
/// use doorkeeper_core::{CardKey, KeyType};
/// use doorkeeper_hardware::{RadioDriver, Result};
///
/// async fn tap_and_check<R: RadioDriver>(radio: &mut R, key: &CardKey) -> Result<()> {
///     if radio.start_passive_detection().await? {
///         let uid = radio.read_detected_uid().await?;
///         radio.authenticate_block(&uid, 4, KeyType::A, key).await?;
///     }
///     Ok(())
/// }
/// ```
pub trait RadioDriver: Send + Sync {
    /// Power up and wake the radio chip.
    async fn begin(&mut self) -> Result<()>;

    /// Query the chip firmware version; `0` means no chip answered.
    async fn firmware_version(&mut self) -> Result<u32>;

    /// Arm passive target detection.
    ///
    /// Returns `true` when a tag is already coupled and its response is ready.
    /// Returns `false` when the chip is now listening; it will pull the
    /// interrupt line low once a tag arrives.
    async fn start_passive_detection(&mut self) -> Result<bool>;

    /// Fetch the UID of the tag found by the last passive detection.
    ///
    /// Reading the response releases the interrupt line.
    async fn read_detected_uid(&mut self) -> Result<Uid>;

    /// Authenticate the sector holding `block` with the given key.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::AuthenticationRejected`](crate::HardwareError::AuthenticationRejected)
    /// when the card refuses the key.
    async fn authenticate_block(
        &mut self,
        uid: &Uid,
        block: u8,
        key_type: KeyType,
        key: &CardKey,
    ) -> Result<()>;

    /// Write 16 bytes to a block of the currently authenticated sector.
    async fn write_block(&mut self, block: u8, data: &[u8; BLOCK_SIZE]) -> Result<()>;
}

/// Sampled digital input (interrupt line, release button).
pub trait InputPin: Send + Sync {
    fn read(&self) -> Level;
}

/// Digital output (indicator LED).
pub trait OutputPin: Send + Sync {
    /// Claim the line and configure it as an output.
    fn attach(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_level(&mut self, level: Level);
}

/// Square-wave tone generator (passive buzzer).
pub trait ToneOutput: Send + Sync {
    fn attach(&mut self) -> Result<()> {
        Ok(())
    }

    fn tone(&mut self, frequency_hz: u32);

    fn silence(&mut self);
}

/// Positional servo driving the door latch.
pub trait ServoOutput: Send + Sync {
    fn attach(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_angle(&mut self, degrees: u16);
}
