//! Enum wrapper for radio driver dispatch.
//!
//! Native `async fn` in traits is not object-safe, so the radio cannot be
//! held as `Box<dyn RadioDriver>`. [`AnyRadioDriver`] gives the detection
//! engine one concrete type to own while keeping static dispatch.
//!
//! # Examples
//!
//! ```
//! use doorkeeper_hardware::devices::AnyRadioDriver;
//! use doorkeeper_hardware::mock::MockRadio;
//!
//! let (radio, _handle) = MockRadio::new();
//! let any_radio = AnyRadioDriver::Mock(radio);
//! assert_eq!(any_radio.name(), "Mock PN532");
//! ```

use doorkeeper_core::constants::BLOCK_SIZE;
use doorkeeper_core::{CardKey, KeyType, Uid};

use crate::Result;
use crate::mock::MockRadio;
use crate::traits::RadioDriver;

/// Enum wrapper for radio driver dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyRadioDriver {
    /// Simulated radio for development and testing.
    Mock(MockRadio),
    // TODO: Add a PN532 SPI/I2C variant behind the `hardware-pn532` feature.
}

impl AnyRadioDriver {
    /// Human-readable driver name for log lines.
    pub fn name(&self) -> &str {
        match self {
            Self::Mock(device) => device.name(),
        }
    }
}

impl From<MockRadio> for AnyRadioDriver {
    fn from(radio: MockRadio) -> Self {
        Self::Mock(radio)
    }
}

impl RadioDriver for AnyRadioDriver {
    async fn begin(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.begin().await,
        }
    }

    async fn firmware_version(&mut self) -> Result<u32> {
        match self {
            Self::Mock(device) => device.firmware_version().await,
        }
    }

    async fn start_passive_detection(&mut self) -> Result<bool> {
        match self {
            Self::Mock(device) => device.start_passive_detection().await,
        }
    }

    async fn read_detected_uid(&mut self) -> Result<Uid> {
        match self {
            Self::Mock(device) => device.read_detected_uid().await,
        }
    }

    async fn authenticate_block(
        &mut self,
        uid: &Uid,
        block: u8,
        key_type: KeyType,
        key: &CardKey,
    ) -> Result<()> {
        match self {
            Self::Mock(device) => device.authenticate_block(uid, block, key_type, key).await,
        }
    }

    async fn write_block(&mut self, block: u8, data: &[u8; BLOCK_SIZE]) -> Result<()> {
        match self {
            Self::Mock(device) => device.write_block(block, data).await,
        }
    }
}
