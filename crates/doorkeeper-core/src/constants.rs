//! Card layout constants and default timing values.

use std::time::Duration;

/// Shortest UID a proximity card broadcasts (single-size UID).
pub const MIN_UID_LENGTH: usize = 4;

/// Longest UID a proximity card broadcasts (triple-size UID).
pub const MAX_UID_LENGTH: usize = 10;

/// Length of a MIFARE Classic sector key.
pub const KEY_LENGTH: usize = 6;

/// Length of a card data block.
pub const BLOCK_SIZE: usize = 16;

/// Data block whose sector keys guard the credential.
pub const AUTH_BLOCK: u8 = 4;

/// Trailer block of the sector containing [`AUTH_BLOCK`].
pub const SECTOR_TRAILER_BLOCK: u8 = 7;

/// Key every blank card ships with.
pub const FACTORY_DEFAULT_KEY: [u8; KEY_LENGTH] = [0xFF; KEY_LENGTH];

/// Transport-configuration access bits written into every trailer.
pub const ACCESS_BITS: [u8; 3] = [0xFF, 0x07, 0x80];

/// General purpose byte written after the access bits.
pub const GENERAL_PURPOSE_BYTE: u8 = 0x69;

/// Global window during which a second successful authentication is dropped.
pub const DEFAULT_AUTH_COOLDOWN: Duration = Duration::from_millis(2000);

/// Hard deadline for a management operation, enforced by the coordinator.
pub const DEFAULT_MANAGEMENT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Window after a report during which the same presence is "persistent".
pub const DEFAULT_PERSISTENCE_DELAY: Duration = Duration::from_millis(500);

/// Per-UID replay window of the radio-card authenticator.
pub const DEFAULT_REPLAY_WINDOW: Duration = Duration::from_millis(1000);

/// Debounce interval of the manual override input.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);
