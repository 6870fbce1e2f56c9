use crate::{
    Result,
    constants::{
        ACCESS_BITS, BLOCK_SIZE, FACTORY_DEFAULT_KEY, GENERAL_PURPOSE_BYTE, KEY_LENGTH,
        MAX_UID_LENGTH, MIN_UID_LENGTH,
    },
    error::Error,
};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Unique identifier broadcast by a proximity card (4-10 bytes).
///
/// Rendered and parsed as uppercase hexadecimal, e.g. `04A1B2C3`.
///
/// # Examples
///
/// ```
/// use doorkeeper_core::Uid;
///
/// let uid: Uid = "04a1b2c3".parse().unwrap();
/// assert_eq!(uid.to_string(), "04A1B2C3");
/// assert_eq!(uid.as_bytes(), &[0x04, 0xA1, 0xB2, 0xC3]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(Vec<u8>);

impl Uid {
    /// Create a UID from raw bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` if the length is outside 4-10 bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        let len = bytes.len();
        if !(MIN_UID_LENGTH..=MAX_UID_LENGTH).contains(&len) {
            return Err(Error::InvalidUid(format!(
                "UID must be {MIN_UID_LENGTH}-{MAX_UID_LENGTH} bytes, got {len}"
            )));
        }
        Ok(Self(bytes))
    }

    /// Raw UID bytes as read from the card.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the UID.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(&self.0))
    }
}

impl std::str::FromStr for Uid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes =
            hex::decode(s.trim()).map_err(|e| Error::InvalidUid(format!("{s:?}: {e}")))?;
        Uid::new(bytes)
    }
}

impl TryFrom<String> for Uid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.to_string()
    }
}

/// Six-byte secret sector key stored on the card and in the credential store.
///
/// # Security
/// Comparison runs in constant time and `Debug` never prints key material.
#[derive(Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardKey([u8; KEY_LENGTH]);

impl CardKey {
    /// Key every blank card ships with (`FFFFFFFFFFFF`).
    pub const FACTORY_DEFAULT: CardKey = CardKey(FACTORY_DEFAULT_KEY);

    #[must_use]
    pub const fn new(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh key from the operating system's CSPRNG.
    ///
    /// The factory default key is never returned.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a key from the given random source.
    pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; KEY_LENGTH];
        loop {
            rng.fill_bytes(&mut bytes);
            if bytes != FACTORY_DEFAULT_KEY {
                return Self(bytes);
            }
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    #[must_use]
    pub fn is_factory_default(&self) -> bool {
        *self == Self::FACTORY_DEFAULT
    }

    /// Uppercase hex rendering, as persisted.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl PartialEq for CardKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl fmt::Debug for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_factory_default() {
            f.write_str("CardKey(factory default)")
        } else {
            f.write_str("CardKey(<redacted>)")
        }
    }
}

impl std::str::FromStr for CardKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; KEY_LENGTH];
        hex::decode_to_slice(s.trim(), &mut bytes)
            .map_err(|e| Error::InvalidKey(format!("expected {KEY_LENGTH} hex bytes: {e}")))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for CardKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CardKey> for String {
    fn from(key: CardKey) -> Self {
        key.to_hex()
    }
}

/// 16-byte sector trailer: Key A, access bits, general purpose byte, Key B.
///
/// Key B is always the factory default; only Key A is rotated.
///
/// # Examples
///
/// ```
/// use doorkeeper_core::{CardKey, SectorTrailer};
///
/// let trailer = SectorTrailer::factory_default();
/// assert_eq!(trailer.as_bytes()[6..10], [0xFF, 0x07, 0x80, 0x69]);
/// assert!(trailer.key_a().is_factory_default());
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SectorTrailer([u8; BLOCK_SIZE]);

impl SectorTrailer {
    /// Build a trailer carrying `key_a` with the fixed access layout.
    #[must_use]
    pub fn new(key_a: &CardKey) -> Self {
        let mut bytes = [0u8; BLOCK_SIZE];
        bytes[..6].copy_from_slice(key_a.as_bytes());
        bytes[6..9].copy_from_slice(&ACCESS_BITS);
        bytes[9] = GENERAL_PURPOSE_BYTE;
        bytes[10..].copy_from_slice(&FACTORY_DEFAULT_KEY);
        Self(bytes)
    }

    /// Trailer of a blank card.
    #[must_use]
    pub fn factory_default() -> Self {
        Self::new(&CardKey::FACTORY_DEFAULT)
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    /// Key A as written in the first six bytes.
    #[must_use]
    pub fn key_a(&self) -> CardKey {
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&self.0[..6]);
        CardKey::new(key)
    }

    /// Key B as written in the last six bytes.
    #[must_use]
    pub fn key_b(&self) -> CardKey {
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&self.0[10..]);
        CardKey::new(key)
    }

    /// Whether access bits and GPB match the fixed layout.
    #[must_use]
    pub fn has_standard_access(&self) -> bool {
        self.0[6..9] == ACCESS_BITS && self.0[9] == GENERAL_PURPOSE_BYTE
    }
}

impl fmt::Debug for SectorTrailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectorTrailer")
            .field("key_a", &self.key_a())
            .field("access", &hex::encode_upper(&self.0[6..10]))
            .field("key_b", &self.key_b())
            .finish()
    }
}

/// Which sector key a block authentication uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    A,
    B,
}

/// Sampled digital level of an input or output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    High,
    Low,
}

impl Level {
    #[must_use]
    pub fn is_low(self) -> bool {
        self == Level::Low
    }

    #[must_use]
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}
