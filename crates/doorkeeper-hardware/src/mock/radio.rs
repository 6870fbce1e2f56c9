//! Mock proximity-card radio for testing and development.
//!
//! The simulated chip keeps a set of cards, each with the sector trailer that
//! guards the credential block. Cards can be tapped onto and taken off the
//! reader through [`MockRadioHandle`]; the handle also exposes the chip's
//! interrupt line as an [`InputPin`] so the detection engine can sample it
//! the same way it samples the real IRQ pin.

use std::collections::HashMap;
use std::sync::Arc;

use doorkeeper_core::constants::{BLOCK_SIZE, SECTOR_TRAILER_BLOCK};
use doorkeeper_core::{CardKey, KeyType, Level, SectorTrailer, Uid};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::traits::{InputPin, RadioDriver};
use crate::{HardwareError, Result};

/// Firmware word reported by a PN532 v1.6.
pub const PN532_FIRMWARE: u32 = 0x3201_0607;

/// Radio primitive recorded by the mock, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioOp {
    Begin,
    FirmwareQuery,
    StartDetection,
    ReadUid,
    Authenticate { block: u8, key_type: KeyType },
    Write { block: u8 },
}

impl RadioOp {
    /// Whether the operation touched a card's sector contents.
    pub fn is_card_access(&self) -> bool {
        matches!(self, Self::Authenticate { .. } | Self::Write { .. })
    }
}

#[derive(Debug)]
struct RadioState {
    started: bool,
    firmware: u32,
    fail_begin: bool,
    fail_reads: bool,
    fail_writes: bool,
    cards: HashMap<Uid, SectorTrailer>,
    in_field: Option<Uid>,
    listening: bool,
    response_ready: bool,
    authenticated: Option<(Uid, u8)>,
    ops: Vec<RadioOp>,
}

impl RadioState {
    fn new() -> Self {
        Self {
            started: false,
            firmware: PN532_FIRMWARE,
            fail_begin: false,
            fail_reads: false,
            fail_writes: false,
            cards: HashMap::new(),
            in_field: None,
            listening: false,
            response_ready: false,
            authenticated: None,
            ops: Vec::new(),
        }
    }

    fn ensure_started(&self) -> Result<()> {
        if self.started {
            Ok(())
        } else {
            Err(HardwareError::disconnected("radio not started"))
        }
    }
}

/// Sector index of a block on a 1K card.
fn sector_of(block: u8) -> u8 {
    block / 4
}

/// Mock PN532-class radio.
///
/// # Examples
///
/// ```
/// use doorkeeper_core::{CardKey, KeyType, Level};
/// use doorkeeper_hardware::mock::MockRadio;
/// use doorkeeper_hardware::{InputPin, RadioDriver};
///
/// # #[tokio::main]
/// # async fn main() -> doorkeeper_hardware::Result<()> {
/// let (mut radio, handle) = MockRadio::new();
/// let irq = handle.irq_pin();
/// let uid = handle.add_blank_card("04A1B2C3".parse().unwrap());
///
/// radio.begin().await?;
/// assert!(!radio.start_passive_detection().await?);
/// assert_eq!(irq.read(), Level::High);
///
/// handle.present_card(&uid);
/// assert_eq!(irq.read(), Level::Low);
///
/// let read = radio.read_detected_uid().await?;
/// radio
///     .authenticate_block(&read, 4, KeyType::A, &CardKey::FACTORY_DEFAULT)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockRadio {
    name: String,
    state: Arc<Mutex<RadioState>>,
}

impl MockRadio {
    /// Create a new mock radio with its control handle.
    pub fn new() -> (Self, MockRadioHandle) {
        Self::with_name("Mock PN532")
    }

    /// Create a new mock radio with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockRadioHandle) {
        let state = Arc::new(Mutex::new(RadioState::new()));
        let radio = Self {
            name: name.into(),
            state: Arc::clone(&state),
        };
        (radio, MockRadioHandle { state })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl RadioDriver for MockRadio {
    async fn begin(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.ops.push(RadioOp::Begin);
        if state.fail_begin {
            debug!(name = %self.name, "Mock radio refusing to start");
            return Err(HardwareError::initialization_failed("radio did not wake up"));
        }
        state.started = true;
        Ok(())
    }

    async fn firmware_version(&mut self) -> Result<u32> {
        let mut state = self.state.lock();
        state.ops.push(RadioOp::FirmwareQuery);
        state.ensure_started()?;
        Ok(state.firmware)
    }

    async fn start_passive_detection(&mut self) -> Result<bool> {
        let mut state = self.state.lock();
        state.ops.push(RadioOp::StartDetection);
        state.ensure_started()?;
        state.listening = true;
        state.response_ready = state.in_field.is_some();
        Ok(state.response_ready)
    }

    async fn read_detected_uid(&mut self) -> Result<Uid> {
        let mut state = self.state.lock();
        state.ops.push(RadioOp::ReadUid);
        state.ensure_started()?;
        if !state.response_ready {
            return Err(HardwareError::NoCard);
        }
        state.response_ready = false;
        state.listening = false;
        if state.fail_reads {
            return Err(HardwareError::card_read("garbled target response"));
        }
        state.in_field.clone().ok_or(HardwareError::NoCard)
    }

    async fn authenticate_block(
        &mut self,
        uid: &Uid,
        block: u8,
        key_type: KeyType,
        key: &CardKey,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.ops.push(RadioOp::Authenticate { block, key_type });
        state.ensure_started()?;
        state.authenticated = None;

        if state.in_field.as_ref() != Some(uid) {
            return Err(HardwareError::NoCard);
        }

        // Only the credential sector is modelled; the rest stay blank.
        let trailer = if sector_of(block) == sector_of(SECTOR_TRAILER_BLOCK) {
            state
                .cards
                .get(uid)
                .copied()
                .unwrap_or_else(SectorTrailer::factory_default)
        } else {
            SectorTrailer::factory_default()
        };

        let expected = match key_type {
            KeyType::A => trailer.key_a(),
            KeyType::B => trailer.key_b(),
        };
        if expected != *key {
            return Err(HardwareError::AuthenticationRejected { block });
        }

        state.authenticated = Some((uid.clone(), sector_of(block)));
        Ok(())
    }

    async fn write_block(&mut self, block: u8, data: &[u8; BLOCK_SIZE]) -> Result<()> {
        let mut state = self.state.lock();
        state.ops.push(RadioOp::Write { block });
        state.ensure_started()?;

        let Some((uid, sector)) = state.authenticated.clone() else {
            return Err(HardwareError::write_failed(block, "sector not authenticated"));
        };
        if sector != sector_of(block) || state.in_field.as_ref() != Some(&uid) {
            return Err(HardwareError::write_failed(block, "sector not authenticated"));
        }
        if state.fail_writes {
            return Err(HardwareError::write_failed(block, "card did not acknowledge"));
        }

        if block == SECTOR_TRAILER_BLOCK {
            trace!(%uid, "Mock card trailer rewritten");
            state.cards.insert(uid, SectorTrailer::from_bytes(*data));
        }
        Ok(())
    }
}

/// Handle for controlling a [`MockRadio`].
#[derive(Debug, Clone)]
pub struct MockRadioHandle {
    state: Arc<Mutex<RadioState>>,
}

impl MockRadioHandle {
    /// Add a card carrying factory-default keys.
    pub fn add_blank_card(&self, uid: Uid) -> Uid {
        self.add_card_with_trailer(uid, SectorTrailer::factory_default())
    }

    /// Add a card whose Key A was already rotated to `key`.
    pub fn add_card_with_key(&self, uid: Uid, key: &CardKey) -> Uid {
        self.add_card_with_trailer(uid, SectorTrailer::new(key))
    }

    fn add_card_with_trailer(&self, uid: Uid, trailer: SectorTrailer) -> Uid {
        self.state.lock().cards.insert(uid.clone(), trailer);
        uid
    }

    /// Bring a card into the field. Unknown cards are added as blank.
    ///
    /// If the chip is listening, the interrupt line drops immediately.
    pub fn present_card(&self, uid: &Uid) {
        let mut state = self.state.lock();
        state
            .cards
            .entry(uid.clone())
            .or_insert_with(SectorTrailer::factory_default);
        state.in_field = Some(uid.clone());
        state.authenticated = None;
        if state.listening {
            state.response_ready = true;
        }
        debug!(%uid, listening = state.listening, "Mock card entered field");
    }

    /// Take the current card off the reader.
    pub fn remove_card(&self) {
        let mut state = self.state.lock();
        if let Some(uid) = state.in_field.take() {
            debug!(%uid, "Mock card left field");
        }
        state.response_ready = false;
        state.authenticated = None;
    }

    pub fn card_in_field(&self) -> Option<Uid> {
        self.state.lock().in_field.clone()
    }

    /// Key A currently stored on a card.
    pub fn key_of(&self, uid: &Uid) -> Option<CardKey> {
        self.state.lock().cards.get(uid).map(SectorTrailer::key_a)
    }

    /// Full sector trailer currently stored on a card.
    pub fn trailer_of(&self, uid: &Uid) -> Option<SectorTrailer> {
        self.state.lock().cards.get(uid).copied()
    }

    /// Report `version` from the firmware query; `0` simulates a missing chip.
    pub fn set_firmware_version(&self, version: u32) {
        self.state.lock().firmware = version;
    }

    pub fn set_begin_failure(&self, fail: bool) {
        self.state.lock().fail_begin = fail;
    }

    pub fn set_read_failure(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    pub fn set_write_failure(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Primitives called on the radio so far.
    pub fn operations(&self) -> Vec<RadioOp> {
        self.state.lock().ops.clone()
    }

    pub fn clear_operations(&self) {
        self.state.lock().ops.clear();
    }

    /// The chip's active-low interrupt line.
    pub fn irq_pin(&self) -> MockIrqPin {
        MockIrqPin {
            state: Arc::clone(&self.state),
        }
    }
}

/// Interrupt line of a [`MockRadio`]: low while a detection response is pending.
#[derive(Debug, Clone)]
pub struct MockIrqPin {
    state: Arc<Mutex<RadioState>>,
}

impl InputPin for MockIrqPin {
    fn read(&self) -> Level {
        if self.state.lock().response_ready {
            Level::Low
        } else {
            Level::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> Uid {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_requires_begin() {
        let (mut radio, _handle) = MockRadio::new();
        let result = radio.start_passive_detection().await;
        assert!(matches!(result, Err(HardwareError::Disconnected { .. })));
    }

    #[tokio::test]
    async fn test_deferred_detection_pulls_irq_low() {
        let (mut radio, handle) = MockRadio::new();
        let irq = handle.irq_pin();
        radio.begin().await.unwrap();

        assert!(!radio.start_passive_detection().await.unwrap());
        assert_eq!(irq.read(), Level::High);

        handle.present_card(&uid("04A1B2C3"));
        assert_eq!(irq.read(), Level::Low);

        assert_eq!(radio.read_detected_uid().await.unwrap(), uid("04A1B2C3"));
        assert_eq!(irq.read(), Level::High);
    }

    #[tokio::test]
    async fn test_read_without_response_is_no_card() {
        let (mut radio, _handle) = MockRadio::new();
        radio.begin().await.unwrap();
        assert!(matches!(
            radio.read_detected_uid().await,
            Err(HardwareError::NoCard)
        ));
    }

    #[tokio::test]
    async fn test_key_rotation_roundtrip() {
        let (mut radio, handle) = MockRadio::new();
        let card = handle.add_blank_card(uid("04A1B2C3"));
        handle.present_card(&card);
        radio.begin().await.unwrap();
        assert!(radio.start_passive_detection().await.unwrap());
        radio.read_detected_uid().await.unwrap();

        radio
            .authenticate_block(&card, 4, KeyType::A, &CardKey::FACTORY_DEFAULT)
            .await
            .unwrap();
        let key = CardKey::new([1, 2, 3, 4, 5, 6]);
        radio
            .write_block(7, SectorTrailer::new(&key).as_bytes())
            .await
            .unwrap();

        assert_eq!(handle.key_of(&card), Some(key));
        let rejected = radio
            .authenticate_block(&card, 4, KeyType::A, &CardKey::FACTORY_DEFAULT)
            .await;
        assert!(matches!(
            rejected,
            Err(HardwareError::AuthenticationRejected { block: 4 })
        ));
        radio
            .authenticate_block(&card, 4, KeyType::A, &key)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_write_requires_authentication() {
        let (mut radio, handle) = MockRadio::new();
        let card = handle.add_blank_card(uid("04A1B2C3"));
        handle.present_card(&card);
        radio.begin().await.unwrap();

        let result = radio
            .write_block(7, SectorTrailer::factory_default().as_bytes())
            .await;
        assert!(matches!(result, Err(HardwareError::WriteFailed { block: 7, .. })));
    }

    #[tokio::test]
    async fn test_removal_clears_pending_response() {
        let (mut radio, handle) = MockRadio::new();
        let irq = handle.irq_pin();
        radio.begin().await.unwrap();
        handle.present_card(&uid("04A1B2C3"));
        assert!(radio.start_passive_detection().await.unwrap());
        assert_eq!(irq.read(), Level::Low);

        handle.remove_card();
        assert_eq!(irq.read(), Level::High);
        assert!(!radio.start_passive_detection().await.unwrap());
    }

    #[tokio::test]
    async fn test_operations_are_recorded() {
        let (mut radio, handle) = MockRadio::new();
        radio.begin().await.unwrap();
        radio.firmware_version().await.unwrap();
        assert_eq!(
            handle.operations(),
            vec![RadioOp::Begin, RadioOp::FirmwareQuery]
        );
        assert!(!handle.operations().iter().any(RadioOp::is_card_access));
    }
}
