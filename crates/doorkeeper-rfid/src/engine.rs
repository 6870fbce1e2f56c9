use std::fmt;
use std::time::Duration;

use doorkeeper_core::constants::{BLOCK_SIZE, DEFAULT_PERSISTENCE_DELAY};
use doorkeeper_core::{CardKey, Error, KeyType, Level, Result, Uid};
use doorkeeper_hardware::{AnyRadioDriver, InputPin, RadioDriver};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Outcome of one detection poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardDetection {
    NoCard,
    /// A new presence event.
    CardDetected,
    /// A presence reported again within the persistence delay.
    CardPersistent,
}

impl CardDetection {
    /// Whether a tag is coupled and its UID can be read.
    #[must_use]
    pub fn is_present(self) -> bool {
        self != CardDetection::NoCard
    }
}

/// Where the engine is in the presence protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionState {
    /// Detection not armed.
    Idle,
    /// Detection armed; sampling the interrupt line for a falling edge.
    AwaitingEdge,
    /// A tag is coupled; waiting for the line to return high.
    CardPresent,
}

impl fmt::Display for DetectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectionState::Idle => "Idle",
            DetectionState::AwaitingEdge => "AwaitingEdge",
            DetectionState::CardPresent => "CardPresent",
        };
        f.write_str(name)
    }
}

/// Radio engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    /// Window after a report during which a re-detection is "persistent".
    pub persistence_delay: Duration,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            persistence_delay: DEFAULT_PERSISTENCE_DELAY,
        }
    }
}

impl RadioConfig {
    pub fn with_persistence_delay(mut self, delay: Duration) -> Self {
        self.persistence_delay = delay;
        self
    }
}

/// Non-blocking card presence detection over a shared radio.
///
/// # State machine
///
/// - `Idle`: arm passive detection. If the chip reports a tag immediately,
///   go to `CardPresent` and report it; otherwise go to `AwaitingEdge`.
/// - `AwaitingEdge`: sample the active-low IRQ line; a HIGH→LOW transition
///   moves to `CardPresent` and reports the tag.
/// - `CardPresent`: once the line is back HIGH, return to `Idle`.
///
/// A report within `persistence_delay` of the previous one is
/// [`CardDetection::CardPersistent`] instead of `CardDetected`.
///
/// # Examples
///
/// ```
/// use doorkeeper_hardware::mock::MockRadio;
/// use doorkeeper_rfid::{CardDetection, RadioEngine};
///
/// # #[tokio::main]
/// # async fn main() -> doorkeeper_core::Result<()> {
/// let (radio, handle) = MockRadio::new();
/// let mut engine = RadioEngine::new(radio.into(), handle.irq_pin());
/// engine.initialize().await?;
///
/// assert_eq!(engine.detect_card().await, CardDetection::NoCard);
/// handle.present_card(&"04A1B2C3".parse().unwrap());
/// assert_eq!(engine.detect_card().await, CardDetection::CardDetected);
/// assert_eq!(engine.read_uid().await?.to_string(), "04A1B2C3");
/// # Ok(())
/// # }
/// ```
pub struct RadioEngine {
    driver: AnyRadioDriver,
    irq: Box<dyn InputPin>,
    config: RadioConfig,
    state: DetectionState,
    irq_prev: Level,
    last_report: Option<Instant>,
    firmware: Option<u32>,
}

impl RadioEngine {
    pub fn new(driver: AnyRadioDriver, irq: impl InputPin + 'static) -> Self {
        Self::with_config(driver, irq, RadioConfig::default())
    }

    pub fn with_config(
        driver: AnyRadioDriver,
        irq: impl InputPin + 'static,
        config: RadioConfig,
    ) -> Self {
        Self {
            driver,
            irq: Box::new(irq),
            config,
            state: DetectionState::Idle,
            irq_prev: Level::High,
            last_report: None,
            firmware: None,
        }
    }

    /// Wake the chip and read its firmware version.
    ///
    /// Idempotent: once the chip answered, later calls return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareInit`] if the chip does not start or reports
    /// no firmware.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.firmware.is_some() {
            return Ok(());
        }

        self.driver
            .begin()
            .await
            .map_err(|e| Error::HardwareInit(format!("{}: {e}", self.driver.name())))?;
        let version = self
            .driver
            .firmware_version()
            .await
            .map_err(|e| Error::HardwareInit(format!("{}: {e}", self.driver.name())))?;
        if version == 0 {
            return Err(Error::HardwareInit(format!(
                "{}: radio chip not found",
                self.driver.name()
            )));
        }

        info!(
            chip = format!("PN5{:02X}", (version >> 24) & 0xFF),
            firmware = format!("{}.{}", (version >> 16) & 0xFF, (version >> 8) & 0xFF),
            "Radio initialized"
        );
        self.firmware = Some(version);
        self.reset();
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.firmware.is_some()
    }

    /// Firmware word reported at initialization.
    pub fn firmware_version(&self) -> Option<u32> {
        self.firmware
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Advance the presence state machine by one poll.
    ///
    /// Driver errors are logged and reported as [`CardDetection::NoCard`].
    pub async fn detect_card(&mut self) -> CardDetection {
        if !self.is_initialized() {
            return CardDetection::NoCard;
        }

        match self.state {
            DetectionState::Idle => match self.driver.start_passive_detection().await {
                Ok(true) => {
                    self.state = DetectionState::CardPresent;
                    self.report()
                }
                Ok(false) => {
                    self.state = DetectionState::AwaitingEdge;
                    self.irq_prev = Level::High;
                    trace!("Passive detection armed");
                    CardDetection::NoCard
                }
                Err(e) => {
                    warn!(error = %e, "Failed to arm passive detection");
                    CardDetection::NoCard
                }
            },
            DetectionState::AwaitingEdge => {
                let level = self.irq.read();
                let falling_edge = self.irq_prev.is_high() && level.is_low();
                self.irq_prev = level;
                if falling_edge {
                    self.state = DetectionState::CardPresent;
                    self.report()
                } else {
                    CardDetection::NoCard
                }
            }
            DetectionState::CardPresent => {
                if self.irq.read().is_high() {
                    self.state = DetectionState::Idle;
                    trace!("Tag released");
                }
                CardDetection::NoCard
            }
        }
    }

    fn report(&mut self) -> CardDetection {
        let now = Instant::now();
        let persistent = self
            .last_report
            .is_some_and(|at| now.duration_since(at) < self.config.persistence_delay);
        if persistent {
            trace!("Tag still coupled");
            CardDetection::CardPersistent
        } else {
            self.last_report = Some(now);
            debug!("Card detected");
            CardDetection::CardDetected
        }
    }

    /// Read the UID of the detected tag.
    pub async fn read_uid(&mut self) -> Result<Uid> {
        Ok(self.driver.read_detected_uid().await?)
    }

    /// Authenticate `block` with Key A.
    pub async fn authenticate_block(&mut self, uid: &Uid, block: u8, key: &CardKey) -> Result<()> {
        Ok(self
            .driver
            .authenticate_block(uid, block, KeyType::A, key)
            .await?)
    }

    pub async fn write_block(&mut self, block: u8, data: &[u8; BLOCK_SIZE]) -> Result<()> {
        Ok(self.driver.write_block(block, data).await?)
    }

    /// Forget any presence in progress.
    pub fn reset(&mut self) {
        self.state = DetectionState::Idle;
        self.irq_prev = Level::High;
        self.last_report = None;
        debug!("Radio engine reset");
    }
}
