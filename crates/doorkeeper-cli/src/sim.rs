//! Console commands that drive the simulated hardware.
//!
//! ```text
//! sim:tap:<uid>     bring a card into the field (unknown cards start blank)
//! sim:remove        take the card away
//! sim:blank:<uid>   add a factory-fresh card without presenting it
//! sim:button        press and release the exit button
//! ```

use std::time::Duration;

use doorkeeper_core::{Error, Result, Uid};
use doorkeeper_hardware::mock::{MockInputHandle, MockRadioHandle};
use tracing::debug;

const PREFIX: &str = "sim:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCommand {
    Tap(Uid),
    Remove,
    Blank(Uid),
    Button,
}

impl SimCommand {
    /// Parse a `sim:` line. Returns `None` for lines meant for the coordinator.
    pub fn parse(line: &str) -> Option<Result<Self>> {
        let line = line.trim();
        let rest = line
            .get(..PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(PREFIX))
            .map(|_| &line[PREFIX.len()..])?;

        let mut parts = rest.splitn(2, ':').map(str::trim);
        let action = parts.next().unwrap_or_default().to_ascii_lowercase();
        let param = parts.next();

        let command = match (action.as_str(), param) {
            ("tap", Some(uid)) => uid.parse().map(Self::Tap),
            ("blank", Some(uid)) => uid.parse().map(Self::Blank),
            ("remove", _) => Ok(Self::Remove),
            ("button", _) => Ok(Self::Button),
            ("tap" | "blank", None) => Err(Error::InvalidCommand(format!(
                "sim:{action} needs a card UID"
            ))),
            _ => Err(Error::InvalidCommand(format!("unknown simulator action '{action}'"))),
        };
        Some(command)
    }
}

/// Handles onto the mock devices owned by the coordinator.
pub struct Simulator {
    radio: MockRadioHandle,
    button: MockInputHandle,
    press_duration: Duration,
}

impl Simulator {
    /// `press_duration` should exceed the manual trigger debounce.
    pub fn new(radio: MockRadioHandle, button: MockInputHandle, press_duration: Duration) -> Self {
        Self {
            radio,
            button,
            press_duration,
        }
    }

    pub fn apply(&self, command: SimCommand) -> String {
        debug!(?command, "Simulator command");
        match command {
            SimCommand::Tap(uid) => {
                self.radio.present_card(&uid);
                format!("Card {uid} in field")
            }
            SimCommand::Remove => match self.radio.card_in_field() {
                Some(uid) => {
                    self.radio.remove_card();
                    format!("Card {uid} removed")
                }
                None => "No card in field".to_string(),
            },
            SimCommand::Blank(uid) => {
                let uid = self.radio.add_blank_card(uid);
                format!("Blank card {uid} added")
            }
            SimCommand::Button => {
                self.button.press();
                let button = self.button.clone();
                let hold = self.press_duration;
                tokio::spawn(async move {
                    tokio::time::sleep(hold).await;
                    button.release();
                });
                "Exit button pressed".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorkeeper_core::Level;
    use doorkeeper_hardware::InputPin;
    use doorkeeper_hardware::mock::{MockInputPin, MockRadio};
    use rstest::rstest;

    fn uid(hex: &str) -> Uid {
        hex.parse().unwrap()
    }

    #[rstest]
    #[case("sim:tap:04A1B2C3", SimCommand::Tap(uid("04A1B2C3")))]
    #[case("SIM:Tap: 04a1b2c3 ", SimCommand::Tap(uid("04A1B2C3")))]
    #[case("sim:blank:0455667788", SimCommand::Blank(uid("0455667788")))]
    #[case("sim:remove", SimCommand::Remove)]
    #[case("sim:button", SimCommand::Button)]
    fn test_parse_valid(#[case] line: &str, #[case] expected: SimCommand) {
        assert_eq!(SimCommand::parse(line).unwrap().unwrap(), expected);
    }

    #[rstest]
    #[case("sim:tap")]
    #[case("sim:tap:zz")]
    #[case("sim:shake")]
    #[case("sim:")]
    fn test_parse_invalid(#[case] line: &str) {
        assert!(matches!(
            SimCommand::parse(line),
            Some(Err(Error::InvalidCommand(_) | Error::InvalidUid(_)))
        ));
    }

    #[rstest]
    #[case("card:register")]
    #[case("help")]
    #[case("si")]
    fn test_coordinator_lines_pass_through(#[case] line: &str) {
        assert!(SimCommand::parse(line).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_button_released_after_hold() {
        let (_radio, radio) = MockRadio::new();
        let (pin, button) = MockInputPin::new();
        let sim = Simulator::new(radio, button, Duration::from_millis(150));

        sim.apply(SimCommand::Button);
        assert_eq!(pin.read(), Level::Low);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(pin.read(), Level::High);
    }

    #[test]
    fn test_tap_and_remove() {
        let (_radio, radio) = MockRadio::new();
        let (_pin, button) = MockInputPin::new();
        let sim = Simulator::new(radio.clone(), button, Duration::from_millis(150));

        sim.apply(SimCommand::Tap(uid("04A1B2C3")));
        assert_eq!(radio.card_in_field(), Some(uid("04A1B2C3")));
        assert_eq!(sim.apply(SimCommand::Remove), "Card 04A1B2C3 removed");
        assert_eq!(sim.apply(SimCommand::Remove), "No card in field");
    }
}
