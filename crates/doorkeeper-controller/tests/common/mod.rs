//! Common test utilities for controller integration tests.
//!
//! [`Harness`] wires a [`SystemCoordinator`] to mock hardware exactly the way
//! the binary does and keeps every mock handle, so a test can tap cards,
//! press the exit button and inspect the outputs.

#![allow(dead_code)]

use std::time::Duration;

use doorkeeper_actuation::{BuzzerExecutor, DoorAccessExecutor, LedExecutor, ServoExecutor};
use doorkeeper_controller::{
    AccessContext, CardAuthenticator, CardManager, DeviceConfig, ManualTrigger, SystemCoordinator,
    TickEvent,
};
use doorkeeper_core::{Level, Uid};
use doorkeeper_hardware::mock::{
    MockInputHandle, MockInputPin, MockOutputHandle, MockOutputPin, MockRadio, MockRadioHandle,
    MockServo, MockTone,
};
use doorkeeper_rfid::RadioEngine;
use doorkeeper_storage::{AnyPersistence, MemoryPersistence, MemoryPersistenceHandle};

/// Control loop period used by the harness.
pub const TICK: Duration = Duration::from_millis(10);

/// Servo angle of an open latch with the default configuration.
pub const OPEN: u16 = 0;

pub struct Harness {
    pub coordinator: SystemCoordinator,
    pub radio: MockRadioHandle,
    pub button: MockInputHandle,
    pub led: MockOutputHandle<Level>,
    pub tone: MockOutputHandle<u32>,
    pub servo: MockOutputHandle<u16>,
}

pub fn uid(hex: &str) -> Uid {
    hex.parse().unwrap()
}

/// Harness over an in-memory credential store.
pub async fn memory_harness() -> (Harness, MemoryPersistenceHandle) {
    let (persistence, handle) = MemoryPersistence::new();
    (harness(persistence).await, handle)
}

/// Harness over any persistence backend, with default configuration.
pub async fn harness(persistence: impl Into<AnyPersistence>) -> Harness {
    harness_with_radio(persistence, MockRadio::new()).await
}

pub async fn harness_with_radio(
    persistence: impl Into<AnyPersistence>,
    (radio, radio_handle): (MockRadio, MockRadioHandle),
) -> Harness {
    let config = DeviceConfig::default();
    let (button_pin, button) = MockInputPin::new();
    let (led, led_handle) = MockOutputPin::new();
    let (tone, tone_handle) = MockTone::new();
    let (servo, servo_handle) = MockServo::new();

    let door = DoorAccessExecutor::new()
        .with_executor(LedExecutor::new(led))
        .with_executor(BuzzerExecutor::new(tone))
        .with_executor(ServoExecutor::with_config(servo, config.servo()));
    let irq = radio_handle.irq_pin();
    let engine = RadioEngine::with_config(radio.into(), irq, config.radio());
    let context = AccessContext::load(engine, persistence, door).await.unwrap();

    let mut coordinator: SystemCoordinator =
        SystemCoordinator::with_config(context, config.coordinator());
    coordinator.add_authenticator(CardAuthenticator::with_config(config.card_authenticator()));
    coordinator.add_authenticator(ManualTrigger::with_config(button_pin, config.manual_trigger()));
    coordinator.add_management_operation("card", CardManager::with_config(config.card_manager()));
    coordinator.initialize().await.unwrap();

    Harness {
        coordinator,
        radio: radio_handle,
        button,
        led: led_handle,
        tone: tone_handle,
        servo: servo_handle,
    }
}

impl Harness {
    /// Tick for `duration`, advancing the paused clock one period per tick.
    pub async fn run_for(&mut self, duration: Duration) -> Vec<TickEvent> {
        let mut events = Vec::new();
        let ticks = duration.as_millis() / TICK.as_millis();
        for _ in 0..ticks {
            if let Some(event) = self.coordinator.tick().await {
                events.push(event);
            }
            tokio::time::advance(TICK).await;
        }
        events
    }

    /// Present `card` until something happens, then take it away.
    pub async fn tap(&mut self, card: &Uid) -> Option<TickEvent> {
        self.radio.present_card(card);
        let mut event = None;
        for _ in 0..10 {
            event = self.coordinator.tick().await;
            tokio::time::advance(TICK).await;
            if event.is_some() {
                break;
            }
        }
        self.radio.remove_card();
        self.run_for(TICK * 2).await;
        event
    }

    /// Press and release the exit button.
    pub async fn press_button(&mut self) -> Vec<TickEvent> {
        self.button.press();
        let mut events = self.run_for(Duration::from_millis(100)).await;
        self.button.release();
        events.extend(self.run_for(Duration::from_millis(100)).await);
        events
    }

    /// Enroll a blank card and return it.
    pub async fn enroll(&mut self, hex: &str) -> Uid {
        let card = uid(hex);
        self.coordinator.handle_command("card:register").await.unwrap();
        match self.tap(&card).await {
            Some(TickEvent::ManagementCompleted { outcome, .. }) if outcome.is_success() => card,
            other => panic!("enrollment of {hex} failed: {other:?}"),
        }
    }

    /// Number of times the latch opened since the harness was built.
    pub fn door_openings(&self) -> usize {
        self.servo.values().iter().filter(|angle| **angle == OPEN).count()
    }
}
