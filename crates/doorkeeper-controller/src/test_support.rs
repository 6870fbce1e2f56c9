//! Mock-backed context shared by the unit tests.

use doorkeeper_actuation::{ActionExecutor, BuzzerExecutor, DoorAccessExecutor, LedExecutor, ServoExecutor};
use doorkeeper_core::{Level, Uid};
use doorkeeper_hardware::mock::{
    MockOutputHandle, MockOutputPin, MockRadio, MockRadioHandle, MockServo, MockTone,
};
use doorkeeper_rfid::RadioEngine;
use doorkeeper_storage::{MemoryPersistence, MemoryPersistenceHandle};

use crate::context::AccessContext;

pub(crate) struct Rig {
    pub radio: MockRadioHandle,
    pub persistence: MemoryPersistenceHandle,
    pub led: MockOutputHandle<Level>,
    pub tone: MockOutputHandle<u32>,
    pub servo: MockOutputHandle<u16>,
}

pub(crate) fn card() -> Uid {
    "04A1B2C3".parse().unwrap()
}

/// Context over fresh mocks; nothing initialized yet.
pub(crate) fn uninitialized_rig() -> (AccessContext, Rig) {
    let (radio, radio_handle) = MockRadio::new();
    let irq = radio_handle.irq_pin();
    let (persistence, persistence_handle) = MemoryPersistence::new();
    let (led, led_handle) = MockOutputPin::new();
    let (tone, tone_handle) = MockTone::new();
    let (servo, servo_handle) = MockServo::new();

    let door = DoorAccessExecutor::new()
        .with_executor(LedExecutor::new(led))
        .with_executor(BuzzerExecutor::new(tone))
        .with_executor(ServoExecutor::new(servo));
    let ctx = AccessContext::new(RadioEngine::new(radio.into(), irq), persistence, door);

    let rig = Rig {
        radio: radio_handle,
        persistence: persistence_handle,
        led: led_handle,
        tone: tone_handle,
        servo: servo_handle,
    };
    (ctx, rig)
}

/// Context with the radio and outputs initialized.
pub(crate) async fn rig() -> (AccessContext, Rig) {
    let (mut ctx, rig) = uninitialized_rig();
    ctx.radio.initialize().await.unwrap();
    ctx.door.initialize().unwrap();
    (ctx, rig)
}
