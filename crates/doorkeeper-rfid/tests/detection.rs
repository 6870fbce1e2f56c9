//! Detection protocol tests against the mock radio.
//!
//! Run with: cargo test --package doorkeeper-rfid --test detection

use std::time::Duration;

use doorkeeper_core::Uid;
use doorkeeper_hardware::mock::{MockRadio, MockRadioHandle};
use doorkeeper_rfid::{CardDetection, DetectionState, RadioConfig, RadioEngine};
use rstest::rstest;

fn card() -> Uid {
    "04A1B2C3".parse().unwrap()
}

async fn engine() -> (RadioEngine, MockRadioHandle) {
    let (radio, handle) = MockRadio::new();
    let mut engine = RadioEngine::with_config(
        radio.into(),
        handle.irq_pin(),
        RadioConfig::default().with_persistence_delay(Duration::from_millis(500)),
    );
    engine.initialize().await.unwrap();
    (engine, handle)
}

/// Poll until the engine reports a presence or gives up.
async fn poll_presence(engine: &mut RadioEngine, polls: usize) -> CardDetection {
    for _ in 0..polls {
        let detection = engine.detect_card().await;
        if detection.is_present() {
            return detection;
        }
    }
    CardDetection::NoCard
}

#[rstest]
#[case::immediate_repoll(100, CardDetection::CardPersistent)]
#[case::just_inside(499, CardDetection::CardPersistent)]
#[case::at_delay(500, CardDetection::CardDetected)]
#[case::long_after(2000, CardDetection::CardDetected)]
#[tokio::test(start_paused = true)]
async fn test_held_card_persistence(#[case] wait_ms: u64, #[case] expected: CardDetection) {
    let (mut engine, handle) = engine().await;
    handle.present_card(&card());

    assert_eq!(poll_presence(&mut engine, 3).await, CardDetection::CardDetected);
    engine.read_uid().await.unwrap();

    tokio::time::advance(Duration::from_millis(wait_ms)).await;
    assert_eq!(poll_presence(&mut engine, 3).await, expected);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_window_measured_from_first_report() {
    let (mut engine, handle) = engine().await;
    handle.present_card(&card());
    assert_eq!(poll_presence(&mut engine, 3).await, CardDetection::CardDetected);
    engine.read_uid().await.unwrap();

    for _ in 0..4 {
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(poll_presence(&mut engine, 3).await, CardDetection::CardPersistent);
        engine.read_uid().await.unwrap();
    }

    tokio::time::advance(Duration::from_millis(150)).await;
    assert_eq!(poll_presence(&mut engine, 3).await, CardDetection::CardDetected);
}

#[tokio::test(start_paused = true)]
async fn test_tap_remove_tap_is_two_detections() {
    let (mut engine, handle) = engine().await;

    handle.present_card(&card());
    assert_eq!(poll_presence(&mut engine, 3).await, CardDetection::CardDetected);
    engine.read_uid().await.unwrap();
    handle.remove_card();

    assert_eq!(poll_presence(&mut engine, 3).await, CardDetection::NoCard);
    assert_eq!(engine.state(), DetectionState::AwaitingEdge);

    tokio::time::advance(Duration::from_millis(800)).await;
    handle.present_card(&card());
    assert_eq!(engine.detect_card().await, CardDetection::CardDetected);
}

#[tokio::test(start_paused = true)]
async fn test_reset_clears_persistence_window() {
    let (mut engine, handle) = engine().await;
    handle.present_card(&card());
    assert_eq!(poll_presence(&mut engine, 3).await, CardDetection::CardDetected);
    engine.read_uid().await.unwrap();

    engine.reset();
    assert_eq!(poll_presence(&mut engine, 3).await, CardDetection::CardDetected);
}

#[tokio::test]
async fn test_removed_before_read_releases_line() {
    let (mut engine, handle) = engine().await;
    handle.present_card(&card());
    assert_eq!(engine.detect_card().await, CardDetection::CardDetected);

    handle.remove_card();
    assert_eq!(engine.detect_card().await, CardDetection::NoCard);
    assert_eq!(engine.state(), DetectionState::Idle);
    assert!(engine.read_uid().await.is_err());
}
