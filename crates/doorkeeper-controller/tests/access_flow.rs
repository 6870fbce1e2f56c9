//! End-to-end access decisions through the coordinator and mock hardware.
//!
//! Run with: cargo test --package doorkeeper-controller --test access_flow

mod common;

use std::time::Duration;

use common::{memory_harness, uid};
use doorkeeper_controller::{SystemState, TickEvent};
use doorkeeper_core::{CardKey, Level};

#[tokio::test(start_paused = true)]
async fn test_enrolled_card_opens_door() {
    let (mut harness, _store) = memory_harness().await;
    let card = harness.enroll("04A1B2C3").await;
    harness.run_for(Duration::from_secs(2)).await;

    let event = harness.tap(&card).await;
    assert!(matches!(event, Some(TickEvent::AccessGranted { .. })), "{event:?}");
    harness.run_for(Duration::from_millis(100)).await;
    assert_eq!(harness.door_openings(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_card_is_denied_with_failure_feedback() {
    let (mut harness, _store) = memory_harness().await;

    let event = harness.tap(&uid("0455667788")).await;
    assert!(matches!(event, Some(TickEvent::AccessDenied { .. })), "{event:?}");
    harness.run_for(Duration::from_millis(100)).await;

    assert_eq!(harness.door_openings(), 0);
    assert!(harness.tone.values().contains(&262));
}

#[tokio::test(start_paused = true)]
async fn test_cloned_uid_with_wrong_key_is_denied() {
    let (mut harness, _store) = memory_harness().await;
    let card = harness.enroll("04A1B2C3").await;
    harness.radio.add_card_with_key(card.clone(), &CardKey::generate());
    harness.run_for(Duration::from_secs(2)).await;

    let event = harness.tap(&card).await;
    assert!(matches!(event, Some(TickEvent::AccessDenied { .. })), "{event:?}");
    assert_eq!(harness.door_openings(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_held_card_opens_door_once() {
    let (mut harness, _store) = memory_harness().await;
    let card = harness.enroll("04A1B2C3").await;
    harness.run_for(Duration::from_secs(2)).await;

    harness.radio.present_card(&card);
    let events = harness.run_for(Duration::from_secs(5)).await;
    harness.radio.remove_card();
    harness.run_for(Duration::from_secs(4)).await;

    assert!(matches!(events.as_slice(), [TickEvent::AccessGranted { .. }]), "{events:?}");
    assert_eq!(harness.door_openings(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_held_unknown_card_is_denied_once() {
    let (mut harness, _store) = memory_harness().await;

    harness.radio.present_card(&uid("0455667788"));
    let events = harness.run_for(Duration::from_secs(5)).await;

    assert!(matches!(events.as_slice(), [TickEvent::AccessDenied { .. }]), "{events:?}");
    assert_eq!(harness.door_openings(), 0);

    // One failure pattern, three blinks, never restarted.
    let blinks = harness.led.values().iter().filter(|level| level.is_high()).count();
    assert_eq!(blinks, 3);
    assert_eq!(harness.led.current(), Some(Level::Low));
}

#[tokio::test(start_paused = true)]
async fn test_held_card_with_wrong_key_is_denied_once() {
    let (mut harness, _store) = memory_harness().await;
    let card = harness.enroll("04A1B2C3").await;
    harness.radio.add_card_with_key(card.clone(), &CardKey::generate());
    harness.run_for(Duration::from_secs(2)).await;

    harness.radio.present_card(&card);
    let events = harness.run_for(Duration::from_secs(5)).await;

    assert!(matches!(events.as_slice(), [TickEvent::AccessDenied { .. }]), "{events:?}");
    assert_eq!(harness.door_openings(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_card_returned_after_window_is_decided_again() {
    let (mut harness, _store) = memory_harness().await;
    let stranger = uid("0455667788");

    assert!(matches!(harness.tap(&stranger).await, Some(TickEvent::AccessDenied { .. })));
    harness.run_for(Duration::from_millis(1500)).await;
    assert!(matches!(harness.tap(&stranger).await, Some(TickEvent::AccessDenied { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_rapid_retap_inside_replay_window_is_ignored() {
    let (mut harness, _store) = memory_harness().await;
    let card = harness.enroll("04A1B2C3").await;
    harness.run_for(Duration::from_secs(2)).await;

    assert!(matches!(harness.tap(&card).await, Some(TickEvent::AccessGranted { .. })));
    assert!(harness.tap(&card).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_two_cards_inside_cooldown_open_once() {
    let (mut harness, _store) = memory_harness().await;
    let first = harness.enroll("04A1B2C3").await;
    let second = harness.enroll("0455667788").await;
    harness.run_for(Duration::from_secs(2)).await;

    assert!(matches!(harness.tap(&first).await, Some(TickEvent::AccessGranted { .. })));
    assert!(matches!(
        harness.tap(&second).await,
        Some(TickEvent::CooldownSuppressed { .. })
    ));
    harness.run_for(Duration::from_secs(4)).await;
    assert_eq!(harness.door_openings(), 1);

    assert!(matches!(harness.tap(&first).await, Some(TickEvent::AccessGranted { .. })));
    harness.run_for(Duration::from_millis(100)).await;
    assert_eq!(harness.door_openings(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_exit_button_always_opens() {
    let (mut harness, _store) = memory_harness().await;

    let events = harness.press_button().await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], TickEvent::AccessGranted { source } if source == "Manual Trigger"));
    assert_eq!(harness.door_openings(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_button_presses_open_once() {
    let (mut harness, _store) = memory_harness().await;

    let first = harness.press_button().await;
    let second = harness.press_button().await;

    assert!(matches!(first.as_slice(), [TickEvent::AccessGranted { .. }]));
    assert!(matches!(second.as_slice(), [TickEvent::CooldownSuppressed { .. }]));
    assert_eq!(harness.door_openings(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_latch_closes_after_dwell() {
    let (mut harness, _store) = memory_harness().await;
    harness.press_button().await;
    assert_eq!(harness.servo.current(), Some(0));

    harness.run_for(Duration::from_secs(3)).await;
    assert_eq!(harness.servo.current(), Some(180));
    assert_eq!(harness.coordinator.state(), SystemState::Authentication);
}
