//! Radio Detection Engine.
//!
//! Owns the proximity-card radio and its interrupt line and turns the
//! chip's two detection paths (tag already coupled when detection is armed,
//! or tag arriving later and pulling the IRQ line low) into one
//! caller-facing [`CardDetection`] result.
//!
//! The engine is polled: [`RadioEngine::detect_card`] never waits for a
//! card. It also exposes the block-level primitives used by the
//! authenticator and the card lifecycle manager.

pub mod engine;

pub use engine::{CardDetection, DetectionState, RadioConfig, RadioEngine};
