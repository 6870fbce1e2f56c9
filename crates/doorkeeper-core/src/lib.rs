//! Domain types shared by every doorkeeper crate.
//!
//! This crate holds the value types that flow between the radio engine,
//! the credential store and the coordinator: card identifiers, per-card
//! secret keys, the MIFARE-style sector trailer used for key rotation,
//! and the error taxonomy reported to the user.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
