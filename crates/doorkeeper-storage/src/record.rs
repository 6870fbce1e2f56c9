use chrono::{DateTime, Utc};
use doorkeeper_core::{CardKey, Uid};
use serde::{Deserialize, Serialize};

/// One enrolled card: its UID and the Key A written onto it.
///
/// Serialized as `{"uid": "04A1B2C3", "key": "A0A1A2A3A4A5"}`; the
/// registration time is only written when known, so files without it load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub uid: Uid,
    pub key: CardKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// Record for a card enrolled right now.
    pub fn new(uid: Uid, key: CardKey) -> Self {
        Self {
            uid,
            key,
            registered_at: Some(Utc::now()),
        }
    }

    /// Record without a registration timestamp.
    pub fn without_timestamp(uid: Uid, key: CardKey) -> Self {
        Self {
            uid,
            key,
            registered_at: None,
        }
    }
}
