use std::time::Duration;

use doorkeeper_core::constants::{AUTH_BLOCK, DEFAULT_REPLAY_WINDOW};
use doorkeeper_core::{Error, Result, Uid};
use doorkeeper_rfid::CardDetection;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::Authenticator;
use crate::context::AccessContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardAuthenticatorConfig {
    /// A UID that was just decided is ignored while it stays on the reader
    /// and for this long after it was last seen.
    pub replay_window: Duration,
}

impl Default for CardAuthenticatorConfig {
    fn default() -> Self {
        Self {
            replay_window: DEFAULT_REPLAY_WINDOW,
        }
    }
}

impl CardAuthenticatorConfig {
    pub fn with_replay_window(mut self, window: Duration) -> Self {
        self.replay_window = window;
        self
    }
}

/// Grants access to cards whose sector answers to the enrolled key.
///
/// The UID is read while polling, so a card that was just granted or denied
/// is ignored before it becomes another request. Every sighting of that card
/// inside the replay window restarts the window: a card left on the reader
/// yields one decision per presence.
pub struct CardAuthenticator {
    config: CardAuthenticatorConfig,
    pending: Option<Result<Uid>>,
    last_seen: Option<(Uid, Instant)>,
}

impl CardAuthenticator {
    pub fn new() -> Self {
        Self::with_config(CardAuthenticatorConfig::default())
    }

    pub fn with_config(config: CardAuthenticatorConfig) -> Self {
        Self {
            config,
            pending: None,
            last_seen: None,
        }
    }

    pub fn config(&self) -> &CardAuthenticatorConfig {
        &self.config
    }

    /// Whether `uid` was decided recently; refreshes the window if so.
    fn seen_recently(&mut self, uid: &Uid) -> bool {
        let window = self.config.replay_window;
        match &mut self.last_seen {
            Some((last, at)) if last == uid && at.elapsed() < window => {
                *at = Instant::now();
                true
            }
            _ => false,
        }
    }
}

impl Default for CardAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator for CardAuthenticator {
    fn name(&self) -> &str {
        "Card Authenticator"
    }

    async fn initialize(&mut self, ctx: &mut AccessContext) -> Result<()> {
        ctx.radio.initialize().await
    }

    async fn has_authentication_request(&mut self, ctx: &mut AccessContext) -> bool {
        let detection = ctx.radio.detect_card().await;
        if !detection.is_present() {
            return false;
        }

        let read = ctx.radio.read_uid().await;
        match &read {
            Ok(uid) if self.seen_recently(uid) => {
                debug!(%uid, "Card inside replay window, ignored");
                return false;
            }
            Ok(uid) => self.last_seen = Some((uid.clone(), Instant::now())),
            // Only a fresh presence turns an unreadable card into a denial.
            Err(e) if detection == CardDetection::CardPersistent => {
                debug!(error = %e, "Unreadable card still in field, ignored");
                return false;
            }
            Err(_) => {}
        }
        self.pending = Some(read);
        true
    }

    async fn authenticate(&mut self, ctx: &mut AccessContext) -> Result<()> {
        let uid = self
            .pending
            .take()
            .ok_or_else(|| Error::authentication("no card pending"))??;

        let Some(key) = ctx.store.find_key(&uid) else {
            warn!(%uid, "Unknown card presented");
            return Err(Error::authentication(format!("card {uid} is not registered")));
        };

        ctx.radio.authenticate_block(&uid, AUTH_BLOCK, &key).await?;
        info!(%uid, "Card authenticated");
        Ok(())
    }

    fn reset(&mut self) {
        self.pending = None;
    }
}
