//! Credential lifecycle for radio cards.
//!
//! Enrollment rotates the card's Key A from the factory default to a fresh
//! random key and stores `(uid, key)`. Erasure needs the same card back,
//! proves possession with the stored key, writes the factory trailer and
//! drops the record. Deletion only drops the record.
//!
//! The card is written before the store changes, so a card that fails
//! mid-way is never half-enrolled in the store.

use std::time::Duration;

use doorkeeper_actuation::ActionExecutor;
use doorkeeper_core::constants::{AUTH_BLOCK, DEFAULT_MANAGEMENT_TIMEOUT, SECTOR_TRAILER_BLOCK};
use doorkeeper_core::{CardKey, Error, Result, SectorTrailer, Uid};
use doorkeeper_storage::CredentialRecord;
use tracing::{debug, error, info, warn};

use super::operation::{LifecycleOperation, OperationKind, OperationOutcome};
use super::ManagementOperation;
use crate::context::AccessContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardManagerConfig {
    /// How long an armed operation waits for its card.
    pub operation_timeout: Duration,
}

impl Default for CardManagerConfig {
    fn default() -> Self {
        Self {
            operation_timeout: DEFAULT_MANAGEMENT_TIMEOUT,
        }
    }
}

impl CardManagerConfig {
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

/// Register, erase, delete and list radio-card credentials.
pub struct CardManager {
    config: CardManagerConfig,
    operation: Option<LifecycleOperation>,
    completed: Option<OperationOutcome>,
}

impl CardManager {
    pub fn new() -> Self {
        Self::with_config(CardManagerConfig::default())
    }

    pub fn with_config(config: CardManagerConfig) -> Self {
        Self {
            config,
            operation: None,
            completed: None,
        }
    }

    pub fn config(&self) -> &CardManagerConfig {
        &self.config
    }

    fn arm(&mut self, ctx: &mut AccessContext, kind: OperationKind) -> Result<()> {
        if self.operation.is_some() {
            return Err(Error::OperationInProgress);
        }
        // Start from a clean detection so a card left on the reader counts.
        ctx.radio.reset();
        self.completed = None;
        info!(
            operation = %kind,
            timeout_ms = self.config.operation_timeout.as_millis() as u64,
            "Management operation armed, present card"
        );
        self.operation = Some(LifecycleOperation::new(kind));
        Ok(())
    }

    async fn enroll(ctx: &mut AccessContext) -> Result<Uid> {
        let uid = ctx.radio.read_uid().await?;
        if ctx.store.contains(&uid) {
            return Err(Error::already_registered(&uid));
        }

        ctx.radio
            .authenticate_block(&uid, AUTH_BLOCK, &CardKey::FACTORY_DEFAULT)
            .await
            .map_err(|e| match e {
                Error::AuthenticationFailure { .. } => {
                    Error::authentication("card is not blank (factory key rejected)")
                }
                other => other,
            })?;

        let key = CardKey::generate();
        ctx.radio
            .write_block(SECTOR_TRAILER_BLOCK, SectorTrailer::new(&key).as_bytes())
            .await?;
        ctx.store.insert(CredentialRecord::new(uid.clone(), key))?;
        Ok(uid)
    }

    async fn erase(ctx: &mut AccessContext, target: &Uid) -> Result<Uid> {
        let uid = ctx.radio.read_uid().await?;
        if uid != *target {
            return Err(Error::WrongCard {
                expected: target.to_string(),
                actual: uid.to_string(),
            });
        }
        Self::restore_factory_key(ctx, &uid).await?;
        Ok(uid)
    }

    async fn restore_factory_key(ctx: &mut AccessContext, uid: &Uid) -> Result<()> {
        let key = ctx.store.find_key(uid).ok_or_else(|| Error::not_found(uid))?;
        ctx.radio.authenticate_block(uid, AUTH_BLOCK, &key).await?;
        ctx.radio
            .write_block(SECTOR_TRAILER_BLOCK, SectorTrailer::factory_default().as_bytes())
            .await?;
        ctx.store.remove(uid)?;
        Ok(())
    }

    /// Persist a successful mutation and pick the feedback.
    async fn finish(&mut self, ctx: &mut AccessContext, kind: OperationKind, result: Result<Uid>) {
        let result = match result {
            Ok(uid) => ctx.save_store().await.map(|()| uid),
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(uid) => {
                info!(operation = %kind, %uid, "Management operation succeeded");
                match kind {
                    OperationKind::Register => ctx.door.execute_registration_success_action(),
                    OperationKind::Erase { .. } => ctx.door.execute_deletion_success_action(),
                }
                OperationOutcome::succeeded(kind, uid)
            }
            Err(e) => {
                match &e {
                    Error::Persistence(_) => {
                        error!(operation = %kind, error = %e, "Credential store not saved")
                    }
                    _ => warn!(operation = %kind, error = %e, "Management operation failed"),
                }
                ctx.door.execute_failure_action();
                let uid = match &kind {
                    OperationKind::Erase { target } => Some(target.clone()),
                    OperationKind::Register => None,
                };
                OperationOutcome::failed(kind, uid, e)
            }
        };

        self.operation = None;
        self.completed = Some(outcome);
    }
}

impl Default for CardManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagementOperation for CardManager {
    fn name(&self) -> &str {
        "Card Manager"
    }

    fn register_new(&mut self, ctx: &mut AccessContext) -> Result<()> {
        self.arm(ctx, OperationKind::Register)
    }

    async fn delete_item(&mut self, ctx: &mut AccessContext, id: &str) -> Result<()> {
        let uid: Uid = id.parse()?;
        if self.operation.is_some() {
            return Err(Error::OperationInProgress);
        }
        ctx.store.remove(&uid)?;

        if let Err(e) = ctx.save_store().await {
            error!(%uid, error = %e, "Credential deleted in memory but not saved");
            ctx.door.execute_failure_action();
            return Err(e);
        }
        info!(%uid, "Credential deleted");
        ctx.door.execute_deletion_success_action();
        Ok(())
    }

    fn erase_and_delete_item(&mut self, ctx: &mut AccessContext, id: &str) -> Result<()> {
        let uid: Uid = id.parse()?;
        if self.operation.is_some() {
            return Err(Error::OperationInProgress);
        }
        if !ctx.store.contains(&uid) {
            return Err(Error::not_found(&uid));
        }
        self.arm(ctx, OperationKind::Erase { target: uid })
    }

    fn list_registered_items(&self, ctx: &AccessContext) -> Vec<String> {
        ctx.store
            .records()
            .iter()
            .enumerate()
            .map(|(index, record)| match record.registered_at {
                Some(at) => format!(
                    "{}. {} (registered {})",
                    index + 1,
                    record.uid,
                    at.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                None => format!("{}. {}", index + 1, record.uid),
            })
            .collect()
    }

    fn has_ongoing_operation(&self) -> bool {
        self.operation.is_some()
    }

    fn has_completed_operation(&self) -> bool {
        self.completed.is_some()
    }

    fn take_completed_operation(&mut self) -> Option<OperationOutcome> {
        self.completed.take()
    }

    async fn handle_operations(&mut self, ctx: &mut AccessContext) {
        let Some(operation) = self.operation.as_ref() else {
            return;
        };

        let kind = operation.kind.clone();
        if operation.is_expired(self.config.operation_timeout) {
            let elapsed_ms = operation.elapsed().as_millis() as u64;
            self.finish(ctx, kind, Err(Error::OperationTimeout { elapsed_ms }))
                .await;
            return;
        }

        if !ctx.radio.detect_card().await.is_present() {
            return;
        }
        debug!(operation = %kind, "Card presented to armed operation");

        let result = match &kind {
            OperationKind::Register => Self::enroll(ctx).await,
            OperationKind::Erase { target } => Self::erase(ctx, target).await,
        };
        self.finish(ctx, kind, result).await;
    }

    fn reset(&mut self) {
        if let Some(operation) = self.operation.take() {
            info!(operation = %operation.kind, "Management operation cancelled");
        }
        self.completed = None;
    }
}
