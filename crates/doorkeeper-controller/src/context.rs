use doorkeeper_actuation::DoorAccessExecutor;
use doorkeeper_core::Result;
use doorkeeper_rfid::RadioEngine;
use doorkeeper_storage::{AnyPersistence, CredentialStore};

/// Shared peripherals and state handed to whichever role is active.
///
/// The coordinator owns the context and lends it mutably to one
/// authenticator or management operation at a time, so the radio never has
/// two users.
pub struct AccessContext {
    pub radio: RadioEngine,
    pub store: CredentialStore,
    pub persistence: AnyPersistence,
    pub door: DoorAccessExecutor,
}

impl AccessContext {
    /// Build a context around an empty credential store.
    pub fn new(
        radio: RadioEngine,
        persistence: impl Into<AnyPersistence>,
        door: DoorAccessExecutor,
    ) -> Self {
        Self {
            radio,
            store: CredentialStore::new(),
            persistence: persistence.into(),
            door,
        }
    }

    /// Build a context and load the credential store from `persistence`.
    ///
    /// Corrupt data yields an empty store (see
    /// [`CredentialStore::load_from`]).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`](doorkeeper_core::Error::Persistence)
    /// if the backend cannot be read at all.
    pub async fn load(
        radio: RadioEngine,
        persistence: impl Into<AnyPersistence>,
        door: DoorAccessExecutor,
    ) -> Result<Self> {
        let mut persistence = persistence.into();
        let store = CredentialStore::load_from(&mut persistence).await?;
        Ok(Self {
            radio,
            store,
            persistence,
            door,
        })
    }

    /// Write the whole store through the persistence gateway.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`](doorkeeper_core::Error::Persistence)
    /// on failure; the in-memory store stays dirty.
    pub async fn save_store(&mut self) -> Result<()> {
        self.store.save_to(&mut self.persistence).await?;
        Ok(())
    }
}
