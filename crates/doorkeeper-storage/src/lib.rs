//! Credential storage for the doorkeeper access controller.
//!
//! Two layers live here:
//!
//! - [`CredentialStore`] - the in-memory UID → key table consulted on every
//!   tap. It is owned by the control loop and never locked.
//! - [`CredentialPersistence`] - the gateway that durably saves and loads
//!   the table. [`JsonFilePersistence`] writes a JSON array of
//!   `{uid, key}` hex records; [`MemoryPersistence`] keeps the same encoding
//!   in memory for tests and allows failure injection.
//!
//! # Loading
//!
//! [`CredentialStore::load_from`] treats unreadable or malformed data as an
//! empty store and immediately re-saves it, so a corrupt file never blocks
//! boot.
//!
//! ```no_run
//! use doorkeeper_storage::{CredentialStore, JsonFilePersistence};
//!
//! # async fn example() -> doorkeeper_storage::StorageResult<()> {
//! let mut persistence = JsonFilePersistence::new("/var/lib/doorkeeper/cards.json");
//! let store = CredentialStore::load_from(&mut persistence).await?;
//! println!("{} credentials loaded", store.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod persistence;
pub mod record;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use persistence::{
    AnyPersistence, CredentialPersistence, JsonFilePersistence, MemoryPersistence,
    MemoryPersistenceHandle,
};
pub use record::CredentialRecord;
pub use store::CredentialStore;
