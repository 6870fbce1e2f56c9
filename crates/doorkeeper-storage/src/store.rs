use doorkeeper_core::{CardKey, Uid};
use tracing::{debug, error, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::persistence::CredentialPersistence;
use crate::record::CredentialRecord;

/// In-memory table of enrolled credentials.
///
/// UIDs are unique. The store tracks whether it holds changes that have not
/// been written through a [`CredentialPersistence`] yet.
///
/// # Examples
///
/// ```
/// use doorkeeper_core::CardKey;
/// use doorkeeper_storage::{CredentialRecord, CredentialStore};
///
/// let mut store = CredentialStore::new();
/// let uid = "04A1B2C3".parse().unwrap();
/// let key = CardKey::new([1, 2, 3, 4, 5, 6]);
///
/// store.insert(CredentialRecord::new(uid, key)).unwrap();
/// assert!(store.is_dirty());
/// assert_eq!(store.find_key(&"04A1B2C3".parse().unwrap()), Some(key));
/// ```
#[derive(Debug, Default, Clone)]
pub struct CredentialStore {
    records: Vec<CredentialRecord>,
    dirty: bool,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from loaded records, dropping repeated UIDs.
    ///
    /// The first record for a UID wins; dropping any marks the store dirty.
    pub fn from_records(records: Vec<CredentialRecord>) -> Self {
        let mut store = Self::new();
        let mut dropped = false;
        for record in records {
            let uid = record.uid.clone();
            if store.insert(record).is_err() {
                warn!(%uid, "Dropping duplicate credential record");
                dropped = true;
            }
        }
        store.dirty = dropped;
        store
    }

    /// Load the store through a persistence gateway.
    ///
    /// Corrupt data yields an empty store that is saved back immediately, as
    /// does data that carried duplicate UIDs once they are dropped.
    ///
    /// # Errors
    ///
    /// Returns I/O errors other than corruption unchanged.
    pub async fn load_from<P: CredentialPersistence>(persistence: &mut P) -> StorageResult<Self> {
        match persistence.load().await {
            Ok(records) => {
                let mut store = Self::from_records(records);
                info!(
                    count = store.len(),
                    source = %persistence.describe(),
                    "Loaded credential store"
                );
                if store.is_dirty() {
                    if let Err(e) = store.save_to(persistence).await {
                        error!(error = %e, "Failed to rewrite de-duplicated credential store");
                    }
                }
                Ok(store)
            }
            Err(StorageError::Corrupt(reason)) => {
                warn!(%reason, source = %persistence.describe(), "Credential data corrupt, resetting to empty");
                let mut store = Self::new();
                store.dirty = true;
                if let Err(e) = store.save_to(persistence).await {
                    error!(error = %e, "Failed to rewrite empty credential store");
                }
                Ok(store)
            }
            Err(e) => Err(e),
        }
    }

    /// Write every record through the gateway and mark the store clean.
    ///
    /// # Errors
    ///
    /// On failure the store stays dirty so the next save rewrites it.
    pub async fn save_to<P: CredentialPersistence>(&mut self, persistence: &mut P) -> StorageResult<()> {
        persistence.save(&self.records).await?;
        self.dirty = false;
        debug!(count = self.records.len(), "Credential store saved");
        Ok(())
    }

    /// Add a record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Duplicate`] if the UID is already stored.
    pub fn insert(&mut self, record: CredentialRecord) -> StorageResult<()> {
        if self.contains(&record.uid) {
            return Err(StorageError::Duplicate {
                uid: record.uid.to_string(),
            });
        }
        self.records.push(record);
        self.dirty = true;
        Ok(())
    }

    /// Remove and return the record for `uid`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no record matches.
    pub fn remove(&mut self, uid: &Uid) -> StorageResult<CredentialRecord> {
        let index = self
            .records
            .iter()
            .position(|record| &record.uid == uid)
            .ok_or_else(|| StorageError::NotFound {
                uid: uid.to_string(),
            })?;
        self.dirty = true;
        Ok(self.records.remove(index))
    }

    pub fn get(&self, uid: &Uid) -> Option<&CredentialRecord> {
        self.records.iter().find(|record| &record.uid == uid)
    }

    /// Stored Key A for `uid`.
    pub fn find_key(&self, uid: &Uid) -> Option<CardKey> {
        self.get(uid).map(|record| record.key)
    }

    pub fn contains(&self, uid: &Uid) -> bool {
        self.get(uid).is_some()
    }

    pub fn records(&self) -> &[CredentialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the store holds changes not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryPersistence;

    fn uid(s: &str) -> Uid {
        s.parse().unwrap()
    }

    fn record(s: &str, seed: u8) -> CredentialRecord {
        CredentialRecord::without_timestamp(uid(s), CardKey::new([seed; 6]))
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let mut store = CredentialStore::new();
        store.insert(record("04A1B2C3", 1)).unwrap();
        let result = store.insert(record("04A1B2C3", 2));
        assert!(matches!(result, Err(StorageError::Duplicate { .. })));
        assert_eq!(store.len(), 1);
        assert_eq!(store.find_key(&uid("04A1B2C3")), Some(CardKey::new([1; 6])));
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let mut store = CredentialStore::new();
        assert!(matches!(
            store.remove(&uid("04A1B2C3")),
            Err(StorageError::NotFound { .. })
        ));
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_remove_returns_record() {
        let mut store = CredentialStore::new();
        store.insert(record("04A1B2C3", 1)).unwrap();
        store.insert(record("04D4E5F6", 2)).unwrap();
        let removed = store.remove(&uid("04A1B2C3")).unwrap();
        assert_eq!(removed.uid, uid("04A1B2C3"));
        assert!(!store.contains(&uid("04A1B2C3")));
        assert!(store.contains(&uid("04D4E5F6")));
    }

    #[test]
    fn test_from_records_keeps_first_duplicate() {
        let store = CredentialStore::from_records(vec![
            record("04A1B2C3", 1),
            record("04A1B2C3", 2),
            record("04D4E5F6", 3),
        ]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.find_key(&uid("04A1B2C3")), Some(CardKey::new([1; 6])));
    }

    #[tokio::test]
    async fn test_load_rewrites_deduplicated_records() {
        let (mut persistence, handle) = MemoryPersistence::new();
        persistence
            .save(&[record("04A1B2C3", 1), record("04A1B2C3", 2), record("04D4E5F6", 3)])
            .await
            .unwrap();
        assert_eq!(handle.save_count(), 1);

        let store = CredentialStore::load_from(&mut persistence).await.unwrap();
        assert!(!store.is_dirty());
        assert_eq!(handle.save_count(), 2);
        let saved = handle.saved_records().unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].key, CardKey::new([1; 6]));
    }

    #[tokio::test]
    async fn test_clean_load_does_not_save() {
        let (mut persistence, handle) = MemoryPersistence::new();
        persistence.save(&[record("04A1B2C3", 1)]).await.unwrap();

        let store = CredentialStore::load_from(&mut persistence).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(handle.save_count(), 1);
    }

    #[tokio::test]
    async fn test_deduplicated_load_survives_save_failure() {
        let (mut persistence, handle) = MemoryPersistence::new();
        persistence
            .save(&[record("04A1B2C3", 1), record("04A1B2C3", 2)])
            .await
            .unwrap();
        handle.set_save_failure(true);

        let store = CredentialStore::load_from(&mut persistence).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.is_dirty());
    }

    #[tokio::test]
    async fn test_save_marks_clean() {
        let (mut persistence, handle) = MemoryPersistence::new();
        let mut store = CredentialStore::new();
        store.insert(record("04A1B2C3", 1)).unwrap();
        assert!(store.is_dirty());

        store.save_to(&mut persistence).await.unwrap();
        assert!(!store.is_dirty());
        assert_eq!(handle.saved_records().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_stays_dirty() {
        let (mut persistence, handle) = MemoryPersistence::new();
        handle.set_save_failure(true);
        let mut store = CredentialStore::new();
        store.insert(record("04A1B2C3", 1)).unwrap();

        assert!(store.save_to(&mut persistence).await.is_err());
        assert!(store.is_dirty());
    }
}
