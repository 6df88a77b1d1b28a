//! In-memory token store.
//!
//! Thread-safe storage suitable for development, testing, and single-process
//! deployments that can afford to lose tokens on restart.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

use follower_core::error::Result;
use follower_core::traits::TokenStore;
use follower_core::types::UserRecord;

/// In-memory [`TokenStore`].
///
/// Last writer wins per username; no cross-key locking.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    records: DashMap<String, UserRecord>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Returns the number of stored users.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no user is stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns all records (for export/backup).
    pub fn all_records(&self) -> Vec<UserRecord> {
        self.records
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Imports records, replacing existing ones with the same username.
    pub fn import(&self, records: Vec<UserRecord>) -> usize {
        let count = records.len();
        for record in records {
            self.records.insert(record.username.clone(), record);
        }
        count
    }

    pub(crate) fn insert(&self, record: UserRecord) {
        self.records.insert(record.username.clone(), record);
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    #[instrument(skip(self))]
    async fn load(&self, username: &str) -> Result<Option<UserRecord>> {
        let record = self.records.get(username).map(|r| r.value().clone());
        debug!(found = record.is_some(), "Loaded user record");
        Ok(record)
    }

    #[instrument(skip(self, record), fields(username = %record.username))]
    async fn save(&self, record: &UserRecord) -> Result<()> {
        self.insert(record.clone());
        debug!("Saved user record");
        Ok(())
    }
}
