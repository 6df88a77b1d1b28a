//! File-backed token store.
//!
//! Every save rewrites the whole file through a temp file and a rename, so a
//! reader (or a restart) sees either the previous or the new set of records.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use follower_core::error::{FollowerError, Result};
use follower_core::traits::TokenStore;
use follower_core::types::UserRecord;

use crate::MemoryTokenStore;

/// File-backed [`TokenStore`].
///
/// Reads are served from memory. Writes are persisted before they become
/// visible, so a failed save leaves both the file and memory unchanged.
///
/// # File Format
///
/// ```text
/// magic (4 bytes): "FLWR"
/// version (1 byte): 1
/// count (8 bytes): number of records, little endian
/// records (variable): JSON array of user records
/// ```
pub struct FileTokenStore {
    /// Path to the storage file
    path: PathBuf,
    /// In-memory view of the file
    memory: MemoryTokenStore,
    /// Serializes writers so snapshots are not interleaved
    write_lock: Mutex<()>,
}

/// File format magic bytes
const MAGIC: &[u8; 4] = b"FLWR";
/// Current file format version
const VERSION: u8 = 1;
/// Magic + version + count
const HEADER_LEN: usize = 13;

impl FileTokenStore {
    /// Opens the store at `path`, loading it if the file exists.
    ///
    /// The file is created on first save.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            memory: MemoryTokenStore::new(),
            write_lock: Mutex::new(()),
        };

        if fs::try_exists(&store.path)
            .await
            .map_err(|e| FollowerError::storage(format!("Failed to stat user store: {e}")))?
        {
            store.load_file().await?;
        }

        Ok(store)
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load_file(&self) -> Result<()> {
        let contents = fs::read(&self.path)
            .await
            .map_err(|e| FollowerError::storage(format!("Failed to read user store: {e}")))?;

        let records = decode(&contents)?;
        info!(count = records.len(), "Loaded user records from file");
        self.memory.import(records);
        Ok(())
    }

    async fn write_file(&self, records: &[UserRecord]) -> Result<()> {
        let contents = encode(records)?;

        let temp_path = self.path.with_extension("tmp");
        let write = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&contents).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &self.path).await
        };
        if let Err(e) = write.await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = ?temp_path, error = %cleanup, "Failed to remove temp file");
                }
            }
            return Err(FollowerError::storage(format!("Failed to write user store: {e}")));
        }

        debug!(count = records.len(), "User store written");
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of stored users.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if no user is stored.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}

fn encode(records: &[UserRecord]) -> Result<Vec<u8>> {
    let serialized = serde_json::to_vec(records)
        .map_err(|e| FollowerError::storage(format!("Failed to encode user records: {e}")))?;

    let mut contents = Vec::with_capacity(HEADER_LEN + serialized.len());
    contents.extend_from_slice(MAGIC);
    contents.push(VERSION);
    contents.extend_from_slice(&(records.len() as u64).to_le_bytes());
    contents.extend_from_slice(&serialized);
    Ok(contents)
}

fn decode(contents: &[u8]) -> Result<Vec<UserRecord>> {
    if contents.len() < HEADER_LEN {
        return Err(FollowerError::storage("User store file too short"));
    }
    if &contents[0..4] != MAGIC {
        return Err(FollowerError::storage("User store has invalid magic bytes"));
    }
    if contents[4] != VERSION {
        return Err(FollowerError::storage(format!(
            "User store version mismatch: expected {VERSION}, got {}",
            contents[4]
        )));
    }

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&contents[5..HEADER_LEN]);
    let count = u64::from_le_bytes(count_bytes);

    let records: Vec<UserRecord> = serde_json::from_slice(&contents[HEADER_LEN..])
        .map_err(|e| FollowerError::storage(format!("Corrupt user store: {e}")))?;

    if records.len() as u64 != count {
        return Err(FollowerError::storage(format!(
            "User store count mismatch: header says {count}, found {}",
            records.len()
        )));
    }
    Ok(records)
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self, username: &str) -> Result<Option<UserRecord>> {
        self.memory.load(username).await
    }

    #[instrument(skip(self, record), fields(username = %record.username))]
    async fn save(&self, record: &UserRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut snapshot: Vec<UserRecord> = self
            .memory
            .all_records()
            .into_iter()
            .filter(|r| r.username != record.username)
            .collect();
        snapshot.push(record.clone());
        snapshot.sort_by(|a, b| a.username.cmp(&b.username));

        self.write_file(&snapshot).await?;
        self.memory.insert(record.clone());
        Ok(())
    }
}
