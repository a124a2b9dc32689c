/// Ephemeral verifier handoff with pluggable flow stores
use crate::error::{PkceError, Result};
use crate::lock::StoreLockManager;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default lifetime of a stored flow record, in seconds.
///
/// An authorization attempt that has not come back through the redirect
/// within this window is treated as abandoned.
pub const DEFAULT_FLOW_TTL_SECS: u64 = 600;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Flow record stored across the redirect boundary
///
/// Holds the code verifier keyed by the `state` parameter for the lifetime
/// of one authorization attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRecord {
    pub state: String,
    pub code_verifier: String,
    pub created_at: u64,
    pub expires_at: u64,
}

impl FlowRecord {
    /// Create a record with the default TTL
    pub fn new(state: String, code_verifier: String) -> Self {
        Self::with_ttl(state, code_verifier, DEFAULT_FLOW_TTL_SECS)
    }

    /// Create a record with a custom TTL in seconds
    pub fn with_ttl(state: String, code_verifier: String, ttl_secs: u64) -> Self {
        let created_at = unix_now();
        Self {
            state,
            code_verifier,
            created_at,
            expires_at: created_at + ttl_secs,
        }
    }

    /// Check whether the record has outlived its TTL
    pub fn is_expired(&self) -> bool {
        unix_now() >= self.expires_at
    }
}

/// Storage interface for in-flight flow records
///
/// Any key-value store with session-lifetime semantics satisfies the
/// handoff requirement; records are single-writer, single-reader within
/// one authorization attempt.
pub trait FlowStore: Send + Sync {
    /// Save a record, keyed by its `state`
    fn save(&self, record: FlowRecord) -> Result<()>;

    /// Remove and return the record for `state`.
    ///
    /// The verifier is consumed exactly once: a second `take` for the same
    /// state returns `None`. Expired records also read as `None`.
    fn take(&self, state: &str) -> Result<Option<FlowRecord>>;

    /// Delete a record without reading it
    fn delete(&self, state: &str) -> Result<()>;

    /// Drop all expired records, returning how many were removed
    fn purge_expired(&self) -> Result<usize>;
}

/// In-memory flow store
///
/// Thread-safe map keyed by `state`. Suitable for single-process flows
/// and tests; contents vanish with the process, which matches the
/// session-scoped lifetime of the verifier.
#[derive(Debug, Default)]
pub struct MemoryFlowStore {
    flows: RwLock<HashMap<String, FlowRecord>>,
}

impl MemoryFlowStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlowStore for MemoryFlowStore {
    fn save(&self, record: FlowRecord) -> Result<()> {
        let mut flows = self.flows.write();
        flows.insert(record.state.clone(), record);
        Ok(())
    }

    fn take(&self, state: &str) -> Result<Option<FlowRecord>> {
        let mut flows = self.flows.write();
        Ok(flows.remove(state).filter(|r| !r.is_expired()))
    }

    fn delete(&self, state: &str) -> Result<()> {
        let mut flows = self.flows.write();
        flows.remove(state);
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize> {
        let mut flows = self.flows.write();
        let before = flows.len();
        flows.retain(|_, r| !r.is_expired());
        Ok(before - flows.len())
    }
}

/// File-based flow store using XDG conventions
///
/// Persists records as JSON so the process receiving the redirect need not
/// be the one that started the flow. Every load-modify-save cycle runs
/// under an advisory file lock.
#[derive(Debug, Clone)]
pub struct FileFlowStore {
    base_path: PathBuf,
    locks: StoreLockManager,
}

impl FileFlowStore {
    /// Create a store under the XDG data directory for `app_name`.
    ///
    /// Checks `$XDG_DATA_HOME` first, then falls back to the platform data
    /// directory. Records land in `<data_dir>/<app_name>/flows.json`.
    pub fn new(app_name: &str) -> Result<Self> {
        let base_dir = if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
            PathBuf::from(xdg_data)
        } else {
            dirs::data_dir()
                .ok_or_else(|| PkceError::StorageError("could not determine data directory".into()))?
        };
        Self::with_path(base_dir.join(app_name))
    }

    /// Create a store rooted at a custom path
    pub fn with_path(path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&path)?;
        let locks = StoreLockManager::for_store(&path)?;
        Ok(Self {
            base_path: path,
            locks,
        })
    }

    fn flows_path(&self) -> PathBuf {
        self.base_path.join("flows.json")
    }

    fn load(&self) -> Result<HashMap<String, FlowRecord>> {
        let path = self.flows_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn persist(&self, flows: &HashMap<String, FlowRecord>) -> Result<()> {
        let content = serde_json::to_string_pretty(flows)?;
        fs::write(self.flows_path(), content)?;
        Ok(())
    }
}

impl FlowStore for FileFlowStore {
    fn save(&self, record: FlowRecord) -> Result<()> {
        let _guard = self.locks.acquire("flows")?;
        let mut flows = self.load()?;
        flows.insert(record.state.clone(), record);
        self.persist(&flows)
    }

    fn take(&self, state: &str) -> Result<Option<FlowRecord>> {
        let _guard = self.locks.acquire("flows")?;
        let mut flows = self.load()?;
        let record = flows.remove(state);
        if record.is_some() {
            self.persist(&flows)?;
        }
        Ok(record.filter(|r| !r.is_expired()))
    }

    fn delete(&self, state: &str) -> Result<()> {
        let _guard = self.locks.acquire("flows")?;
        let mut flows = self.load()?;
        if flows.remove(state).is_some() {
            self.persist(&flows)?;
        }
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize> {
        let _guard = self.locks.acquire("flows")?;
        let mut flows = self.load()?;
        let before = flows.len();
        flows.retain(|_, r| !r.is_expired());
        let removed = before - flows.len();
        if removed > 0 {
            self.persist(&flows)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_take_consumes_once() {
        let store = MemoryFlowStore::new();
        let record = FlowRecord::new("state-1".into(), "verifier-1".into());
        store.save(record).unwrap();

        let taken = store.take("state-1").unwrap();
        assert_eq!(taken.unwrap().code_verifier, "verifier-1");

        // Second take finds nothing
        assert!(store.take("state-1").unwrap().is_none());
    }

    #[test]
    fn test_memory_store_unknown_state() {
        let store = MemoryFlowStore::new();
        assert!(store.take("missing").unwrap().is_none());
    }

    #[test]
    fn test_expired_record_reads_as_absent() {
        let store = MemoryFlowStore::new();
        let record = FlowRecord::with_ttl("state-2".into(), "verifier-2".into(), 0);
        assert!(record.is_expired());
        store.save(record).unwrap();

        assert!(store.take("state-2").unwrap().is_none());
    }

    #[test]
    fn test_purge_expired() {
        let store = MemoryFlowStore::new();
        store
            .save(FlowRecord::with_ttl("old".into(), "v1".into(), 0))
            .unwrap();
        store
            .save(FlowRecord::new("fresh".into(), "v2".into()))
            .unwrap();

        assert_eq!(store.purge_expired().unwrap(), 1);
        assert!(store.take("fresh").unwrap().is_some());
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileFlowStore::with_path(temp_dir.path().to_path_buf()).unwrap();

        let record = FlowRecord::new("state-3".into(), "verifier-3".into());
        store.save(record).unwrap();
        assert!(temp_dir.path().join("flows.json").exists());

        let taken = store.take("state-3").unwrap().unwrap();
        assert_eq!(taken.state, "state-3");
        assert_eq!(taken.code_verifier, "verifier-3");

        assert!(store.take("state-3").unwrap().is_none());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        {
            let store = FileFlowStore::with_path(temp_dir.path().to_path_buf()).unwrap();
            store
                .save(FlowRecord::new("state-4".into(), "verifier-4".into()))
                .unwrap();
        }

        // A second store over the same path sees the record, as a second
        // process would after the redirect
        let reopened = FileFlowStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let taken = reopened.take("state-4").unwrap().unwrap();
        assert_eq!(taken.code_verifier, "verifier-4");
    }

    #[test]
    fn test_file_store_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileFlowStore::with_path(temp_dir.path().to_path_buf()).unwrap();

        store
            .save(FlowRecord::new("state-5".into(), "verifier-5".into()))
            .unwrap();
        store.delete("state-5").unwrap();
        assert!(store.take("state-5").unwrap().is_none());
    }

    #[test]
    fn test_file_store_purge_expired() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileFlowStore::with_path(temp_dir.path().to_path_buf()).unwrap();

        store
            .save(FlowRecord::with_ttl("stale".into(), "v".into(), 0))
            .unwrap();
        store
            .save(FlowRecord::new("live".into(), "v".into()))
            .unwrap();

        assert_eq!(store.purge_expired().unwrap(), 1);
        assert!(store.take("live").unwrap().is_some());
    }
}
