/// Cross-process locking for flow-store files
use crate::error::Result;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Manager for advisory file locks guarding a flow store.
///
/// A file-backed flow store may be shared between the process that starts
/// an authorization attempt and the one that receives the redirect. The
/// lock serializes load-modify-save cycles so concurrent writers cannot
/// tear the store file.
#[derive(Debug, Clone)]
pub struct StoreLockManager {
    lock_dir: PathBuf,
}

impl StoreLockManager {
    /// Create a lock manager keeping its lock files under `lock_dir`
    pub fn new(lock_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&lock_dir)?;
        Ok(Self { lock_dir })
    }

    /// Create a lock manager for a store rooted at `store_dir`.
    ///
    /// Lock files live in a `.locks` subdirectory next to the store data.
    pub fn for_store(store_dir: &Path) -> Result<Self> {
        Self::new(store_dir.join(".locks"))
    }

    /// Acquire an exclusive lock for `key`, blocking until available.
    ///
    /// The lock is released when the returned guard is dropped.
    pub fn acquire(&self, key: &str) -> Result<StoreLock> {
        let file = self.open_lock_file(key)?;
        file.lock_exclusive()?;
        Ok(StoreLock {
            file: Some(file),
            path: self.lock_path(key),
        })
    }

    /// Try to acquire an exclusive lock for `key` without blocking.
    ///
    /// Returns `None` if another process holds the lock.
    pub fn try_acquire(&self, key: &str) -> Result<Option<StoreLock>> {
        let file = self.open_lock_file(key)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(StoreLock {
                file: Some(file),
                path: self.lock_path(key),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn open_lock_file(&self, key: &str) -> Result<File> {
        let lock_path = self.lock_path(key);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?)
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        // Sanitize the key for use in a filename
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.lock_dir.join(format!("{}.lock", safe_key))
    }
}

/// RAII guard for a store lock
///
/// The lock is released when this guard is dropped.
pub struct StoreLock {
    file: Option<File>,
    path: PathBuf,
}

impl StoreLock {
    /// Get the path to the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
        // Removing the lock file is best effort
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_acquire_and_release() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = StoreLockManager::new(temp_dir.path().to_path_buf()).unwrap();

        let lock = manager.acquire("flows").unwrap();
        assert!(lock.path().exists());
        drop(lock);

        // Reacquire after release
        let lock2 = manager.acquire("flows").unwrap();
        drop(lock2);
    }

    #[test]
    fn test_try_acquire_contention() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = StoreLockManager::new(temp_dir.path().to_path_buf()).unwrap();

        let lock1 = manager.try_acquire("flows").unwrap();
        assert!(lock1.is_some());

        let lock2 = manager.try_acquire("flows").unwrap();
        assert!(lock2.is_none());

        drop(lock1);

        let lock3 = manager.try_acquire("flows").unwrap();
        assert!(lock3.is_some());
    }

    #[test]
    fn test_blocking_acquire_serializes_threads() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(StoreLockManager::new(temp_dir.path().to_path_buf()).unwrap());

        let manager1 = manager.clone();
        let handle1 = thread::spawn(move || {
            let _lock = manager1.acquire("shared").unwrap();
            thread::sleep(Duration::from_millis(200));
        });

        // Give the first thread time to grab the lock
        thread::sleep(Duration::from_millis(50));

        let manager2 = manager.clone();
        let handle2 = thread::spawn(move || {
            // Blocks until the first thread releases
            let _lock = manager2.acquire("shared").unwrap();
        });

        handle1.join().unwrap();
        handle2.join().unwrap();
    }

    #[test]
    fn test_key_sanitization() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = StoreLockManager::new(temp_dir.path().to_path_buf()).unwrap();

        let lock = manager.acquire("flows:per/app").unwrap();
        assert!(lock
            .path()
            .to_str()
            .unwrap()
            .contains("flows_per_app.lock"));
    }
}
