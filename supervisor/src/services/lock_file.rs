//! File-backed lock store
//!
//! The PID is written to a temporary file next to the lock and then linked
//! into place without clobbering, so the lock appears with its full contents
//! or not at all. A concurrent reader never sees a half-written PID.

use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::LockStore;

/// Lock store keeping the PID in a plain text file
#[derive(Debug, Clone)]
pub struct FileLockStore {
    path: PathBuf,
}

impl FileLockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn write_exclusive(path: &Path, contents: &str) -> SupervisorResult<bool> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| SupervisorError::lock("create directory", dir, e))?;

    let mut staged = tempfile::Builder::new()
        .prefix(".lock-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| SupervisorError::lock("stage", path, e))?;
    staged
        .write_all(contents.as_bytes())
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| SupervisorError::lock("write", path, e))?;

    match staged.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(SupervisorError::lock("create", path, e.error)),
    }
}

#[async_trait]
impl LockStore for FileLockStore {
    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    async fn read(&self) -> SupervisorResult<Option<String>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SupervisorError::lock("read", &self.path, e)),
        }
    }

    async fn create_exclusive(&self, contents: &str) -> SupervisorResult<bool> {
        let path = self.path.clone();
        let contents = contents.to_string();
        tokio::task::spawn_blocking(move || write_exclusive(&path, &contents))
            .await
            .map_err(|e| SupervisorError::lock("create", &self.path, std::io::Error::new(ErrorKind::Other, e)))?
    }

    async fn remove(&self) -> SupervisorResult<bool> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SupervisorError::lock("remove", &self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileLockStore {
        FileLockStore::new(dir.path().join("lock.pid"))
    }

    #[tokio::test]
    async fn test_read_missing_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.create_exclusive("4242").await.unwrap());
        assert_eq!(store.read().await.unwrap().as_deref(), Some("4242"));
        assert_eq!(std::fs::read_to_string(dir.path().join("lock.pid")).unwrap(), "4242");
    }

    #[tokio::test]
    async fn test_create_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.create_exclusive("1111").await.unwrap());
        assert!(!store.create_exclusive("2222").await.unwrap());
        assert_eq!(store.read().await.unwrap().as_deref(), Some("1111"));
    }

    #[tokio::test]
    async fn test_create_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.create_exclusive("1111").await.unwrap();
        store.create_exclusive("2222").await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("lock.pid")]);
    }

    #[tokio::test]
    async fn test_create_makes_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLockStore::new(dir.path().join("run").join("server").join("lock.pid"));
        assert!(store.create_exclusive("4242").await.unwrap());
        assert_eq!(store.read().await.unwrap().as_deref(), Some("4242"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.create_exclusive("4242").await.unwrap();
        assert!(store.remove().await.unwrap());
        assert!(!store.remove().await.unwrap());
        assert_eq!(store.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_creates_have_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(store_in(&dir));

        let mut tasks = Vec::new();
        for pid in 1..=8u32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move { store.create_exclusive(&pid.to_string()).await.unwrap() }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
