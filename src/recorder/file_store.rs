//! File-backed user store: one pretty JSON document per user under `dir`.
//!
//! Read-modify-write for a user runs under that user's async lock; the write
//! goes to a temp file and is renamed into place, so readers never see a
//! half-written document. Lock entries are dropped once no writer holds them.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::fs;

use super::{AttemptRecord, UserPatch, UserState, UserStore};
use crate::error::StoreError;

#[derive(Debug)]
pub struct FileUserStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileUserStore {
    /// Create the store, creating `dir` if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_for(&self, user_id: &str) -> Result<Arc<tokio::sync::Mutex<()>>, StoreError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| StoreError::Persistence("lock table poisoned".into()))?;
        Ok(locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    /// Drop the user's lock entry once no task holds or waits on it.
    fn release(&self, user_id: &str) {
        if let Ok(mut locks) = self.locks.lock() {
            if locks.get(user_id).is_some_and(|l| Arc::strong_count(l) == 1) {
                locks.remove(user_id);
            }
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or_default()
    }

    async fn write_locked(
        &self,
        user_id: &str,
        patch: UserPatch,
        append_attempt: AttemptRecord,
    ) -> Result<UserState, StoreError> {
        let path = self.path_for(user_id);
        let current = self.read(&path).await?;
        let next = patch.apply(user_id, current, append_attempt);

        let json = serde_json::to_vec_pretty(&next)
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;
        Ok(next)
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(user_id)))
    }

    async fn read(&self, path: &Path) -> Result<Option<UserState>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Persistence(format!("corrupt user document: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl UserStore for FileUserStore {
    async fn upsert_user_state(
        &self,
        user_id: &str,
        patch: UserPatch,
        append_attempt: AttemptRecord,
    ) -> Result<UserState, StoreError> {
        let lock = self.lock_for(user_id)?;
        let result = {
            let _guard = lock.lock().await;
            self.write_locked(user_id, patch, append_attempt).await
        };
        drop(lock);
        self.release(user_id);
        result
    }

    async fn get_user_state(&self, user_id: &str) -> Result<UserState, StoreError> {
        self.read(&self.path_for(user_id))
            .await?
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }
}

/// Filesystem-safe, injective file stem for a user id.
fn file_stem(user_id: &str) -> String {
    let mut out = String::with_capacity(user_id.len());
    for b in user_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02x}");
        }
    }
    if out.is_empty() {
        out.push_str("%empty");
    }
    out
}
