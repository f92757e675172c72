// src/recorder/store.rs
use std::collections::HashMap;
use std::sync::Mutex;

use super::{AttemptRecord, UserPatch, UserState};
use crate::error::StoreError;

/// User/attempt persistence boundary.
///
/// `upsert_user_state` must apply the patch and the append as one operation
/// per user: two concurrent calls for the same user both end up in `attempts`.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert_user_state(
        &self,
        user_id: &str,
        patch: UserPatch,
        append_attempt: AttemptRecord,
    ) -> Result<UserState, StoreError>;

    async fn get_user_state(&self, user_id: &str) -> Result<UserState, StoreError>;
}

/// Process-local store. One lock around the map serializes every upsert.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    inner: Mutex<HashMap<String, UserState>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn upsert_user_state(
        &self,
        user_id: &str,
        patch: UserPatch,
        append_attempt: AttemptRecord,
    ) -> Result<UserState, StoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| StoreError::Persistence("user store lock poisoned".into()))?;
        let current = map.remove(user_id);
        let next = patch.apply(user_id, current, append_attempt);
        map.insert(user_id.to_string(), next.clone());
        Ok(next)
    }

    async fn get_user_state(&self, user_id: &str) -> Result<UserState, StoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| StoreError::Persistence("user store lock poisoned".into()))?;
        map.get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }
}
