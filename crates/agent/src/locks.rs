//! Per-user exclusive sections.

use std::collections::HashMap;
use std::sync::Arc;

use kabot_core::message::UserKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per [`UserKey`]. Different keys never contend.
#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<UserKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn acquire(&self, key: &UserKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            // Forget keys nobody holds or waits on
            slots.retain(|k, m| k == key || Arc::strong_count(m) > 1);
            slots.entry(key.clone()).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub async fn tracked(&self) -> usize {
        self.slots.lock().await.len()
    }
}
