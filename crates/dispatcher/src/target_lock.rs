//! Per-target mutual exclusion.
//!
//! A pane has no request framing, so two jobs typed into it at once would
//! interleave. Each target gets one async mutex, held from the first inject
//! through the capture.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct TargetLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `target`. Released when the guard drops.
    pub async fn acquire(&self, target: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .entry(target.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}
