//! Per-session turn serialization.
//!
//! `SessionLocks` hands out one async mutex per session id. A relay turn
//! holds its session's lock from history load through commit, so two turns
//! on the same session never interleave their appends. Different sessions
//! never contend.
//!
//! The `DashMap` entry guard is dropped before awaiting the mutex so no
//! shard lock is held across an await point.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Guard proving exclusive access to one session's message log.
pub type SessionGuard = OwnedMutexGuard<()>;

#[derive(Debug, Clone, Default)]
pub struct SessionLocks {
    inner: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: Uuid) -> SessionGuard {
        let lock = {
            let entry = self.inner.entry(session_id).or_default();
            Arc::clone(entry.value())
        };
        lock.lock_owned().await
    }

    /// Drop the lock entry of a deleted session.
    ///
    /// Holders of an existing guard are unaffected.
    pub fn forget(&self, session_id: &Uuid) {
        self.inner.remove(session_id);
    }

    /// Number of sessions with a lock entry.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
