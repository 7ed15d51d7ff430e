//! The per-`(saved_search_id, snapshot_type)` worker lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::saved_search::SnapshotType;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LockKey {
    pub saved_search_id: String,
    pub snapshot_type: SnapshotType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerLock {
    pub worker_id: String,
    pub acquired_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl WorkerLock {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.acquired_at);
        age.num_seconds() >= self.ttl_seconds as i64
    }
}
