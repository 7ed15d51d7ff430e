use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use notice_types::{LockKey, NotificationEvent, WorkerLock};

use crate::NotificationEventStore;

/// `Mutex`-guarded in-memory store. The default for
/// `notice-producer`'s and `notice-dispatcher`'s own test suites, and
/// for embedders who supply their own durable store and just need
/// something to exercise the trait contract against.
#[derive(Default)]
pub struct InMemoryEventStore {
    locks: Mutex<HashMap<LockKey, WorkerLock>>,
    events: Mutex<HashMap<LockKey, Vec<NotificationEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationEventStore for InMemoryEventStore {
    fn try_acquire_lock(
        &self,
        key: &LockKey,
        worker_id: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut locks = self.locks.lock().expect("lock table poisoned");
        if let Some(existing) = locks.get(key)
            && !existing.is_expired(now)
        {
            return Ok(false);
        }
        locks.insert(
            key.clone(),
            WorkerLock {
                worker_id: worker_id.to_string(),
                acquired_at: now,
                ttl_seconds: ttl.as_secs(),
            },
        );
        Ok(true)
    }

    fn release_lock(&self, key: &LockKey, worker_id: &str) {
        let mut locks = self.locks.lock().expect("lock table poisoned");
        if let Some(existing) = locks.get(key)
            && existing.worker_id == worker_id
        {
            locks.remove(key);
        }
    }

    fn get_latest_event(&self, key: &LockKey) -> anyhow::Result<Option<NotificationEvent>> {
        let events = self.events.lock().expect("event table poisoned");
        Ok(events.get(key).and_then(|rows| latest(rows)))
    }

    fn publish_event(&self, key: &LockKey, event: NotificationEvent) -> anyhow::Result<String> {
        let mut events = self.events.lock().expect("event table poisoned");
        let rows = events.entry(key.clone()).or_default();
        if let Some(existing) = rows.iter().find(|r| r.event_id == event.event_id) {
            return Ok(existing.event_id.clone());
        }
        let id = event.event_id.clone();
        rows.push(event);
        Ok(id)
    }

    fn compensate_event(&self, key: &LockKey, event_id: &str) -> anyhow::Result<()> {
        let mut events = self.events.lock().expect("event table poisoned");
        if let Some(rows) = events.get_mut(key) {
            rows.retain(|r| r.event_id != event_id);
        }
        Ok(())
    }
}

fn latest(rows: &[NotificationEvent]) -> Option<NotificationEvent> {
    rows.iter()
        .max_by(|a, b| {
            a.generated_at
                .cmp(&b.generated_at)
                .then_with(|| a.event_id.cmp(&b.event_id))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use notice_types::{EventSummary, SnapshotType, SummaryCategories};

    use super::*;

    fn key() -> LockKey {
        LockKey {
            saved_search_id: "search-1".to_string(),
            snapshot_type: SnapshotType::Weekly,
        }
    }

    fn event(id: &str, generated_at: DateTime<Utc>) -> NotificationEvent {
        NotificationEvent {
            event_id: id.to_string(),
            saved_search_id: "search-1".to_string(),
            snapshot_type: SnapshotType::Weekly,
            generated_at,
            state_blob_path: "/blobs/state".to_string(),
            diff_blob_path: "/blobs/diff".to_string(),
            summary: EventSummary {
                schema_version: "v1".to_string(),
                text: "no changes".to_string(),
                categories: SummaryCategories::default(),
                truncated: false,
                highlights: Vec::new(),
            },
        }
    }

    #[test]
    fn second_acquire_fails_while_unexpired() {
        let store = InMemoryEventStore::new();
        let now = Utc::now();
        assert!(store
            .try_acquire_lock(&key(), "worker-a", Duration::from_secs(60), now)
            .unwrap());
        assert!(!store
            .try_acquire_lock(&key(), "worker-b", Duration::from_secs(60), now)
            .unwrap());
    }

    #[test]
    fn expired_lock_is_reclaimable() {
        let store = InMemoryEventStore::new();
        let acquired_at = Utc::now() - chrono::Duration::seconds(120);
        assert!(store
            .try_acquire_lock(&key(), "worker-a", Duration::from_secs(60), acquired_at)
            .unwrap());

        let now = Utc::now();
        assert!(store
            .try_acquire_lock(&key(), "worker-b", Duration::from_secs(60), now)
            .unwrap());
    }

    #[test]
    fn release_is_a_noop_for_non_holder() {
        let store = InMemoryEventStore::new();
        let now = Utc::now();
        store
            .try_acquire_lock(&key(), "worker-a", Duration::from_secs(60), now)
            .unwrap();
        store.release_lock(&key(), "worker-b");
        assert!(!store
            .try_acquire_lock(&key(), "worker-c", Duration::from_secs(60), now)
            .unwrap());
    }

    #[test]
    fn publish_is_idempotent_on_event_id() {
        let store = InMemoryEventStore::new();
        let now = Utc::now();
        let id1 = store.publish_event(&key(), event("evt-1", now)).unwrap();
        let id2 = store.publish_event(&key(), event("evt-1", now)).unwrap();
        assert_eq!(id1, id2);

        let rows = store.events.lock().unwrap();
        assert_eq!(rows.get(&key()).unwrap().len(), 1);
    }

    #[test]
    fn latest_event_breaks_ties_on_event_id() {
        let store = InMemoryEventStore::new();
        let now = Utc::now();
        store.publish_event(&key(), event("evt-a", now)).unwrap();
        store.publish_event(&key(), event("evt-b", now)).unwrap();

        let latest = store.get_latest_event(&key()).unwrap().unwrap();
        assert_eq!(latest.event_id, "evt-b");
    }

    #[test]
    fn compensate_removes_the_row() {
        let store = InMemoryEventStore::new();
        let now = Utc::now();
        store.publish_event(&key(), event("evt-1", now)).unwrap();
        store.compensate_event(&key(), "evt-1").unwrap();
        assert!(store.get_latest_event(&key()).unwrap().is_none());
    }

    #[test]
    fn unrelated_keys_do_not_interfere() {
        let store = InMemoryEventStore::new();
        let other = LockKey {
            saved_search_id: "search-2".to_string(),
            snapshot_type: SnapshotType::Weekly,
        };
        let now = Utc::now();
        store.publish_event(&key(), event("evt-1", now)).unwrap();
        assert!(store.get_latest_event(&other).unwrap().is_none());
    }
}
