use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use notice_types::{LockKey, NotificationEvent, WorkerLock};

use crate::NotificationEventStore;

/// Filesystem reference implementation under a state directory.
///
/// Each `(search, type)` key gets a lock file (`<key>.lock`) and an
/// append-only JSONL event file (`<key>.events.jsonl`), both written
/// with the same temp-file-then-rename atomicity the rest of this
/// workspace's state handling uses.
pub struct FileEventStore {
    state_dir: PathBuf,
}

impl FileEventStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    fn key_slug(key: &LockKey) -> String {
        format!("{}__{}", key.saved_search_id, key.snapshot_type)
    }

    fn lock_path(&self, key: &LockKey) -> PathBuf {
        self.state_dir.join(format!("{}.lock", Self::key_slug(key)))
    }

    fn events_path(&self, key: &LockKey) -> PathBuf {
        self.state_dir
            .join(format!("{}.events.jsonl", Self::key_slug(key)))
    }

    fn read_lock(&self, key: &LockKey) -> Result<Option<WorkerLock>> {
        let path = self.lock_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read lock file {}", path.display()))?;
        let lock: WorkerLock = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse lock file {}", path.display()))?;
        Ok(Some(lock))
    }

    fn write_lock_atomic(&self, path: &Path, lock: &WorkerLock) -> Result<()> {
        fs::create_dir_all(&self.state_dir)
            .with_context(|| format!("failed to create state dir {}", self.state_dir.display()))?;
        let tmp = path.with_extension("tmp");
        let json = serde_json::to_string(lock).context("failed to serialize lock")?;
        {
            let mut file = File::create(&tmp)
                .with_context(|| format!("failed to create {}", tmp.display()))?;
            file.write_all(json.as_bytes())
                .with_context(|| format!("failed to write {}", tmp.display()))?;
            file.sync_all().context("failed to sync lock file")?;
        }
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to rename lock file into {}", path.display()))?;
        Ok(())
    }

    fn read_events(&self, key: &LockKey) -> Result<Vec<NotificationEvent>> {
        let path = self.events_path(key);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path)
            .with_context(|| format!("failed to open events file {}", path.display()))?;
        let mut rows = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("failed to read {}", path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let event: NotificationEvent = serde_json::from_str(&line)
                .with_context(|| format!("failed to parse event row in {}", path.display()))?;
            rows.push(event);
        }
        Ok(rows)
    }
}

impl NotificationEventStore for FileEventStore {
    fn try_acquire_lock(
        &self,
        key: &LockKey,
        worker_id: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if let Some(existing) = self.read_lock(key)? {
            if !existing.is_expired(now) {
                return Ok(false);
            }
        }
        self.write_lock_atomic(
            &self.lock_path(key),
            &WorkerLock {
                worker_id: worker_id.to_string(),
                acquired_at: now,
                ttl_seconds: ttl.as_secs(),
            },
        )?;
        Ok(true)
    }

    fn release_lock(&self, key: &LockKey, worker_id: &str) {
        let Ok(Some(existing)) = self.read_lock(key) else {
            return;
        };
        if existing.worker_id == worker_id {
            let _ = fs::remove_file(self.lock_path(key));
        }
    }

    fn get_latest_event(&self, key: &LockKey) -> Result<Option<NotificationEvent>> {
        let rows = self.read_events(key)?;
        Ok(rows
            .into_iter()
            .max_by(|a, b| {
                a.generated_at
                    .cmp(&b.generated_at)
                    .then_with(|| a.event_id.cmp(&b.event_id))
            }))
    }

    fn publish_event(&self, key: &LockKey, event: NotificationEvent) -> Result<String> {
        let existing = self.read_events(key)?;
        if let Some(row) = existing.iter().find(|r| r.event_id == event.event_id) {
            return Ok(row.event_id.clone());
        }

        fs::create_dir_all(&self.state_dir)
            .with_context(|| format!("failed to create state dir {}", self.state_dir.display()))?;
        let path = self.events_path(key);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open events file {}", path.display()))?;
        let id = event.event_id.clone();
        let line =
            serde_json::to_string(&event).context("failed to serialize event to JSON")?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append event to {}", path.display()))?;
        Ok(id)
    }

    fn compensate_event(&self, key: &LockKey, event_id: &str) -> Result<()> {
        let mut rows = self.read_events(key)?;
        let before = rows.len();
        rows.retain(|r| r.event_id != event_id);
        if rows.len() == before {
            return Ok(());
        }

        let path = self.events_path(key);
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)
                .with_context(|| format!("failed to create {}", tmp.display()))?;
            for row in &rows {
                let line = serde_json::to_string(row).context("failed to serialize event")?;
                writeln!(file, "{line}")
                    .with_context(|| format!("failed to write {}", tmp.display()))?;
            }
            file.sync_all().context("failed to sync events file")?;
        }
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to rename events file into {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use notice_types::{EventSummary, SnapshotType, SummaryCategories};
    use tempfile::tempdir;

    use super::*;

    fn key() -> LockKey {
        LockKey {
            saved_search_id: "search-1".to_string(),
            snapshot_type: SnapshotType::Monthly,
        }
    }

    fn event(id: &str, generated_at: DateTime<Utc>) -> NotificationEvent {
        NotificationEvent {
            event_id: id.to_string(),
            saved_search_id: "search-1".to_string(),
            snapshot_type: SnapshotType::Monthly,
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
    fn acquire_release_and_reacquire_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileEventStore::new(dir.path());
        let now = Utc::now();
        assert!(store
            .try_acquire_lock(&key(), "worker-a", Duration::from_secs(60), now)
            .unwrap());
        assert!(!store
            .try_acquire_lock(&key(), "worker-b", Duration::from_secs(60), now)
            .unwrap());
        store.release_lock(&key(), "worker-a");
        assert!(store
            .try_acquire_lock(&key(), "worker-b", Duration::from_secs(60), now)
            .unwrap());
    }

    #[test]
    fn publish_persists_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileEventStore::new(dir.path());
        let now = Utc::now();
        store.publish_event(&key(), event("evt-1", now)).unwrap();
        store.publish_event(&key(), event("evt-1", now)).unwrap();

        let latest = store.get_latest_event(&key()).unwrap().unwrap();
        assert_eq!(latest.event_id, "evt-1");
        assert_eq!(store.read_events(&key()).unwrap().len(), 1);
    }

    #[test]
    fn compensate_removes_the_event_row() {
        let dir = tempdir().unwrap();
        let store = FileEventStore::new(dir.path());
        let now = Utc::now();
        store.publish_event(&key(), event("evt-1", now)).unwrap();
        store.compensate_event(&key(), "evt-1").unwrap();
        assert!(store.get_latest_event(&key()).unwrap().is_none());
    }
}
