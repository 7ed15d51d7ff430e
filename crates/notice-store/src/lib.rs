//! The Notification Event Store: the worker lock table, the
//! append-only event rows, and the latest-per-`(search, type)` index.
//!
//! Two reference implementations are provided: [`InMemoryEventStore`]
//! for tests and embedders supplying their own durable store, and
//! [`FileEventStore`] for the CLI demo path, modeled on this
//! workspace's filesystem state/lock patterns (atomic rename-based
//! writes, one lock file per key with stale-TTL reclaim).

mod clock;
mod file;
mod memory;

pub use clock::{Clock, SystemClock};
pub use file::FileEventStore;
pub use memory::InMemoryEventStore;

use chrono::{DateTime, Utc};
use notice_types::{LockKey, NotificationEvent};

/// The five storage primitives the producer needs.
///
/// `try_acquire_lock` and `publish_event` must each be a single atomic
/// operation: two concurrent callers racing on the same key succeed at
/// most once.
pub trait NotificationEventStore: Send + Sync {
    /// Returns `true` iff no unexpired lock existed for `key` and the
    /// caller now holds it.
    fn try_acquire_lock(
        &self,
        key: &LockKey,
        worker_id: &str,
        ttl: std::time::Duration,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    /// No-op if `worker_id` is not the current holder; never fails the
    /// caller.
    fn release_lock(&self, key: &LockKey, worker_id: &str);

    /// The newest event row for `key`, if any, ordered by `generated_at`
    /// descending with ties broken by `event_id` descending.
    fn get_latest_event(&self, key: &LockKey) -> anyhow::Result<Option<NotificationEvent>>;

    /// Atomic insert; idempotent on `(search, type, event_id)` — a
    /// second call with the same ids returns the previously stored id
    /// without inserting a duplicate row.
    fn publish_event(&self, key: &LockKey, event: NotificationEvent) -> anyhow::Result<String>;

    /// Delete an event row inserted by the caller, as compensation for
    /// a downstream publish failure.
    fn compensate_event(&self, key: &LockKey, event_id: &str) -> anyhow::Result<()>;
}
