//! The Event Producer: for a given `(saved_search_id,
//! frequency)`, produce at most one [`NotificationEvent`] per
//! invocation, publishing it only when the new state differs from the
//! last one.

mod evaluator;

pub use evaluator::{EvaluationError, InMemoryEvaluator, QueryEvaluator};

use std::time::Duration;

use chrono::{DateTime, Utc};
use notice_blob::BlobStore;
use notice_errors::ProducerError;
use notice_migrate::migrate_keys;
use notice_queue::Publisher;
use notice_store::NotificationEventStore;
use notice_types::{
    FeatureCatalog, FeatureKey, LockKey, MovedSplitRegistry, NotificationEvent,
    NotificationQueueMessage, Reporter, SavedSearch, SnapshotEntry,
};

/// The collaborators the producer needs for one run. Borrowed rather
/// than owned so a single process can share one set across many saved
/// searches.
pub struct ProducerDeps<'a> {
    pub store: &'a dyn NotificationEventStore,
    pub blobs: &'a dyn BlobStore,
    pub notification_queue: &'a dyn Publisher<NotificationQueueMessage>,
    pub registry: &'a MovedSplitRegistry,
    pub evaluator: &'a dyn QueryEvaluator,
}

/// Run one producer tick for `saved_search` at `frequency`.
///
/// Returns `Ok(Some(event_id))` if a new event was published,
/// `Ok(None)` if nothing changed, or the typed error for the step that
/// failed. The lock is always released on every exit path.
#[allow(clippy::too_many_arguments)]
pub fn run(
    deps: &ProducerDeps,
    catalog: &FeatureCatalog,
    saved_search: &SavedSearch,
    frequency: notice_types::Frequency,
    worker_id: &str,
    now: DateTime<Utc>,
    lock_ttl: Duration,
    reporter: &mut dyn Reporter,
) -> Result<Option<String>, ProducerError> {
    let snapshot_type = frequency.snapshot_type();
    let lock_key = LockKey {
        saved_search_id: saved_search.id.clone(),
        snapshot_type,
    };

    let acquired = deps
        .store
        .try_acquire_lock(&lock_key, worker_id, lock_ttl, now)
        .map_err(|e| ProducerError::StorageFailed(e.to_string()))?;
    if !acquired {
        reporter.info(&format!(
            "lock for {}/{snapshot_type} held by another worker, skipping",
            saved_search.id
        ));
        return Err(ProducerError::LockUnavailable {
            saved_search_id: saved_search.id.clone(),
            snapshot_type,
        });
    }

    let result = run_locked(deps, catalog, saved_search, &lock_key, now, reporter);
    deps.store.release_lock(&lock_key, worker_id);
    result
}

fn run_locked(
    deps: &ProducerDeps,
    catalog: &FeatureCatalog,
    saved_search: &SavedSearch,
    lock_key: &LockKey,
    now: DateTime<Utc>,
    reporter: &mut dyn Reporter,
) -> Result<Option<String>, ProducerError> {
    // Step 2: fetch previous event.
    let previous_event = deps
        .store
        .get_latest_event(lock_key)
        .map_err(|e| ProducerError::StorageFailed(e.to_string()))?;

    // Step 3: evaluate the query against the current catalog.
    let matched = deps
        .evaluator
        .evaluate(&saved_search.query, catalog)
        .map_err(|e| ProducerError::EvaluationFailed(e.to_string()))?;
    let matched: std::collections::BTreeSet<FeatureKey> = matched.into_iter().collect();
    let current_snapshot = notice_diff::from_matches(catalog, |k| matched.contains(k));

    let previous_snapshot = match &previous_event {
        None => notice_types::StateSnapshot::default(),
        Some(event) => {
            let bytes = deps
                .blobs
                .get_by_resolved(&event.state_blob_path)
                .map_err(|e| ProducerError::StorageFailed(e.to_string()))?;
            serde_json::from_slice(&bytes)
                .map_err(|e| ProducerError::StorageFailed(e.to_string()))?
        }
    };

    // Step 4: migrate the previous snapshot's historical keys onto
    // today's canonical keys before diffing.
    let mut prev_entries: std::collections::BTreeMap<FeatureKey, SnapshotEntry> =
        previous_snapshot
            .entries()
            .iter()
            .map(|e| (e.feature_key.clone(), e.clone()))
            .collect();
    let present: std::collections::BTreeSet<FeatureKey> = prev_entries.keys().cloned().collect();
    let mut applied_moves = Vec::new();
    let split_notices = migrate_keys(
        deps.registry,
        &present,
        &mut prev_entries,
        |old, new, data| {
            if let Some(mut entry) = data.remove(old) {
                entry.feature_key = new.clone();
                data.insert(new.clone(), entry);
            }
            applied_moves.push((old.clone(), new.clone()));
        },
    )?;
    let migrated_previous = notice_types::StateSnapshot::new(prev_entries.into_values().collect());
    let splits: Vec<(FeatureKey, Vec<FeatureKey>)> = split_notices
        .into_iter()
        .map(|n| (n.old, n.new_keys))
        .collect();

    // Step 5: diff.
    let diff = notice_diff::diff(&migrated_previous, &current_snapshot, &applied_moves, &splits);

    // Step 6: decide whether to publish.
    let query_changed = previous_event
        .as_ref()
        .map(|e| previous_query_differs(e, saved_search))
        .unwrap_or(false);
    if diff.is_empty() && !query_changed {
        reporter.info(&format!(
            "no changes for {}/{}, nothing to publish",
            saved_search.id, lock_key.snapshot_type
        ));
        return Ok(None);
    }

    // Step 7: persist blobs.
    let state_path = deps
        .blobs
        .put(&current_snapshot.canonical_bytes())
        .map_err(|e| ProducerError::StorageFailed(e.to_string()))?;
    let diff_bytes = serde_json::to_vec(&diff).map_err(|e| ProducerError::StorageFailed(e.to_string()))?;
    let diff_path = deps
        .blobs
        .put(&diff_bytes)
        .map_err(|e| ProducerError::StorageFailed(e.to_string()))?;

    // Step 8: build the summary.
    let summary = notice_diff::build_summary(&diff, query_changed, notice_diff::DEFAULT_HIGHLIGHT_CAP);

    // Step 9: publish event, then the queue message; compensate on
    // publish failure.
    let event = NotificationEvent {
        event_id: format!("{}-{}", saved_search.id, now.timestamp_millis()),
        saved_search_id: saved_search.id.clone(),
        snapshot_type: lock_key.snapshot_type,
        generated_at: now,
        state_blob_path: deps.blobs.resolve(&state_path),
        diff_blob_path: deps.blobs.resolve(&diff_path),
        summary: summary.clone(),
    };

    let stored_id = deps
        .store
        .publish_event(lock_key, event.clone())
        .map_err(|e| ProducerError::StorageFailed(e.to_string()))?;

    let message = NotificationQueueMessage {
        schema_version: notice_types::NOTIFICATION_SCHEMA_V1.to_string(),
        event_id: stored_id.clone(),
        search_id: saved_search.id.clone(),
        snapshot_type: lock_key.snapshot_type,
        query: saved_search.query.clone(),
        generated_at: now,
        state_blob_path: event.state_blob_path.clone(),
        diff_blob_path: event.diff_blob_path.clone(),
        summary: serde_json::to_value(&summary).expect("EventSummary serializes infallibly"),
    };

    if let Err(publish_err) = deps
        .notification_queue
        .publish(notice_types::NOTIFICATION_SCHEMA_V1, worker_producer_id(), message)
    {
        reporter.error(&format!(
            "failed to publish notification for event {stored_id}, compensating: {publish_err}"
        ));
        if let Err(compensate_err) = deps.store.compensate_event(lock_key, &stored_id) {
            return Err(ProducerError::InconsistentState {
                event_id: stored_id,
                detail: format!(
                    "publish failed ({publish_err}) and compensation also failed ({compensate_err})"
                ),
            });
        }
        return Err(ProducerError::PublishFailed(publish_err.to_string()));
    }

    reporter.info(&format!("published event {stored_id} for {}", saved_search.id));
    Ok(Some(stored_id))
}

fn worker_producer_id() -> &'static str {
    "notice-producer"
}

/// Whether the saved search's query text has changed since the
/// previous event was generated. This is the second publish trigger,
/// alongside a non-empty diff. `updated_at` moving past the previous
/// event's `generated_at` is the only signal available without
/// storing the query text on the event itself, so a name/description-
/// only edit also triggers a republish under this check.
// TODO: store the query text on NotificationEvent so this can compare
// it directly instead of overapproximating via updated_at.
fn previous_query_differs(previous_event: &NotificationEvent, saved_search: &SavedSearch) -> bool {
    saved_search.updated_at > previous_event.generated_at
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use notice_blob::FsBlobStore;
    use notice_queue::ChannelBroker;
    use notice_store::InMemoryEventStore;
    use notice_types::{BaselineStatus, FeatureRecord, Owner};

    use super::*;

    fn catalog_with(key: &str, name: &str, baseline: BaselineStatus) -> FeatureCatalog {
        let mut catalog = FeatureCatalog::new();
        catalog.insert(
            FeatureKey::new(key).unwrap(),
            FeatureRecord {
                name: name.to_string(),
                baseline,
                browsers: BTreeMap::new(),
                spec_links: Vec::new(),
                discouraged: false,
            },
        );
        catalog
    }

    fn saved_search(query: &str, updated_at: DateTime<Utc>) -> SavedSearch {
        SavedSearch {
            id: "search-1".to_string(),
            owner: Owner::Global,
            query: query.to_string(),
            name: "My search".to_string(),
            description: None,
            created_at: updated_at,
            updated_at,
        }
    }

    struct NullReporter;
    impl Reporter for NullReporter {
        fn info(&mut self, _msg: &str) {}
        fn warn(&mut self, _msg: &str) {}
        fn error(&mut self, _msg: &str) {}
    }

    fn deps<'a>(
        store: &'a InMemoryEventStore,
        blobs: &'a FsBlobStore,
        queue: &'a ChannelBroker<NotificationQueueMessage>,
        registry: &'a MovedSplitRegistry,
        evaluator: &'a InMemoryEvaluator,
    ) -> ProducerDeps<'a> {
        ProducerDeps {
            store,
            blobs,
            notification_queue: queue,
            registry,
            evaluator,
        }
    }

    #[test]
    fn first_run_with_matches_publishes_an_event() {
        let store = InMemoryEventStore::new();
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        let queue: ChannelBroker<NotificationQueueMessage> = ChannelBroker::new();
        let registry = MovedSplitRegistry::default();
        let evaluator = InMemoryEvaluator;

        let catalog = catalog_with("grid", "Grid", BaselineStatus::Limited);
        let search = saved_search("", Utc::now());
        let now = Utc::now();

        let result = run(
            &deps(&store, &blobs, &queue, &registry, &evaluator),
            &catalog,
            &search,
            notice_types::Frequency::Weekly,
            "worker-a",
            now,
            Duration::from_secs(60),
            &mut NullReporter,
        )
        .unwrap();

        assert!(result.is_some());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn unchanged_catalog_on_second_run_publishes_nothing() {
        let store = InMemoryEventStore::new();
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        let queue: ChannelBroker<NotificationQueueMessage> = ChannelBroker::new();
        let registry = MovedSplitRegistry::default();
        let evaluator = InMemoryEvaluator;

        let catalog = catalog_with("grid", "Grid", BaselineStatus::Limited);
        let created_at = Utc::now() - chrono::Duration::hours(1);
        let search = saved_search("", created_at);

        let d = deps(&store, &blobs, &queue, &registry, &evaluator);
        let first = run(
            &d,
            &catalog,
            &search,
            notice_types::Frequency::Weekly,
            "worker-a",
            created_at,
            Duration::from_secs(60),
            &mut NullReporter,
        )
        .unwrap();
        assert!(first.is_some());

        let second = run(
            &d,
            &catalog,
            &search,
            notice_types::Frequency::Weekly,
            "worker-a",
            Utc::now(),
            Duration::from_secs(60),
            &mut NullReporter,
        )
        .unwrap();
        assert!(second.is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn lock_held_by_another_worker_is_rejected() {
        let store = InMemoryEventStore::new();
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        let queue: ChannelBroker<NotificationQueueMessage> = ChannelBroker::new();
        let registry = MovedSplitRegistry::default();
        let evaluator = InMemoryEvaluator;
        let d = deps(&store, &blobs, &queue, &registry, &evaluator);

        let lock_key = LockKey {
            saved_search_id: "search-1".to_string(),
            snapshot_type: notice_types::SnapshotType::Weekly,
        };
        let now = Utc::now();
        store
            .try_acquire_lock(&lock_key, "other-worker", Duration::from_secs(60), now)
            .unwrap();

        let catalog = catalog_with("grid", "Grid", BaselineStatus::Limited);
        let search = saved_search("", now);

        let err = run(
            &d,
            &catalog,
            &search,
            notice_types::Frequency::Weekly,
            "worker-a",
            now,
            Duration::from_secs(60),
            &mut NullReporter,
        )
        .unwrap_err();

        assert!(matches!(err, ProducerError::LockUnavailable { .. }));
    }

    #[test]
    fn baseline_promotion_produces_a_baseline_highlight() {
        let store = InMemoryEventStore::new();
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        let queue: ChannelBroker<NotificationQueueMessage> = ChannelBroker::new();
        let registry = MovedSplitRegistry::default();
        let evaluator = InMemoryEvaluator;
        let d = deps(&store, &blobs, &queue, &registry, &evaluator);

        let created_at = Utc::now() - chrono::Duration::hours(1);
        let search = saved_search("", created_at);

        let catalog_before = catalog_with("grid", "Grid", BaselineStatus::Limited);
        run(
            &d,
            &catalog_before,
            &search,
            notice_types::Frequency::Weekly,
            "worker-a",
            created_at,
            Duration::from_secs(60),
            &mut NullReporter,
        )
        .unwrap();

        let catalog_after = catalog_with("grid", "Grid", BaselineStatus::Newly { low_date: None });
        run(
            &d,
            &catalog_after,
            &search,
            notice_types::Frequency::Weekly,
            "worker-a",
            Utc::now(),
            Duration::from_secs(60),
            &mut NullReporter,
        )
        .unwrap();

        assert_eq!(queue.len(), 2);
        queue.receive(); // the first run's publish, not under test
        let second = queue.receive().unwrap().envelope.payload;
        let categories = &second.summary["categories"];
        assert_eq!(categories["updated_baseline"], 1);
    }

    #[test]
    fn migration_conflict_aborts_without_publishing() {
        // A previous run already stored both a historical key and the
        // key it would be migrated onto (e.g. two legacy entries that
        // independently ended up mapped to the same canonical key).
        // Rewriting `old-a` onto `new-a` once both are already present
        // in the stored snapshot must fail rather than silently drop
        // one of them.
        let store = InMemoryEventStore::new();
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        let queue: ChannelBroker<NotificationQueueMessage> = ChannelBroker::new();
        let evaluator = InMemoryEvaluator;

        let created_at = Utc::now() - chrono::Duration::hours(1);
        let search = saved_search("", created_at);

        let mut catalog_both = FeatureCatalog::new();
        catalog_both.insert(
            FeatureKey::new("old-a").unwrap(),
            FeatureRecord {
                name: "Old A".to_string(),
                baseline: BaselineStatus::Limited,
                browsers: BTreeMap::new(),
                spec_links: Vec::new(),
                discouraged: false,
            },
        );
        catalog_both.insert(
            FeatureKey::new("new-a").unwrap(),
            FeatureRecord {
                name: "New A".to_string(),
                baseline: BaselineStatus::Limited,
                browsers: BTreeMap::new(),
                spec_links: Vec::new(),
                discouraged: false,
            },
        );

        let registry_empty = MovedSplitRegistry::default();
        run(
            &deps(&store, &blobs, &queue, &registry_empty, &evaluator),
            &catalog_both,
            &search,
            notice_types::Frequency::Weekly,
            "worker-a",
            created_at,
            Duration::from_secs(60),
            &mut NullReporter,
        )
        .unwrap();

        let registry = MovedSplitRegistry::new(
            BTreeMap::from([(FeatureKey::new("old-a").unwrap(), FeatureKey::new("new-a").unwrap())]),
            BTreeMap::new(),
        )
        .unwrap();

        let err = run(
            &deps(&store, &blobs, &queue, &registry, &evaluator),
            &catalog_both,
            &search,
            notice_types::Frequency::Weekly,
            "worker-a",
            Utc::now(),
            Duration::from_secs(60),
            &mut NullReporter,
        )
        .unwrap_err();

        assert!(matches!(err, ProducerError::Migrate(_)));
        assert_eq!(queue.len(), 1);
    }
}
