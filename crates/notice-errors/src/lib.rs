//! The error taxonomy, as typed `thiserror` enums — one per component,
//! matching the branchable failure kinds each one can produce.
//! Leaf/glue code elsewhere in the workspace still uses
//! `anyhow::Result` for load-time and CLI-level failures; these enums
//! are for the errors callers need to branch on.

use notice_types::FeatureKey;

/// Errors the Event Producer's `Run` operation can return.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("lock for {saved_search_id}/{snapshot_type:?} is held by another worker")]
    LockUnavailable {
        saved_search_id: String,
        snapshot_type: notice_types::SnapshotType,
    },

    #[error("failed to evaluate saved search query: {0}")]
    EvaluationFailed(String),

    #[error("storage operation failed: {0}")]
    StorageFailed(String),

    #[error("failed to publish notification queue message: {0}")]
    PublishFailed(String),

    #[error(
        "compensation failed after a publish error for event {event_id}: {detail}. This is fatal and must be alerted."
    )]
    InconsistentState { event_id: String, detail: String },

    #[error(transparent)]
    Migrate(#[from] MigrateError),
}

/// Errors the Feature-Key Migrator can return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrateError {
    #[error(
        "migrating {old} to {new} would collide: caller's data already has both keys"
    )]
    ConflictMigratingFeatureKey { old: FeatureKey, new: FeatureKey },
}

/// Errors the Push Dispatcher's `ProcessEvent` operation can return
///.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown EventSummary schema version: {found}")]
    UnknownSummarySchema { found: String },

    #[error("failed to publish {failed} of {total} delivery jobs")]
    PartialPublishFailure { failed: usize, total: usize },

    #[error("failed to look up subscribers: {0}")]
    SubscriberLookupFailed(String),
}
