//! Core domain types for the saved-search change-notification pipeline:
//! the feature catalog, saved searches, state snapshots and diffs,
//! notification events and summaries, subscriptions, and the wire
//! envelopes exchanged over the notification and delivery queues.

mod envelope;
mod event;
mod feature;
mod lock;
mod registry;
mod reporter;
mod saved_search;
mod snapshot;
mod subscription;

pub use envelope::{
    DeliveryMetadata, EmailDeliveryJob, NotificationQueueMessage, WebhookDeliveryJob,
    NOTIFICATION_SCHEMA_V1,
};
pub use event::{
    BaselineChangeHighlight, BaselineStatusWire, BrowserChangeHighlight, BrowserStatusWire,
    EventSummary, NameChange, NotificationEvent, SummaryCategories, SummaryHighlight,
    EVENT_SUMMARY_SCHEMA_V1,
};
pub use feature::{
    BaselineStatus, BaselineTag, BrowserImpl, BrowserName, BrowserSupportStatus, FeatureCatalog,
    FeatureKey, FeatureRecord, InvalidFeatureKey,
};
pub use lock::{LockKey, WorkerLock};
pub use registry::{MovedSplitRegistry, RegistryError, MAX_MOVED_CHAIN};
pub use reporter::Reporter;
pub use saved_search::{Frequency, Owner, SavedSearch, SnapshotType};
pub use snapshot::{
    BaselineChange, Diff, ImplChange, MovedFeature, Rename, SnapshotEntry, SplitFeature,
    StateSnapshot, UpdatedFeature,
};
pub use subscription::{Destination, Subscription, Trigger};
