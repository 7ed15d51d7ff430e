//! Wire envelopes: the notification-queue message and the per-channel
//! delivery job payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::saved_search::SnapshotType;
use crate::subscription::Trigger;

pub const NOTIFICATION_SCHEMA_V1: &str = "v1";

/// The message published to the notification queue after an event is
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationQueueMessage {
    pub schema_version: String,
    pub event_id: String,
    pub search_id: String,
    pub snapshot_type: SnapshotType,
    pub query: String,
    pub generated_at: DateTime<Utc>,
    pub state_blob_path: String,
    pub diff_blob_path: String,
    /// The raw, already-serialized `EventSummary` bytes, carried
    /// verbatim end to end so the dispatcher can pass them through to
    /// delivery jobs without a re-marshal round trip.
    pub summary: serde_json::Value,
}

/// Metadata every delivery job carries regardless of channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryMetadata {
    pub event_id: String,
    pub search_id: String,
    pub query: String,
    pub frequency: crate::saved_search::Frequency,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailDeliveryJob {
    pub subscription_id: String,
    pub recipient_email: String,
    pub channel_id: String,
    pub triggers: Vec<Trigger>,
    pub summary_raw: Vec<u8>,
    pub metadata: DeliveryMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDeliveryJob {
    pub subscription_id: String,
    pub url: String,
    pub channel_id: String,
    pub triggers: Vec<Trigger>,
    pub summary_raw: Vec<u8>,
    pub metadata: DeliveryMetadata,
}
