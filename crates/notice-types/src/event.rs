//! NotificationEvent, EventSummary, and SummaryHighlight — the
//! persisted, wire-shaped output of the Event Producer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feature::{BaselineStatus, BrowserName, BrowserSupportStatus, FeatureKey};
use crate::saved_search::SnapshotType;

pub const EVENT_SUMMARY_SCHEMA_V1: &str = "v1";

/// A single human-meaningful change surfaced in a summary: a rename, a
/// baseline transition, a browser-support transition, a move, or a
/// split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SummaryHighlight {
    Changed {
        feature_id: FeatureKey,
        feature_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name_change: Option<NameChange>,
        #[serde(skip_serializing_if = "Option::is_none")]
        baseline_change: Option<BaselineChangeHighlight>,
        #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
        browser_changes: std::collections::BTreeMap<BrowserName, BrowserChangeHighlight>,
    },
    Moved {
        feature_id: FeatureKey,
        new_feature_id: FeatureKey,
    },
    Split {
        feature_id: FeatureKey,
        new_feature_ids: Vec<FeatureKey>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameChange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineChangeHighlight {
    pub from: BaselineStatusWire,
    pub to: BaselineStatusWire,
}

/// Wire form of [`BaselineStatus`]: `{status, low_date?, high_date?}`,
/// distinct from the Rust-idiomatic enum representation used
/// internally so the JSON shape matches the documented envelope
/// exactly regardless of how the enum derive tags it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineStatusWire {
    pub status: crate::feature::BaselineTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_date: Option<chrono::NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_date: Option<chrono::NaiveDate>,
}

impl From<&BaselineStatus> for BaselineStatusWire {
    fn from(status: &BaselineStatus) -> Self {
        match status {
            BaselineStatus::Limited => Self {
                status: crate::feature::BaselineTag::Limited,
                low_date: None,
                high_date: None,
            },
            BaselineStatus::Newly { low_date } => Self {
                status: crate::feature::BaselineTag::Newly,
                low_date: *low_date,
                high_date: None,
            },
            BaselineStatus::Widely {
                low_date,
                high_date,
            } => Self {
                status: crate::feature::BaselineTag::Widely,
                low_date: *low_date,
                high_date: *high_date,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserChangeHighlight {
    pub from: BrowserStatusWire,
    pub to: BrowserStatusWire,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserStatusWire {
    pub status: BrowserSupportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<chrono::NaiveDate>,
}

/// Exact integer counters per category, always exact even when
/// `highlights` is truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCategories {
    pub query_changed: u32,
    pub added: u32,
    pub removed: u32,
    pub deleted: u32,
    pub moved: u32,
    pub split: u32,
    pub updated: u32,
    pub updated_impl: u32,
    pub updated_rename: u32,
    pub updated_baseline: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub schema_version: String,
    pub text: String,
    pub categories: SummaryCategories,
    pub truncated: bool,
    pub highlights: Vec<SummaryHighlight>,
}

/// Immutable record of one producer run that decided to publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub event_id: String,
    pub saved_search_id: String,
    pub snapshot_type: SnapshotType,
    pub generated_at: DateTime<Utc>,
    pub state_blob_path: String,
    pub diff_blob_path: String,
    pub summary: EventSummary,
}
