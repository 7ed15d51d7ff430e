//! The evaluated state of a saved search (`StateSnapshot`) and the diff
//! between two such snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::feature::{BaselineStatus, BaselineTag, BrowserName, BrowserSupportStatus, FeatureKey};

/// One matched feature's attributes at evaluation time — enough to
/// compute a future diff against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub feature_key: FeatureKey,
    pub name: String,
    pub baseline: BaselineStatus,
    pub browsers: BTreeMap<BrowserName, BrowserSupportStatus>,
}

/// The list of features matching a saved search at evaluation time,
/// ordered ascending by `feature_key`. Two runs
/// with identical results serialize identically, making the blob
/// content-addressable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl StateSnapshot {
    /// Build a snapshot from matched entries, sorting them canonically.
    pub fn new(mut entries: Vec<SnapshotEntry>) -> Self {
        entries.sort_by(|a, b| a.feature_key.cmp(&b.feature_key));
        Self { entries }
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn get(&self, key: &FeatureKey) -> Option<&SnapshotEntry> {
        // `entries` is sorted, but linear scan keeps this type simple;
        // snapshots are small (single saved-search result sets).
        self.entries.iter().find(|e| &e.feature_key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Canonical JSON bytes for content-addressed storage: sorted keys,
    /// no pretty-printing, so identical snapshots always hash the same.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("StateSnapshot serializes infallibly")
    }
}

/// A sub-reason why an existing feature's entry changed between two
/// snapshots. A single feature may carry more than one of these (spec
/// §4.1 step 5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedFeature {
    pub feature_key: FeatureKey,
    pub rename: Option<Rename>,
    pub baseline_change: Option<BaselineChange>,
    pub impl_changes: Vec<ImplChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineChange {
    pub from: BaselineTag,
    pub to: BaselineTag,
    pub from_status: BaselineStatus,
    pub to_status: BaselineStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplChange {
    pub browser: BrowserName,
    pub from: BrowserSupportStatus,
    pub to: BrowserSupportStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovedFeature {
    pub old_key: FeatureKey,
    pub new_key: FeatureKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitFeature {
    pub old_key: FeatureKey,
    pub new_keys: Vec<FeatureKey>,
}

/// The difference between a previous snapshot and a current one.
/// Applying this diff to the previous snapshot must reproduce the
/// current one exactly — see `notice_diff::apply`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub added: Vec<SnapshotEntry>,
    pub removed: Vec<SnapshotEntry>,
    pub moved: Vec<MovedFeature>,
    pub split: Vec<SplitFeature>,
    pub updated: Vec<UpdatedFeature>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.moved.is_empty()
            && self.split.is_empty()
            && self.updated.is_empty()
    }
}
