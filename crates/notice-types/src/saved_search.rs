//! Saved searches and the frequency/snapshot-type split.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The owner of a saved search: a specific user, or the "global" sentinel
/// for shared searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Owner {
    User { id: String },
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub id: String,
    pub owner: Owner,
    pub query: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User-facing notification cadence. `Daily` is an alias for `Immediate`
/// at the storage layer — see [`Frequency::snapshot_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Immediate,
    Daily,
    Weekly,
    Monthly,
}

/// Storage-layer snapshot type. Three variants, not four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotType {
    Immediate,
    Weekly,
    Monthly,
}

impl std::fmt::Display for SnapshotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SnapshotType::Immediate => "immediate",
            SnapshotType::Weekly => "weekly",
            SnapshotType::Monthly => "monthly",
        };
        f.write_str(s)
    }
}

impl Frequency {
    /// Map a user-facing frequency onto its storage-layer snapshot type.
    ///
    /// `daily` intentionally aliases to `immediate`: daily subscribers
    /// share the immediate event stream and are expected to be filtered
    /// into a digest by the channel worker. The upstream behavior this
    /// was distilled from comments that this aliasing looks
    /// unintentional; we preserve it rather than guess a redesign. See
    /// DESIGN.md.
    // TODO: confirm with product whether `daily` should get its own
    // snapshot type instead of riding the immediate stream.
    pub fn snapshot_type(self) -> SnapshotType {
        match self {
            Frequency::Immediate | Frequency::Daily => SnapshotType::Immediate,
            Frequency::Weekly => SnapshotType::Weekly,
            Frequency::Monthly => SnapshotType::Monthly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_aliases_to_immediate_snapshot_type() {
        assert_eq!(Frequency::Daily.snapshot_type(), SnapshotType::Immediate);
        assert_eq!(Frequency::Immediate.snapshot_type(), SnapshotType::Immediate);
    }

    #[test]
    fn weekly_and_monthly_map_through() {
        assert_eq!(Frequency::Weekly.snapshot_type(), SnapshotType::Weekly);
        assert_eq!(Frequency::Monthly.snapshot_type(), SnapshotType::Monthly);
    }
}
