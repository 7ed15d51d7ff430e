//! The feature catalog: canonical feature keys, baseline status, and
//! per-browser implementation status.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A canonical, lowercase-dashed feature identifier (e.g. `grid`,
/// `canvas-2d-color-management`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureKey(String);

impl FeatureKey {
    /// Build a feature key, validating it is lowercase-dashed.
    ///
    /// Accepts ascii lowercase letters, digits, and `-`. Anything else is
    /// rejected so keys stay joinable across snapshots without escaping.
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidFeatureKey> {
        let raw = raw.into();
        if raw.is_empty()
            || !raw
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(InvalidFeatureKey(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid feature key: {0:?} (expected lowercase-dashed)")]
pub struct InvalidFeatureKey(pub String);

/// A browser identifier, e.g. `chrome`, `firefox`, `safari`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrowserName(pub String);

impl fmt::Display for BrowserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Baseline status of a feature, per the three-level classification in
/// the glossary. Carries the dates relevant to promotion highlights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BaselineStatus {
    Limited,
    Newly { low_date: Option<NaiveDate> },
    Widely {
        low_date: Option<NaiveDate>,
        high_date: Option<NaiveDate>,
    },
}

impl BaselineStatus {
    /// The bare status tag, ignoring dates — used for equality checks
    /// that only care about the transition (e.g. trigger matching).
    pub fn tag(&self) -> BaselineTag {
        match self {
            BaselineStatus::Limited => BaselineTag::Limited,
            BaselineStatus::Newly { .. } => BaselineTag::Newly,
            BaselineStatus::Widely { .. } => BaselineTag::Widely,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineTag {
    Limited,
    Newly,
    Widely,
}

impl fmt::Display for BaselineTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BaselineTag::Limited => "limited",
            BaselineTag::Newly => "newly",
            BaselineTag::Widely => "widely",
        };
        f.write_str(s)
    }
}

/// Whether a browser has shipped a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserSupportStatus {
    Unavailable,
    Available,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserImpl {
    pub status: BrowserSupportStatus,
    pub version: Option<String>,
}

/// A single feature's catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub name: String,
    pub baseline: BaselineStatus,
    pub browsers: BTreeMap<BrowserName, BrowserImpl>,
    pub spec_links: Vec<String>,
    pub discouraged: bool,
}

/// A full catalog snapshot: canonical key to feature record.
///
/// Invariant: keys are unique (guaranteed by the `BTreeMap`); every key
/// referenced elsewhere either exists here or appears in the
/// moved/split registry — that cross-structure invariant is enforced by
/// `notice-migrate`, not by this type.
pub type FeatureCatalog = BTreeMap<FeatureKey, FeatureRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_dashed_keys() {
        assert!(FeatureKey::new("canvas-2d-color-management").is_ok());
        assert!(FeatureKey::new("grid").is_ok());
    }

    #[test]
    fn rejects_uppercase_or_empty() {
        assert!(FeatureKey::new("Grid").is_err());
        assert!(FeatureKey::new("").is_err());
        assert!(FeatureKey::new("grid_layout").is_err());
    }

    #[test]
    fn baseline_tag_ignores_dates() {
        let a = BaselineStatus::Newly {
            low_date: Some(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
        };
        let b = BaselineStatus::Newly { low_date: None };
        assert_eq!(a.tag(), b.tag());
    }
}
