use notice_types::{FeatureCatalog, FeatureKey, SnapshotEntry, StateSnapshot};

/// Build a [`StateSnapshot`] from the subset of `catalog` whose keys
/// satisfy `matches`. Entries are ordered ascending by `feature_key` and
/// serialize to the same bytes for the same matched set, so the
/// resulting blob is content-addressable.
pub fn from_matches(
    catalog: &FeatureCatalog,
    matches: impl Fn(&FeatureKey) -> bool,
) -> StateSnapshot {
    let entries = catalog
        .iter()
        .filter(|(key, _)| matches(key))
        .map(|(key, record)| SnapshotEntry {
            feature_key: key.clone(),
            name: record.name.clone(),
            baseline: record.baseline.clone(),
            browsers: record
                .browsers
                .iter()
                .map(|(name, impl_)| (name.clone(), impl_.status))
                .collect(),
        })
        .collect();

    StateSnapshot::new(entries)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use notice_types::{BaselineStatus, BrowserImpl, BrowserSupportStatus, FeatureRecord};

    use super::*;

    #[test]
    fn selects_only_matching_keys_in_ascending_order() {
        let mut catalog = FeatureCatalog::new();
        catalog.insert(
            FeatureKey::new("zzz").unwrap(),
            FeatureRecord {
                name: "Zzz".to_string(),
                baseline: BaselineStatus::Limited,
                browsers: BTreeMap::new(),
                spec_links: Vec::new(),
                discouraged: false,
            },
        );
        catalog.insert(
            FeatureKey::new("aaa").unwrap(),
            FeatureRecord {
                name: "Aaa".to_string(),
                baseline: BaselineStatus::Limited,
                browsers: BTreeMap::from([(
                    notice_types::BrowserName("chrome".to_string()),
                    BrowserImpl {
                        status: BrowserSupportStatus::Available,
                        version: Some("120".to_string()),
                    },
                )]),
                spec_links: Vec::new(),
                discouraged: false,
            },
        );
        catalog.insert(
            FeatureKey::new("excluded").unwrap(),
            FeatureRecord {
                name: "Excluded".to_string(),
                baseline: BaselineStatus::Limited,
                browsers: BTreeMap::new(),
                spec_links: Vec::new(),
                discouraged: false,
            },
        );

        let snapshot = from_matches(&catalog, |k| k.as_str() != "excluded");
        let keys: Vec<_> = snapshot.entries().iter().map(|e| e.feature_key.as_str()).collect();
        assert_eq!(keys, vec!["aaa", "zzz"]);
    }

    #[test]
    fn identical_matches_serialize_byte_identical() {
        let mut catalog = FeatureCatalog::new();
        catalog.insert(
            FeatureKey::new("grid").unwrap(),
            FeatureRecord {
                name: "Grid".to_string(),
                baseline: BaselineStatus::Limited,
                browsers: BTreeMap::new(),
                spec_links: Vec::new(),
                discouraged: false,
            },
        );

        let a = from_matches(&catalog, |_| true);
        let b = from_matches(&catalog, |_| true);
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }
}
