use std::collections::{BTreeMap, BTreeSet};

use notice_types::{
    BaselineChange, FeatureKey, ImplChange, MovedFeature, Rename, SnapshotEntry, SplitFeature,
    StateSnapshot, UpdatedFeature,
};

/// Compute the diff from `previous` to `current`.
///
/// `previous` must already have had the Feature-Key Migrator's 1:1
/// moves applied to it so that renamed features line
/// up by key instead of showing up as a spurious removed+added pair.
/// `applied_moves` records exactly which `(old, new)` rewrites the
/// migrator performed this run, so the diff can still surface a `moved`
/// highlight even when a feature's attributes are otherwise identical
/// (a pure identity move carries no other visible change). `splits`
/// carries the migrator's split notices for old keys that were *not*
/// rewritten (and so must be excluded from the ordinary added/removed
/// comparison, since the new keys already appear there as `added`).
pub fn diff(
    previous: &StateSnapshot,
    current: &StateSnapshot,
    applied_moves: &[(FeatureKey, FeatureKey)],
    splits: &[(FeatureKey, Vec<FeatureKey>)],
) -> notice_types::Diff {
    let split_old_keys: BTreeSet<&FeatureKey> = splits.iter().map(|(old, _)| old).collect();

    let prev_map: BTreeMap<&FeatureKey, &SnapshotEntry> = previous
        .entries()
        .iter()
        .filter(|e| !split_old_keys.contains(&e.feature_key))
        .map(|e| (&e.feature_key, e))
        .collect();
    let cur_map: BTreeMap<&FeatureKey, &SnapshotEntry> = current
        .entries()
        .iter()
        .map(|e| (&e.feature_key, e))
        .collect();

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut updated = Vec::new();

    for (key, cur_entry) in &cur_map {
        match prev_map.get(key) {
            None => added.push((*cur_entry).clone()),
            Some(prev_entry) => {
                if let Some(u) = classify_update(prev_entry, cur_entry) {
                    updated.push(u);
                }
            }
        }
    }
    for (key, prev_entry) in &prev_map {
        if !cur_map.contains_key(key) {
            removed.push((*prev_entry).clone());
        }
    }

    added.sort_by(|a, b| a.feature_key.cmp(&b.feature_key));
    removed.sort_by(|a, b| a.feature_key.cmp(&b.feature_key));
    updated.sort_by(|a, b| a.feature_key.cmp(&b.feature_key));

    let moved = applied_moves
        .iter()
        .map(|(old, new)| MovedFeature {
            old_key: old.clone(),
            new_key: new.clone(),
        })
        .collect();

    let split = splits
        .iter()
        .map(|(old, news)| SplitFeature {
            old_key: old.clone(),
            new_keys: news.clone(),
        })
        .collect();

    notice_types::Diff {
        added,
        removed,
        moved,
        split,
        updated,
    }
}

fn classify_update(prev: &SnapshotEntry, cur: &SnapshotEntry) -> Option<UpdatedFeature> {
    let rename = if prev.name != cur.name {
        Some(Rename {
            from: prev.name.clone(),
            to: cur.name.clone(),
        })
    } else {
        None
    };

    let baseline_change = if prev.baseline != cur.baseline {
        Some(BaselineChange {
            from: prev.baseline.tag(),
            to: cur.baseline.tag(),
            from_status: prev.baseline.clone(),
            to_status: cur.baseline.clone(),
        })
    } else {
        None
    };

    let mut impl_changes = Vec::new();
    let browsers: BTreeSet<_> = prev.browsers.keys().chain(cur.browsers.keys()).collect();
    for browser in browsers {
        let from = prev.browsers.get(browser).copied();
        let to = cur.browsers.get(browser).copied();
        if let (Some(from), Some(to)) = (from, to)
            && from != to
        {
            impl_changes.push(ImplChange {
                browser: browser.clone(),
                from,
                to,
            });
        }
    }
    impl_changes.sort_by(|a, b| a.browser.cmp(&b.browser));

    if rename.is_none() && baseline_change.is_none() && impl_changes.is_empty() {
        return None;
    }

    Some(UpdatedFeature {
        feature_key: cur.feature_key.clone(),
        rename,
        baseline_change,
        impl_changes,
    })
}

/// Reconstruct `current` by applying `diff` to `previous`. Must be the
/// exact inverse of [`diff`].
pub fn apply(previous: &StateSnapshot, diff: &notice_types::Diff) -> StateSnapshot {
    let mut entries: BTreeMap<FeatureKey, SnapshotEntry> = previous
        .entries()
        .iter()
        .map(|e| (e.feature_key.clone(), e.clone()))
        .collect();

    for removed in &diff.removed {
        entries.remove(&removed.feature_key);
    }
    for split in &diff.split {
        entries.remove(&split.old_key);
    }

    let updates_by_key: BTreeMap<&FeatureKey, &UpdatedFeature> = diff
        .updated
        .iter()
        .map(|u| (&u.feature_key, u))
        .collect();

    for moved in &diff.moved {
        if let Some(mut entry) = entries.remove(&moved.old_key) {
            entry.feature_key = moved.new_key.clone();
            if let Some(update) = updates_by_key.get(&moved.new_key) {
                apply_update(&mut entry, update);
            }
            entries.insert(moved.new_key.clone(), entry);
        }
    }

    for update in &diff.updated {
        if let Some(entry) = entries.get_mut(&update.feature_key) {
            apply_update(entry, update);
        }
    }

    for added in &diff.added {
        entries.insert(added.feature_key.clone(), added.clone());
    }

    StateSnapshot::new(entries.into_values().collect())
}

fn apply_update(entry: &mut SnapshotEntry, update: &UpdatedFeature) {
    if let Some(rename) = &update.rename {
        entry.name = rename.to.clone();
    }
    if let Some(change) = &update.baseline_change {
        entry.baseline = change.to_status.clone();
    }
    for change in &update.impl_changes {
        entry.browsers.insert(change.browser.clone(), change.to);
    }
}
