//! The Feature-Key Migrator: before any per-feature join,
//! rewrite historical `feature_key → X` maps onto the current catalog's
//! canonical keys, honouring the moved/split registry and detecting
//! collisions.
//!
//! This is deliberately generic over the caller's data structure: it is
//! called from multiple producers across the wider system and must
//! behave identically everywhere, so the rewrite itself is a
//! caller-supplied callback rather than baked into one concrete shape.

use std::collections::BTreeSet;

use notice_errors::MigrateError;
use notice_types::FeatureKey;

/// A split the caller must decide how to handle (fan out, drop, or
/// error). This component does not apply splits itself: the "correct"
/// rewrite depends on the caller's semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitNotice {
    pub old: FeatureKey,
    pub new_keys: Vec<FeatureKey>,
}

/// Rewrite every historical key in `data` onto its canonical key per
/// `registry`.
///
/// `present` is the set of keys currently in use by the caller's data,
/// computed once up front — not a live predicate over `data` — so that
/// collision detection reflects the caller's starting state rather than
/// an order-dependent view as earlier entries get rewritten in place.
///
/// For every `old -> new` entry in the moved registry where `old` is in
/// `present`: if `new` is also in `present`, this fails with
/// [`MigrateError::ConflictMigratingFeatureKey`] and `data` is left in
/// whatever state the callback has already mutated it to — callers
/// that need atomicity should operate on a scratch copy and swap it in
/// only on `Ok`. Otherwise `rewrite(old, new, data)` is invoked once.
///
/// Splits are not rewritten here; matching split entries are returned
/// in `splits` for the caller to apply.
pub fn migrate_keys<T>(
    registry: &notice_types::MovedSplitRegistry,
    present: &BTreeSet<FeatureKey>,
    data: &mut T,
    mut rewrite: impl FnMut(&FeatureKey, &FeatureKey, &mut T),
) -> Result<Vec<SplitNotice>, MigrateError> {
    for (old, new) in registry.moved_entries() {
        if !present.contains(old) {
            continue;
        }
        if present.contains(new) {
            return Err(MigrateError::ConflictMigratingFeatureKey {
                old: old.clone(),
                new: new.clone(),
            });
        }
        rewrite(old, new, data);
    }

    let mut splits = Vec::new();
    for (old, new_keys) in registry.split_entries() {
        if present.contains(old) {
            splits.push(SplitNotice {
                old: old.clone(),
                new_keys: new_keys.iter().cloned().collect(),
            });
        }
    }
    Ok(splits)
}
