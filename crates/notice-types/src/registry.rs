//! The moved/split registry: persistent redirects from retired
//! historical feature keys onto today's canonical keys.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::feature::FeatureKey;

/// Maximum length of a `Moved` redirect chain we will follow before
/// concluding the registry is malformed. Transitively following
/// `Moved` entries must terminate within a bounded chain.
pub const MAX_MOVED_CHAIN: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovedSplitRegistry {
    moved: BTreeMap<FeatureKey, FeatureKey>,
    split: BTreeMap<FeatureKey, BTreeSet<FeatureKey>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("moved registry maps {0} back onto itself")]
    SelfMapping(FeatureKey),
    #[error("moved registry chain starting at {0} exceeds {MAX_MOVED_CHAIN} hops")]
    ChainTooLong(FeatureKey),
    #[error("key {0} appears in both the moved and split registries")]
    MovedAndSplit(FeatureKey),
}

impl MovedSplitRegistry {
    pub fn new(
        moved: BTreeMap<FeatureKey, FeatureKey>,
        split: BTreeMap<FeatureKey, BTreeSet<FeatureKey>>,
    ) -> Result<Self, RegistryError> {
        for (old, new) in &moved {
            if old == new {
                return Err(RegistryError::SelfMapping(old.clone()));
            }
            if split.contains_key(old) {
                return Err(RegistryError::MovedAndSplit(old.clone()));
            }
        }
        let registry = Self { moved, split };
        for old in registry.moved.keys() {
            registry.resolve(old)?;
        }
        Ok(registry)
    }

    /// Follow the `moved` chain starting at `key` to its terminal
    /// canonical key, bounded by [`MAX_MOVED_CHAIN`].
    pub fn resolve(&self, key: &FeatureKey) -> Result<FeatureKey, RegistryError> {
        let mut current = key.clone();
        for _ in 0..MAX_MOVED_CHAIN {
            match self.moved.get(&current) {
                Some(next) => current = next.clone(),
                None => return Ok(current),
            }
        }
        Err(RegistryError::ChainTooLong(key.clone()))
    }

    pub fn moved_target(&self, old: &FeatureKey) -> Option<&FeatureKey> {
        self.moved.get(old)
    }

    pub fn split_targets(&self, old: &FeatureKey) -> Option<&BTreeSet<FeatureKey>> {
        self.split.get(old)
    }

    pub fn moved_entries(&self) -> impl Iterator<Item = (&FeatureKey, &FeatureKey)> {
        self.moved.iter()
    }

    pub fn split_entries(&self) -> impl Iterator<Item = (&FeatureKey, &BTreeSet<FeatureKey>)> {
        self.split.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> FeatureKey {
        FeatureKey::new(s).unwrap()
    }

    #[test]
    fn rejects_self_mapping() {
        let moved = BTreeMap::from([(key("grid"), key("grid"))]);
        let err = MovedSplitRegistry::new(moved, BTreeMap::new()).unwrap_err();
        assert_eq!(err, RegistryError::SelfMapping(key("grid")));
    }

    #[test]
    fn resolves_multi_hop_chains() {
        let moved = BTreeMap::from([(key("a"), key("b")), (key("b"), key("c"))]);
        let reg = MovedSplitRegistry::new(moved, BTreeMap::new()).unwrap();
        assert_eq!(reg.resolve(&key("a")).unwrap(), key("c"));
    }

    #[test]
    fn rejects_cycles_as_chain_too_long() {
        let moved = BTreeMap::from([(key("a"), key("b")), (key("b"), key("a"))]);
        assert!(MovedSplitRegistry::new(moved, BTreeMap::new()).is_err());
    }

    #[test]
    fn rejects_key_in_both_registries() {
        let moved = BTreeMap::from([(key("old"), key("new"))]);
        let split = BTreeMap::from([(key("old"), BTreeSet::from([key("new2")]))]);
        assert!(MovedSplitRegistry::new(moved, split).is_err());
    }
}
