//! In-memory secret cache.
//!
//! Holds the last successfully fetched [`SecretSet`] for each tracked
//! [`SecretGroup`]. Reads are synchronous and never trigger a fetch; a
//! refresh swaps a whole set behind an `Arc`, so a reader sees either the
//! complete old set or the complete new one.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

use super::types::{SecretGroup, SecretSet, SecureValue};

/// Process-wide cache of the current secret values.
///
/// Constructed once at startup and shared by `Arc`. Only the lifecycle
/// manager replaces sets; everything else reads.
#[derive(Debug, Default)]
pub struct SecretCache {
    sets: RwLock<BTreeMap<SecretGroup, Arc<SecretSet>>>,
}

impl SecretCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a logical secret name across all groups.
    ///
    /// Groups are searched in [`SecretGroup::ALL`] order, so an application
    /// config key shadows a database key of the same name.
    pub fn get(&self, name: &str) -> Option<SecureValue> {
        let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
        SecretGroup::ALL
            .iter()
            .filter_map(|group| sets.get(group))
            .find_map(|set| set.get(name).cloned())
    }

    /// Look up a logical secret name within one group.
    pub fn get_in(&self, group: SecretGroup, name: &str) -> Option<SecureValue> {
        let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
        sets.get(&group).and_then(|set| set.get(name).cloned())
    }

    /// Snapshot of one group's current set.
    pub fn group(&self, group: SecretGroup) -> Option<Arc<SecretSet>> {
        let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
        sets.get(&group).cloned()
    }

    /// Snapshot of every populated group.
    pub fn snapshot(&self) -> Vec<(SecretGroup, Arc<SecretSet>)> {
        let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
        sets.iter().map(|(group, set)| (*group, Arc::clone(set))).collect()
    }

    /// Raw value for the debug/admin surface.
    ///
    /// Deliberately named apart from [`get`](Self::get); every call is logged
    /// (name only) so reveals are auditable.
    pub fn reveal_for_debug(&self, name: &str) -> Option<String> {
        let value = self.get(name)?;
        warn!(secret = %name, "Secret value revealed through debug access");
        Some(value.reveal().to_string())
    }

    /// Atomically swap the stored set for `group`, returning the previous one.
    pub(crate) fn replace(&self, group: SecretGroup, set: SecretSet) -> Option<Arc<SecretSet>> {
        let key_count = set.len();
        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
        let previous = sets.insert(group, Arc::new(set));
        debug!(group = %group, key_count, "Replaced cached secret set");
        previous
    }

    /// Total number of logical secrets across all groups.
    pub fn len(&self) -> usize {
        let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
        sets.values().map(|set| set.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_returns_none() {
        let cache = SecretCache::new();
        assert!(cache.get("API_KEY").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replace_and_get() {
        let cache = SecretCache::new();
        cache.replace(SecretGroup::AppConfig, SecretSet::from_pairs([("API_KEY", "k1")]));
        cache.replace(SecretGroup::Database, SecretSet::from_pairs([("password", "p1")]));

        assert_eq!(cache.get("API_KEY").unwrap().reveal(), "k1");
        assert_eq!(cache.get("password").unwrap().reveal(), "p1");
        assert!(cache.get_in(SecretGroup::AppConfig, "password").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_replace_swaps_whole_set() {
        let cache = SecretCache::new();
        cache.replace(SecretGroup::Database, SecretSet::from_pairs([("user", "a"), ("old", "x")]));

        let previous =
            cache.replace(SecretGroup::Database, SecretSet::from_pairs([("user", "b")])).unwrap();

        assert!(previous.contains("old"));
        assert!(cache.get("old").is_none());
        assert_eq!(cache.get("user").unwrap().reveal(), "b");
    }

    #[test]
    fn test_app_config_shadows_database() {
        let cache = SecretCache::new();
        cache.replace(SecretGroup::Database, SecretSet::from_pairs([("DB_HOST", "db")]));
        cache.replace(SecretGroup::AppConfig, SecretSet::from_pairs([("DB_HOST", "app")]));

        assert_eq!(cache.get("DB_HOST").unwrap().reveal(), "app");
        assert_eq!(cache.get_in(SecretGroup::Database, "DB_HOST").unwrap().reveal(), "db");
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let cache = SecretCache::new();
        cache.replace(SecretGroup::AppConfig, SecretSet::from_pairs([("API_KEY", "k1")]));
        let held = cache.group(SecretGroup::AppConfig).unwrap();

        cache.replace(SecretGroup::AppConfig, SecretSet::from_pairs([("API_KEY", "k2")]));

        // A reader holding the old Arc still sees the complete old set.
        assert_eq!(held.get("API_KEY").unwrap().reveal(), "k1");
        assert_eq!(cache.get("API_KEY").unwrap().reveal(), "k2");
    }

    #[test]
    fn test_reveal_for_debug() {
        let cache = SecretCache::new();
        cache.replace(SecretGroup::AppConfig, SecretSet::from_pairs([("API_KEY", "raw")]));

        assert_eq!(cache.reveal_for_debug("API_KEY").as_deref(), Some("raw"));
        assert!(cache.reveal_for_debug("NOPE").is_none());
    }

    #[test]
    fn test_concurrent_readers_never_see_mixed_sets() {
        let cache = Arc::new(SecretCache::new());
        cache.replace(SecretGroup::Database, SecretSet::from_pairs([("user", "v0"), ("pass", "v0")]));

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 1..200 {
                    let tag = format!("v{}", i);
                    cache.replace(
                        SecretGroup::Database,
                        SecretSet::from_pairs([("user", tag.clone()), ("pass", tag)]),
                    );
                }
            })
        };

        for _ in 0..500 {
            let set = cache.group(SecretGroup::Database).unwrap();
            assert_eq!(set.get("user").unwrap().reveal(), set.get("pass").unwrap().reveal());
        }
        writer.join().unwrap();
    }
}
