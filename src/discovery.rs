//! Discovery of unrecognized query clusters and their promotion to intents.
//!
//! Unmatched queries are lowercased and grouped under a key made of their
//! first three words. Once a cluster holds `threshold` queries, a promotion
//! sweep turns it into an [`Intent`] named after the key and removes the
//! cluster. A later query under the same key starts a fresh cluster.

use std::collections::BTreeMap;

use crate::models::Intent;

/// Queries a cluster needs before it is promoted.
pub const DEFAULT_PROMOTION_THRESHOLD: usize = 3;

const KEY_WORDS: usize = 3;

/// Lowercase a query for clustering.
pub fn normalize_query(query: &str) -> String {
    query.to_lowercase()
}

/// Join the first (up to) three words with `_`.
///
/// A query with no words is its own key.
pub fn derive_cluster_key(normalized: &str) -> String {
    let words: Vec<&str> = normalized.split_whitespace().take(KEY_WORDS).collect();
    if words.is_empty() {
        return normalized.to_string();
    }
    words.join("_")
}

/// A query recorded into a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub cluster_key: String,
    pub phrase: String,
}

/// Cluster key → normalized queries, in arrival order.
#[derive(Debug, Clone)]
pub struct DiscoveryMap {
    clusters: BTreeMap<String, Vec<String>>,
    threshold: usize,
}

impl DiscoveryMap {
    pub fn new(threshold: usize) -> Self {
        Self {
            clusters: BTreeMap::new(),
            threshold: threshold.max(1),
        }
    }

    /// Start from clusters restored from persistence.
    pub fn with_clusters(threshold: usize, clusters: BTreeMap<String, Vec<String>>) -> Self {
        let mut map = Self::new(threshold);
        map.clusters = clusters
            .into_iter()
            .filter(|(_, phrases)| !phrases.is_empty())
            .collect();
        map
    }

    /// Append a query to its cluster, creating the cluster if needed.
    ///
    /// Blank queries are ignored.
    pub fn record(&mut self, query: &str) -> Option<Recorded> {
        if query.trim().is_empty() {
            return None;
        }
        let phrase = normalize_query(query);
        let cluster_key = derive_cluster_key(&phrase);
        self.clusters
            .entry(cluster_key.clone())
            .or_default()
            .push(phrase.clone());
        Some(Recorded {
            cluster_key,
            phrase,
        })
    }

    /// Remove every cluster at or above the threshold and return them as
    /// intents, ordered by cluster key.
    pub fn promote_ready(&mut self) -> Vec<Intent> {
        let threshold = self.threshold;
        let ready: Vec<String> = self
            .clusters
            .iter()
            .filter(|(_, phrases)| phrases.len() >= threshold)
            .map(|(key, _)| key.clone())
            .collect();

        ready
            .into_iter()
            .filter_map(|key| {
                self.clusters
                    .remove(&key)
                    .map(|phrases| Intent::new(key, phrases))
            })
            .collect()
    }

    pub fn cluster(&self, key: &str) -> Option<&[String]> {
        self.clusters.get(key).map(Vec::as_slice)
    }

    pub fn clusters(&self) -> &BTreeMap<String, Vec<String>> {
        &self.clusters
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_key_first_three_words() {
        let key = derive_cluster_key(&normalize_query("Hello World Foo Bar"));
        assert_eq!(key, "hello_world_foo");
    }

    #[test]
    fn test_cluster_key_short_query() {
        assert_eq!(derive_cluster_key("hi"), "hi");
        assert_eq!(derive_cluster_key("hi there"), "hi_there");
    }

    #[test]
    fn test_cluster_key_no_words() {
        assert_eq!(derive_cluster_key(""), "");
        assert_eq!(derive_cluster_key("  "), "  ");
    }

    #[test]
    fn test_record_groups_by_key() {
        let mut map = DiscoveryMap::new(3);
        let r = map.record("How Do I close a channel").unwrap();
        assert_eq!(r.cluster_key, "how_do_i");
        assert_eq!(r.phrase, "how do i close a channel");
        map.record("how do i range over a map");
        assert_eq!(map.cluster("how_do_i").unwrap().len(), 2);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_record_ignores_blank() {
        let mut map = DiscoveryMap::new(3);
        assert!(map.record("   ").is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn test_promotion_at_threshold() {
        let mut map = DiscoveryMap::new(3);
        map.record("what is a goroutine");
        map.record("what is a channel");
        assert!(map.promote_ready().is_empty());

        map.record("what is a slice");
        let promoted = map.promote_ready();
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].name, "what_is_a");
        assert_eq!(
            promoted[0].training_phrases,
            vec!["what is a goroutine", "what is a channel", "what is a slice"]
        );
        assert!(map.cluster("what_is_a").is_none());

        // exactly once
        assert!(map.promote_ready().is_empty());

        map.record("what is a struct");
        assert_eq!(map.cluster("what_is_a").unwrap(), ["what is a struct"]);
    }

    #[test]
    fn test_promotion_leaves_small_clusters() {
        let mut map = DiscoveryMap::new(2);
        map.record("alpha beta gamma one");
        map.record("alpha beta gamma two");
        map.record("delta epsilon");
        let promoted = map.promote_ready();
        assert_eq!(promoted.len(), 1);
        assert_eq!(map.len(), 1);
        assert!(map.cluster("delta_epsilon").is_some());
    }

    #[test]
    fn test_restored_clusters() {
        let mut restored = BTreeMap::new();
        restored.insert("a_b_c".to_string(), vec!["a b c".to_string(); 3]);
        restored.insert("empty".to_string(), Vec::new());
        let mut map = DiscoveryMap::with_clusters(3, restored);
        assert_eq!(map.len(), 1);
        assert_eq!(map.promote_ready().len(), 1);
    }
}
