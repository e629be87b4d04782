//! Persistence abstraction for the answer engine.
//!
//! The engine calls out to an [`InteractionStore`] for everything it
//! records or restores. Every write is best-effort from the engine's point
//! of view: failures are logged and never undo an in-memory change.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`save_interaction`](InteractionStore::save_interaction) | Record a served query/response pair |
//! | [`log_interaction`](InteractionStore::log_interaction) | Record a rated pair from feedback |
//! | [`save_feedback`](InteractionStore::save_feedback) | Record raw feedback |
//! | [`upsert_discovered_intent`](InteractionStore::upsert_discovered_intent) | Append a phrase to a discovered cluster |
//! | [`load_discovered_intents`](InteractionStore::load_discovered_intents) | Restore discovered clusters |
//! | [`promote_discovered_intent`](InteractionStore::promote_discovered_intent) | Record a promoted intent and drop its cluster |
//! | [`load_intents`](InteractionStore::load_intents) | Restore promoted intents |
//! | [`save_training_data`](InteractionStore::save_training_data) | Record a training entry |
//! | [`load_training_data`](InteractionStore::load_training_data) | Restore training entries |
//! | [`load_interactions`](InteractionStore::load_interactions) | Interactions to fold into a retrain corpus |

pub mod memory;
pub mod sqlite;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Feedback, Intent, Interaction, TrainingData};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Separator between phrases of a persisted phrase list.
pub const PHRASE_SEPARATOR: char = ';';

const PHRASE_ESCAPE: char = '\\';

#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn save_interaction(&self, query: &str, response: &str) -> Result<()>;

    async fn log_interaction(&self, query: &str, response: &str, rating: i64) -> Result<()>;

    async fn save_feedback(&self, feedback: &Feedback) -> Result<()>;

    /// Create the cluster row, or append `phrase` to it after a `;`.
    /// Implementations that join phrases escape them with [`escape_phrase`].
    async fn upsert_discovered_intent(&self, cluster_key: &str, phrase: &str) -> Result<()>;

    async fn load_discovered_intents(&self) -> Result<BTreeMap<String, Vec<String>>>;

    /// Store `intent` and remove the discovered row for `cluster_key`.
    async fn promote_discovered_intent(&self, cluster_key: &str, intent: &Intent) -> Result<()>;

    /// Promoted intents, in promotion order.
    async fn load_intents(&self) -> Result<Vec<Intent>>;

    async fn save_training_data(&self, entry: &TrainingData) -> Result<()>;

    /// Training entries, in insertion order.
    async fn load_training_data(&self) -> Result<Vec<TrainingData>>;

    /// Served interactions, in insertion order.
    async fn load_interactions(&self) -> Result<Vec<Interaction>>;
}

/// Escape one phrase for a `;`-joined list. A literal `;` or `\` inside
/// the phrase is prefixed with `\`.
pub fn escape_phrase(phrase: &str) -> String {
    let mut escaped = String::with_capacity(phrase.len());
    for c in phrase.chars() {
        if c == PHRASE_SEPARATOR || c == PHRASE_ESCAPE {
            escaped.push(PHRASE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Split a persisted `;`-joined phrase list, undoing [`escape_phrase`].
/// Empty segments are dropped.
pub fn split_phrases(joined: &str) -> Vec<String> {
    let mut phrases = Vec::new();
    let mut current = String::new();
    let mut chars = joined.chars();
    while let Some(c) = chars.next() {
        match c {
            PHRASE_ESCAPE => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            PHRASE_SEPARATOR => {
                if !current.is_empty() {
                    phrases.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        phrases.push(current);
    }
    phrases
}

pub fn join_phrases(phrases: &[String]) -> String {
    phrases
        .iter()
        .map(|p| escape_phrase(p))
        .collect::<Vec<_>>()
        .join(&PHRASE_SEPARATOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_phrases() {
        assert_eq!(split_phrases("a b;c d"), vec!["a b", "c d"]);
        assert_eq!(split_phrases(";a;;"), vec!["a"]);
        assert!(split_phrases("").is_empty());
    }

    #[test]
    fn test_join_phrases() {
        let phrases = vec!["one".to_string(), "two".to_string()];
        assert_eq!(join_phrases(&phrases), "one;two");
    }

    #[test]
    fn test_separator_inside_phrase_survives() {
        let phrases = vec![
            "zzz qqq www; a; b".to_string(),
            r"back\slash".to_string(),
            "plain".to_string(),
        ];
        let joined = join_phrases(&phrases);
        assert_eq!(joined, r"zzz qqq www\; a\; b;back\\slash;plain");
        assert_eq!(split_phrases(&joined), phrases);
    }
}
