//! In-memory [`InteractionStore`] for tests and embedded use.
//!
//! Tables are plain `Vec`s and maps behind one `std::sync::RwLock`.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Feedback, Intent, Interaction, TrainingData};

use super::InteractionStore;

/// A rated interaction, as written by `log_interaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatedInteraction {
    pub query: String,
    pub response: String,
    pub rating: i64,
}

#[derive(Default)]
struct Tables {
    interactions: Vec<Interaction>,
    interaction_logs: Vec<RatedInteraction>,
    feedback: Vec<Feedback>,
    discovered: BTreeMap<String, Vec<String>>,
    intents: Vec<Intent>,
    training: Vec<TrainingData>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    pub fn interaction_logs(&self) -> Result<Vec<RatedInteraction>> {
        Ok(self.read()?.interaction_logs.clone())
    }

    pub fn feedback(&self) -> Result<Vec<Feedback>> {
        Ok(self.read()?.feedback.clone())
    }
}

#[async_trait]
impl InteractionStore for MemoryStore {
    async fn save_interaction(&self, query: &str, response: &str) -> Result<()> {
        self.write()?.interactions.push(Interaction {
            query: query.to_string(),
            response: response.to_string(),
        });
        Ok(())
    }

    async fn log_interaction(&self, query: &str, response: &str, rating: i64) -> Result<()> {
        self.write()?.interaction_logs.push(RatedInteraction {
            query: query.to_string(),
            response: response.to_string(),
            rating,
        });
        Ok(())
    }

    async fn save_feedback(&self, feedback: &Feedback) -> Result<()> {
        self.write()?.feedback.push(feedback.clone());
        Ok(())
    }

    async fn upsert_discovered_intent(&self, cluster_key: &str, phrase: &str) -> Result<()> {
        self.write()?
            .discovered
            .entry(cluster_key.to_string())
            .or_default()
            .push(phrase.to_string());
        Ok(())
    }

    async fn load_discovered_intents(&self) -> Result<BTreeMap<String, Vec<String>>> {
        Ok(self.read()?.discovered.clone())
    }

    async fn promote_discovered_intent(&self, cluster_key: &str, intent: &Intent) -> Result<()> {
        let mut tables = self.write()?;
        tables.discovered.remove(cluster_key);
        match tables.intents.iter_mut().find(|i| i.name == intent.name) {
            Some(existing) => existing
                .training_phrases
                .extend(intent.training_phrases.iter().cloned()),
            None => tables.intents.push(intent.clone()),
        }
        Ok(())
    }

    async fn load_intents(&self) -> Result<Vec<Intent>> {
        Ok(self.read()?.intents.clone())
    }

    async fn save_training_data(&self, entry: &TrainingData) -> Result<()> {
        self.write()?.training.push(entry.clone());
        Ok(())
    }

    async fn load_training_data(&self) -> Result<Vec<TrainingData>> {
        Ok(self.read()?.training.clone())
    }

    async fn load_interactions(&self) -> Result<Vec<Interaction>> {
        Ok(self.read()?.interactions.clone())
    }
}
