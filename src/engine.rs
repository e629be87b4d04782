//! The answer engine: one owned aggregate behind serialized operations.
//!
//! ```text
//!   query ──▶ normalize ──▶ VSM vector ──┬──▶ KNN over dataset ──▶ answer
//!                                        └──▶ intent classifier
//!                                                  │ unmatched
//!                                                  ▼
//!                                           discovery map ──▶ validate() ──▶ new intent
//! ```
//!
//! # Locking
//!
//! All mutable state (model snapshot, dataset, intents, classifier,
//! discovery map, keywords, topics) lives in one [`EngineState`] behind a
//! `tokio::sync::RwLock`. Queries take the read lock and always see a
//! complete snapshot. Two further mutexes order the writers:
//!
//! | Lock | Held by | Guarantees |
//! |------|---------|------------|
//! | `retrain_lock` | retrain, training intake, the blocking build itself | at most one retrain at a time, counting builds abandoned after a timeout |
//! | `discovery_lock` | unmatched-query recording, promotion sweep | at most one sweep; store writes follow memory order |
//!
//! A retrain builds the new model off the async runtime, bounded by the
//! configured timeout, and swaps it in under the write lock together with
//! recomputed dataset vectors. A build that times out is told to stop and
//! keeps `retrain_lock` until it has. A failed retrain leaves the old snapshot in
//! place.
//!
//! Store calls are made outside the state lock and are best-effort: errors
//! are logged and never undo an in-memory change.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::classifier::{Classification, IntentClassifier};
use crate::config::Config;
use crate::corpus;
use crate::discovery::DiscoveryMap;
use crate::error::EngineError;
use crate::keywords::{self, Keyword};
use crate::knn;
use crate::models::{DataPoint, Feedback, Intent, TrainingData};
use crate::store::InteractionStore;
use crate::topics::{self, Topic, TopicIndex};
use crate::vsm::{SparseVector, VectorSpaceModel};

/// Result of answering one query.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub classification: Classification,
}

/// Summary of a completed retrain.
#[derive(Debug, Clone, Serialize)]
pub struct RetrainReport {
    pub documents: usize,
    pub vocabulary: usize,
    pub datapoints: usize,
}

/// Active intents plus clusters still awaiting promotion.
#[derive(Debug, Clone, Serialize)]
pub struct IntentsView {
    pub intents: Vec<Intent>,
    pub discovered: BTreeMap<String, Vec<String>>,
}

struct Settings {
    corpus_path: PathBuf,
    k: usize,
    keyword_top_n: usize,
    min_confidence: f64,
    retrain_timeout: Duration,
    include_interactions: bool,
}

/// Corpus-derived artifacts rebuilt together on every retrain.
struct Snapshot {
    model: VectorSpaceModel,
    keywords: Vec<Keyword>,
    topics: TopicIndex,
}

impl Snapshot {
    /// `documents` is the full training corpus; the first `corpus_len`
    /// entries are the corpus file itself.
    fn build(documents: &[String], corpus_len: usize, top_n: usize, entities: &[Topic]) -> Self {
        let corpus_lines = &documents[..corpus_len.min(documents.len())];
        Self {
            model: VectorSpaceModel::build(documents),
            keywords: keywords::extract_keywords(corpus_lines, top_n),
            topics: TopicIndex::build(entities, corpus_lines),
        }
    }

    /// Same as [`build`](Self::build), giving up once `cancel` is set.
    fn build_cancellable(
        documents: &[String],
        corpus_len: usize,
        top_n: usize,
        entities: &[Topic],
        cancel: &AtomicBool,
    ) -> Option<Self> {
        let corpus_lines = &documents[..corpus_len.min(documents.len())];
        let model = VectorSpaceModel::build_cancellable(documents, cancel)?;
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        Some(Self {
            model,
            keywords: keywords::extract_keywords(corpus_lines, top_n),
            topics: TopicIndex::build(entities, corpus_lines),
        })
    }
}

struct EngineState {
    model: VectorSpaceModel,
    keywords: Vec<Keyword>,
    topics: TopicIndex,
    dataset: Vec<DataPoint>,
    intents: Vec<Intent>,
    classifier: IntentClassifier,
    discovery: DiscoveryMap,
}

impl EngineState {
    fn install(&mut self, snapshot: Snapshot, vectors: Vec<SparseVector>) {
        self.model = snapshot.model;
        self.keywords = snapshot.keywords;
        self.topics = snapshot.topics;

        let mut vectors = vectors.into_iter();
        for point in &mut self.dataset {
            let vector = match vectors.next() {
                Some(v) => v,
                None => self.model.vectorize(&point.answer),
            };
            point.vector = Some(vector);
        }
    }

    fn compose(&self, query: &str, k: usize) -> String {
        let vector = self.model.vectorize(query);
        let answer = knn::retrieve(&vector, &self.dataset, k).ok();
        let related = keywords::related_keywords(&self.keywords, query);
        let found = self.topics.lookup(query);

        let mut text = match answer {
            Some(answer) => answer.to_string(),
            None => topics::describe(&found),
        };
        if !related.is_empty() {
            text.push_str("\n\nRelated Keywords: ");
            text.push_str(&related.join(", "));
        }
        if answer.is_some() && !found.is_empty() {
            let names: Vec<&str> = found.iter().map(|t| t.name.as_str()).collect();
            text.push_str("\n\nRelated Topics: ");
            text.push_str(&names.join(", "));
        }
        text
    }
}

/// Append `intent`, or merge its phrases into an existing intent of the
/// same name.
fn merge_intent(intents: &mut Vec<Intent>, intent: Intent) {
    match intents.iter_mut().find(|i| i.name == intent.name) {
        Some(existing) => existing.training_phrases.extend(intent.training_phrases),
        None => intents.push(intent),
    }
}

pub struct Engine {
    state: RwLock<EngineState>,
    store: Arc<dyn InteractionStore>,
    retrain_lock: Arc<Mutex<()>>,
    discovery_lock: Mutex<()>,
    replies: HashMap<String, String>,
    entities: Arc<Vec<Topic>>,
    settings: Settings,
}

impl Engine {
    /// Load the corpus, build the initial model and restore persisted state.
    ///
    /// A corpus that cannot be read is fatal. Store failures during
    /// restoration are logged and the engine starts without that data.
    pub async fn start(config: &Config, store: Arc<dyn InteractionStore>) -> Result<Self> {
        let settings = Settings {
            corpus_path: config.corpus.path.clone(),
            k: config.retrieval.k,
            keyword_top_n: config.retrieval.keyword_top_n,
            min_confidence: config.intents.min_confidence,
            retrain_timeout: config.schedule.retrain_timeout(),
            include_interactions: config.schedule.include_interactions,
        };

        let documents = corpus::load_corpus(&settings.corpus_path).await?;

        let entities = match &config.corpus.keyword_entities {
            Some(path) => match corpus::load_entities(path).await {
                Ok(entities) => entities,
                Err(e) => {
                    warn!(error = %e, "keyword entities unavailable, continuing without them");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let snapshot = Snapshot::build(
            &documents,
            documents.len(),
            settings.keyword_top_n,
            &entities,
        );

        let training = store.load_training_data().await.unwrap_or_else(|e| {
            warn!(error = %format!("{e:#}"), "failed to restore training data");
            Vec::new()
        });
        let dataset: Vec<DataPoint> = training
            .into_iter()
            .map(|entry| DataPoint {
                vector: Some(snapshot.model.vectorize(&entry.answer)),
                answer: entry.answer,
                intent: entry.intent,
            })
            .collect();

        let mut intents: Vec<Intent> = config.intents.seed.iter().map(|s| s.to_intent()).collect();
        let promoted = store.load_intents().await.unwrap_or_else(|e| {
            warn!(error = %format!("{e:#}"), "failed to restore promoted intents");
            Vec::new()
        });
        for intent in promoted {
            merge_intent(&mut intents, intent);
        }

        let clusters = store.load_discovered_intents().await.unwrap_or_else(|e| {
            warn!(error = %format!("{e:#}"), "failed to restore discovered intents");
            BTreeMap::new()
        });
        let discovery = DiscoveryMap::with_clusters(config.intents.promotion_threshold, clusters);

        let replies: HashMap<String, String> = config
            .intents
            .seed
            .iter()
            .filter_map(|s| s.reply.clone().map(|r| (s.name.clone(), r)))
            .collect();

        info!(
            documents = documents.len(),
            vocabulary = snapshot.model.vocabulary_size(),
            datapoints = dataset.len(),
            intents = intents.len(),
            clusters = discovery.len(),
            "engine started"
        );

        let classifier = IntentClassifier::new(&intents, settings.min_confidence);
        let state = EngineState {
            model: snapshot.model,
            keywords: snapshot.keywords,
            topics: snapshot.topics,
            dataset,
            intents,
            classifier,
            discovery,
        };

        Ok(Self {
            state: RwLock::new(state),
            store,
            retrain_lock: Arc::new(Mutex::new(())),
            discovery_lock: Mutex::new(()),
            replies,
            entities: Arc::new(entities),
            settings,
        })
    }

    pub fn store(&self) -> &Arc<dyn InteractionStore> {
        &self.store
    }

    /// Answer a query, route it to discovery when no intent matches, and
    /// record the interaction.
    pub async fn answer(&self, query: &str) -> Answer {
        let (mut text, classification) = {
            let state = self.state.read().await;
            (
                state.compose(query, self.settings.k),
                state.classifier.classify(query),
            )
        };

        if let Some(reply) = classification.intent().and_then(|i| self.replies.get(i)) {
            text = reply.clone();
        }

        if !classification.is_matched() {
            self.record_unmatched(query).await;
        }

        if let Err(e) = self.store.save_interaction(query, &text).await {
            warn!(error = %format!("{e:#}"), "failed to save interaction");
        }

        Answer {
            text,
            classification,
        }
    }

    pub async fn classify(&self, query: &str) -> Classification {
        self.state.read().await.classifier.classify(query)
    }

    async fn record_unmatched(&self, query: &str) {
        let _order = self.discovery_lock.lock().await;
        let recorded = self.state.write().await.discovery.record(query);
        let Some(recorded) = recorded else {
            return;
        };
        debug!(cluster = %recorded.cluster_key, "recorded unmatched query");
        if let Err(e) = self
            .store
            .upsert_discovered_intent(&recorded.cluster_key, &recorded.phrase)
            .await
        {
            warn!(error = %format!("{e:#}"), cluster = %recorded.cluster_key, "failed to persist discovered intent");
        }
    }

    /// Promote every cluster that reached the threshold. Returns the new
    /// intents in cluster-key order.
    pub async fn validate(&self) -> Vec<Intent> {
        let _sweep = self.discovery_lock.lock().await;

        let promoted = {
            let mut state = self.state.write().await;
            let promoted = state.discovery.promote_ready();
            if !promoted.is_empty() {
                for intent in &promoted {
                    merge_intent(&mut state.intents, intent.clone());
                }
                let classifier = IntentClassifier::new(&state.intents, self.settings.min_confidence);
                state.classifier = classifier;
            }
            promoted
        };

        for intent in &promoted {
            info!(
                intent = %intent.name,
                phrases = intent.training_phrases.len(),
                "promoted discovered intent"
            );
            if let Err(e) = self.store.promote_discovered_intent(&intent.name, intent).await {
                warn!(error = %format!("{e:#}"), intent = %intent.name, "failed to persist promoted intent");
            }
        }
        promoted
    }

    /// Accept a training entry and retrain.
    ///
    /// Blank queries or answers are rejected without touching the dataset.
    /// If the retrain itself fails, the entry stays in the dataset with a
    /// vector from the current model.
    pub async fn train(&self, entry: TrainingData) -> Result<(), EngineError> {
        if entry.query.trim().is_empty() {
            return Err(EngineError::InvalidTraining("query must not be empty".into()));
        }
        if entry.answer.trim().is_empty() {
            return Err(EngineError::InvalidTraining("answer must not be empty".into()));
        }

        let retrain = Arc::clone(&self.retrain_lock).lock_owned().await;
        self.state
            .write()
            .await
            .dataset
            .push(DataPoint::new(entry.answer.clone(), entry.intent.clone()));

        if let Err(e) = self.store.save_training_data(&entry).await {
            warn!(error = %format!("{e:#}"), "failed to save training data");
        }

        if let Err(e) = self.retrain_locked(retrain).await {
            warn!(error = %e, "retrain after training failed, keeping previous model");
            let mut state = self.state.write().await;
            let EngineState { model, dataset, .. } = &mut *state;
            for point in dataset.iter_mut().filter(|p| p.vector.is_none()) {
                point.vector = Some(model.vectorize(&point.answer));
            }
        }
        Ok(())
    }

    /// Record feedback and its rated interaction.
    pub async fn feedback(&self, feedback: &Feedback) {
        if let Err(e) = self.store.save_feedback(feedback).await {
            warn!(error = %format!("{e:#}"), "failed to save feedback");
        }
        if let Err(e) = self
            .store
            .log_interaction(&feedback.query, &feedback.response, feedback.rating)
            .await
        {
            warn!(error = %format!("{e:#}"), "failed to log rated interaction");
        }
    }

    /// Rebuild the model, waiting for any retrain in progress.
    pub async fn retrain(&self) -> Result<RetrainReport, EngineError> {
        let retrain = Arc::clone(&self.retrain_lock).lock_owned().await;
        self.retrain_locked(retrain).await
    }

    /// Rebuild the model unless a retrain is already running, in which case
    /// `None` is returned.
    pub async fn try_retrain(&self) -> Option<Result<RetrainReport, EngineError>> {
        let Ok(retrain) = Arc::clone(&self.retrain_lock).try_lock_owned() else {
            debug!("retrain already in progress, skipping");
            return None;
        };
        Some(self.retrain_locked(retrain).await)
    }

    /// The guard moves into the blocking build and is released only when
    /// the build returns, so an abandoned build still counts as the running
    /// retrain until it notices the cancel flag.
    async fn retrain_locked(
        &self,
        retrain: OwnedMutexGuard<()>,
    ) -> Result<RetrainReport, EngineError> {
        let mut documents = corpus::load_corpus(&self.settings.corpus_path).await?;
        let corpus_len = documents.len();

        if self.settings.include_interactions {
            match self.store.load_interactions().await {
                Ok(interactions) => {
                    for interaction in interactions {
                        documents.push(interaction.query);
                        documents.push(interaction.response);
                    }
                }
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "failed to load interactions, retraining on corpus only");
                }
            }
        }

        let answers: Vec<String> = self
            .state
            .read()
            .await
            .dataset
            .iter()
            .map(|p| p.answer.clone())
            .collect();

        let top_n = self.settings.keyword_top_n;
        let entities = Arc::clone(&self.entities);
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let task = tokio::task::spawn_blocking(move || {
            let snapshot =
                Snapshot::build_cancellable(&documents, corpus_len, top_n, &entities, &flag)?;
            let vectors: Vec<SparseVector> =
                answers.iter().map(|a| snapshot.model.vectorize(a)).collect();
            Some((snapshot, vectors, documents.len(), retrain))
        });

        let timeout = self.settings.retrain_timeout;
        let (snapshot, vectors, document_count, _retrain) =
            match tokio::time::timeout(timeout, task).await {
                Err(_) | Ok(Ok(None)) => {
                    cancel.store(true, Ordering::Relaxed);
                    return Err(EngineError::RetrainTimeout(timeout));
                }
                Ok(Err(join)) => return Err(EngineError::RetrainTask(join.to_string())),
                Ok(Ok(Some(built))) => built,
            };

        let mut state = self.state.write().await;
        state.install(snapshot, vectors);
        let report = RetrainReport {
            documents: document_count,
            vocabulary: state.model.vocabulary_size(),
            datapoints: state.dataset.len(),
        };
        drop(state);

        info!(
            documents = report.documents,
            vocabulary = report.vocabulary,
            datapoints = report.datapoints,
            "model retrained"
        );
        Ok(report)
    }

    pub async fn intents(&self) -> IntentsView {
        let state = self.state.read().await;
        IntentsView {
            intents: state.intents.clone(),
            discovered: state.discovery.clusters().clone(),
        }
    }

    pub async fn keywords(&self) -> Vec<Keyword> {
        self.state.read().await.keywords.clone()
    }

    /// A copy of the dataset, vectors included.
    pub async fn dataset(&self) -> Vec<DataPoint> {
        self.state.read().await.dataset.clone()
    }

    /// Vectorize `text` against the current model.
    pub async fn vectorize(&self, text: &str) -> SparseVector {
        self.state.read().await.model.vectorize(text)
    }

    pub async fn vocabulary_size(&self) -> usize {
        self.state.read().await.model.vocabulary_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    #[test]
    fn test_merge_intent_appends_and_merges() {
        let mut intents = vec![Intent::new("greeting", ["hello"])];
        merge_intent(&mut intents, Intent::new("weather", ["is it raining"]));
        merge_intent(&mut intents, Intent::new("greeting", ["hey there"]));

        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].training_phrases, vec!["hello", "hey there"]);
        assert_eq!(intents[1].name, "weather");
    }

    #[test]
    fn test_snapshot_uses_corpus_lines_for_keywords() {
        let documents = vec![
            "Goroutines run concurrently".to_string(),
            "zebra zebra zebra".to_string(),
        ];
        let snapshot = Snapshot::build(&documents, 1, 10, &[]);
        assert!(snapshot.model.contains("zebra"));
        assert!(snapshot.keywords.iter().all(|k| k.term != "zebra"));
        assert_eq!(snapshot.topics.lookup("goroutines").len(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_build_stops_and_releases_retrain_lock() {
        let tmp = TempDir::new().unwrap();
        let corpus = tmp.path().join("corpus.md");
        std::fs::write(&corpus, "goroutines are lightweight threads\n").unwrap();
        let mut config = Config::minimal();
        config.corpus.path = corpus.clone();
        config.schedule.retrain_timeout_secs = 1;
        let engine = Engine::start(&config, Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        let vocabulary = engine.vocabulary_size().await;

        // Big enough that the substring IDF pass runs far past the timeout.
        let large: String = (0..8000)
            .map(|i| format!("alpha{i} beta{i} gamma{i} delta{i}\n"))
            .collect();
        std::fs::write(&corpus, large).unwrap();

        let err = engine.retrain().await.unwrap_err();
        assert!(matches!(err, EngineError::RetrainTimeout(_)));
        assert_eq!(engine.vocabulary_size().await, vocabulary);

        // The abandoned build holds the lock until it sees the cancel flag,
        // which happens long before it could have finished.
        let relock = tokio::time::timeout(
            Duration::from_secs(2),
            Arc::clone(&engine.retrain_lock).lock_owned(),
        )
        .await;
        assert!(relock.is_ok());
    }
}
