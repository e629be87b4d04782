//! Core data models shared by the engine, the store and the server.

use serde::{Deserialize, Serialize};

use crate::vsm::SparseVector;

/// A stored answer the KNN retriever can return.
///
/// `vector` is `None` until the next retrain computes it from `answer`.
/// A present vector is only meaningful against the model snapshot that
/// produced it.
#[derive(Debug, Clone)]
pub struct DataPoint {
    pub vector: Option<SparseVector>,
    pub answer: String,
    pub intent: Option<String>,
}

impl DataPoint {
    pub fn new(answer: impl Into<String>, intent: Option<String>) -> Self {
        Self {
            vector: None,
            answer: answer.into(),
            intent,
        }
    }
}

/// A named category of queries with example phrases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    pub training_phrases: Vec<String>,
}

impl Intent {
    pub fn new<I, S>(name: impl Into<String>, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            training_phrases: phrases.into_iter().map(Into::into).collect(),
        }
    }
}

/// Training intake payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingData {
    pub query: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

/// A user rating for a previous response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub query: String,
    pub response: String,
    pub rating: i64,
}

/// A persisted query/response pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub query: String,
    pub response: String,
}
