//! Similarity-based intent classification.
//!
//! The classifier owns its own [`VectorSpaceModel`], built only from the
//! training phrases of the active intents. It is independent of the corpus
//! model used for answer retrieval and is rebuilt whenever the intent list
//! changes.
//!
//! Scanning visits intents in list order and phrases in phrase order; a pair
//! replaces the current best only when its similarity is strictly greater,
//! so the earliest pair wins ties.

use serde::Serialize;

use crate::models::Intent;
use crate::similarity::cosine_similarity;
use crate::vsm::{SparseVector, VectorSpaceModel};

/// Default minimum cosine similarity for a match.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.3;

/// Outcome of classifying one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Classification {
    Matched { intent: String, similarity: f64 },
    /// No pair cleared the threshold. `best` carries the closest candidate.
    Unmatched { best: Option<(String, f64)> },
}

impl Classification {
    pub fn intent(&self) -> Option<&str> {
        match self {
            Classification::Matched { intent, .. } => Some(intent),
            Classification::Unmatched { .. } => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Classification::Matched { .. })
    }
}

struct PhraseVector {
    intent: usize,
    vector: SparseVector,
}

/// Intent table compiled against a phrase-only vector space.
pub struct IntentClassifier {
    names: Vec<String>,
    model: VectorSpaceModel,
    phrases: Vec<PhraseVector>,
    min_confidence: f64,
}

impl IntentClassifier {
    pub fn new(intents: &[Intent], min_confidence: f64) -> Self {
        let corpus: Vec<&str> = intents
            .iter()
            .flat_map(|i| i.training_phrases.iter().map(String::as_str))
            .collect();
        let model = VectorSpaceModel::build(&corpus);

        let phrases = intents
            .iter()
            .enumerate()
            .flat_map(|(idx, intent)| {
                let model = &model;
                intent.training_phrases.iter().map(move |p| PhraseVector {
                    intent: idx,
                    vector: model.vectorize(p),
                })
            })
            .collect();

        Self {
            names: intents.iter().map(|i| i.name.clone()).collect(),
            model,
            phrases,
            min_confidence,
        }
    }

    /// Classify a query. The query is lowercased before vectorizing.
    pub fn classify(&self, query: &str) -> Classification {
        let query_vec = self.model.vectorize(&query.to_lowercase());

        let mut best: Option<(usize, f64)> = None;
        for phrase in &self.phrases {
            let similarity = cosine_similarity(&query_vec, &phrase.vector);
            if best.map_or(true, |(_, s)| similarity > s) {
                best = Some((phrase.intent, similarity));
            }
        }

        match best {
            Some((idx, similarity)) if similarity >= self.min_confidence => {
                Classification::Matched {
                    intent: self.names[idx].clone(),
                    similarity,
                }
            }
            other => Classification::Unmatched {
                best: other.map(|(idx, s)| (self.names[idx].clone(), s)),
            },
        }
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn intent_count(&self) -> usize {
        self.names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeds() -> Vec<Intent> {
        vec![
            Intent::new("greeting", ["hello", "hi", "how are you", "good morning", "hey"]),
            Intent::new("farewell", ["bye", "goodbye", "see you later", "take care"]),
            Intent::new("help", ["help me", "I need assistance", "can you help me"]),
        ]
    }

    #[test]
    fn test_matches_exact_phrase() {
        let classifier = IntentClassifier::new(&seeds(), DEFAULT_MIN_CONFIDENCE);
        assert_eq!(classifier.classify("goodbye").intent(), Some("farewell"));
        assert_eq!(classifier.classify("Good Morning").intent(), Some("greeting"));
    }

    #[test]
    fn test_unrelated_query_is_unmatched() {
        let classifier = IntentClassifier::new(&seeds(), DEFAULT_MIN_CONFIDENCE);
        let result = classifier.classify("explain goroutine scheduling");
        assert!(!result.is_matched());
        assert_eq!(result, Classification::Unmatched { best: Some(("greeting".into(), 0.0)) });
    }

    #[test]
    fn test_zero_threshold_matches_everything() {
        let classifier = IntentClassifier::new(&seeds(), 0.0);
        assert_eq!(classifier.classify("quantum chromodynamics").intent(), Some("greeting"));
    }

    #[test]
    fn test_no_intents() {
        let classifier = IntentClassifier::new(&[], DEFAULT_MIN_CONFIDENCE);
        assert_eq!(classifier.classify("hello"), Classification::Unmatched { best: None });
    }

    #[test]
    fn test_tie_goes_to_earliest_intent() {
        let intents = vec![
            Intent::new("first", ["deploy service"]),
            Intent::new("second", ["deploy service"]),
        ];
        let classifier = IntentClassifier::new(&intents, 0.1);
        assert_eq!(classifier.classify("deploy service").intent(), Some("first"));
    }
}
