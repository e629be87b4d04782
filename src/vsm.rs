//! Corpus vector space model.
//!
//! A [`VectorSpaceModel`] is an immutable snapshot built from a corpus.
//! Rebuilding produces a new snapshot; vectors computed against an older
//! snapshot are not comparable with vectors from a newer one.
//!
//! # Weighting
//!
//! - **TF** is a single corpus-wide count per raw token, not a per-document
//!   frequency.
//! - **IDF** is `ln(N / (1 + df))`, where `df` counts documents whose raw
//!   text *contains* the term as a substring.
//! - A document vector weighs each normalized token found in the TF table
//!   as `(tf / normalized_token_count) * idf`.
//!
//! This mix of a global numerator with a per-call denominator is what the
//! stored answer vectors were tuned against. The keyword extractor in
//! [`crate::keywords`] uses a different, per-document variant.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::normalize;

/// Sparse term → weight mapping. Absent terms have weight zero.
pub type SparseVector = HashMap<String, f64>;

/// Immutable TF/IDF statistics for one corpus.
#[derive(Debug, Clone, Default)]
pub struct VectorSpaceModel {
    term_frequency: HashMap<String, f64>,
    inverse_doc_frequency: HashMap<String, f64>,
    documents: usize,
}

impl VectorSpaceModel {
    /// Build the model from raw documents. Tokens are not normalized here.
    pub fn build<S: AsRef<str>>(corpus: &[S]) -> Self {
        Self::build_cancellable(corpus, &AtomicBool::new(false)).unwrap_or_default()
    }

    /// Like [`build`](Self::build), but returns `None` once `cancel` is set.
    /// The flag is polled once per term of the IDF pass.
    pub fn build_cancellable<S: AsRef<str>>(corpus: &[S], cancel: &AtomicBool) -> Option<Self> {
        let mut term_frequency: HashMap<String, f64> = HashMap::new();
        for doc in corpus {
            for token in normalize::tokenize(doc.as_ref()) {
                *term_frequency.entry(token.to_string()).or_insert(0.0) += 1.0;
            }
        }

        let n = corpus.len() as f64;
        let mut inverse_doc_frequency = HashMap::with_capacity(term_frequency.len());
        for term in term_frequency.keys() {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            let df = corpus
                .iter()
                .filter(|doc| doc.as_ref().contains(term.as_str()))
                .count() as f64;
            inverse_doc_frequency.insert(term.clone(), (n / (1.0 + df)).ln());
        }

        Some(Self {
            term_frequency,
            inverse_doc_frequency,
            documents: corpus.len(),
        })
    }

    /// Turn a document into a weighted vector against this snapshot.
    pub fn vectorize(&self, document: &str) -> SparseVector {
        let tokens = normalize::normalize(document);
        let total = tokens.len() as f64;

        let mut vector = SparseVector::new();
        for token in tokens {
            if let Some(tf) = self.term_frequency.get(&token) {
                let idf = self
                    .inverse_doc_frequency
                    .get(&token)
                    .copied()
                    .unwrap_or(0.0);
                vector.insert(token, (tf / total) * idf);
            }
        }
        vector
    }

    /// Corpus-wide raw count for `term`.
    pub fn term_frequency(&self, term: &str) -> Option<f64> {
        self.term_frequency.get(term).copied()
    }

    /// IDF for `term`, if the term occurs in the corpus.
    pub fn inverse_doc_frequency(&self, term: &str) -> Option<f64> {
        self.inverse_doc_frequency.get(term).copied()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.term_frequency.contains_key(term)
    }

    /// Number of distinct raw terms.
    pub fn vocabulary_size(&self) -> usize {
        self.term_frequency.len()
    }

    /// Number of documents the model was built from.
    pub fn documents(&self) -> usize {
        self.documents
    }
}
