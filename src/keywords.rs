//! Corpus keyword extraction.
//!
//! This is a second TF-IDF variant, separate from [`crate::vsm`]:
//!
//! | | [`crate::vsm`] | keywords |
//! |---|---|---|
//! | case | as written | lowercased |
//! | stopwords | kept in TF | dropped |
//! | TF | corpus-wide count | per document, divided by the document's token count |
//! | IDF document match | raw substring | exact lowercased token |
//!
//! The two are kept apart on purpose: answer vectors and keyword scores are
//! consumed by different parts of the engine and are never compared.
//!
//! `score(term) = Σ_doc tf(term, doc) × ln(N / (1 + df(term)))`

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::normalize;

/// Default number of keywords kept for annotation.
pub const DEFAULT_TOP_N: usize = 20;

/// A ranked corpus keyword.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyword {
    pub term: String,
    pub score: f64,
}

/// Per-document frequency of each non-stopword term, divided by the total
/// token count of the document (stopwords included).
fn document_term_frequency(doc: &str) -> HashMap<String, f64> {
    let tokens = normalize::tokenize(doc);
    let total = tokens.len() as f64;

    let mut tf: HashMap<String, f64> = HashMap::new();
    for token in tokens {
        let term = token.to_lowercase();
        if !normalize::is_stopword(&term) {
            *tf.entry(term).or_insert(0.0) += 1.0;
        }
    }
    for freq in tf.values_mut() {
        *freq /= total;
    }
    tf
}

fn inverse_document_frequency(docs: &[HashMap<String, f64>]) -> HashMap<String, f64> {
    let n = docs.len() as f64;
    let mut df: HashMap<&str, usize> = HashMap::new();
    for doc in docs {
        let terms: HashSet<&str> = doc.keys().map(String::as_str).collect();
        for term in terms {
            *df.entry(term).or_insert(0) += 1;
        }
    }
    df.into_iter()
        .map(|(term, count)| (term.to_string(), (n / (1.0 + count as f64)).ln()))
        .collect()
}

/// Rank corpus terms and return the `top_n` highest scoring.
///
/// Ordering is by score descending, then term ascending.
pub fn extract_keywords<S: AsRef<str>>(corpus: &[S], top_n: usize) -> Vec<Keyword> {
    let per_doc: Vec<HashMap<String, f64>> = corpus
        .iter()
        .map(|doc| document_term_frequency(doc.as_ref()))
        .collect();
    let idf = inverse_document_frequency(&per_doc);

    let mut scores: HashMap<&str, f64> = HashMap::new();
    for doc in &per_doc {
        for (term, freq) in doc {
            let weight = idf.get(term).copied().unwrap_or(0.0);
            *scores.entry(term.as_str()).or_insert(0.0) += freq * weight;
        }
    }

    let mut ranked: Vec<Keyword> = scores
        .into_iter()
        .map(|(term, score)| Keyword {
            term: term.to_string(),
            score,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.term.cmp(&b.term))
    });
    ranked.truncate(top_n);
    ranked
}

/// Keywords that occur (as substrings) in the lowercased query, in rank
/// order.
pub fn related_keywords<'a>(keywords: &'a [Keyword], query: &str) -> Vec<&'a str> {
    let lowered = query.to_lowercase();
    keywords
        .iter()
        .filter(|k| lowered.contains(k.term.as_str()))
        .map(|k| k.term.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec![
            "Goroutines run concurrently",
            "Channels connect goroutines",
            "Slices wrap arrays",
            "Maps are hash tables",
            "Interfaces describe behavior",
        ]
    }

    #[test]
    fn test_document_tf_counts_stopwords_in_total() {
        let tf = document_term_frequency("The channel and the goroutine");
        // 5 tokens; "the" (x2) and "and" are stopwords after lowercasing
        assert_eq!(tf.len(), 2);
        assert!((tf["channel"] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_idf_exact_token_match() {
        let docs = vec![
            document_term_frequency("values matter"),
            document_term_frequency("value types"),
        ];
        let idf = inverse_document_frequency(&docs);
        // "value" is not counted in the first document
        assert!((idf["value"] - (2.0_f64 / 2.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_extract_ranks_and_truncates() {
        let keywords = extract_keywords(&corpus(), 3);
        assert_eq!(keywords.len(), 3);
        // two documents outweigh the lower idf: 2/3 * ln(5/3) > 1/3 * ln(5/2)
        assert_eq!(keywords[0].term, "goroutines");
        // equal scores fall back to term order
        assert_eq!(keywords[1].term, "arrays");
        assert_eq!(keywords[2].term, "behavior");
        for pair in keywords.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_extract_is_deterministic() {
        let a = extract_keywords(&corpus(), 10);
        let b = extract_keywords(&corpus(), 10);
        assert_eq!(a, b);
    }

    #[test]
    fn test_extract_lowercases() {
        let keywords = extract_keywords(&corpus(), 50);
        assert!(keywords.iter().any(|k| k.term == "channels"));
        assert!(keywords.iter().all(|k| k.term.chars().all(|c| !c.is_uppercase())));
    }

    #[test]
    fn test_related_keywords_substring() {
        let keywords = vec![
            Keyword { term: "channel".into(), score: 2.0 },
            Keyword { term: "slice".into(), score: 1.0 },
            Keyword { term: "map".into(), score: 0.5 },
        ];
        let related = related_keywords(&keywords, "How do Channels and SLICES differ");
        assert_eq!(related, vec!["channel", "slice"]);
    }

    #[test]
    fn test_empty_corpus() {
        assert!(extract_keywords::<&str>(&[], 5).is_empty());
    }
}
