//! Distance and similarity over sparse term vectors.
//!
//! A term missing from a [`SparseVector`] has weight `0.0`.

use crate::vsm::SparseVector;

/// Euclidean distance over the union of both key sets.
pub fn euclidean_distance(a: &SparseVector, b: &SparseVector) -> f64 {
    let mut sum = 0.0;
    for (term, wa) in a {
        let diff = wa - b.get(term).copied().unwrap_or(0.0);
        sum += diff * diff;
    }
    for (term, wb) in b {
        if !a.contains_key(term) {
            sum += wb * wb;
        }
    }
    sum.sqrt()
}

/// Cosine similarity; `0.0` when either vector has zero norm.
///
/// The dot product runs over the keys of `a` found in `b`, while each norm
/// covers every key of its own vector.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    for (term, wa) in a {
        if let Some(wb) = b.get(term) {
            dot += wa * wb;
        }
        norm_a += wa * wa;
    }
    let norm_b: f64 = b.values().map(|w| w * w).sum();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
