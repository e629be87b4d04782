//! K-nearest-neighbor answer retrieval.
//!
//! # Algorithm
//!
//! 1. Euclidean distance from the query vector to every data point.
//! 2. Stable sort ascending by distance (dataset order breaks distance ties).
//! 3. Tally answers among the first `k` neighbors.
//! 4. Return the most frequent answer. Count ties go to the answer whose
//!    first occurrence is nearest, scanning neighbors by increasing distance.
//!
//! A data point whose vector has not been computed yet is treated as the
//! empty vector.

use std::cmp::Ordering;

use thiserror::Error;

use crate::models::DataPoint;
use crate::similarity::euclidean_distance;
use crate::vsm::SparseVector;

/// Neighbor count used when the caller has no preference.
pub const DEFAULT_K: usize = 3;

/// Retrieval over a dataset with no entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no answer available: the dataset is empty")]
pub struct EmptyDatasetError;

/// A neighbor of the query, as returned by [`nearest`].
#[derive(Debug, Clone)]
pub struct Neighbor<'a> {
    pub index: usize,
    pub distance: f64,
    pub point: &'a DataPoint,
}

/// The `k` nearest data points, closest first. `k` is at least 1.
pub fn nearest<'a>(
    query: &SparseVector,
    dataset: &'a [DataPoint],
    k: usize,
) -> Result<Vec<Neighbor<'a>>, EmptyDatasetError> {
    if dataset.is_empty() {
        return Err(EmptyDatasetError);
    }

    let empty = SparseVector::new();
    let mut neighbors: Vec<Neighbor<'a>> = dataset
        .iter()
        .enumerate()
        .map(|(index, point)| Neighbor {
            index,
            distance: euclidean_distance(query, point.vector.as_ref().unwrap_or(&empty)),
            point,
        })
        .collect();

    // `sort_by` is stable, so equal distances keep dataset order.
    neighbors.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    neighbors.truncate(k.max(1));
    Ok(neighbors)
}

/// Majority-vote answer among the `k` nearest data points.
pub fn retrieve<'a>(
    query: &SparseVector,
    dataset: &'a [DataPoint],
    k: usize,
) -> Result<&'a str, EmptyDatasetError> {
    let neighbors = nearest(query, dataset, k)?;

    // (answer, count) in first-seen order
    let mut tally: Vec<(&'a str, usize)> = Vec::new();
    for n in &neighbors {
        let answer = n.point.answer.as_str();
        match tally.iter_mut().find(|(a, _)| *a == answer) {
            Some((_, count)) => *count += 1,
            None => tally.push((answer, 1)),
        }
    }

    let mut best = tally[0];
    for &(answer, count) in &tally[1..] {
        if count > best.1 {
            best = (answer, count);
        }
    }
    Ok(best.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vsm::VectorSpaceModel;

    fn point(answer: &str, pairs: &[(&str, f64)]) -> DataPoint {
        DataPoint {
            vector: Some(pairs.iter().map(|(t, w)| (t.to_string(), *w)).collect()),
            answer: answer.to_string(),
            intent: None,
        }
    }

    fn query(pairs: &[(&str, f64)]) -> SparseVector {
        pairs.iter().map(|(t, w)| (t.to_string(), *w)).collect()
    }

    #[test]
    fn test_empty_dataset() {
        let q = query(&[("go", 1.0)]);
        assert_eq!(retrieve(&q, &[], 3), Err(EmptyDatasetError));
    }

    #[test]
    fn test_k1_returns_exact_match() {
        let corpus = vec![
            "goroutines are lightweight threads managed by the runtime",
            "a channel passes values between goroutines",
            "a slice is a dynamically sized view into an array",
        ];
        let model = VectorSpaceModel::build(&corpus);
        let dataset: Vec<DataPoint> = corpus
            .iter()
            .map(|doc| DataPoint {
                vector: Some(model.vectorize(doc)),
                answer: doc.to_string(),
                intent: None,
            })
            .collect();

        let q = model.vectorize(corpus[1]);
        assert_eq!(retrieve(&q, &dataset, 1).unwrap(), corpus[1]);
    }

    #[test]
    fn test_majority_vote() {
        let dataset = vec![
            point("A", &[("x", 1.0)]),
            point("B", &[("x", 1.1)]),
            point("B", &[("x", 1.2)]),
            point("A", &[("x", 9.0)]),
        ];
        let q = query(&[("x", 1.0)]);
        assert_eq!(retrieve(&q, &dataset, 3).unwrap(), "B");
    }

    #[test]
    fn test_count_tie_goes_to_nearest() {
        let dataset = vec![
            point("far", &[("x", 3.0)]),
            point("near", &[("x", 1.0)]),
        ];
        let q = query(&[("x", 1.0)]);
        assert_eq!(retrieve(&q, &dataset, 2).unwrap(), "near");
    }

    #[test]
    fn test_distance_tie_keeps_dataset_order() {
        let dataset = vec![point("first", &[("x", 2.0)]), point("second", &[("x", 2.0)])];
        let q = query(&[("x", 1.0)]);
        assert_eq!(retrieve(&q, &dataset, 2).unwrap(), "first");
        assert_eq!(retrieve(&q, &dataset, 1).unwrap(), "first");
    }

    #[test]
    fn test_k_larger_than_dataset() {
        let dataset = vec![point("only", &[("x", 2.0)])];
        let q = query(&[("x", 1.0)]);
        assert_eq!(retrieve(&q, &dataset, 10).unwrap(), "only");
    }

    #[test]
    fn test_missing_vector_is_empty() {
        let dataset = vec![
            DataPoint::new("pending", None),
            point("vectorized", &[("x", 1.0)]),
        ];
        let q = query(&[("x", 1.0)]);
        let neighbors = nearest(&q, &dataset, 2).unwrap();
        assert_eq!(neighbors[0].point.answer, "vectorized");
        assert!((neighbors[1].distance - 1.0).abs() < 1e-12);
    }
}
