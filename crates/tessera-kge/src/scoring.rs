//! Scoring helpers shared by training and prediction.
//!
//! Training works with the raw TransE distance `‖h + r − t‖₂` (lower is
//! better). Prediction reports the bounded plausibility `1 / (1 + distance)`,
//! which lies in `(0, 1]` and is higher for better candidates.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Map a distance to a plausibility score in `(0, 1]`.
#[inline]
pub fn plausibility(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// One ranked prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted entity id or relation type.
    pub id: String,
    /// Score (higher = more plausible / more similar).
    pub score: f32,
    /// Rank (1 = best).
    pub rank: usize,
}

/// Sort `(id, score)` pairs descending by score and keep the best `k`.
///
/// Ties are broken by id so results do not depend on map iteration order.
pub(crate) fn top_k(mut scored: Vec<(String, f32)>, k: usize) -> Vec<Prediction> {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(k);

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (id, score))| Prediction {
            id,
            score,
            rank: i + 1,
        })
        .collect()
}
