//! Rank-based evaluation for link prediction.
//!
//! Given a test triplet `(h, r, t)`:
//! 1. **Tail prediction**: rank the true tail among `predict_tail(h, r, ·)`
//! 2. **Head prediction**: rank the true head among `predict_head(r, t, ·)`
//!
//! Both ranks enter the same pool. A true entity missing from the candidate
//! list is ranked one past its end.
//!
//! | Metric | Range | Description |
//! |--------|-------|-------------|
//! | MR | [1, ∞) | Mean rank |
//! | MRR | (0, 1] | Mean reciprocal rank: average of 1/rank |
//! | Hits@1 | [0, 1] | Fraction with rank = 1 |
//! | Hits@3 | [0, 1] | Fraction with rank <= 3 |
//! | Hits@10 | [0, 1] | Fraction with rank <= 10 |

use crate::scoring::Prediction;
use serde::{Deserialize, Serialize};

/// Rank-based evaluation results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankMetrics {
    /// Mean Rank: E\[rank\]
    pub mean_rank: f64,
    /// Mean Reciprocal Rank: E\[1/rank\]
    pub mean_reciprocal_rank: f64,
    /// Hits@1: P(rank = 1)
    pub hits_at_1: f64,
    /// Hits@3: P(rank <= 3)
    pub hits_at_3: f64,
    /// Hits@10: P(rank <= 10)
    pub hits_at_10: f64,
    /// Number of ranks aggregated (two per test triplet)
    pub num_ranks: usize,
}

impl RankMetrics {
    /// Compute metrics from a list of ranks.
    pub fn from_ranks(ranks: &[usize]) -> Self {
        if ranks.is_empty() {
            return Self::default();
        }

        let n = ranks.len() as f64;
        let mean_reciprocal_rank = ranks.iter().map(|&r| 1.0 / r as f64).sum::<f64>() / n;
        let mean_rank = ranks.iter().map(|&r| r as f64).sum::<f64>() / n;
        let hits_at_1 = ranks.iter().filter(|&&r| r == 1).count() as f64 / n;
        let hits_at_3 = ranks.iter().filter(|&&r| r <= 3).count() as f64 / n;
        let hits_at_10 = ranks.iter().filter(|&&r| r <= 10).count() as f64 / n;

        Self {
            mean_rank,
            mean_reciprocal_rank,
            hits_at_1,
            hits_at_3,
            hits_at_10,
            num_ranks: ranks.len(),
        }
    }

    /// Merge metrics from multiple evaluation runs, weighted by rank count.
    pub fn merge(metrics: &[Self]) -> Self {
        let total: usize = metrics.iter().map(|m| m.num_ranks).sum();
        if total == 0 {
            return Self::default();
        }

        let total_f = total as f64;
        let weighted = |f: fn(&Self) -> f64| {
            metrics
                .iter()
                .map(|m| f(m) * m.num_ranks as f64)
                .sum::<f64>()
                / total_f
        };

        Self {
            mean_rank: weighted(|m| m.mean_rank),
            mean_reciprocal_rank: weighted(|m| m.mean_reciprocal_rank),
            hits_at_1: weighted(|m| m.hits_at_1),
            hits_at_3: weighted(|m| m.hits_at_3),
            hits_at_10: weighted(|m| m.hits_at_10),
            num_ranks: total,
        }
    }

    /// Format as summary string.
    pub fn summary(&self) -> String {
        format!(
            "MRR: {:.4} | MR: {:.1} | H@1: {:.3} | H@3: {:.3} | H@10: {:.3} (n={})",
            self.mean_reciprocal_rank,
            self.mean_rank,
            self.hits_at_1,
            self.hits_at_3,
            self.hits_at_10,
            self.num_ranks
        )
    }
}

/// 1-based position of `id` in a ranked list, or `len + 1` when absent.
pub fn rank_of(predictions: &[Prediction], id: &str) -> usize {
    predictions
        .iter()
        .position(|p| p.id == id)
        .map_or(predictions.len() + 1, |i| i + 1)
}
