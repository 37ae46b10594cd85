//! Read-only link prediction over persisted embeddings.
//!
//! The [`Predictor`] holds a snapshot of vectors handed to it by the caller,
//! typically the augmented vectors of a finished job, and never touches the
//! live training store.
//!
//! ```text
//!   predict_tail(h, r, ?)      target = h + r
//!   predict_head(?, r, t)      target = t − r
//!   predict_relation(h, ?, t)  target = t − h
//! ```
//!
//! Candidates are scored by `1 / (1 + ‖target − c‖)`.

use crate::augment::ContextualEmbedding;
use crate::error::{Error, Result};
use crate::evaluation::{rank_of, RankMetrics};
use crate::scoring::{plausibility, top_k, Prediction};
use crate::store::EmbeddingStore;
use crate::vector;
use std::collections::HashMap;
use tessera_core::Triplet;

/// Candidate list size used when ranking test triplets.
pub const EVALUATION_CANDIDATES: usize = 1000;

/// Stateless link predictor.
#[derive(Debug, Clone)]
pub struct Predictor {
    dim: usize,
    entity_embeddings: HashMap<String, Vec<f32>>,
    relation_embeddings: HashMap<String, Vec<f32>>,
}

impl Predictor {
    /// Create from an embedding snapshot.
    ///
    /// All vectors must share one length.
    pub fn from_embeddings(
        entity_embeddings: HashMap<String, Vec<f32>>,
        relation_embeddings: HashMap<String, Vec<f32>>,
    ) -> Result<Self> {
        let dim = entity_embeddings
            .values()
            .chain(relation_embeddings.values())
            .next()
            .map_or(0, Vec::len);

        for v in entity_embeddings.values().chain(relation_embeddings.values()) {
            if v.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: v.len(),
                });
            }
        }

        Ok(Self {
            dim,
            entity_embeddings,
            relation_embeddings,
        })
    }

    /// Create from persisted contextual vectors.
    pub fn from_contextual(
        entities: HashMap<String, ContextualEmbedding>,
        relations: HashMap<String, ContextualEmbedding>,
    ) -> Self {
        let convert = |m: HashMap<String, ContextualEmbedding>| {
            m.into_iter()
                .map(|(k, v)| (k, v.to_vec()))
                .collect::<HashMap<_, _>>()
        };
        Self {
            dim: crate::augment::D_TOTAL,
            entity_embeddings: convert(entities),
            relation_embeddings: convert(relations),
        }
    }

    /// Create from a copy of a trained store (raw, un-augmented vectors).
    pub fn from_store(store: &EmbeddingStore) -> Self {
        Self {
            dim: store.dimensions(),
            entity_embeddings: store.entity_embeddings().clone(),
            relation_embeddings: store.relation_embeddings().clone(),
        }
    }

    /// Embedding dimension.
    pub fn dimensions(&self) -> usize {
        self.dim
    }

    /// Number of entities.
    pub fn num_entities(&self) -> usize {
        self.entity_embeddings.len()
    }

    /// Number of relations.
    pub fn num_relations(&self) -> usize {
        self.relation_embeddings.len()
    }

    fn entity(&self, id: &str) -> Result<&[f32]> {
        self.entity_embeddings
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::missing_entity(id))
    }

    fn relation(&self, id: &str) -> Result<&[f32]> {
        self.relation_embeddings
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::missing_relation(id))
    }

    /// Most plausible tails for `(head, relation, ?)`, excluding `head`.
    pub fn predict_tail(&self, head: &str, relation: &str, k: usize) -> Result<Vec<Prediction>> {
        let target = vector::add(self.entity(head)?, self.relation(relation)?)?;
        rank_by_distance(&target, &self.entity_embeddings, Some(head), k)
    }

    /// Most plausible heads for `(?, relation, tail)`, excluding `tail`.
    pub fn predict_head(&self, relation: &str, tail: &str, k: usize) -> Result<Vec<Prediction>> {
        let target = vector::subtract(self.entity(tail)?, self.relation(relation)?)?;
        rank_by_distance(&target, &self.entity_embeddings, Some(tail), k)
    }

    /// Most plausible relation types for `(head, ?, tail)`.
    pub fn predict_relation(&self, head: &str, tail: &str, k: usize) -> Result<Vec<Prediction>> {
        let target = vector::subtract(self.entity(tail)?, self.entity(head)?)?;
        rank_by_distance(&target, &self.relation_embeddings, None, k)
    }

    /// Plausibility `1 / (1 + ‖h + r − t‖)` of one triplet.
    pub fn triplet_score(&self, head: &str, relation: &str, tail: &str) -> Result<f32> {
        let residual = vector::translation_residual(
            self.entity(head)?,
            self.relation(relation)?,
            self.entity(tail)?,
        )?;
        Ok(plausibility(vector::l2_norm(&residual)))
    }

    /// Entities most cosine-similar to `id`, excluding itself.
    pub fn find_similar_entities(&self, id: &str, k: usize) -> Result<Vec<Prediction>> {
        let query = self.entity(id)?;
        rank_by_cosine(query, &self.entity_embeddings, id, k)
    }

    /// Relation types most cosine-similar to `relation`, excluding itself.
    pub fn find_similar_relations(&self, relation: &str, k: usize) -> Result<Vec<Prediction>> {
        let query = self.relation(relation)?;
        rank_by_cosine(query, &self.relation_embeddings, relation, k)
    }

    /// Rank-based metrics over `test_triplets`.
    ///
    /// Each triplet contributes a tail rank (true tail within
    /// `predict_tail(h, r, 1000)`) and a head rank (true head within
    /// `predict_head(r, t, 1000)`). Empty input yields all-zero metrics.
    pub fn evaluate_graph_completeness(&self, test_triplets: &[Triplet]) -> Result<RankMetrics> {
        let mut ranks = Vec::with_capacity(test_triplets.len() * 2);

        for t in test_triplets {
            let (head, relation, tail) = (t.head.as_str(), t.relation.as_str(), t.tail.as_str());

            let tails = self.predict_tail(head, relation, EVALUATION_CANDIDATES)?;
            ranks.push(rank_of(&tails, tail));

            let heads = self.predict_head(relation, tail, EVALUATION_CANDIDATES)?;
            ranks.push(rank_of(&heads, head));
        }

        Ok(RankMetrics::from_ranks(&ranks))
    }
}

fn rank_by_distance(
    target: &[f32],
    candidates: &HashMap<String, Vec<f32>>,
    exclude: Option<&str>,
    k: usize,
) -> Result<Vec<Prediction>> {
    let scored = candidates
        .iter()
        .filter(|(id, _)| Some(id.as_str()) != exclude)
        .map(|(id, v)| Ok((id.clone(), plausibility(vector::euclidean_distance(target, v)?))))
        .collect::<Result<Vec<_>>>()?;
    Ok(top_k(scored, k))
}

fn rank_by_cosine(
    query: &[f32],
    candidates: &HashMap<String, Vec<f32>>,
    exclude: &str,
    k: usize,
) -> Result<Vec<Prediction>> {
    let scored = candidates
        .iter()
        .filter(|(id, _)| id.as_str() != exclude)
        .map(|(id, v)| Ok((id.clone(), vector::cosine_similarity(query, v)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(top_k(scored, k))
}
