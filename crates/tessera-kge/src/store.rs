//! Embedding Store: the entity and relation vectors of one training run.
//!
//! The store is an ordinary owned value. The caller creates it (fresh or from
//! a checkpoint), lends it to the trainer by `&mut`, hands it to the
//! checkpoint codec, and drops it when the job finalizes.

use crate::error::{Error, Result};
use crate::training::TrainingConfig;
use crate::vector;
use std::collections::HashMap;
use tessera_core::Triplet;

/// Entity and relation-type embeddings plus the config they are trained under.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingStore {
    config: TrainingConfig,
    /// Entity embeddings (entity_id -> embedding vector).
    entity_embeddings: HashMap<String, Vec<f32>>,
    /// Relation embeddings (relation_type -> embedding vector).
    relation_embeddings: HashMap<String, Vec<f32>>,
}

impl EmbeddingStore {
    /// Create an empty store.
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            entity_embeddings: HashMap::new(),
            relation_embeddings: HashMap::new(),
        }
    }

    /// Create from existing embeddings.
    ///
    /// Every vector must have `config.dimensions` components.
    pub fn from_parts(
        config: TrainingConfig,
        entity_embeddings: HashMap<String, Vec<f32>>,
        relation_embeddings: HashMap<String, Vec<f32>>,
    ) -> Result<Self> {
        let dim = config.dimensions;
        for v in entity_embeddings.values().chain(relation_embeddings.values()) {
            if v.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: v.len(),
                });
            }
        }

        Ok(Self {
            config,
            entity_embeddings,
            relation_embeddings,
        })
    }

    /// Training configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Embedding dimension.
    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    /// Number of entities.
    pub fn num_entities(&self) -> usize {
        self.entity_embeddings.len()
    }

    /// Number of relation types.
    pub fn num_relations(&self) -> usize {
        self.relation_embeddings.len()
    }

    /// True when no vectors have been initialized yet.
    pub fn is_empty(&self) -> bool {
        self.entity_embeddings.is_empty() && self.relation_embeddings.is_empty()
    }

    /// Entity embedding, if present.
    pub fn entity(&self, id: &str) -> Option<&[f32]> {
        self.entity_embeddings.get(id).map(Vec::as_slice)
    }

    /// Relation embedding, if present.
    pub fn relation(&self, relation: &str) -> Option<&[f32]> {
        self.relation_embeddings.get(relation).map(Vec::as_slice)
    }

    /// Entity embedding or [`Error::MissingEmbedding`].
    pub fn require_entity(&self, id: &str) -> Result<&[f32]> {
        self.entity(id).ok_or_else(|| Error::missing_entity(id))
    }

    /// Relation embedding or [`Error::MissingEmbedding`].
    pub fn require_relation(&self, relation: &str) -> Result<&[f32]> {
        self.relation(relation)
            .ok_or_else(|| Error::missing_relation(relation))
    }

    /// All entity embeddings.
    pub fn entity_embeddings(&self) -> &HashMap<String, Vec<f32>> {
        &self.entity_embeddings
    }

    /// All relation embeddings.
    pub fn relation_embeddings(&self) -> &HashMap<String, Vec<f32>> {
        &self.relation_embeddings
    }

    /// Entity ids in sorted order.
    ///
    /// Sorted so that seeded sampling over the id list does not depend on
    /// hash map iteration order.
    pub fn entity_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entity_embeddings.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Relation types in sorted order.
    pub fn relation_types(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.relation_embeddings.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Insert or replace an entity embedding.
    pub fn insert_entity(&mut self, id: impl Into<String>, embedding: Vec<f32>) -> Result<()> {
        self.check_len(&embedding)?;
        self.entity_embeddings.insert(id.into(), embedding);
        Ok(())
    }

    /// Insert or replace a relation embedding.
    pub fn insert_relation(
        &mut self,
        relation: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Result<()> {
        self.check_len(&embedding)?;
        self.relation_embeddings.insert(relation.into(), embedding);
        Ok(())
    }

    /// TransE score `‖h + r − t‖₂` (lower = more plausible).
    pub fn score(&self, triplet: &Triplet) -> Result<f32> {
        let (h, r, t) = self.triplet_vectors(triplet)?;
        let residual = vector::translation_residual(h, r, t)?;
        Ok(vector::l2_norm(&residual))
    }

    /// Borrow the three vectors of a triplet.
    pub fn triplet_vectors(&self, triplet: &Triplet) -> Result<(&[f32], &[f32], &[f32])> {
        let h = self.require_entity(triplet.head.as_str())?;
        let r = self.require_relation(triplet.relation.as_str())?;
        let t = self.require_entity(triplet.tail.as_str())?;
        Ok((h, r, t))
    }

    /// Project every embedding back onto the unit sphere.
    pub fn normalize_all(&mut self) {
        for v in self
            .entity_embeddings
            .values_mut()
            .chain(self.relation_embeddings.values_mut())
        {
            vector::normalize_in_place(v);
        }
    }

    /// `entity += factor * direction`.
    pub(crate) fn nudge_entity(&mut self, id: &str, direction: &[f32], factor: f32) -> Result<()> {
        let v = self
            .entity_embeddings
            .get_mut(id)
            .ok_or_else(|| Error::missing_entity(id))?;
        vector::add_scaled(v, direction, factor)
    }

    /// `relation += factor * direction`.
    pub(crate) fn nudge_relation(
        &mut self,
        relation: &str,
        direction: &[f32],
        factor: f32,
    ) -> Result<()> {
        let v = self
            .relation_embeddings
            .get_mut(relation)
            .ok_or_else(|| Error::missing_relation(relation))?;
        vector::add_scaled(v, direction, factor)
    }

    fn check_len(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() == self.config.dimensions {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.config.dimensions,
                actual: embedding.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EmbeddingStore {
        let mut store = EmbeddingStore::new(TrainingConfig::default().with_dimensions(2));
        store.insert_entity("A", vec![0.0, 0.0]).unwrap();
        store.insert_entity("B", vec![1.0, 0.0]).unwrap();
        store.insert_relation("r", vec![1.0, 0.0]).unwrap();
        store
    }

    #[test]
    fn test_score() {
        let s = store();
        assert!(s.score(&Triplet::new("A", "r", "B")).unwrap().abs() < 1e-6);
        assert!((s.score(&Triplet::new("B", "r", "A")).unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_ids_are_named() {
        let s = store();
        let err = s.score(&Triplet::new("A", "r", "Z")).unwrap_err();
        assert_eq!(err.to_string(), "Missing entity embedding: Z");

        let err = s.score(&Triplet::new("A", "q", "B")).unwrap_err();
        assert_eq!(err.to_string(), "Missing relation embedding: q");
    }

    #[test]
    fn test_insert_checks_dimension() {
        let mut s = store();
        assert!(matches!(
            s.insert_entity("C", vec![1.0, 2.0, 3.0]),
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_from_parts_validates() {
        let mut entities = HashMap::new();
        entities.insert("A".to_string(), vec![1.0; 3]);
        let config = TrainingConfig::default().with_dimensions(4);
        assert!(EmbeddingStore::from_parts(config, entities, HashMap::new()).is_err());
    }

    #[test]
    fn test_normalize_all() {
        let mut s = store();
        s.insert_entity("C", vec![3.0, 4.0]).unwrap();
        s.normalize_all();
        let c = s.entity("C").unwrap();
        assert!((vector::l2_norm(c) - 1.0).abs() < 1e-6);
        // Zero vector stays zero.
        assert_eq!(s.entity("A").unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn test_sorted_ids() {
        let s = store();
        assert_eq!(s.entity_ids(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(s.relation_types(), vec!["r".to_string()]);
    }
}
