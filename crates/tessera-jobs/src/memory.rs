//! In-memory backend.

use crate::error::{Error, Result};
use crate::job::TrainingJob;
use crate::storage::{
    CheckpointStore, EmbeddingSink, EmbeddingSource, GraphSource, JobQueue, PersistedEmbeddings,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tessera_core::GraphSnapshot;
use tessera_kge::{checkpoint_prefix, ContextualEmbedding};

/// All storage seams over process-local maps.
///
/// Entity writes are accepted only for ids that are nodes of the scope's
/// graph, mirroring a store that attaches vectors to existing node rows.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    graphs: RwLock<HashMap<String, GraphSnapshot>>,
    jobs: RwLock<HashMap<String, TrainingJob>>,
    checkpoints: RwLock<BTreeMap<String, Vec<u8>>>,
    embeddings: RwLock<HashMap<String, PersistedEmbeddings>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the graph of `scope_id`.
    pub fn insert_graph(&self, scope_id: impl Into<String>, snapshot: GraphSnapshot) {
        self.graphs.write().insert(scope_id.into(), snapshot);
    }

    /// Checkpoint keys currently stored, in lexical order.
    pub fn checkpoint_keys(&self) -> Vec<String> {
        self.checkpoints.read().keys().cloned().collect()
    }
}

impl GraphSource for MemoryBackend {
    fn fetch_graph(&self, scope_id: &str) -> Result<GraphSnapshot> {
        Ok(self.graphs.read().get(scope_id).cloned().unwrap_or_default())
    }
}

impl JobQueue for MemoryBackend {
    fn enqueue(&self, job: TrainingJob) -> Result<()> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.id) {
            return Err(Error::Storage(format!("job {} already exists", job.id)));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<TrainingJob>> {
        Ok(self.jobs.read().get(id).cloned())
    }

    fn list(&self) -> Result<Vec<TrainingJob>> {
        let mut jobs: Vec<TrainingJob> = self.jobs.read().values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }

    fn save(&self, job: &TrainingJob) -> Result<()> {
        let mut jobs = self.jobs.write();
        match jobs.get_mut(&job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(Error::JobNotFound(job.id.clone())),
        }
    }
}

impl CheckpointStore for MemoryBackend {
    fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        self.checkpoints.write().insert(path.to_string(), bytes);
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.checkpoints.read().get(path).cloned())
    }

    fn delete_job(&self, job_id: &str) -> Result<usize> {
        let prefix = checkpoint_prefix(job_id);
        let mut checkpoints = self.checkpoints.write();
        let before = checkpoints.len();
        checkpoints.retain(|key, _| !key.starts_with(&prefix));
        Ok(before - checkpoints.len())
    }
}

impl EmbeddingSink for MemoryBackend {
    fn write_entity_embedding(
        &self,
        scope_id: &str,
        entity_id: &str,
        embedding: &ContextualEmbedding,
    ) -> Result<()> {
        let known = self
            .graphs
            .read()
            .get(scope_id)
            .is_some_and(|g| g.node(entity_id).is_some());
        if !known {
            return Err(Error::Persistence {
                id: entity_id.to_string(),
                message: format!("no node with this id in scope {}", scope_id),
            });
        }

        self.embeddings
            .write()
            .entry(scope_id.to_string())
            .or_default()
            .entities
            .insert(entity_id.to_string(), *embedding);
        Ok(())
    }

    fn write_relation_embedding(
        &self,
        scope_id: &str,
        relation_type: &str,
        embedding: &ContextualEmbedding,
    ) -> Result<()> {
        self.embeddings
            .write()
            .entry(scope_id.to_string())
            .or_default()
            .relations
            .insert(relation_type.to_string(), *embedding);
        Ok(())
    }
}

impl EmbeddingSource for MemoryBackend {
    fn load_embeddings(&self, scope_id: &str) -> Result<PersistedEmbeddings> {
        Ok(self
            .embeddings
            .read()
            .get(scope_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use chrono::{Duration, Utc};
    use tessera_core::{GraphEdge, GraphNode};
    use tessera_kge::{augment, checkpoint_path, StructuralContext, TrainingConfig};

    fn job(id: &str, age_secs: i64) -> TrainingJob {
        let created = Utc::now() - Duration::seconds(age_secs);
        TrainingJob::new_at("s", TrainingConfig::default(), 10, created).with_id(id)
    }

    #[test]
    fn test_enqueue_and_save() {
        let backend = MemoryBackend::new();
        backend.enqueue(job("a", 0)).unwrap();
        assert!(backend.enqueue(job("a", 0)).is_err());

        let mut a = JobQueue::get(&backend, "a").unwrap().unwrap();
        a.status = JobStatus::Processing;
        backend.save(&a).unwrap();
        assert_eq!(
            JobQueue::get(&backend, "a").unwrap().unwrap().status,
            JobStatus::Processing
        );

        let err = backend.save(&job("ghost", 0)).unwrap_err();
        assert!(matches!(err, Error::JobNotFound(ref id) if id == "ghost"));
    }

    #[test]
    fn test_list_and_oldest() {
        let backend = MemoryBackend::new();
        backend.enqueue(job("young", 10)).unwrap();
        backend.enqueue(job("old", 100)).unwrap();
        backend.enqueue(job("middle", 50)).unwrap();

        let ids: Vec<String> = backend.list().unwrap().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec!["old", "middle", "young"]);

        let oldest = backend.oldest(JobStatus::Pending).unwrap().unwrap();
        assert_eq!(oldest.id, "old");
        assert!(backend.oldest(JobStatus::Processing).unwrap().is_none());
    }

    #[test]
    fn test_oldest_stale_only_sees_untouched_processing_jobs() {
        let backend = MemoryBackend::new();
        for (id, age) in [("fresh", 10), ("stale", 100), ("waiting", 200)] {
            let mut j = job(id, age);
            if id != "waiting" {
                j.status = JobStatus::Processing;
            }
            backend.enqueue(j).unwrap();
        }

        // "waiting" is older but Pending, "fresh" was touched 10 s ago.
        let cutoff = Utc::now() - Duration::seconds(60);
        let stale = backend.oldest_stale(cutoff).unwrap().unwrap();
        assert_eq!(stale.id, "stale");

        let cutoff = Utc::now() - Duration::seconds(150);
        assert!(backend.oldest_stale(cutoff).unwrap().is_none());
    }

    #[test]
    fn test_checkpoint_delete_is_scoped_to_job() {
        let backend = MemoryBackend::new();
        backend.put(&checkpoint_path("a", 5), vec![1]).unwrap();
        backend.put(&checkpoint_path("a", 10), vec![2]).unwrap();
        backend.put(&checkpoint_path("ab", 5), vec![3]).unwrap();

        assert_eq!(
            CheckpointStore::get(&backend, &checkpoint_path("a", 10)).unwrap(),
            Some(vec![2])
        );
        assert_eq!(backend.delete_job("a").unwrap(), 2);
        assert_eq!(backend.checkpoint_keys(), vec![checkpoint_path("ab", 5)]);
    }

    #[test]
    fn test_entity_writes_require_a_node() {
        let backend = MemoryBackend::new();
        backend.insert_graph(
            "s",
            GraphSnapshot::new(vec![GraphNode::new("a")], vec![GraphEdge::new("a", "r", "b")]),
        );
        let v = augment(&[0.5; 45], &StructuralContext::new("a", "s", 0));

        backend.write_entity_embedding("s", "a", &v).unwrap();
        let err = backend.write_entity_embedding("s", "b", &v).unwrap_err();
        assert!(matches!(err, Error::Persistence { ref id, .. } if id == "b"));
        backend.write_relation_embedding("s", "r", &v).unwrap();

        let stored = backend.load_embeddings("s").unwrap();
        assert_eq!(stored.entities.len(), 1);
        assert_eq!(stored.relations.len(), 1);
        assert!(backend.load_embeddings("other").unwrap().is_empty());
    }
}
