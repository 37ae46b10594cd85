//! Filesystem backend.
//!
//! One workspace directory holds every kind of record as JSON:
//!
//! ```text
//! <root>/
//!   graphs/{scope}.json                 GraphSnapshot (nodes, edges)
//!   jobs/{id}.json                      TrainingJob
//!   checkpoints/{job}/epoch-NNNNNN.json checkpoint blobs
//!   embeddings/{scope}.json             PersistedEmbeddings
//! ```
//!
//! Files are replaced by writing a sibling temp file and renaming it over the
//! target, so a crash never leaves a half-written record behind.

use crate::error::{Error, Result};
use crate::job::TrainingJob;
use crate::storage::{
    CheckpointStore, EmbeddingSink, EmbeddingSource, GraphSource, JobQueue, PersistedEmbeddings,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tessera_core::GraphSnapshot;
use tessera_kge::{checkpoint_prefix, ContextualEmbedding};
use tracing::debug;

const GRAPHS_DIR: &str = "graphs";
const JOBS_DIR: &str = "jobs";
const EMBEDDINGS_DIR: &str = "embeddings";

/// Vectors written since the last flush, plus the node ids they may target.
#[derive(Debug, Default)]
struct PendingScope {
    nodes: HashSet<String>,
    embeddings: PersistedEmbeddings,
}

/// All storage seams over a workspace directory.
#[derive(Debug)]
pub struct FsBackend {
    root: PathBuf,
    pending: Mutex<HashMap<String, PendingScope>>,
}

impl FsBackend {
    /// Open (and create if needed) a workspace at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [GRAPHS_DIR, JOBS_DIR, EMBEDDINGS_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self {
            root,
            pending: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store the graph of `scope_id`.
    pub fn put_graph(&self, scope_id: &str, snapshot: &GraphSnapshot) -> Result<()> {
        let path = self.record_path(GRAPHS_DIR, scope_id)?;
        write_json(&path, snapshot)
    }

    fn record_path(&self, dir: &str, name: &str) -> Result<PathBuf> {
        if !is_plain_name(name) {
            return Err(Error::Storage(format!("invalid record name: {:?}", name)));
        }
        Ok(self.root.join(dir).join(format!("{}.json", name)))
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !plain || !key.starts_with("checkpoints/") {
            return Err(Error::Storage(format!("invalid checkpoint key: {:?}", key)));
        }
        Ok(self.root.join(relative))
    }

    fn with_pending<T>(
        &self,
        scope_id: &str,
        f: impl FnOnce(&mut PendingScope) -> Result<T>,
    ) -> Result<T> {
        let mut pending = self.pending.lock();
        if !pending.contains_key(scope_id) {
            let graph = self.fetch_graph(scope_id)?;
            let nodes = graph.nodes().iter().map(|n| n.id.as_str().to_string()).collect();
            pending.insert(
                scope_id.to_string(),
                PendingScope {
                    nodes,
                    embeddings: PersistedEmbeddings::default(),
                },
            );
        }
        match pending.get_mut(scope_id) {
            Some(scope) => f(scope),
            None => Err(Error::Storage(format!("no pending writes for {}", scope_id))),
        }
    }
}

/// A single path component with no separators or dot segments.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl GraphSource for FsBackend {
    fn fetch_graph(&self, scope_id: &str) -> Result<GraphSnapshot> {
        let path = self.record_path(GRAPHS_DIR, scope_id)?;
        Ok(read_json(&path)?.unwrap_or_default())
    }
}

impl JobQueue for FsBackend {
    fn enqueue(&self, job: TrainingJob) -> Result<()> {
        let path = self.record_path(JOBS_DIR, &job.id)?;
        if path.exists() {
            return Err(Error::Storage(format!("job {} already exists", job.id)));
        }
        write_json(&path, &job)
    }

    fn get(&self, id: &str) -> Result<Option<TrainingJob>> {
        let path = self.record_path(JOBS_DIR, id)?;
        read_json(&path)
    }

    fn list(&self) -> Result<Vec<TrainingJob>> {
        let mut jobs = Vec::new();
        for entry in fs::read_dir(self.root.join(JOBS_DIR))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(job) = read_json::<TrainingJob>(&path)? {
                jobs.push(job);
            }
        }
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }

    fn save(&self, job: &TrainingJob) -> Result<()> {
        let path = self.record_path(JOBS_DIR, &job.id)?;
        if !path.exists() {
            return Err(Error::JobNotFound(job.id.clone()));
        }
        write_json(&path, job)
    }
}

impl CheckpointStore for FsBackend {
    fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        write_atomic(&self.blob_path(path)?, &bytes)
    }

    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.blob_path(path)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_job(&self, job_id: &str) -> Result<usize> {
        let prefix = checkpoint_prefix(job_id);
        let dir = self.blob_path(prefix.trim_end_matches('/'))?;

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut removed = 0;
        for entry in entries {
            if entry?.file_type()?.is_file() {
                removed += 1;
            }
        }
        fs::remove_dir_all(&dir)?;
        debug!(job_id, removed, "deleted checkpoints");
        Ok(removed)
    }
}

impl EmbeddingSink for FsBackend {
    fn write_entity_embedding(
        &self,
        scope_id: &str,
        entity_id: &str,
        embedding: &ContextualEmbedding,
    ) -> Result<()> {
        self.with_pending(scope_id, |scope| {
            if !scope.nodes.contains(entity_id) {
                return Err(Error::Persistence {
                    id: entity_id.to_string(),
                    message: format!("no node with this id in scope {}", scope_id),
                });
            }
            scope
                .embeddings
                .entities
                .insert(entity_id.to_string(), *embedding);
            Ok(())
        })
    }

    fn write_relation_embedding(
        &self,
        scope_id: &str,
        relation_type: &str,
        embedding: &ContextualEmbedding,
    ) -> Result<()> {
        self.with_pending(scope_id, |scope| {
            scope
                .embeddings
                .relations
                .insert(relation_type.to_string(), *embedding);
            Ok(())
        })
    }

    fn flush(&self, scope_id: &str) -> Result<()> {
        let Some(scope) = self.pending.lock().remove(scope_id) else {
            return Ok(());
        };
        let path = self.record_path(EMBEDDINGS_DIR, scope_id)?;
        let mut stored: PersistedEmbeddings = read_json(&path)?.unwrap_or_default();
        stored.merge(scope.embeddings);
        write_json(&path, &stored)
    }
}

impl EmbeddingSource for FsBackend {
    fn load_embeddings(&self, scope_id: &str) -> Result<PersistedEmbeddings> {
        let path = self.record_path(EMBEDDINGS_DIR, scope_id)?;
        Ok(read_json(&path)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{GraphEdge, GraphNode};
    use tessera_kge::{augment, checkpoint_path, StructuralContext, TrainingConfig};

    fn backend() -> (tempfile::TempDir, FsBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::open(dir.path().join("ws")).unwrap();
        (dir, backend)
    }

    #[test]
    fn test_open_creates_layout() {
        let (_dir, backend) = backend();
        assert!(backend.root().join("graphs").is_dir());
        assert!(backend.root().join("jobs").is_dir());
        assert!(backend.root().join("embeddings").is_dir());
    }

    #[test]
    fn test_graph_round_trip() {
        let (_dir, backend) = backend();
        let snapshot = GraphSnapshot::new(
            vec![GraphNode::new("a"), GraphNode::new("b")],
            vec![GraphEdge::new("a", "knows", "b")],
        );
        backend.put_graph("team", &snapshot).unwrap();

        assert_eq!(backend.fetch_graph("team").unwrap(), snapshot);
        assert_eq!(backend.fetch_graph("nobody").unwrap().node_count(), 0);
    }

    #[test]
    fn test_jobs_persist_across_instances() {
        let (dir, backend) = backend();
        let job = TrainingJob::new("team", TrainingConfig::default(), 10).with_id("job-1");
        backend.enqueue(job.clone()).unwrap();
        assert!(backend.enqueue(job.clone()).is_err());

        let reopened = FsBackend::open(dir.path().join("ws")).unwrap();
        assert_eq!(JobQueue::get(&reopened, "job-1").unwrap(), Some(job));
        assert_eq!(reopened.list().unwrap().len(), 1);
        assert!(JobQueue::get(&reopened, "job-2").unwrap().is_none());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let (_dir, backend) = backend();
        assert!(JobQueue::get(&backend, "../escape").is_err());
        assert!(backend.fetch_graph("a/b").is_err());
        assert!(backend.put("checkpoints/../../etc/passwd", vec![]).is_err());
        assert!(backend.put("elsewhere/x.json", vec![]).is_err());
    }

    #[test]
    fn test_checkpoint_blobs() {
        let (_dir, backend) = backend();
        backend.put(&checkpoint_path("j", 25), b"one".to_vec()).unwrap();
        backend.put(&checkpoint_path("j", 50), b"two".to_vec()).unwrap();

        assert_eq!(
            CheckpointStore::get(&backend, &checkpoint_path("j", 50)).unwrap(),
            Some(b"two".to_vec())
        );
        assert!(CheckpointStore::get(&backend, &checkpoint_path("j", 75))
            .unwrap()
            .is_none());

        assert_eq!(backend.delete_job("j").unwrap(), 2);
        assert!(!backend.root().join("checkpoints/j").exists());
        assert_eq!(backend.delete_job("j").unwrap(), 0);
    }

    #[test]
    fn test_embeddings_are_buffered_until_flush() {
        let (_dir, backend) = backend();
        backend
            .put_graph(
                "s",
                &GraphSnapshot::new(vec![GraphNode::new("a")], vec![GraphEdge::new("a", "r", "x")]),
            )
            .unwrap();
        let v = augment(&[0.25; 45], &StructuralContext::new("a", "s", 3));

        backend.write_entity_embedding("s", "a", &v).unwrap();
        backend.write_relation_embedding("s", "r", &v).unwrap();
        assert!(matches!(
            backend.write_entity_embedding("s", "x", &v),
            Err(Error::Persistence { .. })
        ));
        assert!(backend.load_embeddings("s").unwrap().is_empty());

        backend.flush("s").unwrap();
        let stored = backend.load_embeddings("s").unwrap();
        assert_eq!(stored.entities.get("a"), Some(&v));
        assert_eq!(stored.relations.len(), 1);

        // A second flush with nothing pending is a no-op.
        backend.flush("s").unwrap();
        assert_eq!(backend.load_embeddings("s").unwrap(), stored);
    }
}
