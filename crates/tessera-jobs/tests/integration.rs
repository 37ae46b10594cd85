//! End-to-end job lifecycle over the filesystem backend.
//!
//! enqueue -> sliced training with checkpoints -> finalize -> prediction

use chrono::{Duration, Utc};
use tessera_core::{GraphEdge, GraphNode, GraphSnapshot};
use tessera_jobs::{
    EmbeddingSource, FsBackend, InvocationOutcome, JobQueue, JobStatus, Orchestrator,
    OrchestratorConfig,
};
use tessera_kge::{TrainingConfig, D_TOTAL};

fn library() -> GraphSnapshot {
    GraphSnapshot::new(
        vec![
            GraphNode::new("tolkien").with_name("J. R. R. Tolkien"),
            GraphNode::new("lewis").with_name("C. S. Lewis"),
            GraphNode::new("hobbit").with_property("year", serde_json::json!(1937)),
            GraphNode::new("narnia"),
            GraphNode::new("inklings"),
            GraphNode::new("draft").deleted(),
        ],
        vec![
            GraphEdge::new("tolkien", "wrote", "hobbit"),
            GraphEdge::new("lewis", "wrote", "narnia"),
            GraphEdge::new("tolkien", "memberOf", "inklings"),
            GraphEdge::new("lewis", "memberOf", "inklings"),
            GraphEdge::new("tolkien", "wrote", "draft"),
            GraphEdge::new("lewis", "friendOf", "tolkien").deleted(),
        ],
    )
}

#[test]
fn test_job_lifecycle_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsBackend::open(dir.path()).unwrap();
    backend.put_graph("books", &library()).unwrap();

    let training = TrainingConfig::default()
        .with_dimensions(16)
        .with_epochs(10)
        .with_seed(9);
    let orch = Orchestrator::with_backend(OrchestratorConfig::default(), &backend);
    let job = orch.enqueue("books", Some(training), Some(30)).unwrap();

    let start = Utc::now();
    let mut outcomes = Vec::new();
    for minute in 0..3 {
        outcomes.push(orch.run_once_at(start + Duration::minutes(minute)).unwrap());
    }

    assert!(matches!(outcomes[0], InvocationOutcome::Progress(_)));
    assert!(matches!(outcomes[1], InvocationOutcome::Progress(_)));
    let InvocationOutcome::Completed(summary) = &outcomes[2] else {
        panic!("expected completion, got {:?}", outcomes[2]);
    };

    // Soft-deleted rows never reach training.
    assert_eq!(summary.nodes_processed, 5);
    assert_eq!(summary.edges_processed, 4);
    assert_eq!(summary.processed_epochs, 30);

    let stored = JobQueue::get(&backend, &job.id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert!(!dir.path().join("checkpoints").join(&job.id).exists());

    let embeddings = backend.load_embeddings("books").unwrap();
    assert_eq!(embeddings.entities.len(), 5);
    assert_eq!(embeddings.relations.len(), 2);
    assert!(embeddings
        .entities
        .values()
        .all(|v| v.as_slice().len() == D_TOTAL));

    let predictor = embeddings.into_predictor();
    let tails = predictor.predict_tail("tolkien", "wrote", 3).unwrap();
    assert_eq!(tails.len(), 3);
    assert!(tails.iter().all(|p| p.id != "tolkien"));
}

#[test]
fn test_checkpoint_files_track_progress() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsBackend::open(dir.path()).unwrap();
    backend.put_graph("books", &library()).unwrap();

    let training = TrainingConfig::default().with_dimensions(8).with_epochs(5);
    let orch = Orchestrator::with_backend(OrchestratorConfig::default(), &backend);
    let job = orch.enqueue("books", Some(training), Some(20)).unwrap();

    orch.run_once().unwrap();
    let stored = JobQueue::get(&backend, &job.id).unwrap().unwrap();
    let checkpoint = stored.checkpoint_ref.clone().unwrap();
    assert_eq!(checkpoint, format!("checkpoints/{}/epoch-000005.json", job.id));
    assert!(dir.path().join(&checkpoint).is_file());

    let doc: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join(&checkpoint)).unwrap()).unwrap();
    assert_eq!(doc["schemaVersion"], 1);
    assert_eq!(doc["processedEpochs"], 5);
    assert_eq!(doc["config"]["dimensions"], 8);
}

#[test]
fn test_unknown_scope_completes_empty() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsBackend::open(dir.path()).unwrap();
    let orch = Orchestrator::with_backend(OrchestratorConfig::default(), &backend);

    // Unknown scope -> empty graph -> nothing to train, finalize writes nothing.
    let job = orch
        .enqueue("empty", Some(TrainingConfig::default().with_epochs(5)), Some(5))
        .unwrap();
    let outcome = orch.run_once().unwrap();
    let summary = outcome.summary().unwrap();
    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.persisted_embeddings, 0);
    assert!(summary.final_loss.is_none());

    let stored = JobQueue::get(&backend, &job.id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
}
