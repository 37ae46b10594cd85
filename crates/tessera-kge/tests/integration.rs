//! Integration tests for the embedding pipeline.
//!
//! training -> checkpoint -> augmentation -> link prediction

use std::collections::HashMap;
use tessera_core::{EntityId, GraphEdge, GraphNode, GraphSnapshot, RelationType, Triplet};
use tessera_kge::{
    augment, load_model, save_model, CheckpointProgress, EmbeddingStore, Predictor,
    StructuralContext, TrainingConfig, TransETrainer, D_TOTAL,
};

fn train_snapshot(snapshot: &GraphSnapshot, config: TrainingConfig) -> EmbeddingStore {
    let seed = config.seed;
    let mut store = EmbeddingStore::new(config);
    let mut trainer = TransETrainer::seeded(seed);
    trainer
        .initialize(&mut store, &snapshot.entity_ids(), &snapshot.relation_types())
        .unwrap();
    trainer.train(&mut store, &snapshot.triplets(), 0).unwrap();
    store
}

/// Small social graph: two teams, each with a leader.
fn social() -> GraphSnapshot {
    let nodes = ["alice", "bob", "carol", "dave", "erin", "frank", "acme", "globex"]
        .into_iter()
        .map(GraphNode::new)
        .collect();
    let edges = vec![
        GraphEdge::new("alice", "worksAt", "acme"),
        GraphEdge::new("bob", "worksAt", "acme"),
        GraphEdge::new("carol", "worksAt", "acme"),
        GraphEdge::new("dave", "worksAt", "globex"),
        GraphEdge::new("erin", "worksAt", "globex"),
        GraphEdge::new("frank", "worksAt", "globex"),
        GraphEdge::new("alice", "manages", "bob"),
        GraphEdge::new("dave", "manages", "erin"),
    ];
    GraphSnapshot::new(nodes, edges)
}

#[test]
fn test_true_link_outscores_unseen_link_across_seeds() {
    let triplets = vec![Triplet::new("A", "loves", "B")];
    let entities: Vec<EntityId> = ["A", "B", "C"].into_iter().map(EntityId::from).collect();
    let relations = vec![RelationType::from("loves")];

    let seeds = 0..20u64;
    let total = seeds.clone().count();
    let mut wins = 0;

    for seed in seeds {
        let config = TrainingConfig::default()
            .with_dimensions(4)
            .with_margin(1.0)
            .with_learning_rate(0.05)
            .with_epochs(100)
            .with_seed(seed);
        let mut store = EmbeddingStore::new(config);
        let mut trainer = TransETrainer::seeded(seed);
        trainer.initialize(&mut store, &entities, &relations).unwrap();
        trainer.train(&mut store, &triplets, 0).unwrap();

        let predictor = Predictor::from_store(&store);
        let good = predictor.triplet_score("A", "loves", "B").unwrap();
        let bad = predictor.triplet_score("A", "loves", "C").unwrap();
        if good > bad {
            wins += 1;
        }
    }

    assert!(
        wins * 10 >= total * 7,
        "true link won in only {}/{} seeded runs",
        wins,
        total
    );
}

#[test]
fn test_pipeline_on_snapshot() {
    let snapshot = social();
    let config = TrainingConfig::default()
        .with_dimensions(16)
        .with_epochs(50)
        .with_seed(3);
    let store = train_snapshot(&snapshot, config);

    assert_eq!(store.num_entities(), 8);
    assert_eq!(store.num_relations(), 2);

    let predictor = Predictor::from_store(&store);
    let preds = predictor.predict_tail("alice", "worksAt", 3).unwrap();
    assert_eq!(preds.len(), 3);
    assert!(preds.iter().all(|p| p.id != "alice"));
    assert!(preds.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(preds[0].rank, 1);

    let metrics = predictor
        .evaluate_graph_completeness(&snapshot.triplets())
        .unwrap();
    assert_eq!(metrics.num_ranks, 16);
    assert!(metrics.mean_rank >= 1.0);
    assert!(metrics.mean_reciprocal_rank > 0.0 && metrics.mean_reciprocal_rank <= 1.0);
}

#[test]
fn test_checkpoint_round_trip_preserves_predictions() {
    let snapshot = social();
    let config = TrainingConfig::default()
        .with_dimensions(8)
        .with_epochs(7)
        .with_seed(11);
    let mut store = train_snapshot(&snapshot, config);
    // Loading renormalizes; compare against a normalized original.
    store.normalize_all();

    let progress = CheckpointProgress {
        processed_epochs: 7,
        last_loss: Some(0.3),
    };
    let bytes = save_model(&store, progress).unwrap();
    let (restored, restored_progress) = load_model(&bytes).unwrap();

    assert_eq!(restored_progress.processed_epochs, 7);
    assert_eq!(restored.config(), store.config());
    assert_eq!(restored.entity_ids(), store.entity_ids());

    for id in store.entity_ids() {
        let a = store.entity(&id).unwrap();
        let b = restored.entity(&id).unwrap();
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    let before = Predictor::from_store(&store)
        .triplet_score("bob", "worksAt", "acme")
        .unwrap();
    let after = Predictor::from_store(&restored)
        .triplet_score("bob", "worksAt", "acme")
        .unwrap();
    assert!((before - after).abs() < 1e-4);
}

#[test]
fn test_resumed_store_keeps_trained_vectors() {
    let snapshot = social();
    let config = TrainingConfig::default().with_dimensions(8).with_epochs(5);
    let store = train_snapshot(&snapshot, config);

    let bytes = save_model(&store, CheckpointProgress::default()).unwrap();
    let (mut restored, _) = load_model(&bytes).unwrap();
    let snapshot_before = restored.clone();

    // Re-initializing a restored store only fills new ids.
    let mut trainer = TransETrainer::seeded(99);
    let mut entities = snapshot.entity_ids();
    entities.push(EntityId::from("newcomer"));
    let created = trainer
        .initialize(&mut restored, &entities, &snapshot.relation_types())
        .unwrap();

    assert_eq!(created, 1);
    assert_eq!(restored.entity("alice"), snapshot_before.entity("alice"));
    assert!(restored.entity("newcomer").is_some());
}

#[test]
fn test_predictor_over_augmented_vectors() {
    let snapshot = social();
    let config = TrainingConfig::default().with_dimensions(50).with_epochs(10);
    let store = train_snapshot(&snapshot, config);

    let entities: HashMap<_, _> = snapshot
        .entity_ids()
        .into_iter()
        .map(|id| {
            let ctx = StructuralContext::new(id.as_str(), "team-graph", 0);
            let v = augment(store.entity(id.as_str()).unwrap(), &ctx);
            (id.as_str().to_string(), v)
        })
        .collect();
    let counts = snapshot.relation_counts();
    let relations: HashMap<_, _> = snapshot
        .relation_types()
        .into_iter()
        .map(|rel| {
            let edges = counts.get(&rel).copied().unwrap_or(0);
            let ctx = StructuralContext::new(rel.as_str(), "team-graph", edges);
            let v = augment(store.relation(rel.as_str()).unwrap(), &ctx);
            (rel.as_str().to_string(), v)
        })
        .collect();

    let predictor = Predictor::from_contextual(entities, relations);
    assert_eq!(predictor.dimensions(), D_TOTAL);
    assert_eq!(predictor.num_entities(), 8);

    let sims = predictor.find_similar_entities("bob", 4).unwrap();
    assert_eq!(sims.len(), 4);
    assert!(sims.iter().all(|s| s.id != "bob"));

    let rels = predictor.predict_relation("alice", "acme", 2).unwrap();
    assert_eq!(rels.len(), 2);
}
