use crate::{EntityId, GraphEdge, GraphNode, RelationType, Triplet};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One scope's worth of graph rows (a graph or topic).
///
/// Soft-deleted nodes and edges are dropped on construction, as are edges
/// touching a soft-deleted node, so everything downstream sees live rows only.
///
/// # Example
///
/// ```rust
/// use tessera_core::{GraphEdge, GraphNode, GraphSnapshot};
///
/// let snapshot = GraphSnapshot::new(
///     vec![GraphNode::new("a"), GraphNode::new("b"), GraphNode::new("gone").deleted()],
///     vec![
///         GraphEdge::new("a", "knows", "b"),
///         GraphEdge::new("a", "knows", "gone"),
///     ],
/// );
///
/// assert_eq!(snapshot.node_count(), 2);
/// assert_eq!(snapshot.edge_count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSnapshot")]
pub struct GraphSnapshot {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    /// Node id -> position in `nodes` (first row wins on duplicates).
    #[serde(skip)]
    index: HashMap<EntityId, usize>,
}

/// Wire shape, filtered through [`GraphSnapshot::new`] on deserialization.
#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    nodes: Vec<GraphNode>,
    #[serde(default)]
    edges: Vec<GraphEdge>,
}

impl From<RawSnapshot> for GraphSnapshot {
    fn from(raw: RawSnapshot) -> Self {
        Self::new(raw.nodes, raw.edges)
    }
}

impl GraphSnapshot {
    /// Build a snapshot, discarding soft-deleted rows.
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        let deleted: HashSet<&EntityId> =
            nodes.iter().filter(|n| n.deleted).map(|n| &n.id).collect();

        let edges = edges
            .into_iter()
            .filter(|e| !e.deleted)
            .filter(|e| !deleted.contains(&e.from_id) && !deleted.contains(&e.to_id))
            .collect();
        let nodes: Vec<GraphNode> = nodes.iter().filter(|n| !n.deleted).cloned().collect();

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.id.clone()).or_insert(i);
        }

        Self {
            nodes,
            edges,
            index,
        }
    }

    /// Live node rows.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Live edge rows.
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Look up a node row by id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// One triplet per live edge, in edge order.
    pub fn triplets(&self) -> Vec<Triplet> {
        self.edges.iter().map(Triplet::from).collect()
    }

    /// Distinct entity ids: nodes first, then edge endpoints without a node row.
    ///
    /// Order is stable (first appearance), which keeps seeded initialization
    /// reproducible.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(self.nodes.len());

        let endpoints = self
            .edges
            .iter()
            .flat_map(|e| [&e.from_id, &e.to_id]);

        for id in self.nodes.iter().map(|n| &n.id).chain(endpoints) {
            if seen.insert(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    /// Distinct relation types in order of first appearance.
    pub fn relation_types(&self) -> Vec<RelationType> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .filter(|e| seen.insert(&e.relation_type))
            .map(|e| e.relation_type.clone())
            .collect()
    }

    /// Number of edges per relation type.
    pub fn relation_counts(&self) -> HashMap<RelationType, usize> {
        let mut counts = HashMap::new();
        for edge in &self.edges {
            *counts.entry(edge.relation_type.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GraphSnapshot {
        GraphSnapshot::new(
            vec![
                GraphNode::new("alice").with_name("Alice"),
                GraphNode::new("bob"),
                GraphNode::new("carol").deleted(),
            ],
            vec![
                GraphEdge::new("alice", "knows", "bob"),
                GraphEdge::new("bob", "knows", "alice"),
                GraphEdge::new("alice", "worksAt", "acme"),
                GraphEdge::new("bob", "knows", "carol"),
                GraphEdge::new("alice", "likes", "bob").deleted(),
            ],
        )
    }

    #[test]
    fn test_soft_deleted_rows_are_dropped() {
        let g = sample();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 3);
        assert!(g.node("carol").is_none());
        assert!(g.triplets().iter().all(|t| t.tail.as_str() != "carol"));
    }

    #[test]
    fn test_entity_ids_include_dangling_endpoints() {
        let ids: Vec<String> = sample().entity_ids().into_iter().map(|e| e.0).collect();
        assert_eq!(ids, vec!["alice", "bob", "acme"]);
    }

    #[test]
    fn test_relation_types_are_distinct() {
        let g = sample();
        let types: Vec<String> = g.relation_types().into_iter().map(|r| r.0).collect();
        assert_eq!(types, vec!["knows", "worksAt"]);

        let counts = g.relation_counts();
        assert_eq!(counts[&RelationType::new("knows")], 2);
        assert_eq!(counts[&RelationType::new("worksAt")], 1);
    }

    #[test]
    fn test_node_lookup() {
        let g = GraphSnapshot::new(
            vec![
                GraphNode::new("a").with_name("first"),
                GraphNode::new("b"),
                GraphNode::new("a").with_name("second"),
                GraphNode::new("c").deleted(),
            ],
            vec![],
        );
        assert_eq!(g.node("a").map(GraphNode::label), Some("first"));
        assert!(g.node("b").is_some());
        assert!(g.node("c").is_none());
        assert!(g.node("missing").is_none());

        let json = r#"{"nodes": [{"id": "x"}, {"id": "y", "deleted": true}]}"#;
        let g: GraphSnapshot = serde_json::from_str(json).unwrap();
        assert!(g.node("x").is_some());
        assert!(g.node("y").is_none());
    }

    #[test]
    fn test_node_lookup_scales_to_large_scopes() {
        let nodes = (0..50_000).map(|i| GraphNode::new(format!("n{i}"))).collect();
        let g = GraphSnapshot::new(nodes, vec![]);
        for id in g.entity_ids() {
            assert_eq!(g.node(id.as_str()).map(|n| &n.id), Some(&id));
        }
    }

    #[test]
    fn test_deserialize_filters() {
        let json = r#"{
            "nodes": [{"id": "a"}, {"id": "b", "deleted": true}],
            "edges": [{"fromId": "a", "toId": "b", "type": "r"}]
        }"#;
        let g: GraphSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn edge_rows() -> impl Strategy<Value = Vec<(u8, u8, u8, bool)>> {
            proptest::collection::vec((0u8..6, 0u8..3, 0u8..6, any::<bool>()), 0..20)
        }

        proptest! {
            #[test]
            fn entity_ids_are_distinct_and_cover_triplets(rows in edge_rows()) {
                let edges = rows
                    .iter()
                    .map(|&(h, r, t, gone)| {
                        let e = GraphEdge::new(format!("n{h}"), format!("r{r}"), format!("n{t}"));
                        if gone { e.deleted() } else { e }
                    })
                    .collect();
                let g = GraphSnapshot::new(vec![GraphNode::new("n0")], edges);

                let ids = g.entity_ids();
                let distinct: HashSet<_> = ids.iter().collect();
                prop_assert_eq!(distinct.len(), ids.len());
                prop_assert_eq!(g.edge_count(), rows.iter().filter(|r| !r.3).count());
                for t in g.triplets() {
                    prop_assert!(distinct.contains(&t.head));
                    prop_assert!(distinct.contains(&t.tail));
                }
            }
        }
    }
}
