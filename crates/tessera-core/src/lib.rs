#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

//! Core types for the tessera embedding engine.
//!
//! This crate provides the vocabulary shared by training, job orchestration
//! and prediction:
//!
//! - [`EntityId`] / [`RelationType`] - identifiers for nodes and edge types
//! - [`Triplet`] - a `(head, relation, tail)` fact
//! - [`GraphNode`] / [`GraphEdge`] - rows as delivered by the graph store
//! - [`GraphSnapshot`] - one scope's nodes and edges, with triplet derivation
//!
//! # Example
//!
//! ```rust
//! use tessera_core::{GraphEdge, GraphNode, GraphSnapshot};
//!
//! let snapshot = GraphSnapshot::new(
//!     vec![GraphNode::new("marie"), GraphNode::new("radium")],
//!     vec![GraphEdge::new("marie", "discovered", "radium")],
//! );
//!
//! let triplets = snapshot.triplets();
//! assert_eq!(triplets.len(), 1);
//! assert_eq!(triplets[0].relation.as_str(), "discovered");
//! ```

mod entity;
mod graph;
mod relation;
mod triplet;

pub use entity::{EntityId, GraphNode};
pub use graph::GraphSnapshot;
pub use relation::{GraphEdge, RelationType};
pub use triplet::Triplet;
