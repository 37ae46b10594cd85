//! Relation types and edge rows.

use crate::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A relation type (edge label) in a knowledge graph.
///
/// Every edge sharing a type shares one relation embedding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationType(pub String);

impl RelationType {
    /// Create a new relation type.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the relation type as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RelationType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RelationType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for RelationType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An edge row as stored by the graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Source node.
    pub from_id: EntityId,

    /// Target node.
    pub to_id: EntityId,

    /// Edge type.
    #[serde(rename = "type")]
    pub relation_type: RelationType,

    /// Free-form property payload.
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,

    /// Soft-delete marker.
    #[serde(default)]
    pub deleted: bool,
}

impl GraphEdge {
    /// Create an edge `from --[relation_type]--> to`.
    pub fn new(
        from: impl Into<EntityId>,
        relation_type: impl Into<RelationType>,
        to: impl Into<EntityId>,
    ) -> Self {
        Self {
            from_id: from.into(),
            to_id: to.into(),
            relation_type: relation_type.into(),
            properties: serde_json::Map::new(),
            deleted: false,
        }
    }

    /// Add a property.
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Mark the row as soft-deleted.
    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }
}

impl fmt::Display for GraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --[{}]--> {}", self.from_id, self.relation_type, self.to_id)
    }
}
