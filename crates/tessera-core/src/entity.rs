//! Entity identifiers and node rows.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Unique identifier for an entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Create a new entity ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A node row as stored by the graph store.
///
/// Rows with `deleted` set are soft-deleted and never reach training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier.
    pub id: EntityId,

    /// Human-readable name or label.
    #[serde(default)]
    pub name: Option<String>,

    /// Free-form property payload.
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,

    /// Soft-delete marker.
    #[serde(default)]
    pub deleted: bool,
}

impl GraphNode {
    /// Create a node with just an ID.
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            properties: serde_json::Map::new(),
            deleted: false,
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
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

    /// Label used for structural features: the name, else the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    /// Size in bytes of the serialized property payload.
    pub fn payload_size(&self) -> usize {
        if self.properties.is_empty() {
            return 0;
        }
        serde_json::to_string(&self.properties).map_or(0, |s| s.len())
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref name) = self.name {
            write!(f, "{} ({})", name, self.id)
        } else {
            write!(f, "{}", self.id)
        }
    }
}
