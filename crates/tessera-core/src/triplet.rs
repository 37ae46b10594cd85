//! Triplet type.
//!
//! A triplet is a `(head, relation, tail)` fact derived from one graph edge.

use crate::{EntityId, GraphEdge, RelationType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(head, relation, tail)` fact.
///
/// # Example
///
/// ```rust
/// use tessera_core::Triplet;
///
/// let t = Triplet::new("Paris", "capitalOf", "France");
/// assert_eq!(t.head.as_str(), "Paris");
/// assert_eq!(t.relation.as_str(), "capitalOf");
/// assert_eq!(t.tail.as_str(), "France");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triplet {
    /// Head entity.
    pub head: EntityId,
    /// Relation type.
    pub relation: RelationType,
    /// Tail entity.
    pub tail: EntityId,
}

impl Triplet {
    /// Create a new triplet.
    pub fn new(
        head: impl Into<EntityId>,
        relation: impl Into<RelationType>,
        tail: impl Into<EntityId>,
    ) -> Self {
        Self {
            head: head.into(),
            relation: relation.into(),
            tail: tail.into(),
        }
    }

    /// Parse a `head,relation,tail` line.
    ///
    /// Whitespace around each field is trimmed. Returns `None` for lines with
    /// fewer than three fields or an empty field.
    pub fn from_csv_line(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, ',').map(str::trim);
        let head = parts.next().filter(|s| !s.is_empty())?;
        let relation = parts.next().filter(|s| !s.is_empty())?;
        let tail = parts.next().filter(|s| !s.is_empty())?;
        Some(Self::new(head, relation, tail))
    }
}

impl From<&GraphEdge> for Triplet {
    fn from(edge: &GraphEdge) -> Self {
        Self {
            head: edge.from_id.clone(),
            relation: edge.relation_type.clone(),
            tail: edge.to_id.clone(),
        }
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.head, self.relation, self.tail)
    }
}
