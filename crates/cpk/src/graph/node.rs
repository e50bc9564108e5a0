//! Nodes and edges of the credential graph.

use serde::{Deserialize, Serialize};

use crate::graph::attribute::AttributeId;

/// Value carried by the root node.
pub const ROOT_VALUE: &str = "root";

/// Index of a node in the store arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The singleton graph root.
    pub const ROOT: NodeId = NodeId(0);
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// A graph node. Relationships live in [`Edge`]s, not in the node.
///
/// A node without an attribute reads as the `default` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<AttributeId>,
    pub value: String,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.id == NodeId::ROOT
    }
}

/// Directed link from a higher node to a lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub higher: NodeId,
    pub lower: NodeId,
}
