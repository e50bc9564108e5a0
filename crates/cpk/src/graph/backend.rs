//! Persistence backend for the graph store.
//!
//! A backend stores whole committed snapshots. The store stages changes in
//! memory and hands the backend a new snapshot on each commit; the backend
//! either persists all of it or returns an error.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::attribute::Attribute;
use crate::graph::node::{Edge, Node};

/// Everything the graph store persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub attributes: Vec<Attribute>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Storage collaborator of [`GraphStore`](crate::graph::GraphStore).
pub trait Backend {
    /// Last committed snapshot, or `None` for a store that was never written.
    fn load(&self) -> Result<Option<GraphSnapshot>>;

    /// Atomically replace the committed snapshot.
    fn save(&mut self, snapshot: &GraphSnapshot) -> Result<()>;
}

/// Backend keeping the committed snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    snapshot: Option<GraphSnapshot>,
    commits: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots saved so far.
    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn snapshot(&self) -> Option<&GraphSnapshot> {
        self.snapshot.as_ref()
    }
}

impl Backend for MemoryBackend {
    fn load(&self) -> Result<Option<GraphSnapshot>> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &GraphSnapshot) -> Result<()> {
        self.snapshot = Some(snapshot.clone());
        self.commits += 1;
        Ok(())
    }
}
