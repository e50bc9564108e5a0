//! JSON graph file.
//!
//! ```json
//! {
//!     "format": "cpk-graph",
//!     "attributes": [{"id": 0, "name": "default"}],
//!     "nodes": [{"id": 0, "value": "root"}, {"id": 1, "attribute": 1, "value": "alice"}],
//!     "edges": [{"higher": 0, "lower": 1}]
//! }
//! ```
//!
//! Node values are stored exactly as the store holds them; entry
//! operations encrypt values before they reach the graph.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::write_atomic;
use crate::error::{CpkError, Result};
use crate::graph::{Backend, GraphSnapshot};

const GRAPH_FORMAT: &str = "cpk-graph";

#[derive(Debug, Serialize, Deserialize)]
struct GraphFile {
    format: String,
    #[serde(flatten)]
    snapshot: GraphSnapshot,
}

/// [`Backend`] persisting snapshots to a single JSON file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for FileBackend {
    fn load(&self) -> Result<Option<GraphSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        if !self.path.is_file() {
            return Err(CpkError::InvalidFileFormat(format!(
                "{} is not a file",
                self.path.display()
            )));
        }

        let bytes = std::fs::read(&self.path)?;
        let file: GraphFile = serde_json::from_slice(&bytes)
            .map_err(|e| CpkError::InvalidFileFormat(format!("{}: {e}", self.path.display())))?;
        if file.format != GRAPH_FORMAT {
            return Err(CpkError::InvalidFileFormat(format!(
                "unsupported format {:?}",
                file.format
            )));
        }
        log::debug!("loaded graph from {}", self.path.display());
        Ok(Some(file.snapshot))
    }

    fn save(&mut self, snapshot: &GraphSnapshot) -> Result<()> {
        let file = GraphFile {
            format: GRAPH_FORMAT.to_string(),
            snapshot: snapshot.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| CpkError::SerializationError(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes())
    }
}
