//! Graph store and path resolver.
//!
//! Nodes live in an arena indexed by [`NodeId`]; edges are kept both as a
//! list of pairs (what gets persisted) and as per-node adjacency lists of
//! children and parents (what resolution walks).
//!
//! Resolution walks a path from the root. At each step the children of the
//! current node are filtered by the step's attribute and value. One match
//! descends, zero matches either fails or creates a node, and more than one
//! match is a broken uniqueness invariant reported as
//! [`CpkError::AmbiguousPath`]. It is never resolved by picking one.
//!
//! Changes are staged in memory until [`GraphStore::commit`] hands a full
//! snapshot to the [`Backend`].

use log::{debug, warn};

use crate::error::{CpkError, Result};
use crate::graph::attribute::{
    AttrRef, Attribute, AttributeId, AttributeRegistry, DEFAULT_ATTRIBUTE, PASSWORD_ATTRIBUTE,
};
use crate::graph::backend::{Backend, GraphSnapshot, MemoryBackend};
use crate::graph::node::{Edge, Node, NodeId, ROOT_VALUE};
use crate::graph::path::{display_path, PathStep, TerminalPolicy};

/// Options fixed when a store is opened.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Name of the reserved password attribute; `None` disables it.
    pub password_attribute: Option<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            password_attribute: Some(PASSWORD_ATTRIBUTE.to_string()),
        }
    }
}

/// Handle to an initialized graph.
pub struct GraphStore<B: Backend = MemoryBackend> {
    backend: B,
    registry: AttributeRegistry,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// Children of each node.
    lower: Vec<Vec<NodeId>>,
    /// Parents of each node.
    higher: Vec<Vec<NodeId>>,
    committed: GraphSnapshot,
    password_attribute: Option<String>,
    dirty: bool,
}

impl GraphStore<MemoryBackend> {
    /// Open a fresh store backed by memory.
    pub fn in_memory() -> Result<Self> {
        Self::open(MemoryBackend::new(), StoreOptions::default())
    }
}

impl<B: Backend> GraphStore<B> {
    /// Load the committed snapshot and initialize the store.
    ///
    /// Creates the `default` attribute and the root node when they are
    /// missing and commits that bootstrap. Opening an initialized store
    /// writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `CpkError::InvalidFileFormat` when the persisted snapshot is
    /// inconsistent, or whatever the backend fails with.
    pub fn open(backend: B, options: StoreOptions) -> Result<Self> {
        let snapshot = backend.load()?.unwrap_or_default();
        validate_snapshot(&snapshot)?;

        let password_attribute = options.password_attribute.filter(|n| !n.is_empty());
        let mut store = Self {
            backend,
            registry: AttributeRegistry::new(password_attribute.clone()),
            nodes: Vec::new(),
            edges: Vec::new(),
            lower: Vec::new(),
            higher: Vec::new(),
            committed: snapshot.clone(),
            password_attribute,
            dirty: false,
        };
        store.restore(snapshot);

        if store.bootstrap() {
            debug!("initializing graph store");
            store.commit()?;
        }
        Ok(store)
    }

    fn bootstrap(&mut self) -> bool {
        let mut changed = false;
        if !self.registry.is_initialized() {
            self.registry.init();
            changed = true;
        }
        if self.nodes.is_empty() {
            self.push_node(None, ROOT_VALUE.to_string());
            changed = true;
        }
        changed
    }

    fn restore(&mut self, snapshot: GraphSnapshot) {
        self.registry =
            AttributeRegistry::from_attributes(snapshot.attributes, self.password_attribute.clone());
        self.lower = vec![Vec::new(); snapshot.nodes.len()];
        self.higher = vec![Vec::new(); snapshot.nodes.len()];
        self.nodes = snapshot.nodes;
        self.edges = Vec::with_capacity(snapshot.edges.len());
        for edge in snapshot.edges {
            if !self.lower[edge.higher.0].contains(&edge.lower) {
                self.push_edge(edge);
            }
        }
        self.dirty = false;
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn root(&self) -> &Node {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| CpkError::NotFound(format!("node {id}")))
    }

    /// Nodes reachable through one edge where `id` is the higher end.
    pub fn children(&self, id: NodeId) -> Result<Vec<&Node>> {
        self.node(id)?;
        Ok(self.lower[id.0].iter().map(|c| &self.nodes[c.0]).collect())
    }

    /// Nodes reachable through one edge where `id` is the lower end.
    pub fn parents(&self, id: NodeId) -> Result<Vec<&Node>> {
        self.node(id)?;
        Ok(self.higher[id.0].iter().map(|p| &self.nodes[p.0]).collect())
    }

    /// The attribute a node reads as; untyped nodes read as `default`.
    pub fn attribute_of(&self, node: &Node) -> Result<&Attribute> {
        let id = match node.attribute {
            Some(id) => id,
            None => self.registry.default()?,
        };
        self.registry.get(&AttrRef::Id(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Whether changes are staged since the last commit or rollback.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ── Attributes ────────────────────────────────────────────────────────────

    pub fn attribute(&self, attr: &AttrRef) -> Result<&Attribute> {
        self.registry.get(attr)
    }

    pub fn default_attribute(&self) -> Result<AttributeId> {
        self.registry.default()
    }

    pub fn get_or_create_attribute(&mut self, name: &str) -> Result<AttributeId> {
        self.resolve_attribute(&AttrRef::from(name))
    }

    /// The reserved password attribute, created on first use. `None` when
    /// the store was opened without one.
    pub fn password_attribute(&mut self) -> Option<AttributeId> {
        let before = self.registry.len();
        let id = self.registry.get_or_create_password();
        self.dirty |= self.registry.len() != before;
        id
    }

    /// Stage a new attribute. A duplicate name fails at commit time with
    /// `CpkError::AttributeConflict`.
    pub fn create_attribute(
        &mut self,
        name: &str,
        description: Option<String>,
    ) -> Result<AttributeId> {
        let id = self.registry.create(name, description)?;
        self.dirty = true;
        Ok(id)
    }

    fn resolve_attribute(&mut self, attr: &AttrRef) -> Result<AttributeId> {
        let before = self.registry.len();
        let id = self.registry.resolve_or_create(attr)?;
        self.dirty |= self.registry.len() != before;
        Ok(id)
    }

    fn is_default_ref(&self, attr: &AttrRef) -> bool {
        match attr {
            AttrRef::Name(name) => name == DEFAULT_ATTRIBUTE,
            AttrRef::Id(id) => self.registry.default().ok() == Some(*id),
        }
    }

    // ── Resolution ────────────────────────────────────────────────────────────

    /// Apply the terminal policy to a path.
    ///
    /// A last step that carries only a real (non-default) attribute names
    /// the target type itself. Otherwise the policy's implicit type, if any,
    /// is appended as an attribute-only step. Returns the rewritten path and
    /// the target type.
    pub fn target_path(
        &self,
        path: &[PathStep],
        policy: &TerminalPolicy,
    ) -> (Vec<PathStep>, Option<AttrRef>) {
        let mut steps = path.to_vec();
        let explicit = match steps.last() {
            Some(last) if last.value_str().is_none() => last
                .attribute_ref()
                .filter(|a| !self.is_default_ref(a))
                .cloned(),
            _ => None,
        };
        let target = match explicit {
            Some(attr) => {
                steps.pop();
                Some(attr)
            }
            None => policy.implicit_type().map(AttrRef::from),
        };
        if let Some(attr) = &target {
            steps.push(PathStep::attr(attr.clone()));
        }
        (steps, target)
    }

    /// Resolve a path to exactly one node without modifying the graph.
    ///
    /// # Errors
    ///
    /// `CpkError::PathNotFound` when a step matches nothing,
    /// `CpkError::AmbiguousPath` when a step matches several children.
    pub fn find(&self, path: &[PathStep]) -> Result<NodeId> {
        let default = self.registry.default()?;
        let mut current = NodeId::ROOT;
        for step in path {
            let attribute = match step.attribute_ref() {
                None => None,
                Some(attr @ AttrRef::Name(_)) => match self.registry.lookup(attr) {
                    Some(id) => Some(id),
                    None => return Err(path_not_found(step)),
                },
                Some(attr) => Some(self.registry.get(attr)?.id),
            };
            current = self
                .select(current, attribute, step.value_str(), default)?
                .ok_or_else(|| path_not_found(step))?;
        }
        debug!("resolved [{}] to {current}", display_path(path));
        Ok(current)
    }

    /// Resolve a path to exactly one node, creating missing nodes along the
    /// way when `create` is set.
    ///
    /// Created nodes, edges and attributes stay staged until
    /// [`GraphStore::commit`].
    ///
    /// # Errors
    ///
    /// As [`GraphStore::find`], except that a step matching nothing creates
    /// a node instead of failing.
    pub fn resolve(&mut self, path: &[PathStep], create: bool) -> Result<NodeId> {
        if !create {
            return self.find(path);
        }

        let default = self.registry.default()?;
        let mut current = NodeId::ROOT;
        for step in path {
            let attribute = match step.attribute_ref() {
                None => None,
                Some(attr) => Some(self.resolve_attribute(attr)?),
            };
            current = match self.select(current, attribute, step.value_str(), default)? {
                Some(next) => next,
                None => {
                    let value = step.value_str().unwrap_or_default();
                    self.add_child(current, attribute, value)?
                }
            };
        }
        debug!("resolved [{}] to {current} (create)", display_path(path));
        Ok(current)
    }

    fn select(
        &self,
        parent: NodeId,
        attribute: Option<AttributeId>,
        value: Option<&str>,
        default: AttributeId,
    ) -> Result<Option<NodeId>> {
        let matches: Vec<NodeId> = self.lower[parent.0]
            .iter()
            .copied()
            .filter(|id| {
                let node = &self.nodes[id.0];
                attribute.map_or(true, |a| node.attribute.unwrap_or(default) == a)
                    && value.map_or(true, |v| node.value == v)
            })
            .collect();

        match matches.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => Err(CpkError::AmbiguousPath {
                matches: matches.iter().map(|id| self.nodes[id.0].clone()).collect(),
                last: self.nodes[parent.0].clone(),
            }),
        }
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Create a node below `higher` without any uniqueness check.
    pub fn add_child(
        &mut self,
        higher: NodeId,
        attribute: Option<AttributeId>,
        value: impl Into<String>,
    ) -> Result<NodeId> {
        self.node(higher)?;
        if let Some(id) = attribute {
            self.registry.get(&AttrRef::Id(id))?;
        }
        let lower = self.push_node(attribute, value.into());
        self.push_edge(Edge { higher, lower });
        self.dirty = true;
        debug!("new node {lower} below {higher}");
        Ok(lower)
    }

    /// Add an edge between two existing nodes, giving `lower` another parent.
    ///
    /// Returns `false` when the edge already exists.
    ///
    /// # Errors
    ///
    /// `CpkError::InvalidEdge` for self-links, links into the root and links
    /// that would close a cycle.
    pub fn link(&mut self, higher: NodeId, lower: NodeId) -> Result<bool> {
        self.node(higher)?;
        self.node(lower)?;
        if higher == lower || lower == NodeId::ROOT {
            return Err(CpkError::InvalidEdge(format!("{higher} -> {lower}")));
        }
        if self.lower[higher.0].contains(&lower) {
            return Ok(false);
        }
        if self.reaches(lower, higher) {
            return Err(CpkError::InvalidEdge(format!(
                "{higher} -> {lower} would close a cycle"
            )));
        }
        self.push_edge(Edge { higher, lower });
        self.dirty = true;
        Ok(true)
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) -> Result<()> {
        self.node(id)?;
        if id == NodeId::ROOT {
            return Err(CpkError::AlreadyExists("root node value".to_string()));
        }
        self.nodes[id.0].value = value.into();
        self.dirty = true;
        Ok(())
    }

    fn push_node(&mut self, attribute: Option<AttributeId>, value: String) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            attribute,
            value,
        });
        self.lower.push(Vec::new());
        self.higher.push(Vec::new());
        id
    }

    fn push_edge(&mut self, edge: Edge) {
        self.lower[edge.higher.0].push(edge.lower);
        self.higher[edge.lower.0].push(edge.higher);
        self.edges.push(edge);
    }

    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !std::mem::replace(&mut seen[id.0], true) {
                stack.extend(self.lower[id.0].iter().copied());
            }
        }
        false
    }

    // ── Transactions ──────────────────────────────────────────────────────────

    /// Current working state as a snapshot.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            attributes: self.registry.attributes().to_vec(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Persist staged changes.
    ///
    /// On failure the working state is rolled back to the last committed
    /// snapshot and the error is returned as-is.
    ///
    /// # Errors
    ///
    /// `CpkError::AttributeConflict` when two attributes share a name, or
    /// whatever the backend fails with.
    pub fn commit(&mut self) -> Result<()> {
        if let Some(name) = self.registry.first_conflict().map(str::to_string) {
            warn!("attribute {name:?} is not unique, rolling back");
            self.rollback();
            return Err(CpkError::AttributeConflict(name));
        }

        let snapshot = self.snapshot();
        if let Err(e) = self.backend.save(&snapshot) {
            warn!("commit failed, rolling back: {e}");
            self.rollback();
            return Err(e);
        }

        debug!(
            "committed {} nodes, {} edges, {} attributes",
            snapshot.nodes.len(),
            snapshot.edges.len(),
            snapshot.attributes.len()
        );
        self.committed = snapshot;
        self.dirty = false;
        Ok(())
    }

    /// Discard staged changes.
    pub fn rollback(&mut self) {
        let snapshot = self.committed.clone();
        self.restore(snapshot);
    }
}

fn path_not_found(step: &PathStep) -> CpkError {
    CpkError::PathNotFound {
        step: step.to_string(),
    }
}

fn validate_snapshot(snapshot: &GraphSnapshot) -> Result<()> {
    let invalid = |msg: String| Err(CpkError::InvalidFileFormat(msg));

    for (i, attribute) in snapshot.attributes.iter().enumerate() {
        if attribute.id.0 != i {
            return invalid(format!("attribute {} stored at index {i}", attribute.id));
        }
    }
    for (i, node) in snapshot.nodes.iter().enumerate() {
        if node.id.0 != i {
            return invalid(format!("{} stored at index {i}", node.id));
        }
        if let Some(attr) = node.attribute {
            if attr.0 >= snapshot.attributes.len() {
                return invalid(format!("{} has unknown attribute {attr}", node.id));
            }
        }
    }
    if let Some(root) = snapshot.nodes.first() {
        if root.value != ROOT_VALUE {
            return invalid(format!("first node is not the root: {:?}", root.value));
        }
    }
    for edge in &snapshot.edges {
        let count = snapshot.nodes.len();
        if edge.higher.0 >= count || edge.lower.0 >= count {
            return invalid(format!("dangling edge {} -> {}", edge.higher, edge.lower));
        }
        if edge.higher == edge.lower || edge.lower == NodeId::ROOT {
            return invalid(format!("invalid edge {} -> {}", edge.higher, edge.lower));
        }
    }
    Ok(())
}
