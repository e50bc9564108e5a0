//! Typed graph addressing.
//!
//! Secrets are not stored under flat keys. Each one lives in a node reached
//! from the root by an ordered list of (attribute, value) steps, e.g.
//! `service=mail user=alice password=`. Every level must be unique for a
//! given step, which turns the path into a compound key without a fixed
//! schema.
//!
//! # Modules
//!
//! - [`attribute`]: attribute types and their registry.
//! - [`node`]: nodes, node ids and edges.
//! - [`path`]: path steps, token parsing and the terminal policy.
//! - [`backend`]: persistence collaborator trait and the memory backend.
//! - [`store`]: the arena-backed store and the path resolver.

pub mod attribute;
pub mod backend;
pub mod node;
pub mod path;
pub mod store;

pub use attribute::{
    AttrRef, Attribute, AttributeId, AttributeRegistry, DEFAULT_ATTRIBUTE, PASSWORD_ATTRIBUTE,
};
pub use backend::{Backend, GraphSnapshot, MemoryBackend};
pub use node::{Edge, Node, NodeId, ROOT_VALUE};
pub use path::{display_path, parse_path, PathStep, TerminalPolicy};
pub use store::{GraphStore, StoreOptions};
