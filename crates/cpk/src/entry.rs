//! High-level operations on stored credentials.
//!
//! These tie the graph store, the terminal policy and the crypto adapter
//! together. Node values written here are always adapter output; the graph
//! itself never sees a plaintext secret.

use crate::crypto::CryptoAdapter;
use crate::error::{CpkError, Result};
use crate::graph::{
    display_path, Attribute, AttributeId, Backend, GraphStore, Node, NodeId, PathStep,
    TerminalPolicy,
};

/// Store a value at the node addressed by `path`, creating missing nodes.
///
/// `value_fn` is called with the target type once the node is known to
/// accept a value, so a generator is never run for a write that would be
/// refused. The encrypted value is committed; on any error every staged
/// change is rolled back.
///
/// # Errors
///
/// `CpkError::AlreadyExists` when the node holds a value and `force` is
/// not set, plus resolution, adapter and backend errors.
pub fn store_value<B, F>(
    store: &mut GraphStore<B>,
    path: &[PathStep],
    policy: &TerminalPolicy,
    force: bool,
    adapter: &dyn CryptoAdapter,
    value_fn: F,
) -> Result<NodeId>
where
    B: Backend,
    F: FnOnce(Option<&Attribute>) -> Result<String>,
{
    let (steps, target) = store.target_path(path, policy);
    let staged = stage_value(store, &steps, target.is_some(), force, adapter, value_fn);
    match staged {
        Ok(id) => {
            store.commit()?;
            log::debug!("stored value at [{}]", display_path(&steps));
            Ok(id)
        }
        Err(e) => {
            store.rollback();
            Err(e)
        }
    }
}

fn stage_value<B, F>(
    store: &mut GraphStore<B>,
    steps: &[PathStep],
    typed: bool,
    force: bool,
    adapter: &dyn CryptoAdapter,
    value_fn: F,
) -> Result<NodeId>
where
    B: Backend,
    F: FnOnce(Option<&Attribute>) -> Result<String>,
{
    let id = store.resolve(steps, true)?;
    let node = store.node(id)?;
    if !node.value.is_empty() && !force {
        return Err(CpkError::AlreadyExists(display_path(steps)));
    }

    let target = if typed {
        Some(store.attribute_of(node)?.clone())
    } else {
        None
    };
    let value = value_fn(target.as_ref())?;

    let sealed = adapter.encrypt(value.as_bytes())?;
    let sealed = String::from_utf8(sealed)
        .map_err(|_| CpkError::EncryptionFailed("adapter output is not text".to_string()))?;
    store.set_value(id, sealed)?;
    Ok(id)
}

/// Decrypt the value stored at the node addressed by `path`.
///
/// # Errors
///
/// `CpkError::NotFound` when the node exists but holds no value.
pub fn read_value<B: Backend>(
    store: &GraphStore<B>,
    path: &[PathStep],
    policy: &TerminalPolicy,
    adapter: &dyn CryptoAdapter,
) -> Result<String> {
    let (steps, _) = store.target_path(path, policy);
    let id = store.find(&steps)?;
    let node = store.node(id)?;
    if node.value.is_empty() {
        return Err(CpkError::NotFound(display_path(&steps)));
    }
    let plaintext = adapter.decrypt(node.value.as_bytes())?;
    String::from_utf8(plaintext)
        .map_err(|_| CpkError::DecryptionFailed("value is not valid UTF-8".to_string()))
}

/// Children of the node addressed by `path`, with their attributes.
///
/// The path is taken literally; no implicit terminal step is appended.
pub fn list_children<'a, B: Backend>(
    store: &'a GraphStore<B>,
    path: &[PathStep],
) -> Result<Vec<(&'a Attribute, &'a Node)>> {
    let id = store.find(path)?;
    store
        .children(id)?
        .into_iter()
        .map(|node| store.attribute_of(node).map(|attr| (attr, node)))
        .collect()
}

/// Create and commit a named attribute.
///
/// # Errors
///
/// `CpkError::AttributeConflict` when the name is taken.
pub fn define_attribute<B: Backend>(
    store: &mut GraphStore<B>,
    name: &str,
    description: Option<String>,
) -> Result<AttributeId> {
    let id = store.create_attribute(name, description)?;
    store.commit()?;
    Ok(id)
}
