//! Attribute registry: typed labels attached to graph nodes.
//!
//! Attributes are created lazily the first time a path step names them
//! and are never deleted. Two names are reserved: `default`, the type of
//! every node that carries no explicit attribute, and `password`, the
//! implicit type of the final step of a path.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CpkError, Result};

/// Name of the attribute every untyped node reads as.
pub const DEFAULT_ATTRIBUTE: &str = "default";

/// Name of the reserved secret-bearing attribute.
pub const PASSWORD_ATTRIBUTE: &str = "password";

/// Index of an attribute in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeId(pub usize);

impl std::fmt::Display for AttributeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "attr_{}", self.0)
    }
}

/// A named node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Attribute {
    /// Whether at most one node of this type may hang below a given node.
    pub fn one_per_higher_node(&self) -> bool {
        self.name == PASSWORD_ATTRIBUTE
    }
}

/// Reference to an attribute either by name or by registry id.
///
/// Callers hand in whichever they hold; the store resolves it once at
/// the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrRef {
    Name(String),
    Id(AttributeId),
}

impl std::fmt::Display for AttrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrRef::Name(name) => write!(f, "{name}"),
            AttrRef::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for AttrRef {
    fn from(name: &str) -> Self {
        AttrRef::Name(name.to_string())
    }
}

impl From<String> for AttrRef {
    fn from(name: String) -> Self {
        AttrRef::Name(name)
    }
}

impl From<AttributeId> for AttrRef {
    fn from(id: AttributeId) -> Self {
        AttrRef::Id(id)
    }
}

impl From<&Attribute> for AttrRef {
    fn from(attribute: &Attribute) -> Self {
        AttrRef::Id(attribute.id)
    }
}

/// Arena of attributes with a by-name index.
///
/// The index maps each name to the first attribute carrying it. Explicit
/// creation may stage a second attribute with the same name; such a clash
/// is reported by [`AttributeRegistry::first_conflict`] and rejected when
/// the owning store commits.
#[derive(Debug, Clone)]
pub struct AttributeRegistry {
    attributes: Vec<Attribute>,
    by_name: HashMap<String, AttributeId>,
    password_name: Option<String>,
}

impl AttributeRegistry {
    /// Create an empty registry. `password_name` of `None` disables the
    /// reserved password attribute.
    pub fn new(password_name: Option<String>) -> Self {
        Self::from_attributes(Vec::new(), password_name)
    }

    /// Rebuild a registry from persisted attributes.
    pub fn from_attributes(attributes: Vec<Attribute>, password_name: Option<String>) -> Self {
        let mut by_name = HashMap::new();
        for attribute in &attributes {
            by_name
                .entry(attribute.name.clone())
                .or_insert(attribute.id);
        }
        Self {
            attributes,
            by_name,
            password_name: password_name.filter(|n| !n.is_empty()),
        }
    }

    /// Create the `default` attribute if missing and return its id.
    pub fn init(&mut self) -> AttributeId {
        match self.by_name.get(DEFAULT_ATTRIBUTE) {
            Some(id) => *id,
            None => self.push(DEFAULT_ATTRIBUTE.to_string(), None),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.by_name.contains_key(DEFAULT_ATTRIBUTE)
    }

    /// The reserved `default` attribute.
    pub fn default(&self) -> Result<AttributeId> {
        self.by_name.get(DEFAULT_ATTRIBUTE).copied().ok_or_else(|| {
            CpkError::NotInitialized(format!("attribute {DEFAULT_ATTRIBUTE:?} missing"))
        })
    }

    /// Look up an attribute, failing with `NotFound` when absent.
    pub fn get(&self, attr: &AttrRef) -> Result<&Attribute> {
        self.lookup(attr)
            .and_then(|id| self.attributes.get(id.0))
            .ok_or_else(|| CpkError::NotFound(format!("attribute {attr}")))
    }

    /// Resolve a reference to an id without failing.
    pub fn lookup(&self, attr: &AttrRef) -> Option<AttributeId> {
        match attr {
            AttrRef::Name(name) => self.by_name.get(name).copied(),
            AttrRef::Id(id) => (id.0 < self.attributes.len()).then_some(*id),
        }
    }

    pub fn by_id(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.get(id.0)
    }

    /// Return the attribute named `name`, creating it if needed.
    pub fn get_or_create(&mut self, name: &str) -> Result<AttributeId> {
        if let Some(id) = self.by_name.get(name) {
            return Ok(*id);
        }
        validate_name(name)?;
        Ok(self.push(name.to_string(), None))
    }

    /// Resolve a reference, creating named attributes that do not exist.
    /// Unknown ids still fail with `NotFound`.
    pub fn resolve_or_create(&mut self, attr: &AttrRef) -> Result<AttributeId> {
        match attr {
            AttrRef::Name(name) => self.get_or_create(name),
            AttrRef::Id(_) => self.get(attr).map(|a| a.id),
        }
    }

    /// The reserved password attribute, created on first use.
    ///
    /// Returns `None` when the registry was configured without one.
    pub fn get_or_create_password(&mut self) -> Option<AttributeId> {
        let name = self.password_name.clone()?;
        match self.by_name.get(&name) {
            Some(id) => Some(*id),
            None => Some(self.push(name, None)),
        }
    }

    pub fn password_name(&self) -> Option<&str> {
        self.password_name.as_deref()
    }

    /// Stage a new attribute unconditionally.
    ///
    /// Name uniqueness is checked when the owning store commits.
    pub fn create(&mut self, name: &str, description: Option<String>) -> Result<AttributeId> {
        validate_name(name)?;
        Ok(self.push(name.to_string(), description))
    }

    /// First attribute name carried by more than one attribute.
    pub fn first_conflict(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| self.by_name.get(&a.name) != Some(&a.id))
            .map(|a| a.name.as_str())
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    fn push(&mut self, name: String, description: Option<String>) -> AttributeId {
        let id = AttributeId(self.attributes.len());
        log::debug!("new attribute {id} {name:?}");
        self.by_name.entry(name.clone()).or_insert(id);
        self.attributes.push(Attribute {
            id,
            name,
            description,
        });
        id
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('=') || name.chars().any(char::is_whitespace) {
        return Err(CpkError::InvalidAttributeName(name.to_string()));
    }
    Ok(())
}
