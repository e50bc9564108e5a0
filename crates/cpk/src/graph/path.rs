//! Path filters: ordered (attribute, value) steps addressing one node.
//!
//! Steps are usually parsed from command-line tokens:
//!
//! ```text
//! service=mail    attribute and value
//! mail            value only, any attribute
//! password=       attribute only
//! ```

use crate::error::{CpkError, Result};
use crate::graph::attribute::{AttrRef, PASSWORD_ATTRIBUTE};

/// One step of a path filter. At least one side is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    attribute: Option<AttrRef>,
    value: Option<String>,
}

impl PathStep {
    /// Build a step, rejecting one that constrains nothing.
    pub fn new(attribute: Option<AttrRef>, value: Option<String>) -> Result<Self> {
        if attribute.is_none() && value.is_none() {
            return Err(CpkError::EmptyPathStep);
        }
        Ok(Self { attribute, value })
    }

    /// Step matching both attribute and value.
    pub fn attr_value(attribute: impl Into<AttrRef>, value: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            value: Some(value.into()),
        }
    }

    /// Step matching on attribute alone.
    pub fn attr(attribute: impl Into<AttrRef>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            value: None,
        }
    }

    /// Step matching on value alone.
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            attribute: None,
            value: Some(value.into()),
        }
    }

    pub fn attribute_ref(&self) -> Option<&AttrRef> {
        self.attribute.as_ref()
    }

    pub fn value_str(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Parse a single `attr=value`, `attr=` or `value` token.
    pub fn parse(token: &str) -> Result<Self> {
        let invalid = || CpkError::InvalidToken(token.to_string());
        match token.split_once('=') {
            Some(("", "")) => Err(invalid()),
            Some(("", value)) => Ok(Self::value(value)),
            Some((attr, "")) => Ok(Self::attr(attr)),
            Some((attr, value)) => Ok(Self::attr_value(attr, value)),
            None if token.is_empty() => Err(invalid()),
            None => Ok(Self::value(token)),
        }
    }
}

impl std::fmt::Display for PathStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.attribute, &self.value) {
            (Some(a), Some(v)) => write!(f, "{a}={v}"),
            (Some(a), None) => write!(f, "{a}="),
            (None, Some(v)) => write!(f, "{v}"),
            (None, None) => Ok(()),
        }
    }
}

/// Parse a sequence of tokens into a path.
pub fn parse_path<I, S>(tokens: I) -> Result<Vec<PathStep>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|t| PathStep::parse(t.as_ref()))
        .collect()
}

/// Render a path the way it would be typed.
pub fn display_path(path: &[PathStep]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rule choosing the type of the node a path finally addresses when its
/// last step does not name one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalPolicy {
    implicit_type: Option<String>,
}

impl TerminalPolicy {
    pub fn new(implicit_type: Option<String>) -> Self {
        Self {
            implicit_type: implicit_type.filter(|t| !t.is_empty()),
        }
    }

    /// Address the matched node itself, never appending a typed step.
    pub fn disabled() -> Self {
        Self {
            implicit_type: None,
        }
    }

    pub fn implicit_type(&self) -> Option<&str> {
        self.implicit_type.as_deref()
    }
}

impl Default for TerminalPolicy {
    fn default() -> Self {
        Self::new(Some(PASSWORD_ATTRIBUTE.to_string()))
    }
}
