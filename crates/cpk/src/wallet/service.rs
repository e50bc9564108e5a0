//! Service definitions and the records that instantiate them.
//!
//! A [`Service`] declares which attribute names identify an account (user
//! name, host, ...) and which hold secrets (password, pin, ...). A
//! [`Record`] is one concrete set of values for a service. Both compare
//! structurally.

use std::collections::BTreeMap;

use crate::error::{CpkError, Result};

/// Named set of identifier and secret attribute names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    name: String,
    id_attr_names: Vec<String>,
    secret_attr_names: Vec<String>,
}

impl Service {
    /// Build a service definition.
    ///
    /// # Errors
    ///
    /// `CpkError::AttributeRoleConflict` if a name is declared both as an
    /// identifier and as a secret.
    pub fn new<I, S>(name: impl Into<String>, id_attr_names: I, secret_attr_names: S) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let name = name.into();
        let id_attr_names: Vec<String> = id_attr_names.into_iter().map(Into::into).collect();
        let secret_attr_names: Vec<String> =
            secret_attr_names.into_iter().map(Into::into).collect();

        if let Some(clash) = secret_attr_names
            .iter()
            .find(|s| id_attr_names.contains(s))
        {
            return Err(CpkError::AttributeRoleConflict {
                service: name,
                attribute: clash.clone(),
            });
        }

        Ok(Self {
            name,
            id_attr_names,
            secret_attr_names,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_attr_names(&self) -> &[String] {
        &self.id_attr_names
    }

    pub fn secret_attr_names(&self) -> &[String] {
        &self.secret_attr_names
    }

    /// Whether `attribute` is declared in either role.
    pub fn contains(&self, attribute: &str) -> bool {
        self.id_attr_names.iter().any(|a| a == attribute) || self.is_secret(attribute)
    }

    pub fn is_secret(&self, attribute: &str) -> bool {
        self.secret_attr_names.iter().any(|a| a == attribute)
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (id: {}; secret: {})",
            self.name,
            self.id_attr_names.join(", "),
            self.secret_attr_names.join(", ")
        )
    }
}

/// Attribute values for one instance of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    service: Service,
    attrs: BTreeMap<String, String>,
}

impl Record {
    /// Build a record, validating every key against the service.
    ///
    /// # Errors
    ///
    /// `CpkError::UnknownAttribute` for the first key the service does not
    /// declare.
    pub fn new<I, K, V>(service: &Service, attrs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self {
            service: service.clone(),
            attrs: BTreeMap::new(),
        };
        for (name, value) in attrs {
            record.add_attribute(name, value)?;
        }
        Ok(record)
    }

    /// Set one attribute, validating it against the service.
    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        if !self.service.contains(&name) {
            return Err(CpkError::UnknownAttribute {
                service: self.service.name.clone(),
                attribute: name,
            });
        }
        self.attrs.insert(name, value.into());
        Ok(())
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.attrs.get(attribute).map(String::as_str)
    }

    /// Identifier attributes in declaration order, skipping unset ones.
    pub fn identifiers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.service
            .id_attr_names
            .iter()
            .filter_map(|name| self.get(name).map(|value| (name.as_str(), value)))
    }
}
