//! Portable encrypted wallet: service definitions plus credential records.

pub mod protocol;
pub mod service;

use std::collections::HashMap;

pub use protocol::{FrameReader, ProtocolState, WalletProtocol, FRAME_DELIMITER};
pub use service::{Record, Service};

use crate::crypto::CryptoAdapter;
use crate::error::{CpkError, Result};

/// Services indexed by name, in registration order, and their records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wallet {
    services: Vec<Service>,
    index: HashMap<String, usize>,
    records: Vec<Record>,
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service. Names are unique within a wallet.
    pub fn add_service(&mut self, service: Service) -> Result<()> {
        if self.index.contains_key(service.name()) {
            return Err(CpkError::DuplicateService(service.name().to_string()));
        }
        self.index
            .insert(service.name().to_string(), self.services.len());
        self.services.push(service);
        Ok(())
    }

    pub fn get_service(&self, name: &str) -> Result<&Service> {
        self.index
            .get(name)
            .map(|&i| &self.services[i])
            .ok_or_else(|| CpkError::UnknownService(name.to_string()))
    }

    /// Append a record whose service is registered under the same definition.
    pub fn add_record(&mut self, record: Record) -> Result<()> {
        let registered = self.get_service(record.service().name())?;
        if registered != record.service() {
            return Err(CpkError::UnknownService(format!(
                "{} (record uses a different definition)",
                record.service().name()
            )));
        }
        self.records.push(record);
        Ok(())
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_for<'a>(&'a self, service_name: &'a str) -> impl Iterator<Item = &'a Record> {
        self.records
            .iter()
            .filter(move |r| r.service().name() == service_name)
    }

    pub fn decode(bytes: &[u8], adapter: &dyn CryptoAdapter) -> Result<Self> {
        protocol::decode(bytes, adapter)
    }

    pub fn encode(&self, adapter: &dyn CryptoAdapter) -> Result<Vec<u8>> {
        protocol::encode(self, adapter)
    }
}
