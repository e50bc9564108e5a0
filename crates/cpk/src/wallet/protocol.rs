//! Framed wallet stream format.
//!
//! ```text
//! frame     := adapter.encrypt(json) "\n\n"
//! stream    := header-frame record-frame*
//! header    := {"services": [{"name", "id_as", "password_as"}, ...]}
//! record    := {"service_name": "...", "attrs": {"key": "value", ...}}
//! ```
//!
//! Decoding is pull-based: a [`FrameReader`] yields complete frames from an
//! in-memory buffer and [`WalletProtocol`] feeds them one at a time into a
//! [`Wallet`]. The header must be the first frame; a record arriving before
//! it names a service nobody registered and is rejected as such.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::service::{Record, Service};
use super::Wallet;
use crate::crypto::CryptoAdapter;
use crate::error::{CpkError, Result};

/// Bytes terminating every frame.
pub const FRAME_DELIMITER: &[u8] = b"\n\n";

// ── Wire documents ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct HeaderDocument {
    #[serde(default)]
    services: Vec<ServiceDescriptor>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ServiceDescriptor {
    name: String,
    #[serde(default)]
    id_as: Vec<String>,
    #[serde(default)]
    password_as: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordDocument {
    service_name: String,
    #[serde(default)]
    attrs: BTreeMap<String, String>,
}

impl From<&Service> for ServiceDescriptor {
    fn from(service: &Service) -> Self {
        Self {
            name: service.name().to_string(),
            id_as: service.id_attr_names().to_vec(),
            password_as: service.secret_attr_names().to_vec(),
        }
    }
}

// ── Frame reader ─────────────────────────────────────────────────────────────

/// Yields delimiter-terminated frames from a buffer, without the delimiter.
///
/// Bytes after the last delimiter are not a frame; call [`finish`] once the
/// iterator is exhausted to reject them.
///
/// [`finish`]: FrameReader::finish
pub struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed as part of a complete frame.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Fails with `TruncatedStream` if a partial frame is left over.
    pub fn finish(self) -> Result<()> {
        match self.remaining().len() {
            0 => Ok(()),
            n => Err(CpkError::TruncatedStream(n)),
        }
    }
}

impl<'a> Iterator for FrameReader<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.remaining();
        let end = rest
            .windows(FRAME_DELIMITER.len())
            .position(|w| w == FRAME_DELIMITER)?;
        self.pos += end + FRAME_DELIMITER.len();
        Some(&rest[..end])
    }
}

// ── Protocol ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    AwaitingHeader,
    AwaitingRecord,
}

/// Two-state decoder turning decrypted frames into wallet contents.
pub struct WalletProtocol<'a> {
    adapter: &'a dyn CryptoAdapter,
    state: ProtocolState,
    frames: usize,
}

impl<'a> WalletProtocol<'a> {
    pub fn new(adapter: &'a dyn CryptoAdapter) -> Self {
        Self {
            adapter,
            state: ProtocolState::AwaitingHeader,
            frames: 0,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Number of frames accepted so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Decrypt and apply one frame.
    pub fn feed(&mut self, wallet: &mut Wallet, frame: &[u8]) -> Result<()> {
        let plaintext = self.adapter.decrypt(frame)?;
        let document: serde_json::Value = serde_json::from_slice(&plaintext)
            .map_err(|e| CpkError::InvalidFrame(format!("frame {}: {e}", self.frames)))?;

        match self.state {
            ProtocolState::AwaitingHeader => {
                self.header_received(wallet, document)?;
                self.state = ProtocolState::AwaitingRecord;
            }
            ProtocolState::AwaitingRecord => self.record_received(wallet, document)?,
        }
        self.frames += 1;
        Ok(())
    }

    fn header_received(&self, wallet: &mut Wallet, document: serde_json::Value) -> Result<()> {
        if let Some(name) = document.get("service_name") {
            let name = name.as_str().map(str::to_string).unwrap_or_else(|| name.to_string());
            return Err(CpkError::UnknownService(name));
        }
        let header: HeaderDocument = serde_json::from_value(document)
            .map_err(|e| CpkError::InvalidFrame(format!("header: {e}")))?;

        for descriptor in header.services {
            let service = Service::new(descriptor.name, descriptor.id_as, descriptor.password_as)?;
            wallet.add_service(service)?;
        }
        log::debug!("Wallet header declares {} services", wallet.services().len());
        Ok(())
    }

    fn record_received(&self, wallet: &mut Wallet, document: serde_json::Value) -> Result<()> {
        let document: RecordDocument = serde_json::from_value(document)
            .map_err(|e| CpkError::InvalidFrame(format!("record frame {}: {e}", self.frames)))?;
        let service = wallet.get_service(&document.service_name)?.clone();
        let record = Record::new(&service, document.attrs)?;
        wallet.add_record(record)
    }
}

// ── Whole-stream helpers ─────────────────────────────────────────────────────

/// Decode a complete stream. Any failure discards the partial wallet.
pub fn decode(bytes: &[u8], adapter: &dyn CryptoAdapter) -> Result<Wallet> {
    let mut wallet = Wallet::new();
    let mut protocol = WalletProtocol::new(adapter);
    let mut reader = FrameReader::new(bytes);

    for frame in reader.by_ref() {
        protocol.feed(&mut wallet, frame)?;
    }
    reader.finish()?;

    log::debug!(
        "Decoded wallet: {} frames, {} records",
        protocol.frames(),
        wallet.records().len()
    );
    Ok(wallet)
}

/// Encode a wallet as header frame followed by one frame per record.
pub fn encode(wallet: &Wallet, adapter: &dyn CryptoAdapter) -> Result<Vec<u8>> {
    let header = HeaderDocument {
        services: wallet.services().iter().map(ServiceDescriptor::from).collect(),
    };
    let mut out = Vec::new();
    push_frame(&mut out, adapter, &header)?;

    for record in wallet.records() {
        let document = RecordDocument {
            service_name: record.service().name().to_string(),
            attrs: record.attrs().clone(),
        };
        push_frame(&mut out, adapter, &document)?;
    }
    Ok(out)
}

fn push_frame<T: Serialize>(out: &mut Vec<u8>, adapter: &dyn CryptoAdapter, doc: &T) -> Result<()> {
    let json = serde_json::to_vec(doc).map_err(|e| CpkError::SerializationError(e.to_string()))?;
    let frame = adapter.encrypt(&json)?;
    // A trailing newline would merge with the delimiter and shift the split.
    if frame
        .windows(FRAME_DELIMITER.len())
        .any(|w| w == FRAME_DELIMITER)
        || frame.ends_with(b"\n")
    {
        return Err(CpkError::FrameContainsDelimiter);
    }
    out.extend_from_slice(&frame);
    out.extend_from_slice(FRAME_DELIMITER);
    Ok(())
}
