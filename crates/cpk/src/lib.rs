//! cpk: credential store addressed through a typed graph.
//!
//! Secrets live in graph nodes reached from a single root by paths of
//! (attribute, value) steps such as `service=mail user=alice`, and can be
//! exported as a portable wallet: a framed stream of encrypted JSON
//! documents declaring services and their records.

pub mod config;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod graph;
pub mod storage;
pub mod wallet;

// Re-export primary types
pub use config::Config;
pub use crypto::{CryptoAdapter, PassphraseAdapter};
pub use error::{CpkError, Result};

// Re-export graph types
pub use graph::{
    AttrRef, Attribute, AttributeId, Backend, GraphSnapshot, GraphStore, MemoryBackend, Node,
    NodeId, PathStep, StoreOptions, TerminalPolicy,
};

// Re-export wallet and storage types
pub use storage::{open_wallet, save_wallet, FileBackend};
pub use wallet::{Record, Service, Wallet};
