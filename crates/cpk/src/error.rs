//! Error types for cpk.
//!
//! All errors are strongly typed and propagated without panicking.
//! Secret values and key material are never included in error messages.

use crate::graph::Node;

/// Error types covering graph resolution, wallet decoding and storage.
#[derive(Debug, thiserror::Error)]
pub enum CpkError {
    #[error("No node matches path step {step}")]
    PathNotFound { step: String },

    #[error(
        "Path step matched {} nodes ({}) under node {} ({})",
        .matches.len(),
        describe_nodes(.matches),
        .last.id,
        .last.value
    )]
    AmbiguousPath { matches: Vec<Node>, last: Node },

    #[error("Attribute name is not unique: {0}")]
    AttributeConflict(String),

    #[error("Duplicate service: {0}")]
    DuplicateService(String),

    #[error("Attribute {attribute} declared as both identifier and secret on service {service}")]
    AttributeRoleConflict { service: String, attribute: String },

    #[error("Attribute {attribute} is not declared on service {service}")]
    UnknownAttribute { service: String, attribute: String },

    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Stream ended with {0} unprocessed bytes in the frame buffer")]
    TruncatedStream(usize),

    #[error("Resource already holds a value: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store not initialized: {0}")]
    NotInitialized(String),

    #[error("Path step needs an attribute or a value")]
    EmptyPathStep,

    #[error("Invalid attribute name: {0:?}")]
    InvalidAttributeName(String),

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Invalid path token: {0:?}")]
    InvalidToken(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Encrypted frame contains the frame delimiter")]
    FrameContainsDelimiter,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid passphrase")]
    InvalidPassphrase,

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_nodes(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(|n| format!("{}={}", n.id, n.value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CpkError>;
