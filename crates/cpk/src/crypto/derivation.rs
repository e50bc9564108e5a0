//! Key derivation using HKDF-SHA256.
//!
//! The Argon2id output is never used as a cipher key directly; each use
//! gets its own key expanded under a fixed context string.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{CpkError, Result};

/// Context for keys encrypting wallet frames and stored node values.
/// Must remain stable across versions.
pub const FRAME_CONTEXT: &str = "cpk/wallet-frame";

/// Derive a 32-byte child key from a root key and context string.
pub fn derive_key(root_key_bytes: &[u8; 32], context: &str) -> Result<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(None, root_key_bytes);
    let mut output = [0u8; 32];
    hk.expand(context.as_bytes(), &mut output)
        .map_err(|e| CpkError::DerivationFailed(format!("HKDF expand failed: {e}")))?;
    Ok(output)
}
