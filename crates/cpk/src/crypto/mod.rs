//! Cryptographic primitives for cpk.
//!
//! This module provides:
//! - the [`CryptoAdapter`](adapter::CryptoAdapter) seam used by the wallet
//!   protocol and stored node values
//! - Argon2id passphrase-based key derivation
//! - HKDF-SHA256 key derivation
//! - ChaCha20-Poly1305 authenticated encryption with OS-random salts and nonces

pub mod adapter;
pub mod derivation;
pub mod encryption;

pub use adapter::{CryptoAdapter, PassphraseAdapter};
