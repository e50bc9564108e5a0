//! Primitives behind [`PassphraseAdapter`](super::PassphraseAdapter).
//!
//! Every wallet frame and stored node value is sealed with
//! ChaCha20-Poly1305 under a key that starts as Argon2id(passphrase, salt).
//! The salt and nonce travel with the ciphertext, so both are generated
//! here from the OS random source.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;

use crate::error::{CpkError, Result};

const ARGON2_M_COST: u32 = 65536; // 64 MiB
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;

/// Byte length of a ChaCha20-Poly1305 nonce.
pub const NONCE_LEN: usize = 12;

/// Byte length of an Argon2id salt.
pub const SALT_LEN: usize = 16;

/// Fresh salt from the OS random source.
pub fn random_salt() -> [u8; SALT_LEN] {
    random_bytes()
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

fn cipher(key: &[u8; 32]) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(Key::from_slice(key))
}

/// Stretch a passphrase into the master key for one salt.
///
/// Costs 64 MiB, 3 passes and 4 lanes; callers cache the result per salt. The output is never used as a cipher key directly but fed to
/// HKDF first.
pub fn derive_passphrase_key(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> Result<[u8; 32]> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(32))
        .map_err(|e| CpkError::DerivationFailed(format!("Argon2 params: {e}")))?;

    let mut master_key = [0u8; 32];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(passphrase, salt, &mut master_key)
        .map_err(|e| CpkError::DerivationFailed(format!("Argon2 hash: {e}")))?;
    Ok(master_key)
}

/// Seal one frame or node value under a fresh random nonce.
///
/// Returns the nonce and the ciphertext with its 16-byte tag appended; the
/// adapter armors both together with the salt.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<([u8; NONCE_LEN], Vec<u8>)> {
    let nonce: [u8; NONCE_LEN] = random_bytes();
    let sealed = cipher(key)
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CpkError::EncryptionFailed(format!("seal: {e}")))?;
    Ok((nonce, sealed))
}

/// Open a sealed frame or node value.
///
/// A nonce of the wrong length means the armor was cut or mangled and
/// fails with `DecryptionFailed`. A tag mismatch fails with
/// `InvalidPassphrase`, since a key derived from the wrong passphrase is
/// the usual cause; tampered ciphertext surfaces the same way.
pub fn decrypt(key: &[u8; 32], nonce: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(CpkError::DecryptionFailed(format!(
            "nonce is {} bytes, expected {NONCE_LEN}",
            nonce.len()
        )));
    }
    cipher(key)
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CpkError::InvalidPassphrase)
}
