//! Crypto adapters, the seam between stored bytes and plaintext.
//!
//! The wallet format and the graph store only require that `decrypt` is the
//! exact inverse of whatever `encrypt` produced. [`PassphraseAdapter`] is
//! the adapter shipped with cpk.
//!
//! Armored output of [`PassphraseAdapter`]:
//! ```text
//! base64( salt[16] || nonce[12] || ciphertext+tag )
//! ```
//! The key for a salt is `HKDF-SHA256(Argon2id(passphrase, salt), FRAME_CONTEXT)`.
//! Standard base64 never contains a newline, so armored output can be framed
//! with the wallet delimiter.

use std::cell::RefCell;
use std::collections::HashMap;

use base64::Engine;
use zeroize::Zeroize;

use crate::crypto::derivation::{derive_key, FRAME_CONTEXT};
use crate::crypto::encryption::{
    self, derive_passphrase_key, random_salt, NONCE_LEN, SALT_LEN,
};
use crate::error::{CpkError, Result};

const TAG_LEN: usize = 16;

/// Encrypt/decrypt collaborator used for wallet frames and node values.
pub trait CryptoAdapter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Passphrase-keyed ChaCha20-Poly1305 adapter producing base64 armor.
///
/// Key derivation is slow by construction, so derived keys are cached per
/// salt for the lifetime of the adapter. All frames encrypted by one
/// adapter share its salt. Key material is zeroized on drop.
pub struct PassphraseAdapter {
    passphrase: Vec<u8>,
    salt: [u8; SALT_LEN],
    keys: RefCell<HashMap<[u8; SALT_LEN], [u8; 32]>>,
}

impl PassphraseAdapter {
    /// Create an adapter with a fresh random salt.
    pub fn new(passphrase: impl AsRef<[u8]>) -> Self {
        Self::with_salt(passphrase, random_salt())
    }

    pub fn with_salt(passphrase: impl AsRef<[u8]>, salt: [u8; SALT_LEN]) -> Self {
        Self {
            passphrase: passphrase.as_ref().to_vec(),
            salt,
            keys: RefCell::new(HashMap::new()),
        }
    }

    fn key_for(&self, salt: &[u8; SALT_LEN]) -> Result<[u8; 32]> {
        if let Some(key) = self.keys.borrow().get(salt) {
            return Ok(*key);
        }
        let mut master_key = derive_passphrase_key(&self.passphrase, salt)?;
        let key = derive_key(&master_key, FRAME_CONTEXT);
        master_key.zeroize();
        let key = key?;
        self.keys.borrow_mut().insert(*salt, key);
        Ok(key)
    }
}

impl CryptoAdapter for PassphraseAdapter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut key = self.key_for(&self.salt)?;
        let sealed = encryption::encrypt(&key, plaintext);
        key.zeroize();
        let (nonce, ciphertext) = sealed?;

        let mut raw = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        raw.extend_from_slice(&self.salt);
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD
            .encode(raw)
            .into_bytes())
    }

    fn decrypt(&self, armored: &[u8]) -> Result<Vec<u8>> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(armored)
            .map_err(|e| CpkError::DecryptionFailed(format!("invalid armor: {e}")))?;
        if raw.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
            return Err(CpkError::DecryptionFailed(format!(
                "armored payload too short ({} bytes)",
                raw.len()
            )));
        }

        let (salt, rest) = raw.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let salt: [u8; SALT_LEN] = salt
            .try_into()
            .map_err(|_| CpkError::DecryptionFailed("salt must be 16 bytes".to_string()))?;

        let mut key = self.key_for(&salt)?;
        let plaintext = encryption::decrypt(&key, nonce, ciphertext);
        key.zeroize();
        plaintext
    }
}

impl Drop for PassphraseAdapter {
    fn drop(&mut self) {
        self.passphrase.zeroize();
        for key in self.keys.get_mut().values_mut() {
            key.zeroize();
        }
    }
}
