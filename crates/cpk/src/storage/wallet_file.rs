//! Wallet file open/save.

use std::path::Path;

use super::write_atomic;
use crate::crypto::CryptoAdapter;
use crate::error::{CpkError, Result};
use crate::wallet::Wallet;

/// Read and decode a wallet file.
///
/// A missing file is an empty wallet.
///
/// # Errors
///
/// `CpkError::InvalidFileFormat` when `path` exists but is not a regular
/// file, plus every decode error of [`Wallet::decode`].
pub fn open_wallet(path: &Path, adapter: &dyn CryptoAdapter) -> Result<Wallet> {
    if !path.exists() {
        log::debug!("no wallet at {}, starting empty", path.display());
        return Ok(Wallet::new());
    }
    if !path.is_file() {
        return Err(CpkError::InvalidFileFormat(format!(
            "{} is not a file",
            path.display()
        )));
    }
    let bytes = std::fs::read(path)?;
    Wallet::decode(&bytes, adapter)
}

/// Encode and atomically replace the wallet file.
pub fn save_wallet(path: &Path, wallet: &Wallet, adapter: &dyn CryptoAdapter) -> Result<()> {
    let bytes = wallet.encode(adapter)?;
    write_atomic(path, &bytes)?;
    log::debug!(
        "saved wallet with {} records to {}",
        wallet.records().len(),
        path.display()
    );
    Ok(())
}
