//! On-disk persistence for the graph store and the wallet.
//!
//! # Directory layout
//!
//! The data directory defaults to `dirs::data_dir()/cpk`:
//!
//! ```text
//! <data_dir>/
//! ├── graph.json   # committed graph snapshot
//! └── wallet       # framed, encrypted wallet stream
//! ```
//!
//! # Modules
//!
//! - [`graph_file`]: JSON [`Backend`](crate::graph::Backend) for the graph store.
//! - [`wallet_file`]: open/save of wallet files.

pub mod graph_file;
pub mod wallet_file;

pub use graph_file::FileBackend;
pub use wallet_file::{open_wallet, save_wallet};

use std::path::Path;

use crate::error::Result;

/// Write `data` to `path` via a sibling temp file and a rename.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}
