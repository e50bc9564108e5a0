//! User configuration (`config.toml`) and data directory resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CpkError, Result};
use crate::graph::{StoreOptions, TerminalPolicy, PASSWORD_ATTRIBUTE};
use crate::storage::write_atomic;

pub const APP_NAME: &str = "cpk";
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CPK_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Graph snapshot file, relative to the data directory
    #[serde(default = "default_graph_file")]
    pub graph_file: String,
    /// Wallet file, relative to the data directory
    #[serde(default = "default_wallet_file")]
    pub wallet_file: String,
    /// Implicit type of the last path step; empty disables it
    #[serde(default = "default_password_attribute")]
    pub password_attribute: String,
    /// Shell command whose stdout becomes a new password
    #[serde(default = "default_password_generator")]
    pub password_generator: String,
}

fn default_graph_file() -> String {
    "graph.json".to_string()
}

fn default_wallet_file() -> String {
    "wallet".to_string()
}

fn default_password_attribute() -> String {
    PASSWORD_ATTRIBUTE.to_string()
}

fn default_password_generator() -> String {
    "pwgen -s 20 1".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph_file: default_graph_file(),
            wallet_file: default_wallet_file(),
            password_attribute: default_password_attribute(),
            password_generator: default_password_generator(),
        }
    }
}

impl Config {
    /// `<config_dir>/cpk/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| CpkError::Config("no configuration directory".to_string()))?;
        Ok(dir.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config_toml = std::fs::read_to_string(path)?;
        toml::from_str(&config_toml)
            .map_err(|e| CpkError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_toml =
            toml::to_string_pretty(self).map_err(|e| CpkError::Config(e.to_string()))?;
        write_atomic(path, config_toml.as_bytes())
    }

    /// Data directory: `custom`, else `$CPK_DATA_DIR`, else `<data_dir>/cpk`.
    pub fn data_dir(custom: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = custom {
            return Ok(path);
        }
        if let Some(path) = std::env::var_os(DATA_DIR_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let dir = dirs::data_dir()
            .ok_or_else(|| CpkError::Config("no data directory".to_string()))?;
        Ok(dir.join(APP_NAME))
    }

    pub fn graph_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.graph_file)
    }

    pub fn wallet_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.wallet_file)
    }

    fn password_attribute(&self) -> Option<String> {
        Some(self.password_attribute.clone()).filter(|name| !name.is_empty())
    }

    pub fn terminal_policy(&self) -> TerminalPolicy {
        TerminalPolicy::new(self.password_attribute())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            password_attribute: self.password_attribute(),
        }
    }
}
