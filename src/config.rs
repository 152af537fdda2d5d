//! Configuration management for AuthChain

use crate::error::{ChainError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "authchain.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChainConfig {
    #[serde(default = "default_label")]
    pub label: String,
    /// Hex hash of a bootstrapped genesis block in the block store. When
    /// unset the built-in genesis block roots the chain.
    #[serde(default)]
    pub genesis_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            label: default_label(),
            genesis_hash: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            timeout_secs: default_timeout(),
        }
    }
}

impl StorageConfig {
    pub fn blocks_dir(&self) -> PathBuf {
        self.data_dir.join("blocks")
    }

    pub fn chains_dir(&self) -> PathBuf {
        self.data_dir.join("blockchains")
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.data_dir.join("keys")
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_label() -> String {
    "main".to_string()
}

fn default_timeout() -> u64 {
    10
}

/// Loads `authchain.toml` from the working directory, falling back to defaults.
pub fn load_config() -> Result<Config> {
    load_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)
            .map_err(|e| ChainError::Config(format!("{}: {}", path.display(), e)))?
    };

    // Validate critical values
    if config.chain.label.is_empty() {
        return Err(ChainError::Config("chain.label must not be empty".to_string()));
    }
    if config.chain.label.contains(['/', '\\']) {
        return Err(ChainError::Config("chain.label must not contain path separators".to_string()));
    }
    if config.storage.data_dir.as_os_str().is_empty() {
        return Err(ChainError::Config("storage.data_dir must be set".to_string()));
    }

    Ok(config)
}
