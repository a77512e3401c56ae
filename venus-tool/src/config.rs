use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ToolError;

pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:12580";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ChainConfig {
    pub network_name: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network_name: "localnet".into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub wallets: Vec<String>,
    pub miners: Vec<String>,
    pub server: ServerConfig,
    pub chain: ChainConfig,
}

/// The daemon's home directory.
#[derive(Clone, Debug)]
pub struct Repo {
    path: PathBuf,
}

impl Repo {
    /// Opens `path`, creating it if needed. A leading `~` is the home dir.
    pub fn open(path: &str) -> Result<Self, ToolError> {
        let path = expand_home(path);
        if !path.exists() {
            info!("create repo at {}", path.display());
            std::fs::create_dir_all(&path)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config_path(&self) -> PathBuf {
        self.path.join(CONFIG_FILE)
    }

    /// Reads the config, writing the defaults first when there is none.
    pub fn load_config(&self) -> Result<Config, ToolError> {
        let path = self.config_path();
        if !path.exists() {
            let config = Config::default();
            self.save_config(&config)?;
            return Ok(config);
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn save_config(&self, config: &Config) -> Result<(), ToolError> {
        let raw = toml::to_string_pretty(config)?;
        std::fs::write(self.config_path(), raw)?;
        info!("config saved to {}", self.config_path().display());
        Ok(())
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~") {
        Some(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}
