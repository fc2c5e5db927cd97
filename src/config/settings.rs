use crate::error::{BlockchainError, Result};
use crate::network::{NodeOptions, DEFAULT_VERSION};
use crate::wallet::PrivateKey;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const BOOTSTRAP_NODES_KEY: &str = "BOOTSTRAP_NODES";
const VALIDATOR_SEED_KEY: &str = "VALIDATOR_SEED";
const DATA_DIR_KEY: &str = "DATA_DIR";

/// Node settings. Precedence: CLI flags over environment over file over defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub version: String,
    pub listen_addr: String,
    pub bootstrap_nodes: Vec<String>,
    /// Hex-encoded 32-byte seed; the node validates when set.
    pub validator_seed: Option<String>,
    pub block_time_secs: u64,
    pub rpc_timeout_ms: u64,
    /// sled database directory; in-memory stores when unset.
    pub data_dir: Option<PathBuf>,
    pub produce_empty_blocks: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            version: DEFAULT_VERSION.to_string(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            bootstrap_nodes: vec![],
            validator_seed: None,
            block_time_secs: 5,
            rpc_timeout_ms: 5000,
            data_dir: None,
            produce_empty_blocks: false,
        }
    }
}

impl NodeConfig {
    pub fn from_toml_str(content: &str) -> Result<NodeConfig> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<NodeConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<NodeConfig> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => NodeConfig::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(NODE_ADDRESS_KEY) {
            self.listen_addr = addr;
        }
        if let Some(nodes) = lookup(BOOTSTRAP_NODES_KEY) {
            self.bootstrap_nodes = nodes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(seed) = lookup(VALIDATOR_SEED_KEY) {
            self.validator_seed = Some(seed);
        }
        if let Some(dir) = lookup(DATA_DIR_KEY) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(BlockchainError::Config("listen_addr is empty".to_string()));
        }
        if self.block_time_secs == 0 {
            return Err(BlockchainError::Config(
                "block_time_secs must be greater than zero".to_string(),
            ));
        }
        if self.rpc_timeout_ms == 0 {
            return Err(BlockchainError::Config(
                "rpc_timeout_ms must be greater than zero".to_string(),
            ));
        }
        self.validator_key()?;
        Ok(())
    }

    pub fn validator_key(&self) -> Result<Option<PrivateKey>> {
        match &self.validator_seed {
            Some(seed) => PrivateKey::from_seed_hex(seed)
                .map(Some)
                .map_err(|e| BlockchainError::Config(format!("invalid validator seed: {e}"))),
            None => Ok(None),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn node_options(&self) -> Result<NodeOptions> {
        self.validate()?;
        Ok(NodeOptions {
            version: self.version.clone(),
            listen_addr: self.listen_addr.clone(),
            validator_key: self.validator_key()?,
            block_time: Duration::from_secs(self.block_time_secs),
            produce_empty_blocks: self.produce_empty_blocks,
        })
    }
}
