//! Toolkit configuration.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    credential::KeyPaths,
    poll::{DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, PollPolicy},
};

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "ethkit.toml";

/// Default JSON-RPC endpoint.
pub const DEFAULT_CHAIN_ENDPOINT: &str = "http://127.0.0.1:8545";

/// Default name of the configuration root under the home directory.
const DEFAULT_CONFIG_DIR: &str = ".ethkit";

/// Receipt poll settings as they appear in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay between receipt lookups, in milliseconds.
    pub interval_ms: u64,
    /// Maximum number of receipt lookups.
    pub max_attempts: usize,
    /// Optional overall deadline, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: u64::try_from(DEFAULT_POLL_INTERVAL.as_millis()).unwrap_or(u64::MAX),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_secs: None,
        }
    }
}

impl From<&PollConfig> for PollPolicy {
    fn from(config: &PollConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            max_attempts: config.max_attempts,
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Everything needed to talk to a node and deploy to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthkitConfig {
    /// JSON-RPC endpoint of the node.
    pub chain_endpoint: Url,
    /// Root holding `ethereum/account.key` and `ethereum/password`.
    pub config_root: PathBuf,
    /// Keystore path overriding the default under `config_root`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
    /// Passphrase file overriding the default under `config_root`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_path: Option<PathBuf>,
    /// The `solc` binary used for local compilation.
    pub solc: PathBuf,
    /// Dump every RPC request and response at debug level.
    pub rpc_debug: bool,
    /// Receipt poll bounds.
    pub poll: PollConfig,
}

impl Default for EthkitConfig {
    fn default() -> Self {
        Self {
            chain_endpoint: Url::parse(DEFAULT_CHAIN_ENDPOINT)
                .expect("default endpoint should always parse"),
            config_root: default_config_root(),
            key_path: None,
            password_path: None,
            solc: PathBuf::from("solc"),
            rpc_debug: false,
            poll: PollConfig::default(),
        }
    }
}

impl EthkitConfig {
    /// Keystore and passphrase locations, explicit paths first.
    pub fn key_paths(&self) -> KeyPaths {
        KeyPaths::resolve(
            &self.config_root,
            self.key_path.as_deref(),
            self.password_path.as_deref(),
        )
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from(&self.poll)
    }
}

/// `~/.ethkit`, or `./.ethkit` when no home directory is known.
pub fn default_config_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CONFIG_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR))
}
