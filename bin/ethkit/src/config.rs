//! Layered configuration: defaults, `ethkit.toml`, `ETHKIT_*` environment, then flags.

use std::path::Path;

use anyhow::{Context, Result};
use ethkit_deploy::{EthkitConfig, config::CONFIG_FILENAME};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::cli::ConfigOverrides;

/// Prefix of environment variables mapped onto [`EthkitConfig`] fields.
///
/// Nested fields use `__`, e.g. `ETHKIT_POLL__MAX_ATTEMPTS`.
const ENV_PREFIX: &str = "ETHKIT_";

pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<EthkitConfig> {
    let file = path.unwrap_or(Path::new(CONFIG_FILENAME));
    if path.is_some() && !file.exists() {
        anyhow::bail!("Configuration file not found: {}", file.display());
    }

    Figment::from(Serialized::defaults(EthkitConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .merge(Serialized::defaults(overrides))
        .extract()
        .with_context(|| format!("Invalid configuration (file: {})", file.display()))
}
