use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "ethkit")]
#[command(
    author,
    version,
    about = "Compile, deploy and talk to Ethereum contracts over JSON-RPC"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "ETHKIT_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to an `ethkit.toml` configuration file.
    ///
    /// If not provided, `ethkit.toml` is read from the current directory when present.
    #[arg(long, alias = "conf", env = "ETHKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Configuration values set on the command line. They take precedence over the
/// configuration file and the `ETHKIT_` environment.
#[derive(Debug, Clone, Default, Parser, Serialize)]
pub struct ConfigOverrides {
    /// JSON-RPC endpoint of the node.
    #[arg(long, alias = "rpc-url")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_endpoint: Option<Url>,

    /// Directory holding `ethereum/account.key` and `ethereum/password`.
    ///
    /// Defaults to `~/.ethkit`.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_root: Option<PathBuf>,

    /// Keystore file, overriding the one under the configuration root.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,

    /// Passphrase file, overriding the one under the configuration root.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_path: Option<PathBuf>,

    /// The `solc` binary used for local compilation.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solc: Option<PathBuf>,

    /// Log every JSON-RPC request and response.
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub rpc_debug: bool,

    #[clap(flatten)]
    pub poll: PollOverrides,
}

/// Receipt poll bounds.
#[derive(Debug, Clone, Default, Parser, Serialize)]
pub struct PollOverrides {
    /// Delay between receipt lookups, in milliseconds.
    #[arg(long = "poll-interval-ms")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,

    /// Maximum number of receipt lookups.
    #[arg(long = "poll-max-attempts")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<usize>,

    /// Overall deadline for the receipt poll, in seconds.
    #[arg(long = "poll-timeout-secs")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile Solidity sources and list the resulting units.
    Compile {
        /// Comma-separated source paths, or inline source when compiling remotely.
        source: String,

        /// Compile through the node's `contract_compileContract` method instead of `solc`.
        #[arg(long)]
        remote: bool,
    },

    /// Compile and deploy every concrete contract of the sources.
    Deploy {
        /// Comma-separated source paths, or inline source when compiling remotely.
        source: String,

        /// Constructor arguments: `^` separates values, `[a,b]` is an array.
        #[arg(short, long, default_value = "")]
        args: String,

        /// Compile through the node instead of `solc`.
        #[arg(long)]
        remote: bool,
    },

    /// Submit an already signed transaction.
    SendRawTx {
        /// `0x`-prefixed RLP-encoded transaction.
        raw: String,
    },

    /// Fetch a transaction receipt.
    Receipt {
        /// Transaction hash.
        tx_hash: String,

        /// Poll until the receipt is available.
        #[arg(short, long)]
        wait: bool,
    },

    /// Call a read-only contract function through `eth_call`.
    Call {
        /// Contract address.
        address: String,

        /// Path to the contract's `.abi` file.
        #[arg(long)]
        abi: PathBuf,

        /// Function name.
        function: String,

        /// Function arguments, in the same format as constructor arguments.
        #[arg(short, long, default_value = "")]
        args: String,
    },

    /// Send an arbitrary JSON-RPC request and print the raw result.
    Invoke {
        /// RPC method name.
        method: String,

        /// Positional parameters. Each one is parsed as JSON, falling back to a string.
        params: Vec<String>,
    },
}
