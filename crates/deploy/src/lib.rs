//! ethkit-deploy - Ethereum client toolkit.
//!
//! This crate compiles Solidity sources, encodes constructor arguments, signs contract
//! creation transactions with a keystore credential and drives them to a confirmed
//! receipt over JSON-RPC.

pub mod args;
pub mod config;
pub mod credential;
pub mod poll;
pub mod rpc;

mod chain;
mod compiler;
mod deployer;
mod error;
mod fs;

pub use chain::{CallRequest, ChainClient, RpcChainClient, TransactionReceipt};
pub use compiler::{CompileResult, CompileUnit, ContractCompiler, SolidityCompiler};
pub use config::EthkitConfig;
pub use credential::{KeyPaths, SigningCredential};
pub use deployer::{Deployer, Deployment, DeploymentOutcome, DeploymentStatus, deploy};
pub use error::{DeployFailure, Error, Result};
pub use fs::FsHandler;
pub use poll::PollPolicy;
pub use rpc::{RpcClient, RpcLogger};
