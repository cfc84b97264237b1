//! Error types shared by every stage of the deployment pipeline.

use std::path::PathBuf;

use alloy_core::primitives::B256;
use thiserror::Error;

use crate::{CompileResult, DeploymentOutcome};

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the toolkit can surface, grouped by the stage that produced it.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP request could not be sent or the response body was not a JSON-RPC envelope.
    #[error("transport failure calling {method}: {reason}")]
    Transport { method: String, reason: String },

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code} ({message})")]
    Rpc { code: i64, message: String },

    /// The compiler could not be invoked or rejected the sources.
    #[error("compile error: {0}")]
    Compile(String),

    /// The keystore or passphrase could not be read, or decryption failed.
    #[error("credential error: {0}")]
    Credential(String),

    /// The chain could not be reached while resolving the signing context.
    #[error("connection error: {0}")]
    Connection(String),

    /// An argument could not be matched or coerced against the declared parameter type.
    #[error("cannot encode argument {position} as `{expected}`: {reason}")]
    Encoding {
        position: usize,
        expected: String,
        reason: String,
    },

    /// The ABI of a compiled unit is not valid JSON ABI.
    #[error("invalid ABI for {name}: {source}")]
    Abi {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The compiler produced no contract units.
    #[error("empty contract: the compiler produced no deployable units")]
    EmptyContract,

    /// The transaction could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The deployment transaction was mined but reverted.
    #[error("deploy contract failed, tx hash is: {tx_hash}")]
    DeploymentRejected { tx_hash: B256 },

    /// The receipt did not appear within the configured poll bound.
    #[error("no receipt for {tx_hash} after {attempts} attempts")]
    PollTimeout { tx_hash: B256, attempts: usize },

    /// The caller cancelled the receipt poll.
    #[error("receipt poll for {tx_hash} was cancelled")]
    PollCancelled { tx_hash: B256 },

    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn transport(method: &str, reason: impl ToString) -> Self {
        Self::Transport {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encoding(position: usize, expected: impl ToString, reason: impl ToString) -> Self {
        Self::Encoding {
            position,
            expected: expected.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The transaction hash carried by the error, if the failure happened after submission.
    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            Self::DeploymentRejected { tx_hash }
            | Self::PollTimeout { tx_hash, .. }
            | Self::PollCancelled { tx_hash } => Some(*tx_hash),
            _ => None,
        }
    }
}

/// A failed deployment, with whatever was produced before the failing stage.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct DeployFailure {
    /// The stage error that stopped the deployment.
    #[source]
    pub error: Error,
    /// The compile result, when compilation had already succeeded.
    pub compiled: Option<CompileResult>,
    /// Units that were fully deployed before the failure.
    pub deployed: Vec<DeploymentOutcome>,
}

impl From<Error> for DeployFailure {
    fn from(error: Error) -> Self {
        Self {
            error,
            compiled: None,
            deployed: Vec::new(),
        }
    }
}
