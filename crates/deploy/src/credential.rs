//! Signing credential resolution.
//!
//! A credential is an unlocked keystore key bound to the chain id it signs for. It lives
//! for a single deployment call; the underlying key is zeroized when the signer drops.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Address, B256, Bytes};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;

use crate::{Error, Result};

/// Directory under the configuration root holding the default key material.
pub const KEY_DIR: &str = "ethereum";
/// Default keystore file name.
pub const KEY_FILE: &str = "account.key";
/// Default passphrase file name.
pub const PASSWORD_FILE: &str = "password";

/// Resolved locations of the keystore and its passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPaths {
    pub key: PathBuf,
    pub password: PathBuf,
}

impl KeyPaths {
    /// Explicit paths win; missing ones fall back to `<config_root>/ethereum/{account.key,password}`.
    pub fn resolve(config_root: &Path, key: Option<&Path>, password: Option<&Path>) -> Self {
        let defaults = config_root.join(KEY_DIR);
        Self {
            key: key.map_or_else(|| defaults.join(KEY_FILE), Path::to_path_buf),
            password: password.map_or_else(|| defaults.join(PASSWORD_FILE), Path::to_path_buf),
        }
    }

    /// Read the passphrase and decrypt the keystore.
    ///
    /// # Errors
    /// Returns [`Error::Credential`] when either file is unreadable or decryption fails.
    pub fn unlock(&self) -> Result<PrivateKeySigner> {
        let password = std::fs::read_to_string(&self.password).map_err(|e| {
            Error::Credential(format!(
                "cannot read password file {}: {e}",
                self.password.display()
            ))
        })?;

        PrivateKeySigner::decrypt_keystore(&self.key, password.trim()).map_err(|e| {
            Error::Credential(format!("cannot unlock keystore {}: {e}", self.key.display()))
        })
    }
}

/// A signed, RLP-encoded transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: B256,
    pub raw: Bytes,
}

/// Private key plus the chain id it is authorized to sign for.
pub struct SigningCredential {
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl SigningCredential {
    pub fn new(signer: PrivateKeySigner, chain_id: u64) -> Self {
        Self { signer, chain_id }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign a legacy transaction with EIP-155 replay protection for this chain.
    pub fn sign_legacy(&self, mut tx: TxLegacy) -> Result<SignedTransaction> {
        tx.chain_id = Some(self.chain_id);
        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| Error::Signing(e.to_string()))?;

        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(SignedTransaction {
            hash: *envelope.tx_hash(),
            raw: envelope.encoded_2718().into(),
        })
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}
