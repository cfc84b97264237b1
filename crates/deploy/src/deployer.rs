//! Deployment orchestrator.
//!
//! Ties the compiler, the argument encoder, the signing credential and the chain client
//! together: every deployable unit of a compile result is submitted as a contract
//! creation, confirmed through the receipt poll and persisted as an `.abi` artifact.

use std::path::PathBuf;

use alloy_consensus::TxLegacy;
use alloy_core::{
    dyn_abi::{DynSolValue, FunctionExt},
    json_abi::JsonAbi,
    primitives::{Address, B256, Bytes, TxKind, U256},
};
use tokio_util::sync::CancellationToken;

use crate::{
    CallRequest, ChainClient, CompileResult, CompileUnit, ContractCompiler, DeployFailure,
    EthkitConfig, Error, Result, RpcChainClient, SolidityCompiler, TransactionReceipt,
    args,
    credential::{KeyPaths, SigningCredential},
    fs::FsHandler,
    poll::{PollPolicy, wait_for_receipt},
    rpc::{RpcClient, RpcLogger},
};

/// Execution outcome recorded in a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentStatus {
    Success,
    Failed,
}

impl From<&TransactionReceipt> for DeploymentStatus {
    fn from(receipt: &TransactionReceipt) -> Self {
        if receipt.succeeded() {
            Self::Success
        } else {
            Self::Failed
        }
    }
}

/// A confirmed deployment of one compile unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOutcome {
    /// Unit identifier from the compile result.
    pub name: String,
    pub address: Address,
    pub tx_hash: B256,
    pub status: DeploymentStatus,
    /// Where the unit's ABI was written.
    pub artifact: PathBuf,
}

/// Result of a successful [`Deployer::deploy`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// One entry per deployed (non-abstract) unit, in compile order.
    pub contracts: Vec<DeploymentOutcome>,
    /// The full compiler output, abstract units included.
    pub compiled: CompileResult,
}

impl Deployment {
    /// Address of the last deployed unit.
    ///
    /// Kept for callers that deploy one contract per call; use [`Deployment::contracts`]
    /// when a source set yields several units.
    pub fn address(&self) -> Option<Address> {
        self.contracts.last().map(|c| c.address)
    }
}

/// Deploys compiled contracts through a [`ChainClient`].
#[derive(Debug, Clone)]
pub struct Deployer<C, K> {
    chain: C,
    compiler: K,
    poll: PollPolicy,
    cancel: CancellationToken,
}

impl Deployer<RpcChainClient, SolidityCompiler> {
    /// Build a JSON-RPC backed deployer from configuration.
    pub fn from_config(config: &EthkitConfig) -> Result<Self> {
        let rpc = RpcClient::new(
            config.chain_endpoint.clone(),
            RpcLogger::new(config.rpc_debug),
        )?;
        Ok(Self::new(
            RpcChainClient::new(rpc.clone()),
            SolidityCompiler::new(&config.solc, rpc),
        )
        .with_poll_policy(config.poll_policy()))
    }
}

impl<C: ChainClient, K: ContractCompiler> Deployer<C, K> {
    pub fn new(chain: C, compiler: K) -> Self {
        Self {
            chain,
            compiler,
            poll: PollPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Use `cancel` to abort an in-flight receipt poll.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn compiler(&self) -> &K {
        &self.compiler
    }

    /// Unlock the keystore at `keys`, bind it to the connected chain and deploy.
    pub async fn deploy(
        &self,
        keys: &KeyPaths,
        source: &str,
        arg_string: &str,
        local: bool,
    ) -> Result<Deployment, DeployFailure> {
        let signer = keys.unlock()?;
        let chain_id = self
            .chain
            .chain_id()
            .await
            .map_err(|e| Error::Connection(format!("cannot fetch chain id: {e}")))?;

        let credential = SigningCredential::new(signer, chain_id);
        tracing::info!(
            deployer = %credential.address(),
            chain_id,
            "Signing credential unlocked"
        );

        self.deploy_with_credential(credential, source, arg_string, local)
            .await
    }

    /// Compile `source` and deploy every non-abstract unit with `credential`.
    ///
    /// Stops at the first failing unit. The returned [`DeployFailure`] carries the compile
    /// result and the units that were deployed before the failure.
    pub async fn deploy_with_credential(
        &self,
        credential: SigningCredential,
        source: &str,
        arg_string: &str,
        local: bool,
    ) -> Result<Deployment, DeployFailure> {
        let compiled = self.compiler.compile(source, local).await?;
        if compiled.is_empty() {
            return Err(DeployFailure {
                error: Error::EmptyContract,
                compiled: Some(compiled),
                deployed: Vec::new(),
            });
        }
        if let Err(error) = compiled.validate() {
            return Err(DeployFailure {
                error,
                compiled: Some(compiled),
                deployed: Vec::new(),
            });
        }

        let units: Vec<CompileUnit> = compiled.units().collect();
        let mut contracts = Vec::new();
        for unit in units {
            if unit.is_abstract() {
                tracing::debug!(unit = %unit.name, "Skipping abstract unit");
                continue;
            }

            match self.deploy_unit(&credential, &unit, arg_string).await {
                Ok(outcome) => contracts.push(outcome),
                Err(error) => {
                    tracing::error!(unit = %unit.name, %error, "Deployment failed");
                    return Err(DeployFailure {
                        error,
                        compiled: Some(compiled),
                        deployed: contracts,
                    });
                }
            }
        }

        Ok(Deployment {
            contracts,
            compiled,
        })
    }

    async fn deploy_unit(
        &self,
        credential: &SigningCredential,
        unit: &CompileUnit,
        arg_string: &str,
    ) -> Result<DeploymentOutcome> {
        let abi: JsonAbi = serde_json::from_str(&unit.abi).map_err(|source| Error::Abi {
            name: unit.name.clone(),
            source,
        })?;

        let bytecode: Bytes = unit
            .bytecode
            .trim()
            .parse()
            .map_err(|e| Error::Compile(format!("invalid bytecode for {}: {e}", unit.name)))?;
        let constructor_args = args::encode_constructor_input(&abi, arg_string)?;
        let mut init_code = bytecode.to_vec();
        init_code.extend_from_slice(&constructor_args);
        let init_code = Bytes::from(init_code);

        let sender = credential.address();
        let nonce = self.chain.nonce(sender).await?;
        let gas_price = self.chain.gas_price().await?;
        let gas_limit = self
            .chain
            .estimate_gas(&CallRequest::deployment(sender, init_code.clone()))
            .await?;

        let signed = credential.sign_legacy(TxLegacy {
            chain_id: Some(credential.chain_id()),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Create,
            value: U256::ZERO,
            input: init_code,
        })?;

        let address = sender.create(nonce);
        let tx_hash = self.chain.send_raw_transaction(&signed.raw).await?;
        if tx_hash != signed.hash {
            tracing::warn!(
                submitted = %signed.hash,
                reported = %tx_hash,
                "Node reported a different transaction hash"
            );
        }

        tracing::info!(
            unit = %unit.name,
            %address,
            %tx_hash,
            nonce,
            gas_limit,
            "Deployment transaction submitted"
        );

        let receipt = wait_for_receipt(&self.chain, tx_hash, &self.poll, &self.cancel).await?;
        let status = DeploymentStatus::from(&receipt);
        if status == DeploymentStatus::Failed {
            return Err(Error::DeploymentRejected {
                tx_hash: receipt.transaction_hash,
            });
        }

        let address = match receipt.contract_address {
            Some(reported) if reported != address => {
                tracing::warn!(
                    predicted = %address,
                    %reported,
                    "Receipt contract address differs from prediction"
                );
                reported
            }
            _ => address,
        };

        let artifact = FsHandler::write_abi_artifact(&unit.name, &unit.abi)?;
        tracing::info!(
            unit = %unit.name,
            %address,
            artifact = %artifact.display(),
            "Contract deployed"
        );

        Ok(DeploymentOutcome {
            name: unit.name.clone(),
            address,
            tx_hash,
            status,
            artifact,
        })
    }

    /// Invoke `function` on the contract at `to` through `eth_call` and decode its outputs.
    pub async fn call_function(
        &self,
        to: Address,
        abi: &JsonAbi,
        function: &str,
        arg_string: &str,
    ) -> Result<Vec<DynSolValue>> {
        let calldata = args::encode_function_call(abi, function, arg_string)?;
        let arity = args::encode_args(abi, function, arg_string)?.len();
        let output = self
            .chain
            .call(&CallRequest::call(to, calldata.into()))
            .await?;

        args::find_function(abi, function, arity)?
            .abi_decode_output(&output)
            .map_err(|e| {
                Error::transport("eth_call", format!("cannot decode `{function}` output: {e}"))
            })
    }
}

/// Deploy `source` using the endpoint and key material described by `config`.
pub async fn deploy(
    config: &EthkitConfig,
    source: &str,
    arg_string: &str,
    local: bool,
) -> Result<Deployment, DeployFailure> {
    Deployer::from_config(config)?
        .deploy(&config.key_paths(), source, arg_string, local)
        .await
}
