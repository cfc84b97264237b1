//! ethkit is a CLI tool to compile, deploy and talk to Ethereum contracts.

mod cli;
mod config;

use std::str::FromStr;

use alloy_core::{
    json_abi::JsonAbi,
    primitives::{Address, B256, Bytes},
};
use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;
use ethkit_deploy::{
    ChainClient, CompileResult, ContractCompiler, Deployer, DeploymentOutcome,
    TransactionReceipt, poll::wait_for_receipt,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref(), &cli.overrides)?;

    // RPC dumps are emitted at debug level.
    let verbosity = if config.rpc_debug {
        cli.verbosity.max(LevelFilter::DEBUG)
    } else {
        cli.verbosity
    };

    // Initialize the logger.
    tracing_subscriber::fmt().with_max_level(verbosity).init();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_ctrl_c.cancel();
        }
    });

    tracing::debug!(
        chain_endpoint = %config.chain_endpoint,
        config_root = %config.config_root.display(),
        "Configuration loaded"
    );

    let deployer = Deployer::from_config(&config)?.with_cancellation(cancel.clone());

    match cli.command {
        Command::Compile { source, remote } => {
            let compiled = deployer.compiler().compile(&source, !remote).await?;
            compiled.validate()?;
            println!("{}", compile_table(&compiled));
        }
        Command::Deploy {
            source,
            args,
            remote,
        } => match deployer
            .deploy(&config.key_paths(), &source, &args, !remote)
            .await
        {
            Ok(deployment) => println!("{}", deployment_table(&deployment.contracts)),
            Err(failure) => {
                if !failure.deployed.is_empty() {
                    println!("{}", deployment_table(&failure.deployed));
                }
                return Err(anyhow::Error::new(failure).context("Deployment failed"));
            }
        },
        Command::SendRawTx { raw } => {
            let raw = Bytes::from_str(&raw).context("Invalid raw transaction hex")?;
            let hash = deployer.chain().send_raw_transaction(&raw).await?;
            println!("{hash}");
        }
        Command::Receipt { tx_hash, wait } => {
            let tx_hash = B256::from_str(&tx_hash).context("Invalid transaction hash")?;
            let receipt = if wait {
                let policy = config.poll_policy();
                Some(wait_for_receipt(deployer.chain(), tx_hash, &policy, &cancel).await?)
            } else {
                deployer.chain().transaction_receipt(tx_hash).await?
            };

            match receipt {
                Some(receipt) => println!("{}", receipt_table(&receipt)),
                None => println!("Transaction {tx_hash} is pending or unknown"),
            }
        }
        Command::Call {
            address,
            abi,
            function,
            args,
        } => {
            let address = Address::from_str(&address).context("Invalid contract address")?;
            let abi_json = std::fs::read_to_string(&abi)
                .with_context(|| format!("Failed to read ABI file {}", abi.display()))?;
            let abi: JsonAbi = serde_json::from_str(&abi_json).context("Invalid ABI file")?;

            let values = deployer
                .call_function(address, &abi, &function, &args)
                .await?;
            for value in values {
                println!("{value:?}");
            }
        }
        Command::Invoke { method, params } => {
            let params = params.iter().map(String::as_str).map(parse_param).collect();
            let result = deployer
                .chain()
                .rpc()
                .invoke_read_only(&method, params)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

/// Parse a CLI parameter as JSON, keeping it as a plain string when it is not valid JSON.
fn parse_param(param: &str) -> Value {
    serde_json::from_str(param).unwrap_or_else(|_| Value::String(param.to_string()))
}

fn compile_table(compiled: &CompileResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Unit", "Deployable", "Bytecode size"]);
    for unit in compiled.units() {
        let size = unit.bytecode.trim_start_matches("0x").len() / 2;
        table.add_row(vec![
            unit.name.clone(),
            (!unit.is_abstract()).to_string(),
            size.to_string(),
        ]);
    }
    table
}

fn deployment_table(contracts: &[DeploymentOutcome]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Contract", "Address", "Transaction", "ABI"]);
    for contract in contracts {
        table.add_row(vec![
            contract.name.clone(),
            contract.address.to_string(),
            contract.tx_hash.to_string(),
            contract.artifact.display().to_string(),
        ]);
    }
    table
}

fn receipt_table(receipt: &TransactionReceipt) -> Table {
    let optional = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec![
        "transaction".to_string(),
        receipt.transaction_hash.to_string(),
    ]);
    table.add_row(vec![
        "block".to_string(),
        optional(receipt.block_number.map(|b| b.to_string())),
    ]);
    table.add_row(vec![
        "status".to_string(),
        if receipt.succeeded() { "success" } else { "failed" }.to_string(),
    ]);
    table.add_row(vec![
        "gas used".to_string(),
        optional(receipt.gas_used.map(|g| g.to_string())),
    ]);
    table.add_row(vec![
        "contract".to_string(),
        optional(receipt.contract_address.map(|a| a.to_string())),
    ]);
    table
}
