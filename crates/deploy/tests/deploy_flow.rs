//! End-to-end deployment tests for ethkit-deploy.
//!
//! A wiremock server stands in for the node: it answers the chain queries, compiles
//! through `contract_compileContract` and serves receipts. The keystore is laid out in a
//! temporary configuration root.

use std::path::{Path, PathBuf};

use alloy_consensus::TxLegacy;
use alloy_core::primitives::{Address, B256, Bytes, TxKind, U256, b256};
use alloy_signer_local::PrivateKeySigner;
use ethkit_deploy::{
    DeploymentStatus, Error, EthkitConfig, SigningCredential, config::PollConfig, deploy,
};
use serde_json::{Value, json};
use tempdir::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method},
};

/// Web3 Secret Storage pbkdf2 test vector, passphrase `testpassword`.
const KEYSTORE: &str = r#"{
    "crypto": {
        "cipher": "aes-128-ctr",
        "cipherparams": {"iv": "6087dab2f9fdbbfaddc31a909735c1e6"},
        "ciphertext": "5318b4d5bcd28de64ee5559e671353e16f075ecae9f99c7a79a38af5f869aa46",
        "kdf": "pbkdf2",
        "kdfparams": {
            "c": 262144,
            "dklen": 32,
            "prf": "hmac-sha256",
            "salt": "ae3cd4e7013836a3df6bd7241b12db061dbe2c6785853cce422d148a624ce0bd"
        },
        "mac": "517ead924a9d0dc3124507e3393d175ce3ff7c1e96529c6c555ce9e51205e9b2"
    },
    "id": "3198bc9c-6672-5ab3-d995-4942343ae5b6",
    "version": 3
}"#;

const KEY: B256 = b256!("0x7a28b5ba57c53603b0b07b56bba752f7784bf506fa95edc395f5cf6c7514fe9d");

const CHAIN_ID: u64 = 1337;
const GAS_PRICE: u128 = 1_000_000_000;
const GAS_LIMIT: u64 = 500_000;
const BYTECODE: &str = "0x6080604052";
const STORAGE_ABI: &str = r#"[{"type":"constructor","inputs":[],"stateMutability":"nonpayable"},{"type":"function","name":"get","inputs":[],"outputs":[{"name":"","type":"uint256","internalType":"uint256"}],"stateMutability":"view"}]"#;

/// Test setup: a mock node plus a configuration root holding the keystore.
struct TestContext {
    server: MockServer,
    root: TempDir,
}

impl TestContext {
    async fn new() -> Self {
        let root = TempDir::new("ethkit-flow").unwrap();
        let key_dir = root.path().join("ethereum");
        std::fs::create_dir_all(&key_dir).unwrap();
        std::fs::write(key_dir.join("account.key"), KEYSTORE).unwrap();
        std::fs::write(key_dir.join("password"), "testpassword\n").unwrap();

        Self {
            server: MockServer::start().await,
            root,
        }
    }

    fn config(&self) -> EthkitConfig {
        EthkitConfig {
            chain_endpoint: self.server.uri().parse().unwrap(),
            config_root: self.root.path().to_path_buf(),
            poll: PollConfig {
                interval_ms: 10,
                max_attempts: 20,
                timeout_secs: None,
            },
            ..Default::default()
        }
    }

    fn unit_name(&self) -> String {
        format!("{}/storage.sol:Storage", self.root.path().display())
    }

    async fn mount(&self, rpc_method: &str, result: Value) {
        mount_result(&self.server, rpc_method, result, None).await;
    }

    /// Answer the chain queries a deployment makes before submitting.
    async fn mount_chain(&self) {
        self.mount("eth_chainId", json!(format!("{CHAIN_ID:#x}"))).await;
        self.mount("eth_getTransactionCount", json!("0x0")).await;
        self.mount("eth_gasPrice", json!(format!("{GAS_PRICE:#x}"))).await;
        self.mount("eth_estimateGas", json!(format!("{GAS_LIMIT:#x}"))).await;
        self.mount(
            "contract_compileContract",
            json!({
                "Abi": [STORAGE_ABI],
                "Bin": [BYTECODE],
                "Types": [self.unit_name()],
            }),
        )
        .await;
    }

    /// Serve `pending` empty receipt lookups, then a receipt with `status`.
    async fn mount_receipt(&self, tx_hash: B256, status: &str, pending: u64) {
        if pending > 0 {
            mount_result(
                &self.server,
                "eth_getTransactionReceipt",
                Value::Null,
                Some(pending),
            )
            .await;
        }
        self.mount(
            "eth_getTransactionReceipt",
            json!({
                "transactionHash": tx_hash,
                "blockNumber": "0x2",
                "contractAddress": sender().create(0),
                "gasUsed": "0x1d4c0",
                "status": status,
            }),
        )
        .await;
    }
}

async fn mount_result(server: &MockServer, rpc_method: &str, result: Value, times: Option<u64>) {
    let mock = Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "jsonrpc": "2.0",
            "result": result
        })));

    match times {
        Some(n) => mock.up_to_n_times(n).with_priority(1).mount(server).await,
        None => mock.mount(server).await,
    }
}

fn sender() -> Address {
    PrivateKeySigner::from_bytes(&KEY).unwrap().address()
}

/// Hash of the creation transaction the deployer is expected to sign.
fn expected_tx_hash() -> B256 {
    let credential = SigningCredential::new(PrivateKeySigner::from_bytes(&KEY).unwrap(), CHAIN_ID);
    credential
        .sign_legacy(TxLegacy {
            chain_id: Some(CHAIN_ID),
            nonce: 0,
            gas_price: GAS_PRICE,
            gas_limit: GAS_LIMIT,
            to: TxKind::Create,
            value: U256::ZERO,
            input: BYTECODE.parse::<Bytes>().unwrap(),
        })
        .unwrap()
        .hash
}

fn abi_artifact(root: &Path) -> PathBuf {
    root.join("storage.abi")
}

#[tokio::test]
async fn test_remote_compile_deploy_and_persist_abi() {
    let ctx = TestContext::new().await;
    let tx_hash = expected_tx_hash();
    ctx.mount_chain().await;
    ctx.mount("eth_sendRawTransaction", json!(tx_hash)).await;
    ctx.mount_receipt(tx_hash, "0x1", 2).await;

    let deployment = deploy(&ctx.config(), "contract Storage {}", "", false)
        .await
        .unwrap();

    assert_eq!(deployment.address(), Some(sender().create(0)));
    assert_eq!(deployment.contracts.len(), 1);

    let deployed = &deployment.contracts[0];
    assert_eq!(deployed.tx_hash, tx_hash);
    assert_eq!(deployed.status, DeploymentStatus::Success);
    assert_eq!(deployed.artifact, abi_artifact(ctx.root.path()));
    assert_eq!(
        std::fs::read_to_string(&deployed.artifact).unwrap(),
        STORAGE_ABI
    );
}

#[tokio::test]
async fn test_reverted_deployment_reports_tx_hash() {
    let ctx = TestContext::new().await;
    let tx_hash = expected_tx_hash();
    ctx.mount_chain().await;
    ctx.mount("eth_sendRawTransaction", json!(tx_hash)).await;
    ctx.mount_receipt(tx_hash, "0x0", 0).await;

    let failure = deploy(&ctx.config(), "contract Storage {}", "", false)
        .await
        .unwrap_err();

    assert_eq!(
        failure.to_string(),
        format!("deploy contract failed, tx hash is: {tx_hash}")
    );
    assert!(matches!(failure.error, Error::DeploymentRejected { .. }));
    assert_eq!(failure.compiled.map(|c| c.len()), Some(1));
    assert!(!abi_artifact(ctx.root.path()).exists());
}

#[tokio::test]
async fn test_receipt_never_arriving_times_out() {
    let ctx = TestContext::new().await;
    let tx_hash = expected_tx_hash();
    ctx.mount_chain().await;
    ctx.mount("eth_sendRawTransaction", json!(tx_hash)).await;
    ctx.mount("eth_getTransactionReceipt", Value::Null).await;

    let mut config = ctx.config();
    config.poll.max_attempts = 3;

    let failure = deploy(&config, "contract Storage {}", "", false)
        .await
        .unwrap_err();

    match failure.error {
        Error::PollTimeout {
            tx_hash: polled,
            attempts,
        } => {
            assert_eq!(polled, tx_hash);
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_node_is_connection_error() {
    let ctx = TestContext::new().await;
    let config = EthkitConfig {
        chain_endpoint: "http://127.0.0.1:1".parse().unwrap(),
        ..ctx.config()
    };

    let failure = deploy(&config, "contract Storage {}", "", false)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, Error::Connection(_)));
    assert!(failure.compiled.is_none());
}

#[tokio::test]
async fn test_wrong_password_is_credential_error() {
    let ctx = TestContext::new().await;
    std::fs::write(ctx.root.path().join("ethereum/password"), "hunter2").unwrap();
    ctx.mount_chain().await;

    let failure = deploy(&ctx.config(), "contract Storage {}", "", false)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, Error::Credential(_)));
}

#[tokio::test]
async fn test_remote_result_missing_abis_is_empty_contract() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "contract_compileContract" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "jsonrpc": "2.0",
            "result": {"Abi": [], "Bin": ["0x00"], "Types": ["A"]}
        })))
        .with_priority(1)
        .mount(&ctx.server)
        .await;
    ctx.mount_chain().await;

    let failure = deploy(&ctx.config(), "contract A {}", "", false)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, Error::EmptyContract));
    assert_eq!(failure.compiled.map(|c| c.bins), Some(vec!["0x00".to_string()]));
}
