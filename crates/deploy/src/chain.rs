//! Chain client: raw transaction submission and receipt lookup.

use std::future::Future;

use alloy_core::primitives::{Address, B256, Bytes, U64, U256};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{Error, Result, rpc::RpcClient};

/// Transaction receipt fields the deployment pipeline relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub gas_used: Option<U64>,
    /// `0x1` on success, `0x0` on revert. Absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U64>,
}

impl TransactionReceipt {
    /// Whether execution succeeded. Receipts without a status field count as success.
    pub fn succeeded(&self) -> bool {
        self.status != Some(U64::ZERO)
    }
}

/// Minimal call object for `eth_call` and `eth_estimateGas`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    pub data: Bytes,
}

impl CallRequest {
    /// A contract-creation request carrying `init_code`.
    pub fn deployment(from: Address, init_code: Bytes) -> Self {
        Self {
            from: Some(from),
            data: init_code,
            ..Default::default()
        }
    }

    /// A message call to `to` carrying `data`.
    pub fn call(to: Address, data: Bytes) -> Self {
        Self {
            to: Some(to),
            data,
            ..Default::default()
        }
    }
}

/// Chain operations used by the deployment orchestrator.
///
/// `transaction_receipt` returns `Ok(None)` while the transaction is not yet mined, and
/// `Err` only when the query itself failed. The receipt poll relies on that split.
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> impl Future<Output = Result<u64>> + Send;

    fn nonce(&self, address: Address) -> impl Future<Output = Result<u64>> + Send;

    fn gas_price(&self) -> impl Future<Output = Result<u128>> + Send;

    fn estimate_gas(&self, request: &CallRequest) -> impl Future<Output = Result<u64>> + Send;

    fn send_raw_transaction(&self, raw: &Bytes) -> impl Future<Output = Result<B256>> + Send;

    fn transaction_receipt(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<TransactionReceipt>>> + Send;

    fn call(&self, request: &CallRequest) -> impl Future<Output = Result<Bytes>> + Send;
}

/// [`ChainClient`] backed by the standard `eth_*` JSON-RPC namespace.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    rpc: RpcClient,
}

impl RpcChainClient {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }
}

fn to_param<T: Serialize>(method: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::transport(method, e))
}

impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64> {
        let id: U64 = self.rpc.request("eth_chainId", vec![]).await?;
        Ok(id.to())
    }

    async fn nonce(&self, address: Address) -> Result<u64> {
        let nonce: U64 = self
            .rpc
            .request(
                "eth_getTransactionCount",
                vec![json!(address), json!("pending")],
            )
            .await?;
        Ok(nonce.to())
    }

    async fn gas_price(&self) -> Result<u128> {
        let price: U256 = self.rpc.request("eth_gasPrice", vec![]).await?;
        u128::try_from(price)
            .map_err(|_| Error::transport("eth_gasPrice", format!("gas price {price} out of range")))
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64> {
        let params = vec![to_param("eth_estimateGas", request)?];
        let gas: U64 = self.rpc.request("eth_estimateGas", params).await?;
        Ok(gas.to())
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256> {
        self.rpc
            .request("eth_sendRawTransaction", vec![json!(raw)])
            .await
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>> {
        self.rpc
            .request("eth_getTransactionReceipt", vec![json!(hash)])
            .await
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        let params = vec![to_param("eth_call", request)?, json!("latest")];
        self.rpc.request("eth_call", params).await
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::rpc::RpcLogger;

    fn client_for(server: &MockServer) -> RpcChainClient {
        RpcChainClient::new(
            RpcClient::new(server.uri().parse().unwrap(), RpcLogger::default()).unwrap(),
        )
    }

    async fn mount_result(server: &MockServer, rpc_method: &str, result: Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "jsonrpc": "2.0",
                "result": result
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_chain_id_parses_hex_quantity() {
        let server = MockServer::start().await;
        mount_result(&server, "eth_chainId", json!("0x539")).await;
        assert_eq!(client_for(&server).chain_id().await.unwrap(), 1337);
    }

    #[tokio::test]
    async fn test_missing_receipt_is_none() {
        let server = MockServer::start().await;
        mount_result(&server, "eth_getTransactionReceipt", Value::Null).await;
        let receipt = client_for(&server)
            .transaction_receipt(B256::repeat_byte(1))
            .await
            .unwrap();
        assert!(receipt.is_none());
    }

    #[tokio::test]
    async fn test_receipt_query_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "jsonrpc": "2.0",
                "error": {"code": -32000, "message": "header not found"}
            })))
            .mount(&server)
            .await;
        let err = client_for(&server)
            .transaction_receipt(B256::repeat_byte(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rpc { code: -32000, .. }));
    }

    #[tokio::test]
    async fn test_submitted_hash_round_trips_through_receipt() {
        let server = MockServer::start().await;
        let hash = B256::repeat_byte(0x5a);
        mount_result(&server, "eth_sendRawTransaction", json!(hash)).await;
        mount_result(
            &server,
            "eth_getTransactionReceipt",
            json!({
                "transactionHash": hash,
                "blockNumber": "0x10",
                "contractAddress": null,
                "gasUsed": "0x5208",
                "status": "0x1"
            }),
        )
        .await;

        let client = client_for(&server);
        let submitted = client
            .send_raw_transaction(&Bytes::from_static(&[0xf8, 0x6b]))
            .await
            .unwrap();
        let receipt = client
            .transaction_receipt(submitted)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(submitted, hash);
        assert_eq!(receipt.transaction_hash, submitted);
        assert!(receipt.succeeded());
    }

    #[tokio::test]
    async fn test_nonce_and_gas_price() {
        let server = MockServer::start().await;
        mount_result(&server, "eth_getTransactionCount", json!("0x7")).await;
        mount_result(&server, "eth_gasPrice", json!("0x3b9aca00")).await;
        let client = client_for(&server);
        assert_eq!(client.nonce(Address::ZERO).await.unwrap(), 7);
        assert_eq!(client.gas_price().await.unwrap(), 1_000_000_000);
    }

    #[test]
    fn test_receipt_status() {
        let mut receipt = TransactionReceipt {
            transaction_hash: B256::ZERO,
            block_number: None,
            contract_address: None,
            gas_used: None,
            status: Some(U64::from(1)),
        };
        assert!(receipt.succeeded());
        receipt.status = Some(U64::ZERO);
        assert!(!receipt.succeeded());
        receipt.status = None;
        assert!(receipt.succeeded());
    }

    #[test]
    fn test_call_request_skips_unset_fields() {
        let request = CallRequest::deployment(Address::ZERO, Bytes::from_static(&[0x60]));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "from": "0x0000000000000000000000000000000000000000",
                "data": "0x60"
            })
        );
    }
}
