//! JSON-RPC 2.0 transport over HTTP.

use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::{Error, Result};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Log target used for request/response dumps.
pub const RPC_LOG_TARGET: &str = "ethkit::rpc";

/// Logging collaborator for the transport.
///
/// When enabled, every exchange is emitted verbatim at `debug` level. Request bodies
/// may contain signed transactions, so this is meant for diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RpcLogger {
    enabled: bool,
}

impl RpcLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn exchange(&self, method: &str, request: &[u8], response: &[u8]) {
        if !self.enabled {
            return;
        }
        tracing::debug!(
            target: RPC_LOG_TARGET,
            method,
            request = %String::from_utf8_lossy(request),
            response = %String::from_utf8_lossy(response),
            "RPC exchange"
        );
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    id: u64,
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a [Value],
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

/// HTTP JSON-RPC client bound to one endpoint.
///
/// Cloning is cheap: clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: Url,
    logger: RpcLogger,
}

impl RpcClient {
    /// Create a client for `url` with the given logging collaborator.
    ///
    /// # Errors
    /// Returns [`Error::Transport`] if the HTTP client cannot be built.
    pub fn new(url: Url, logger: RpcLogger) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::transport("<init>", e))?;
        Ok(Self { http, url, logger })
    }

    /// The endpoint this client posts to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Make a JSON-RPC call and return the raw `result` value.
    ///
    /// A JSON `null` result is returned as [`Value::Null`]; callers decide whether
    /// that means "absent".
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let body = serde_json::to_vec(&RpcRequest {
            id: 1,
            jsonrpc: "2.0",
            method,
            params: &params,
        })
        .map_err(|e| Error::transport(method, e))?;

        let response = self
            .http
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.clone())
            .send()
            .await
            .map_err(|e| Error::transport(method, e))?;

        let status = response.status();
        let data = response
            .bytes()
            .await
            .map_err(|e| Error::transport(method, e))?;

        self.logger.exchange(method, &body, &data);

        let envelope: RpcResponse = serde_json::from_slice(&data).map_err(|e| {
            Error::transport(method, format!("malformed response (HTTP {status}): {e}"))
        })?;

        if let Some(error) = envelope.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(envelope.result)
    }

    /// Make a JSON-RPC call and deserialize the result.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
        let result = self.call(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| Error::transport(method, format!("unexpected result shape: {e}")))
    }

    /// Invoke an arbitrary method and hand back the raw result.
    pub async fn invoke_read_only(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        tracing::debug!(method, params = params.len(), "Invoking RPC method");
        self.call(method, params).await
    }
}
