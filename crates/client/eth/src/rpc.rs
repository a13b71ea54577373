use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

/// Errors from the JSON-RPC transport or the node itself.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("JSON/RPC request failed: {0}")]
    Transport(String),
    // The node's own error text is surfaced verbatim to callers.
    #[error("{message}")]
    Server { code: i64, message: String },
    #[error("Invalid JSON/RPC response: {0}")]
    Response(String),
}

/// Slim seam to the Ethereum node. Everything above the transport (gas
/// estimation, privacy routing, receipt polling) is written against this
/// trait so tests can substitute a recording stub.
#[async_trait]
pub trait EthRpc: Send + Sync {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError>;
}

/// JSON-RPC 2.0 over HTTP.
pub struct HttpRpc {
    client: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl HttpRpc {
    pub fn new(url: Url) -> Self {
        Self { client: reqwest::Client::new(), url, next_id: AtomicU64::new(1) }
    }
}

#[async_trait]
impl EthRpc for HttpRpc {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!("RPC --> {method}");
        let res = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(RpcError::Transport(format!("server returned HTTP {status}")));
        }
        let body: JsonRpcResponse =
            res.json().await.map_err(|e| RpcError::Response(e.to_string()))?;
        if let Some(err) = body.error {
            tracing::debug!("RPC <-- {method} error {}: {}", err.code, err.message);
            return Err(RpcError::Server { code: err.code, message: err.message });
        }
        tracing::debug!("RPC <-- {method} OK");
        Ok(body.result)
    }
}
