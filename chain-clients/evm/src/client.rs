//! EVM Client Module
//!
//! JSON-RPC client for EVM-compatible nodes. The `EvmRpc` trait is the read-only
//! surface the bridge tracker depends on; `EvmClient` is the HTTP implementation.

use async_trait::async_trait;
use ethereum_types::{H160, H256, U256, U64};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::abi::{self, AbiError, Token};
use crate::types::{EvmLog, HexBytes, LogFilter, TransactionReceipt};

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors returned by EVM JSON-RPC calls
#[derive(Debug, Error)]
pub enum EvmError {
    /// HTTP failure, connection reset or request timeout
    #[error("transport error calling {method}: {message}")]
    Transport { method: String, message: String },
    /// Error object returned by the node
    #[error("JSON-RPC error from {method} (code: {code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    /// Response did not have the expected shape
    #[error("failed to decode {method} response: {message}")]
    Decode { method: String, message: String },
    #[error(transparent)]
    Abi(#[from] AbiError),
}

impl EvmError {
    /// Whether the failure happened below the JSON-RPC layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, EvmError::Transport { .. })
    }

    /// Node-reported message, if any.
    pub fn rpc_message(&self) -> Option<&str> {
        match self {
            EvmError::Rpc { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Read-only view of an EVM chain
#[async_trait]
pub trait EvmRpc: Send + Sync {
    /// Current head block number (`eth_blockNumber`).
    async fn block_number(&self) -> Result<u64, EvmError>;

    /// Logs matching `filter` (`eth_getLogs`), in chain order.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<EvmLog>, EvmError>;

    /// Receipt for `tx_hash`, or `None` while the transaction is pending or unknown.
    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, EvmError>;

    /// Native balance at the latest block (`eth_getBalance`).
    async fn balance(&self, address: H160) -> Result<U256, EvmError>;

    /// Read-only contract call at the latest block (`eth_call`).
    async fn call(&self, to: H160, data: Vec<u8>) -> Result<Vec<u8>, EvmError>;
}

// ============================================================================
// EVM CLIENT IMPLEMENTATION
// ============================================================================

/// Client for communicating with EVM-compatible blockchain nodes via JSON-RPC
#[derive(Debug, Clone)]
pub struct EvmClient {
    /// HTTP client for making requests
    client: Client,
    /// URL of the node (e.g., "http://127.0.0.1:8545")
    rpc_url: String,
    request_timeout: Duration,
}

impl EvmClient {
    /// Creates a new EVM client for the given node URL
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - JSON-RPC endpoint of the node
    ///
    /// # Returns
    ///
    /// * `Ok(EvmClient)` - Successfully created client
    /// * `Err(EvmError)` - Failed to build the HTTP client
    pub fn new(rpc_url: &str) -> Result<Self, EvmError> {
        Self::with_timeout(rpc_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(rpc_url: &str, request_timeout: Duration) -> Result<Self, EvmError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| EvmError::Transport {
                method: "client_build".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            request_timeout,
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Sends one JSON-RPC request and deserializes its `result` field.
    ///
    /// A `null` result deserializes into `T` as-is, so callers expecting absent
    /// values use `Option<_>`.
    async fn json_rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T, EvmError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let transport = |message: String| EvmError::Transport {
            method: method.to_string(),
            message,
        };

        let rpc_future = async {
            let resp = self
                .client
                .post(&self.rpc_url)
                .json(&request)
                .send()
                .await
                .map_err(|e| transport(format!("failed to send request to {}: {}", self.rpc_url, e)))?;
            resp.json::<serde_json::Value>().await.map_err(|e| {
                transport(format!("failed to read response from {}: {}", self.rpc_url, e))
            })
        };

        let response = tokio::time::timeout(self.request_timeout, rpc_future)
            .await
            .map_err(|_| {
                transport(format!(
                    "timed out after {:?} waiting for {}",
                    self.request_timeout, self.rpc_url
                ))
            })??;

        if let Some(error) = response.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            tracing::debug!(method, code, %message, "JSON-RPC error");
            return Err(EvmError::Rpc {
                method: method.to_string(),
                code,
                message,
            });
        }

        let result = response
            .get("result")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        serde_json::from_value(result).map_err(|e| EvmError::Decode {
            method: method.to_string(),
            message: e.to_string(),
        })
    }

    /// ERC20 `balanceOf(owner)` on `token`.
    pub async fn erc20_balance_of(&self, token: H160, owner: H160) -> Result<U256, EvmError> {
        balance_of(self, token, owner).await
    }

    /// ERC721 `balanceOf(owner)` on `token` (number of tokens held).
    pub async fn erc721_balance_of(&self, token: H160, owner: H160) -> Result<U256, EvmError> {
        balance_of(self, token, owner).await
    }
}

/// Calls `balanceOf(address)` through any `EvmRpc`; ERC20 and ERC721 share the selector.
pub async fn balance_of<C: EvmRpc + ?Sized>(
    rpc: &C,
    token: H160,
    owner: H160,
) -> Result<U256, EvmError> {
    let calldata = abi::encode_call("balanceOf(address)", &[Token::Address(owner)]);
    let output = rpc.call(token, calldata).await?;
    Ok(abi::read_uint(&output, 0)?)
}

#[async_trait]
impl EvmRpc for EvmClient {
    async fn block_number(&self) -> Result<u64, EvmError> {
        let number: U64 = self.json_rpc("eth_blockNumber", vec![]).await?;
        Ok(number.as_u64())
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<EvmLog>, EvmError> {
        self.json_rpc("eth_getLogs", vec![filter.to_json()]).await
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, EvmError> {
        self.json_rpc(
            "eth_getTransactionReceipt",
            vec![serde_json::json!(format!("{:#x}", tx_hash))],
        )
        .await
    }

    async fn balance(&self, address: H160) -> Result<U256, EvmError> {
        self.json_rpc(
            "eth_getBalance",
            vec![
                serde_json::json!(format!("{:#x}", address)),
                serde_json::json!("latest"),
            ],
        )
        .await
    }

    async fn call(&self, to: H160, data: Vec<u8>) -> Result<Vec<u8>, EvmError> {
        let output: HexBytes = self
            .json_rpc(
                "eth_call",
                vec![
                    serde_json::json!({
                        "to": format!("{:#x}", to),
                        "data": abi::to_hex(&data),
                    }),
                    serde_json::json!("latest"),
                ],
            )
            .await?;
        Ok(output.0)
    }
}
