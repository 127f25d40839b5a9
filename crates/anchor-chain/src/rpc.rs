//! # Ledger JSON-RPC Client
//!
//! Thin async wrapper over the node's JSON-RPC endpoint. Each call posts
//! `{"jsonrpc":"2.0","method",...,"params",...,"id"}` and returns the
//! `result` field, mapping transport failures, non-2xx statuses, and
//! JSON-RPC error objects to [`ChainError`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{json, Value};
use url::Url;

use crate::abi::{parse_quantity, to_quantity};
use crate::error::ChainError;

/// Number and timestamp of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Block height.
    pub number: u64,
    /// Block timestamp (seconds since the Unix epoch).
    pub timestamp: u64,
}

/// JSON-RPC client for one ledger node.
#[derive(Debug)]
pub struct RpcClient {
    client: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Build a client with a per-request timeout.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    /// The endpoint this client talks to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send a JSON-RPC request and return the `result` field.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        });

        let resp = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transport {
                method: method.to_string(),
                reason: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        if !resp.status().is_success() {
            return Err(ChainError::Http {
                method: method.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let json: Value = resp.json().await.map_err(|e| ChainError::InvalidResponse {
            method: method.to_string(),
            reason: format!("invalid JSON: {e}"),
        })?;

        if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
            return Err(ChainError::Rpc {
                method: method.to_string(),
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown RPC error")
                    .to_string(),
            });
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| ChainError::InvalidResponse {
                method: method.to_string(),
                reason: "missing 'result' field".to_string(),
            })
    }

    /// Next nonce for `address`, counting transactions already in the pool.
    pub async fn transaction_count(&self, address: &str) -> Result<u64, ChainError> {
        let method = "eth_getTransactionCount";
        let result = self.call(method, json!([address, "pending"])).await?;
        quantity(method, &result)
    }

    /// Submit a transaction for node-side signing. Returns the raw hash string.
    pub async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        data: &str,
        nonce: u64,
    ) -> Result<String, ChainError> {
        let method = "eth_sendTransaction";
        let tx = json!({
            "from": from,
            "to": to,
            "data": data,
            "nonce": to_quantity(nonce),
        });
        let result = self.call(method, json!([tx])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ChainError::InvalidResponse {
                method: method.to_string(),
                reason: "non-string transaction hash".to_string(),
            })
    }

    /// Ask the node to unlock `address`. A zero duration means until restart.
    pub async fn unlock_account(
        &self,
        address: &str,
        passphrase: &str,
        duration_secs: u64,
    ) -> Result<bool, ChainError> {
        let method = "personal_unlockAccount";
        let result = self
            .call(method, json!([address, passphrase, duration_secs]))
            .await?;
        result.as_bool().ok_or_else(|| ChainError::InvalidResponse {
            method: method.to_string(),
            reason: "non-boolean unlock result".to_string(),
        })
    }

    /// Number and timestamp of the latest block.
    pub async fn latest_block(&self) -> Result<BlockInfo, ChainError> {
        let method = "eth_getBlockByNumber";
        let block = self.call(method, json!(["latest", false])).await?;
        if block.is_null() {
            return Err(ChainError::InvalidResponse {
                method: method.to_string(),
                reason: "no latest block".to_string(),
            });
        }
        let field = |name: &str| -> Result<u64, ChainError> {
            block
                .get(name)
                .ok_or_else(|| ChainError::InvalidResponse {
                    method: method.to_string(),
                    reason: format!("block missing '{name}'"),
                })
                .and_then(|v| quantity(method, v))
        };
        Ok(BlockInfo {
            number: field("number")?,
            timestamp: field("timestamp")?,
        })
    }
}

fn quantity(method: &str, value: &Value) -> Result<u64, ChainError> {
    value
        .as_str()
        .and_then(parse_quantity)
        .ok_or_else(|| ChainError::InvalidResponse {
            method: method.to_string(),
            reason: format!("expected hex quantity, got {value}"),
        })
}
