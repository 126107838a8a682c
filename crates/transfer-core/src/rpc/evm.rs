use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{parse_quantity, parse_quantity_u64, CallRequest, EvmRpc, JsonRpcClient};
use crate::error::{Result, TransferError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockHeader {
    base_fee_per_gas: Option<String>,
}

/// [`EvmRpc`] over an Ethereum JSON-RPC endpoint.
#[derive(Debug)]
pub struct HttpEvmRpc {
    rpc: JsonRpcClient,
}

impl HttpEvmRpc {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(url, timeout)?,
        })
    }

    async fn quantity(&self, method: &str, params: serde_json::Value) -> Result<u128> {
        let hex: String = self.rpc.call(method, params).await?;
        parse_quantity(&hex)
    }
}

#[async_trait]
impl EvmRpc for HttpEvmRpc {
    async fn transaction_count(&self, address: &str) -> Result<u64> {
        let hex: String = self
            .rpc
            .call("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        parse_quantity_u64(&hex)
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64> {
        let hex: String = self
            .rpc
            .call("eth_estimateGas", json!([call.to_json()]))
            .await?;
        parse_quantity_u64(&hex)
    }

    async fn gas_price(&self) -> Result<u128> {
        self.quantity("eth_gasPrice", json!([])).await
    }

    async fn max_priority_fee_per_gas(&self) -> Result<u128> {
        self.quantity("eth_maxPriorityFeePerGas", json!([])).await
    }

    async fn base_fee_per_gas(&self) -> Result<Option<u128>> {
        let block: Option<BlockHeader> = self
            .rpc
            .call("eth_getBlockByNumber", json!(["latest", false]))
            .await?;

        let block = block.ok_or_else(|| TransferError::Rpc {
            method: "eth_getBlockByNumber".into(),
            code: None,
            message: "latest block not found".into(),
        })?;

        block
            .base_fee_per_gas
            .as_deref()
            .map(parse_quantity)
            .transpose()
    }

    async fn code_at(&self, address: &str) -> Result<Vec<u8>> {
        let code: String = self
            .rpc
            .call("eth_getCode", json!([address, "latest"]))
            .await?;
        let digits = code.strip_prefix("0x").unwrap_or(&code);
        hex::decode(digits).map_err(|e| TransferError::Codec(format!("eth_getCode: {e}")))
    }

    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String> {
        let raw = format!("0x{}", hex::encode(raw_tx));
        self.rpc.call("eth_sendRawTransaction", json!([raw])).await
    }
}
