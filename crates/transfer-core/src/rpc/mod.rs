//! Chain RPC boundaries.
//!
//! Builders and submission drivers only see these traits, so tests can
//! swap in in-memory chains. The HTTP implementations speak JSON-RPC 2.0.

mod client;
mod evm;
mod solana;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Result, TransferError};

pub use client::JsonRpcClient;
pub use evm::HttpEvmRpc;
pub use solana::HttpSolanaRpc;

/// Arguments for `eth_estimateGas`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: String,
    pub to: String,
    pub value: U256,
    pub data: Vec<u8>,
}

impl CallRequest {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "from": self.from,
            "to": self.to,
            "value": format!("0x{:x}", self.value),
            "data": format!("0x{}", hex::encode(&self.data)),
        })
    }
}

#[async_trait]
pub trait EvmRpc: Send + Sync {
    /// Pending nonce of `address`.
    async fn transaction_count(&self, address: &str) -> Result<u64>;

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64>;

    async fn gas_price(&self) -> Result<u128>;

    async fn max_priority_fee_per_gas(&self) -> Result<u128>;

    /// Base fee of the latest block; `None` before London.
    async fn base_fee_per_gas(&self) -> Result<Option<u128>>;

    /// Deployed bytecode at `address`; empty for externally owned accounts.
    async fn code_at(&self, address: &str) -> Result<Vec<u8>>;

    /// Broadcast a signed transaction and return its hash.
    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: [u8; 32],
    pub last_valid_block_height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub owner: [u8; 32],
    pub lamports: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    Processed,
    Confirmed,
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub confirmation_status: Option<ConfirmationStatus>,
    /// On-chain execution error, if the transaction failed.
    pub err: Option<String>,
}

#[async_trait]
pub trait SolanaRpc: Send + Sync {
    async fn latest_blockhash(&self) -> Result<LatestBlockhash>;

    /// `None` when the account does not exist.
    async fn account_info(&self, address: &[u8; 32]) -> Result<Option<AccountInfo>>;

    /// Fee in lamports; `None` if the blockhash has already expired.
    async fn fee_for_message(&self, message: &[u8]) -> Result<Option<u64>>;

    /// Broadcast a signed transaction and return its signature.
    async fn send_transaction(&self, raw_tx: &[u8]) -> Result<String>;

    async fn signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>>;

    async fn block_height(&self) -> Result<u64>;
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(value: &str) -> Result<u128> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| TransferError::Codec(format!("quantity {value:?} lacks 0x prefix")))?;

    if digits.is_empty() {
        return Ok(0);
    }

    u128::from_str_radix(digits, 16)
        .map_err(|e| TransferError::Codec(format!("invalid quantity {value:?}: {e}")))
}

pub fn parse_quantity_u64(value: &str) -> Result<u64> {
    let n = parse_quantity(value)?;
    u64::try_from(n).map_err(|_| TransferError::Codec(format!("quantity {value} exceeds u64")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert_eq!(parse_quantity("0x5208").unwrap(), 21_000);
        assert_eq!(parse_quantity_u64("0x3b9aca00").unwrap(), 1_000_000_000);
        assert!(parse_quantity("5208").is_err());
        assert!(parse_quantity("0xzz").is_err());
        assert!(parse_quantity_u64("0x10000000000000000").is_err());
    }

    #[test]
    fn call_request_json() {
        let req = CallRequest {
            from: "0x01".into(),
            to: "0x02".into(),
            value: U256::from(255u64),
            data: vec![0xa9, 0x05],
        };
        let json = req.to_json();
        assert_eq!(json["value"], "0xff");
        assert_eq!(json["data"], "0xa905");
    }

    #[test]
    fn confirmation_status_orders_by_strength() {
        assert!(ConfirmationStatus::Finalized > ConfirmationStatus::Confirmed);
        assert!(ConfirmationStatus::Confirmed > ConfirmationStatus::Processed);
    }
}
