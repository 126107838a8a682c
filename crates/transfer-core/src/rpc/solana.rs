use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AccountInfo, ConfirmationStatus, JsonRpcClient, LatestBlockhash, SignatureStatus, SolanaRpc};
use crate::config::Commitment;
use crate::error::{Result, TransferError};

// ---------------------------------------------------------------------------
// Solana RPC response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
struct AccountValue {
    /// `[data, encoding]`
    data: (String, String),
    owner: String,
    lamports: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusValue {
    confirmation_status: Option<ConfirmationStatus>,
    err: Option<Value>,
}

/// [`SolanaRpc`] over a Solana JSON-RPC endpoint.
#[derive(Debug)]
pub struct HttpSolanaRpc {
    rpc: JsonRpcClient,
    commitment: Commitment,
    max_retries: Option<usize>,
}

impl HttpSolanaRpc {
    pub fn new(
        url: &str,
        timeout: Duration,
        commitment: Commitment,
        max_retries: Option<usize>,
    ) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(url, timeout)?,
            commitment,
            max_retries,
        })
    }

    fn commitment_config(&self) -> Value {
        json!({ "commitment": self.commitment.as_str() })
    }
}

fn decode_pubkey(field: &str, value: &str) -> Result<[u8; 32]> {
    chain_sol::address_to_bytes(value)
        .map_err(|e| TransferError::Codec(format!("{field}: {e}")))
}

#[async_trait]
impl SolanaRpc for HttpSolanaRpc {
    async fn latest_blockhash(&self) -> Result<LatestBlockhash> {
        let resp: WithContext<BlockhashValue> = self
            .rpc
            .call("getLatestBlockhash", json!([self.commitment_config()]))
            .await?;

        Ok(LatestBlockhash {
            blockhash: decode_pubkey("blockhash", &resp.value.blockhash)?,
            last_valid_block_height: resp.value.last_valid_block_height,
        })
    }

    async fn account_info(&self, address: &[u8; 32]) -> Result<Option<AccountInfo>> {
        let params = json!([
            chain_sol::bytes_to_address(address),
            { "encoding": "base64", "commitment": self.commitment.as_str() }
        ]);
        let resp: WithContext<Option<AccountValue>> =
            self.rpc.call("getAccountInfo", params).await?;

        let Some(account) = resp.value else {
            return Ok(None);
        };

        let (encoded, encoding) = &account.data;
        if encoding != "base64" {
            return Err(TransferError::Codec(format!(
                "getAccountInfo returned {encoding} data"
            )));
        }
        let data = STANDARD
            .decode(encoded)
            .map_err(|e| TransferError::Codec(format!("account data: {e}")))?;

        Ok(Some(AccountInfo {
            owner: decode_pubkey("owner", &account.owner)?,
            lamports: account.lamports,
            data,
        }))
    }

    async fn fee_for_message(&self, message: &[u8]) -> Result<Option<u64>> {
        let params = json!([STANDARD.encode(message), self.commitment_config()]);
        let resp: WithContext<Option<u64>> = self.rpc.call("getFeeForMessage", params).await?;
        Ok(resp.value)
    }

    async fn send_transaction(&self, raw_tx: &[u8]) -> Result<String> {
        let mut config = json!({
            "encoding": "base64",
            "preflightCommitment": self.commitment.as_str(),
        });
        if let Some(max_retries) = self.max_retries {
            config["maxRetries"] = json!(max_retries);
        }

        self.rpc
            .call("sendTransaction", json!([STANDARD.encode(raw_tx), config]))
            .await
    }

    async fn signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>> {
        let params = json!([[signature], { "searchTransactionHistory": false }]);
        let resp: WithContext<Vec<Option<StatusValue>>> =
            self.rpc.call("getSignatureStatuses", params).await?;

        Ok(resp.value.into_iter().next().flatten().map(|s| SignatureStatus {
            confirmation_status: s.confirmation_status,
            err: s.err.map(|e| e.to_string()),
        }))
    }

    async fn block_height(&self) -> Result<u64> {
        self.rpc
            .call("getBlockHeight", json!([self.commitment_config()]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_value_parses_rpc_shape() {
        let json = json!({
            "context": { "slot": 1 },
            "value": {
                "data": ["AQID", "base64"],
                "executable": false,
                "lamports": 1461600,
                "owner": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
                "rentEpoch": 0
            }
        });
        let resp: WithContext<Option<AccountValue>> = serde_json::from_value(json).unwrap();
        let account = resp.value.unwrap();
        assert_eq!(STANDARD.decode(&account.data.0).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            decode_pubkey("owner", &account.owner).unwrap(),
            chain_sol::TOKEN_PROGRAM_ID
        );
    }

    #[test]
    fn missing_account_is_none() {
        let json = json!({ "context": { "slot": 1 }, "value": null });
        let resp: WithContext<Option<AccountValue>> = serde_json::from_value(json).unwrap();
        assert!(resp.value.is_none());
    }

    #[test]
    fn signature_status_parses() {
        let json = json!({
            "context": { "slot": 1 },
            "value": [{ "slot": 5, "confirmations": null, "err": null, "confirmationStatus": "finalized" }]
        });
        let resp: WithContext<Vec<Option<StatusValue>>> = serde_json::from_value(json).unwrap();
        let status = resp.value[0].as_ref().unwrap();
        assert_eq!(status.confirmation_status, Some(ConfirmationStatus::Finalized));
        assert!(status.err.is_none());
    }
}
