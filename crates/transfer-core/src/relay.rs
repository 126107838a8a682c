//! Client for the relay that distributes transfer records between sender
//! and receiver.
//!
//! Every record crosses this boundary in its wire form.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::Result;
use crate::rpc::JsonRpcClient;
use crate::state::TxStateMachine;
use crate::wire::{from_wire, to_wire};

#[async_trait]
pub trait RelayRpc: Send + Sync {
    async fn initiate_transaction(&self, record: &TxStateMachine) -> Result<()>;

    async fn sender_confirm(&self, record: &TxStateMachine) -> Result<()>;

    async fn receiver_confirm(&self, record: &TxStateMachine) -> Result<()>;

    async fn revert_transaction(&self, record: &TxStateMachine, reason: Option<&str>)
        -> Result<()>;

    /// Records involving `address` that changed since the last fetch.
    async fn fetch_pending_tx_updates(&self, address: &str) -> Result<Vec<TxStateMachine>>;
}

/// [`RelayRpc`] over the relay's JSON-RPC endpoint.
#[derive(Debug)]
pub struct HttpRelayClient {
    rpc: JsonRpcClient,
}

impl HttpRelayClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(url, timeout)?,
        })
    }

    async fn push(&self, method: &str, record: &TxStateMachine) -> Result<()> {
        let _: Value = self.rpc.call(method, json!([to_wire(record)?])).await?;
        info!(method, tx_nonce = record.tx_nonce, status = ?record.status_tag(), "record sent to relay");
        Ok(())
    }
}

#[async_trait]
impl RelayRpc for HttpRelayClient {
    async fn initiate_transaction(&self, record: &TxStateMachine) -> Result<()> {
        self.push("initiateTransaction", record).await
    }

    async fn sender_confirm(&self, record: &TxStateMachine) -> Result<()> {
        self.push("senderConfirm", record).await
    }

    async fn receiver_confirm(&self, record: &TxStateMachine) -> Result<()> {
        self.push("receiverConfirm", record).await
    }

    async fn revert_transaction(
        &self,
        record: &TxStateMachine,
        reason: Option<&str>,
    ) -> Result<()> {
        let params = json!([to_wire(record)?, reason]);
        let _: Value = self.rpc.call("revertTransaction", params).await?;
        info!(tx_nonce = record.tx_nonce, ?reason, "revert sent to relay");
        Ok(())
    }

    async fn fetch_pending_tx_updates(&self, address: &str) -> Result<Vec<TxStateMachine>> {
        let wires: Vec<Value> = self
            .rpc
            .call("fetchPendingTxUpdates", json!([address]))
            .await?;
        debug!(address, count = wires.len(), "fetched pending updates");

        let mut records = wires
            .into_iter()
            .map(from_wire)
            .collect::<Result<Vec<_>>>()?;
        sort_pending_updates(&mut records);
        Ok(records)
    }
}

/// Order updates so records still awaiting action come first, by protocol
/// stage, then by `tx_nonce`. Finished records go last.
pub fn sort_pending_updates(records: &mut [TxStateMachine]) {
    records.sort_by_key(|r| {
        let tag = r.status_tag();
        (tag.is_terminal(), tag, r.tx_nonce)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{NewTransfer, StatusTag};
    use crate::types::{Chain, Token};
    use alloy_primitives::U256;

    fn record(tx_nonce: u32) -> TxStateMachine {
        TxStateMachine::initiate(NewTransfer {
            tx_nonce,
            sender_address: "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".into(),
            receiver_address: "0x000000000000000000000000000000000000dEaD".into(),
            sender_address_network: Chain::Base,
            receiver_address_network: Chain::Base,
            amount: U256::from(5u64),
            token: Token::native(Chain::Base),
            code_word: "amber".into(),
        })
        .unwrap()
    }

    #[test]
    fn sort_puts_live_records_first() {
        let reverted = record(1).revert("user cancelled".into()).unwrap();
        let confirmed = record(2)
            .set_receiver_signature(vec![1; 64])
            .and_then(|r| r.recv_addr_confirmed())
            .unwrap();
        let genesis_late = record(9);
        let genesis_early = record(3);

        let mut records = vec![reverted, confirmed, genesis_late, genesis_early];
        sort_pending_updates(&mut records);

        let order: Vec<(StatusTag, u32)> =
            records.iter().map(|r| (r.status_tag(), r.tx_nonce)).collect();
        assert_eq!(
            order,
            vec![
                (StatusTag::Genesis, 3),
                (StatusTag::Genesis, 9),
                (StatusTag::RecvAddrConfirmed, 2),
                (StatusTag::Reverted, 1),
            ]
        );
    }

    #[test]
    fn client_rejects_bad_url() {
        assert!(HttpRelayClient::new("relay", Duration::from_secs(1)).is_err());
    }
}
