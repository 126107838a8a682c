//! Broadcast of signed transfers and Solana confirmation polling.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::builder::ChainClients;
use crate::error::{rpc_is_retryable, Result, TransferError};
use crate::reconstruct::reconstruct_record;
use crate::rpc::{ConfirmationStatus, SolanaRpc};
use crate::state::TxStateMachine;
use crate::types::ChainFamily;

/// Outcome of waiting for a Solana signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed(ConfirmationStatus),
    /// Landed but failed on-chain.
    Failed(String),
    /// The blockhash expired before the transaction was seen.
    Expired,
}

/// Reconstruct the signed transaction and broadcast it on the sender's
/// network.
///
/// A node that already holds the transaction counts as success with the
/// locally computed id. Deterministic JSON-RPC rejections become
/// `FailedToSubmitTxn` with the node's message verbatim. Anything else,
/// transport faults and HTTP status errors included, is returned as `Err`
/// with the record left pending so the caller can retry it.
pub async fn submit(record: &TxStateMachine, clients: &ChainClients) -> Result<TxStateMachine> {
    let pending = record.set_submission_pending()?;
    let tx = reconstruct_record(&pending)?;
    let chain = pending.sender_address_network;

    let sent = match chain.family()? {
        ChainFamily::Evm(_) => clients.evm(chain)?.send_raw_transaction(&tx.raw_tx).await,
        ChainFamily::Solana => clients.solana()?.send_transaction(&tx.raw_tx).await,
    };

    match sent {
        Ok(id) => {
            if id != tx.tx_id {
                warn!(expected = %tx.tx_id, returned = %id, "node returned a different transaction id");
            }
            info!(tx_nonce = pending.tx_nonce, chain = %chain, tx_id = %id, "transaction broadcast");
            pending.set_tx_submission_passed(id)
        }
        Err(TransferError::Rpc { message, .. }) if is_duplicate_broadcast(&message) => {
            info!(tx_nonce = pending.tx_nonce, chain = %chain, tx_id = %tx.tx_id, %message, "node already has the transaction");
            pending.set_tx_submission_passed(tx.tx_id)
        }
        Err(TransferError::Rpc { code, message, .. }) if !rpc_is_retryable(code, &message) => {
            warn!(tx_nonce = pending.tx_nonce, chain = %chain, reason = %message, "broadcast rejected");
            pending.set_tx_submission_failed(message)
        }
        Err(e) => {
            warn!(tx_nonce = pending.tx_nonce, chain = %chain, error = %e, "broadcast failed, record left pending");
            Err(e)
        }
    }
}

/// Replies a node gives when it already holds the exact signed transaction.
const DUPLICATE_BROADCAST_PATTERNS: &[&str] = &[
    "already known",
    "known transaction",
    "already imported",
    "already been processed",
    "alreadyprocessed",
];

/// Whether a broadcast rejection only says the transaction was seen before.
///
/// "nonce too low" is not included: another transaction may hold the nonce.
pub fn is_duplicate_broadcast(message: &str) -> bool {
    let message = message.to_lowercase();
    DUPLICATE_BROADCAST_PATTERNS
        .iter()
        .any(|p| message.contains(p))
}

/// Poll a Solana signature until it reaches `Confirmed` or the current block
/// height passes `last_valid_block_height`.
pub async fn confirm_transaction<R>(
    rpc: &R,
    signature: &str,
    last_valid_block_height: u64,
    poll_interval: Duration,
) -> Result<Confirmation>
where
    R: SolanaRpc + ?Sized,
{
    loop {
        if let Some(status) = rpc.signature_status(signature).await? {
            if let Some(err) = status.err {
                return Ok(Confirmation::Failed(err));
            }
            match status.confirmation_status {
                Some(level) if level >= ConfirmationStatus::Confirmed => {
                    info!(signature, ?level, "transaction confirmed");
                    return Ok(Confirmation::Confirmed(level));
                }
                level => debug!(signature, ?level, "waiting for confirmation"),
            }
        }

        let height = rpc.block_height().await?;
        if height > last_valid_block_height {
            warn!(signature, height, last_valid_block_height, "blockhash expired");
            return Ok(Confirmation::Expired);
        }

        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{AccountInfo, LatestBlockhash, SignatureStatus};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedRpc {
        statuses: Mutex<Vec<Option<SignatureStatus>>>,
        heights: Mutex<Vec<u64>>,
    }

    impl ScriptedRpc {
        fn new(statuses: Vec<Option<SignatureStatus>>, heights: Vec<u64>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                heights: Mutex::new(heights),
            }
        }
    }

    #[async_trait]
    impl SolanaRpc for ScriptedRpc {
        async fn latest_blockhash(&self) -> Result<LatestBlockhash> {
            unimplemented!()
        }
        async fn account_info(&self, _: &[u8; 32]) -> Result<Option<AccountInfo>> {
            unimplemented!()
        }
        async fn fee_for_message(&self, _: &[u8]) -> Result<Option<u64>> {
            unimplemented!()
        }
        async fn send_transaction(&self, _: &[u8]) -> Result<String> {
            unimplemented!()
        }
        async fn signature_status(&self, _: &str) -> Result<Option<SignatureStatus>> {
            Ok(self.statuses.lock().unwrap().remove(0))
        }
        async fn block_height(&self) -> Result<u64> {
            Ok(self.heights.lock().unwrap().remove(0))
        }
    }

    fn status(level: ConfirmationStatus) -> Option<SignatureStatus> {
        Some(SignatureStatus {
            confirmation_status: Some(level),
            err: None,
        })
    }

    #[tokio::test]
    async fn waits_until_confirmed() {
        let rpc = ScriptedRpc::new(
            vec![None, status(ConfirmationStatus::Processed), status(ConfirmationStatus::Confirmed)],
            vec![10, 11],
        );
        let outcome = confirm_transaction(&rpc, "sig", 100, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(outcome, Confirmation::Confirmed(ConfirmationStatus::Confirmed));
    }

    #[tokio::test]
    async fn expires_past_last_valid_height() {
        let rpc = ScriptedRpc::new(vec![None, None], vec![99, 101]);
        let outcome = confirm_transaction(&rpc, "sig", 100, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(outcome, Confirmation::Expired);
    }

    #[tokio::test]
    async fn on_chain_error_is_reported() {
        let failed = Some(SignatureStatus {
            confirmation_status: Some(ConfirmationStatus::Confirmed),
            err: Some("InstructionError".into()),
        });
        let rpc = ScriptedRpc::new(vec![failed], vec![]);
        let outcome = confirm_transaction(&rpc, "sig", 100, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(outcome, Confirmation::Failed("InstructionError".into()));
    }

    #[test]
    fn duplicate_broadcast_replies() {
        assert!(is_duplicate_broadcast("already known"));
        assert!(is_duplicate_broadcast("Known transaction: 0xabc"));
        assert!(is_duplicate_broadcast(
            "Transaction simulation failed: This transaction has already been processed"
        ));
        assert!(!is_duplicate_broadcast("nonce too low"));
        assert!(!is_duplicate_broadcast("insufficient funds for gas * price + value"));
    }
}
