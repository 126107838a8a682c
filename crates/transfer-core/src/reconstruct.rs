//! Turns a call payload plus the wallet's raw signature into a
//! broadcastable transaction.

use tracing::debug;

use crate::error::{Result, TransferError};
use crate::payload::CallPayload;
use crate::state::TxStateMachine;

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructedTx {
    pub raw_tx: Vec<u8>,
    /// Hex hash for EVM, base58 first signature for Solana.
    pub tx_id: String,
}

/// Combine `payload` with `signature`.
///
/// EVM signatures must be exactly 65 bytes `r || s || v`. Solana signatures
/// longer than 64 bytes are truncated; shorter ones are rejected. `signer`
/// is the Solana fee payer the signature belongs to and is ignored for EVM.
pub fn reconstruct(payload: &CallPayload, signature: &[u8], signer: &str) -> Result<ReconstructedTx> {
    payload.validate()?;

    let tx = match payload {
        CallPayload::Solana(sol) => {
            let signer = chain_sol::address_to_bytes(signer)?;
            let signed = chain_sol::attach_signature(&sol.call_payload, &signer, signature)?;
            ReconstructedTx {
                raw_tx: signed.raw_tx,
                tx_id: signed.signature,
            }
        }
        evm => {
            let signed = chain_eth::reconstruct_signed(evm.unsigned_payload(), signature)?;
            ReconstructedTx {
                raw_tx: signed.raw_tx,
                tx_id: signed.tx_hash,
            }
        }
    };

    debug!(chain = %payload.chain(), tx_id = %tx.tx_id, "reconstructed signed transaction");
    Ok(tx)
}

/// Reconstruct from a record's own call payload and signature.
pub fn reconstruct_record(record: &TxStateMachine) -> Result<ReconstructedTx> {
    let payload = record
        .call_payload
        .as_ref()
        .ok_or_else(|| TransferError::Validation("record has no call payload".into()))?;
    let signature = record
        .signed_call_payload
        .as_deref()
        .ok_or_else(|| TransferError::Validation("record has no signed call payload".into()))?;

    reconstruct(payload, signature, &record.sender_address)
}
