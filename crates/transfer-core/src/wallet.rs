//! Boundary to the sender's external wallet.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{Result, TransferError};
use crate::state::TxStateMachine;

/// Signs raw bytes with the sender's key: a 32-byte digest on EVM chains,
/// the serialized message on Solana.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn sign(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Messages wallets use when the user declines a request.
const REJECTION_PATTERNS: &[&str] = &[
    "user rejected",
    "user denied",
    "user cancelled",
    "user canceled",
    "rejected the request",
    "request rejected",
    // EIP-1193 userRejectedRequest.
    "code 4001",
    "code: 4001",
    "\"code\":4001",
];

/// Whether a wallet error message means the user declined to sign.
pub fn is_user_rejection(message: &str) -> bool {
    let message = message.to_lowercase();
    REJECTION_PATTERNS.iter().any(|p| {
        message.match_indices(p).any(|(at, _)| {
            !message[at + p.len()..].starts_with(|c: char| c.is_ascii_digit())
        })
    })
}

/// Result of asking the wallet to sign a prepared transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum SigningOutcome {
    /// The record now carries the signature.
    Signed(TxStateMachine),
    /// The user declined; the record is unchanged and can be signed again.
    Cancelled(TxStateMachine),
}

/// Ask `signer` to sign the record's call payload.
///
/// A user rejection is not an error: it yields [`SigningOutcome::Cancelled`]
/// with the record as it was before the request.
pub async fn sign_call_payload<S>(record: &TxStateMachine, signer: &S) -> Result<SigningOutcome>
where
    S: WalletSigner + ?Sized,
{
    let payload = record
        .call_payload
        .as_ref()
        .ok_or_else(|| TransferError::Validation("nothing to sign: no call payload".into()))?;

    match signer.sign(payload.signable_bytes()).await {
        Ok(signature) => {
            info!(tx_nonce = record.tx_nonce, len = signature.len(), "wallet signed call payload");
            Ok(SigningOutcome::Signed(record.set_signed_call_payload(signature)?))
        }
        Err(e) if is_rejection(&e) => {
            warn!(tx_nonce = record.tx_nonce, error = %e, "user declined to sign");
            Ok(SigningOutcome::Cancelled(record.clone()))
        }
        Err(e) => Err(e),
    }
}

fn is_rejection(err: &TransferError) -> bool {
    match err {
        TransferError::UserRejected => true,
        TransferError::Wallet(message) => is_user_rejection(message),
        _ => false,
    }
}
