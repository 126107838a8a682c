use thiserror::Error;

/// Solana chain operation errors.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("unsupported message version: {0}")]
    UnsupportedMessageVersion(u8),

    #[error("invalid account data: {0}")]
    InvalidAccountData(String),
}
