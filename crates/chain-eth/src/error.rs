use thiserror::Error;

/// Ethereum chain operation errors.
#[derive(Debug, Error)]
pub enum EthError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    /// The serialized payload does not carry the type marker its fields
    /// demand. Never expected in correct operation.
    #[error("type marker mismatch: expected {expected}, found 0x{found:02x}")]
    TypeMarkerMismatch { expected: &'static str, found: u8 },

    #[error("unsupported chain: {0}")]
    UnsupportedChain(u64),
}

impl From<alloy_rlp::Error> for EthError {
    fn from(e: alloy_rlp::Error) -> Self {
        EthError::EncodingError(format!("rlp: {e}"))
    }
}
