use thiserror::Error;

use crate::state::StatusTag;
use crate::types::Chain;

/// Broad classes of failure the caller reacts to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input: addresses, token/network mismatch, missing contract code.
    Validation,
    /// A chain or relay endpoint failed or rejected the request.
    ChainRpc,
    /// The wallet failed to sign, or the user declined.
    WalletInteraction,
    /// Bytes that cannot be encoded, decoded or reconstructed.
    Codec,
    /// An operation not allowed in the record's current status.
    State,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(Chain),

    #[error("Token belongs to {token}, but the sender network is {network}")]
    TokenNetworkMismatch { token: Chain, network: Chain },

    #[error("No contract code at {0}")]
    NoContractCode(String),

    #[error("{method} failed: {message}")]
    Rpc {
        method: String,
        code: Option<i64>,
        message: String,
    },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("User rejected the request")]
    UserRejected,

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Cannot {operation} while status is {status:?}")]
    InvalidTransition {
        status: StatusTag,
        operation: &'static str,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Validation(_)
            | TransferError::UnsupportedChain(_)
            | TransferError::TokenNetworkMismatch { .. }
            | TransferError::NoContractCode(_)
            | TransferError::Config(_) => ErrorKind::Validation,
            TransferError::Rpc { .. }
            | TransferError::HttpStatus { .. }
            | TransferError::Transport(_) => ErrorKind::ChainRpc,
            TransferError::UserRejected | TransferError::Wallet(_) => {
                ErrorKind::WalletInteraction
            }
            TransferError::Codec(_) | TransferError::Io(_) => ErrorKind::Codec,
            TransferError::InvalidTransition { .. } => ErrorKind::State,
        }
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Transport faults, rate limits and server-side hiccups are transient.
    /// Rejections such as "nonce too low" or "insufficient funds" are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferError::Transport(_) => true,
            TransferError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            TransferError::Rpc { code, message, .. } => rpc_is_retryable(*code, message),
            _ => false,
        }
    }

    pub(crate) fn transition(status: StatusTag, operation: &'static str) -> Self {
        TransferError::InvalidTransition { status, operation }
    }
}

/// Whether a JSON-RPC error object describes a transient condition.
pub(crate) fn rpc_is_retryable(code: Option<i64>, message: &str) -> bool {
    // -32005: limit exceeded (EIP-1474).
    if code == Some(-32005) {
        return true;
    }
    let message = message.to_lowercase();
    ["rate limit", "too many requests", "timeout", "timed out", "temporarily"]
        .iter()
        .any(|pattern| message.contains(pattern))
}

impl From<chain_eth::EthError> for TransferError {
    fn from(e: chain_eth::EthError) -> Self {
        use chain_eth::EthError;

        match e {
            EthError::InvalidAddress(_)
            | EthError::InvalidPublicKey(_)
            | EthError::TransactionBuildError(_)
            | EthError::InvalidSignature(_)
            | EthError::UnsupportedChain(_) => TransferError::Validation(format!("ETH: {e}")),
            _ => TransferError::Codec(format!("ETH: {e}")),
        }
    }
}

impl From<chain_sol::SolError> for TransferError {
    fn from(e: chain_sol::SolError) -> Self {
        use chain_sol::SolError;

        match e {
            SolError::InvalidAddress(_)
            | SolError::InvalidPublicKey(_)
            | SolError::TransactionBuildError(_)
            | SolError::InvalidSignature(_) => TransferError::Validation(format!("SOL: {e}")),
            _ => TransferError::Codec(format!("SOL: {e}")),
        }
    }
}

impl From<serde_json::Error> for TransferError {
    fn from(e: serde_json::Error) -> Self {
        TransferError::Codec(e.to_string())
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransferError::Codec(format!("response decode failed: {e}"))
        } else {
            TransferError::Transport(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
