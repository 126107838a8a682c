//! Multi-chain transfer protocol core.
//!
//! A transfer moves through a verification protocol before anything is
//! broadcast:
//!
//! 1. The sender initiates a [`TxStateMachine`] record, which the relay
//!    distributes to the receiver.
//! 2. The receiver attests ownership of its address.
//! 3. A builder for the sender's network prepares the unsigned transaction
//!    and the bytes the wallet must sign.
//! 4. The sender's wallet signs; the signature is combined with the
//!    unsigned payload into a broadcastable transaction.
//! 5. The transaction is submitted and the record reaches a terminal status.
//!
//! EVM networks (EIP-1559, and EIP-155 legacy for BNB Smart Chain) and
//! Solana (v0 messages, SPL and Token-2022) are supported.

pub mod builder;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod payload;
pub mod reconstruct;
pub mod relay;
pub mod rpc;
pub mod state;
pub mod submit;
pub mod types;
pub mod wallet;
pub mod wire;

pub use builder::{prepare_call_payload, ChainClients};
pub use config::TransferConfig;
pub use error::{ErrorKind, Result, TransferError};
pub use payload::CallPayload;
pub use reconstruct::{reconstruct, ReconstructedTx};
pub use relay::{sort_pending_updates, HttpRelayClient, RelayRpc};
pub use state::{NewTransfer, StatusTag, TxStateMachine, TxStatus};
pub use submit::{confirm_transaction, submit, Confirmation};
pub use types::{Chain, FungibleToken, Token};
pub use wallet::{sign_call_payload, SigningOutcome, WalletSigner};
