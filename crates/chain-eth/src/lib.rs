//! Ethereum/EVM chain support for the transfer protocol.
//!
//! This crate provides:
//! - Ethereum address validation, EIP-55 checksums and public-key derivation
//! - EIP-1559 and EIP-155 legacy unsigned transaction encoding and digests
//! - Signature reconstruction (recovery-id normalization) and signer recovery
//! - ERC-20 `transfer` call encoding
//! - Definitions of the EVM networks the protocol builds transactions for

pub mod abi;
pub mod address;
pub mod chains;
pub mod erc20;
pub mod error;
pub mod transaction;

pub use error::EthError;
pub use transaction::{
    build_transaction, decode_unsigned, encode_unsigned, reconstruct_signed, recover_signer,
    signing_payload, FeeParams, SignedEthTransaction, SigningPayload, TransferCall, TxType,
    UnsignedTransaction,
};
