//! Solana chain support for the transfer protocol.
//!
//! This crate builds v0 versioned messages for native SOL and SPL token
//! transfers and turns a wallet's raw Ed25519 signature into a broadcastable
//! transaction, all without pulling in `solana-sdk`.
//!
//! The compact binary wire format is implemented by hand; `ed25519-dalek`
//! is only used to verify signatures and `bs58` for Base58 encoding.

pub mod address;
pub mod error;
pub mod spl_token;
pub mod transaction;

pub use address::{address_to_bytes, bytes_to_address, validate_address, wallet_address_to_bytes};
pub use error::SolError;
pub use spl_token::{
    build_create_associated_token_account_idempotent, build_transfer_checked,
    derive_associated_token_address, parse_mint_decimals, TokenProgram,
    ASSOCIATED_TOKEN_PROGRAM_ID, MINT_ACCOUNT_LEN, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
pub use transaction::{
    attach_signature, build_sol_transfer, build_system_transfer_instruction, compile_message,
    decode_compact_u16, deserialize_message, encode_compact_u16, serialize_message,
    split_transaction, verify_transaction, CompiledInstruction, MessageVersion,
    SignedSolTransaction, SolAccountMeta, SolInstruction, VersionedMessage, SIGNATURE_LEN,
    SYSTEM_PROGRAM_ID,
};
