//! Unsigned message preparation for Solana.
//!
//! The serialized v0 message is both what the wallet signs and the message
//! section of the broadcast transaction.

use alloy_primitives::U256;
use chain_sol::{
    build_create_associated_token_account_idempotent, build_system_transfer_instruction,
    build_transfer_checked, bytes_to_address, compile_message, derive_associated_token_address,
    parse_mint_decimals, serialize_message, SolInstruction, TokenProgram,
};
use tracing::{debug, info, warn};

use crate::display::fee_to_display;
use crate::error::{Result, TransferError};
use crate::payload::{CallPayload, SolanaCallPayload};
use crate::rpc::SolanaRpc;
use crate::state::TxStateMachine;
use crate::types::{Chain, FungibleToken};

/// Largest integer JSON clients represent exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

const LAMPORT_DECIMALS: u8 = 9;

/// Build the call payload and fee estimate for a Solana transfer.
pub async fn build_solana_call_payload<R>(
    record: &TxStateMachine,
    rpc: &R,
) -> Result<TxStateMachine>
where
    R: SolanaRpc + ?Sized,
{
    record.validate()?;
    if record.sender_address_network != Chain::Solana {
        return Err(TransferError::Validation(format!(
            "{} is not Solana",
            record.sender_address_network
        )));
    }

    let sender = chain_sol::wallet_address_to_bytes(&record.sender_address)?;
    let receiver = chain_sol::address_to_bytes(&record.receiver_address)?;
    let amount = base_units(record.amount)?;

    let (instructions, latest) = match record.token.as_fungible() {
        None => {
            let latest = rpc.latest_blockhash().await?;
            let ix = build_system_transfer_instruction(&sender, &receiver, amount);
            (vec![ix], latest)
        }
        Some(token) => {
            let mint = mint_address(token)?;
            let (latest, mint_account) =
                tokio::try_join!(rpc.latest_blockhash(), rpc.account_info(&mint))?;
            let mint_account = mint_account.ok_or_else(|| {
                TransferError::Validation(format!("mint {} not found", token.address))
            })?;

            let program = TokenProgram::from_owner(&mint_account.owner)?;
            let decimals = parse_mint_decimals(&mint_account.data)?;
            if decimals != token.decimals {
                warn!(
                    mint = %token.address,
                    expected = token.decimals,
                    on_chain = decimals,
                    "token decimals differ from mint, using mint"
                );
            }

            let instructions =
                spl_instructions(rpc, program, &sender, &receiver, &mint, amount, decimals)
                    .await?;
            (instructions, latest)
        }
    };

    let message = compile_message(&instructions, &sender, &latest.blockhash)?;
    let message_bytes = serialize_message(&message)?;

    let lamports = rpc.fee_for_message(&message_bytes).await?.ok_or_else(|| {
        TransferError::Rpc {
            method: "getFeeForMessage".into(),
            code: None,
            message: "blockhash expired before fee estimate".into(),
        }
    })?;
    let fee = fee_to_display(1, u128::from(lamports), LAMPORT_DECIMALS);

    let payload = CallPayload::Solana(SolanaCallPayload {
        call_payload: message_bytes,
        latest_block_height: latest.last_valid_block_height,
    });
    let next = record.set_call_payload(payload)?.set_fees_amount(fee)?;

    info!(
        tx_nonce = record.tx_nonce,
        instructions = instructions.len(),
        last_valid_block_height = latest.last_valid_block_height,
        fee_lamports = lamports,
        "prepared Solana call payload"
    );
    Ok(next)
}

/// Resolve both token accounts and build the transfer, creating the
/// receiver's account first when it does not exist yet.
async fn spl_instructions<R>(
    rpc: &R,
    program: TokenProgram,
    sender: &[u8; 32],
    receiver: &[u8; 32],
    mint: &[u8; 32],
    amount: u64,
    decimals: u8,
) -> Result<Vec<SolInstruction>>
where
    R: SolanaRpc + ?Sized,
{
    let source = derive_associated_token_address(sender, mint, program)?;
    let destination = derive_associated_token_address(receiver, mint, program)?;

    let (source_account, destination_account) =
        tokio::try_join!(rpc.account_info(&source), rpc.account_info(&destination))?;

    if source_account.is_none() {
        return Err(TransferError::Validation(format!(
            "sender has no token account {}",
            bytes_to_address(&source)
        )));
    }

    let mut instructions = Vec::with_capacity(2);
    if destination_account.is_none() {
        debug!(
            account = %bytes_to_address(&destination),
            "receiver token account missing, creating it"
        );
        instructions.push(build_create_associated_token_account_idempotent(
            program, sender, receiver, mint,
        )?);
    }
    instructions.push(build_transfer_checked(
        program,
        &source,
        mint,
        &destination,
        sender,
        amount,
        decimals,
    )?);

    Ok(instructions)
}

fn mint_address(token: &FungibleToken) -> Result<[u8; 32]> {
    if token.address.is_empty() {
        return Err(TransferError::Validation(format!(
            "{} has no mint address",
            token.name
        )));
    }
    Ok(chain_sol::address_to_bytes(&token.address)?)
}

/// Narrow a base-unit amount to u64, rejecting anything past the
/// safe-integer range instead of truncating.
pub fn base_units(amount: U256) -> Result<u64> {
    let value = u64::try_from(amount)
        .map_err(|_| TransferError::Validation(format!("amount {amount} exceeds u64")))?;
    if value > MAX_SAFE_INTEGER {
        return Err(TransferError::Validation(format!(
            "amount {amount} exceeds the safe integer range"
        )));
    }
    Ok(value)
}
