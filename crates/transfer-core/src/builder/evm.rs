//! Unsigned transaction preparation for EVM networks.
//!
//! EIP-1559 chains get a type-2 envelope. BNB Smart Chain gets an EIP-155
//! legacy envelope. Either way the wallet signs the Keccak-256 digest of the
//! serialized unsigned transaction.

use chain_eth::{build_transaction, signing_payload, FeeParams, TransferCall, TxType};
use tracing::{debug, info, warn};

use crate::display::fee_to_display;
use crate::error::{Result, TransferError};
use crate::payload::CallPayload;
use crate::rpc::{CallRequest, EvmRpc};
use crate::state::TxStateMachine;
use crate::types::ChainFamily;

/// Multiplier applied to the latest base fee for `maxFeePerGas`, leaving
/// room for the base fee to rise over a few blocks.
const BASE_FEE_MULTIPLIER: u128 = 2;

/// Build the call payload and fee estimate for an EVM transfer.
///
/// Token transfers first check that the token contract has code; an address
/// without code fails before any gas estimation is attempted. Nonce, gas and
/// fee data are then fetched concurrently.
pub async fn build_evm_call_payload<R>(record: &TxStateMachine, rpc: &R) -> Result<TxStateMachine>
where
    R: EvmRpc + ?Sized,
{
    record.validate()?;
    let chain = record.sender_address_network;
    let ChainFamily::Evm(evm) = chain.family()? else {
        return Err(TransferError::Validation(format!("{chain} is not an EVM chain")));
    };

    chain.validate_address(&record.sender_address)?;
    chain.validate_address(&record.receiver_address)?;

    let call = match record.token.as_fungible() {
        None => TransferCall::native(&record.receiver_address, record.amount)?,
        Some(token) => {
            if token.address.is_empty() {
                return Err(TransferError::Validation(format!(
                    "{} has no contract address",
                    token.name
                )));
            }
            chain.validate_address(&token.address)?;

            let code = rpc.code_at(&token.address).await?;
            if code.is_empty() {
                return Err(TransferError::NoContractCode(token.address.clone()));
            }

            TransferCall::token(&token.address, &record.receiver_address, record.amount)?
        }
    };

    let request = CallRequest {
        from: record.sender_address.clone(),
        to: call.to.clone(),
        value: call.value,
        data: call.data.clone(),
    };

    let (nonce, gas_limit, fees) = tokio::try_join!(
        rpc.transaction_count(&record.sender_address),
        rpc.estimate_gas(&request),
        fee_params(rpc, evm.tx_type),
    )?;

    debug!(
        chain = %chain,
        nonce,
        gas_limit,
        ?fees,
        "fetched EVM transaction parameters"
    );

    let tx = build_transaction(evm.chain_id, nonce, gas_limit, call, fees);
    let signing = signing_payload(&tx)?;
    let payload = CallPayload::from_evm(chain, &tx, signing)?;

    let fee = fee_to_display(gas_limit, fees.max_price_per_gas(), evm.decimals);

    let next = record.set_call_payload(payload)?.set_fees_amount(fee)?;

    info!(
        tx_nonce = record.tx_nonce,
        chain = %chain,
        tx_type = ?evm.tx_type,
        fee,
        "prepared EVM call payload"
    );
    Ok(next)
}

/// Fetch fee parameters for the envelope the chain uses.
///
/// When an EIP-1559 chain's node does not answer the fee-market queries,
/// the legacy gas price is used for both fee fields. That overpays the tip
/// but always covers the base fee.
pub async fn fee_params<R>(rpc: &R, tx_type: TxType) -> Result<FeeParams>
where
    R: EvmRpc + ?Sized,
{
    match tx_type {
        TxType::Legacy => Ok(FeeParams::Legacy {
            gas_price: rpc.gas_price().await?,
        }),
        TxType::Eip1559 => {
            let market = tokio::try_join!(rpc.max_priority_fee_per_gas(), rpc.base_fee_per_gas());

            match market {
                Ok((priority, Some(base_fee))) => Ok(FeeParams::Eip1559 {
                    max_fee_per_gas: base_fee
                        .saturating_mul(BASE_FEE_MULTIPLIER)
                        .saturating_add(priority),
                    max_priority_fee_per_gas: priority,
                }),
                Ok((_, None)) => {
                    warn!("latest block has no base fee, falling back to gas price");
                    gas_price_fallback(rpc).await
                }
                Err(e @ TransferError::Rpc { .. }) => {
                    warn!(error = %e, "fee market query unsupported, falling back to gas price");
                    gas_price_fallback(rpc).await
                }
                Err(e) => Err(e),
            }
        }
    }
}

async fn gas_price_fallback<R>(rpc: &R) -> Result<FeeParams>
where
    R: EvmRpc + ?Sized,
{
    let gas_price = rpc.gas_price().await?;
    Ok(FeeParams::Eip1559 {
        max_fee_per_gas: gas_price,
        max_priority_fee_per_gas: gas_price,
    })
}
