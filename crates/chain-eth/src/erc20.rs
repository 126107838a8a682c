use alloy_primitives::U256;

use crate::abi::{encode_function_call, split_function_call, AbiParam};
use crate::address::{format_address, parse_address};
use crate::error::EthError;

/// Function selector for `transfer(address,uint256)`: `0xa9059cbb`.
///
/// BEP-20 tokens on BNB Smart Chain share the same ABI.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Encodes an ERC-20 `transfer(address,uint256)` call.
///
/// # Parameters
///
/// - `to`: The recipient address (0x-prefixed hex string).
/// - `amount`: The transfer amount in the token's base units.
///
/// # Returns
///
/// The complete calldata (4-byte selector + 64 bytes of ABI-encoded params).
pub fn encode_transfer(to: &str, amount: U256) -> Result<Vec<u8>, EthError> {
    let addr = parse_address(to)?;
    let params = [
        AbiParam::Address(addr),
        AbiParam::Uint256(amount.to_be_bytes::<32>()),
    ];
    Ok(encode_function_call(TRANSFER_SELECTOR, &params))
}

/// Decodes `transfer(address,uint256)` calldata into `(recipient, amount)`.
pub fn decode_transfer(data: &[u8]) -> Result<(String, U256), EthError> {
    let (selector, words) = split_function_call(data).ok_or_else(|| {
        EthError::EncodingError(format!("malformed calldata of {} bytes", data.len()))
    })?;

    if selector != TRANSFER_SELECTOR || words.len() != 2 {
        return Err(EthError::EncodingError(
            "calldata is not an ERC-20 transfer".into(),
        ));
    }

    if words[0][..12].iter().any(|&b| b != 0) {
        return Err(EthError::EncodingError(
            "address word has non-zero padding".into(),
        ));
    }

    let mut addr = [0u8; 20];
    addr.copy_from_slice(&words[0][12..]);

    Ok((format_address(&addr), U256::from_be_bytes(words[1])))
}
