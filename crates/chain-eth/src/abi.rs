//! Minimal ABI encoding for EVM function calls.
//!
//! Only the static word types the token transfer path needs are supported.

/// A single ABI-encoded parameter.
#[derive(Debug, Clone)]
pub enum AbiParam {
    /// A 20-byte Ethereum address, left-padded to 32 bytes.
    Address([u8; 20]),
    /// A 256-bit unsigned integer as a big-endian 32-byte array.
    Uint256([u8; 32]),
}

/// Encodes a function call with the given 4-byte selector and ABI parameters.
///
/// The output is `selector || encode(params[0]) || encode(params[1]) || ...`
/// where each parameter is encoded as a 32-byte ABI word.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + params.len() * 32);
    data.extend_from_slice(&selector);

    for param in params {
        data.extend_from_slice(&encode_param(param));
    }

    data
}

/// Splits calldata into its selector and 32-byte argument words.
///
/// Returns `None` if the data is shorter than a selector or the argument
/// section is not word-aligned.
pub fn split_function_call(data: &[u8]) -> Option<([u8; 4], Vec<[u8; 32]>)> {
    if data.len() < 4 || (data.len() - 4) % 32 != 0 {
        return None;
    }

    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);

    let words = data[4..]
        .chunks_exact(32)
        .map(|chunk| {
            let mut word = [0u8; 32];
            word.copy_from_slice(chunk);
            word
        })
        .collect();

    Some((selector, words))
}

fn encode_param(param: &AbiParam) -> [u8; 32] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(addr);
            word
        }
        AbiParam::Uint256(value) => *value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_address_param() {
        let mut addr = [0u8; 20];
        addr[0] = 0xde;
        addr[19] = 0xad;

        let word = encode_param(&AbiParam::Address(addr));

        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], &addr);
    }

    #[test]
    fn encode_uint256_param() {
        let mut value = [0u8; 32];
        value[31] = 42;

        let word = encode_param(&AbiParam::Uint256(value));
        assert_eq!(word, value);
    }

    #[test]
    fn encode_function_call_with_selector_only() {
        let selector = [0xa9, 0x05, 0x9c, 0xbb];
        let data = encode_function_call(selector, &[]);

        assert_eq!(data, selector.to_vec());
    }

    #[test]
    fn encode_function_call_with_params() {
        let selector = [0xa9, 0x05, 0x9c, 0xbb];
        let mut addr = [0u8; 20];
        addr[19] = 0x01;

        let mut amount = [0u8; 32];
        amount[31] = 100;

        let params = [AbiParam::Address(addr), AbiParam::Uint256(amount)];
        let data = encode_function_call(selector, &params);

        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &selector);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(data[35], 0x01);
        assert_eq!(data[67], 100);
    }

    #[test]
    fn split_function_call_recovers_words() {
        let selector = [0xa9, 0x05, 0x9c, 0xbb];
        let data = encode_function_call(
            selector,
            &[AbiParam::Address([7u8; 20]), AbiParam::Uint256([9u8; 32])],
        );

        let (sel, words) = split_function_call(&data).unwrap();
        assert_eq!(sel, selector);
        assert_eq!(words.len(), 2);
        assert_eq!(&words[0][12..], &[7u8; 20]);
        assert_eq!(words[1], [9u8; 32]);
    }

    #[test]
    fn split_function_call_rejects_misaligned() {
        assert!(split_function_call(&[0xa9, 0x05]).is_none());
        assert!(split_function_call(&[0u8; 5]).is_none());
    }
}
