//! Solana address handling.
//!
//! Solana addresses are Base58-encoded 32-byte values. Wallet addresses are
//! Ed25519 public keys and therefore lie on the curve; program-derived
//! addresses (such as associated token accounts) deliberately do not.

use crate::error::SolError;

/// Validate a Solana address string.
///
/// A valid Solana address is a Base58-encoded string that decodes to exactly
/// 32 bytes.
pub fn validate_address(address: &str) -> Result<bool, SolError> {
    address_to_bytes(address).map(|_| true)
}

/// Decode a Solana address string to its 32-byte representation.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], SolError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })?;

    Ok(arr)
}

/// Encode 32 bytes as a Solana address (Base58 string).
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decodes an address that must be able to sign or own token accounts,
/// i.e. an Ed25519 public key rather than a program-derived address.
pub fn wallet_address_to_bytes(address: &str) -> Result<[u8; 32], SolError> {
    let bytes = address_to_bytes(address)?;
    if !is_on_curve(&bytes) {
        return Err(SolError::InvalidPublicKey(format!(
            "{address} is not an Ed25519 public key"
        )));
    }
    Ok(bytes)
}

/// Check if 32 bytes represent a valid Ed25519 curve point.
pub(crate) fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_program_address() {
        assert_eq!(bytes_to_address(&[0u8; 32]), "11111111111111111111111111111111");
    }

    #[test]
    fn roundtrip_encode_decode() {
        let address = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
        let bytes = address_to_bytes(address).unwrap();
        assert_eq!(bytes_to_address(&bytes), address);
    }

    #[test]
    fn validate_garbage_returns_error() {
        assert!(validate_address("not-a-valid-address!!!").is_err());
    }

    #[test]
    fn validate_too_short_returns_error() {
        // "1" decodes to a single zero byte.
        assert!(validate_address("1").is_err());
    }

    #[test]
    fn wallet_address_accepts_real_pubkey() {
        let key = ed25519_dalek::SigningKey::from_bytes(&[0x42u8; 32]);
        let address = bytes_to_address(&key.verifying_key().to_bytes());
        assert!(wallet_address_to_bytes(&address).is_ok());
    }

    #[test]
    fn wallet_address_rejects_off_curve_bytes() {
        // 0x02 repeated is not a valid compressed Edwards point.
        let address = bytes_to_address(&[0x02; 32]);
        assert!(wallet_address_to_bytes(&address).is_err());
    }

    #[test]
    fn is_on_curve_accepts_basepoint() {
        let basepoint: [u8; 32] = [
            0x58, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
            0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
            0x66, 0x66, 0x66, 0x66,
        ];
        assert!(is_on_curve(&basepoint));
    }
}
