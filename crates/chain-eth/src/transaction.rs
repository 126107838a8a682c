//! Unsigned EVM transaction encoding, signing digests and signature
//! reconstruction.
//!
//! Two envelopes are supported:
//!
//! ```text
//! EIP-1559 signing payload:  0x02 || rlp([chain_id, nonce, max_priority_fee,
//!                                         max_fee, gas_limit, to, value, data,
//!                                         access_list])
//! EIP-1559 signed:           0x02 || rlp([...same nine fields..., y_parity, r, s])
//!
//! EIP-155 signing payload:   rlp([nonce, gas_price, gas_limit, to, value, data,
//!                                 chain_id, 0, 0])
//! EIP-155 signed:            rlp([nonce, gas_price, gas_limit, to, value, data,
//!                                 v, r, s])     v = chain_id * 2 + 35 + parity
//! ```
//!
//! The wallet only ever sees the Keccak-256 digest of the signing payload.
//! The payload itself travels with the transfer record so the signed
//! transaction can be rebuilt from the wallet's 65-byte `r || s || v`.

use alloy_primitives::U256;
use alloy_rlp::{Decodable, Encodable, Header, RlpDecodable, RlpEncodable};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::address::{format_address, parse_address, verifying_key_to_address};
use crate::erc20;
use crate::error::EthError;

/// EIP-2718 type byte of an EIP-1559 transaction.
pub const EIP1559_TX_TYPE: u8 = 0x02;

/// Length of a wallet signature: `r[32] || s[32] || v[1]`.
pub const SIGNATURE_LEN: usize = 65;

/// Offset wallets add to the recovery id in pre-EIP-155 style signatures.
const LEGACY_V_OFFSET: u8 = 27;

/// EIP-155 replay-protection offset: `v = chain_id * 2 + 35 + parity`.
const EIP155_V_OFFSET: u64 = 35;

/// First byte of any RLP list header. Untyped legacy payloads start here.
const RLP_LIST_START: u8 = 0xc0;

/// Which transaction envelope a chain uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Eip1559,
    Legacy,
}

/// The recipient, value and calldata of a transfer, independent of fees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCall {
    /// Transaction `to`: the recipient for native transfers, the token
    /// contract for ERC-20/BEP-20 transfers.
    pub to: String,
    pub value: U256,
    pub data: Vec<u8>,
}

impl TransferCall {
    /// A native-asset transfer with empty calldata.
    pub fn native(recipient: &str, amount: U256) -> Result<Self, EthError> {
        parse_address(recipient)?;

        Ok(Self {
            to: recipient.to_string(),
            value: amount,
            data: Vec::new(),
        })
    }

    /// A token transfer: zero value, `transfer(recipient, amount)` calldata
    /// sent to the token contract.
    pub fn token(contract: &str, recipient: &str, amount: U256) -> Result<Self, EthError> {
        parse_address(contract)?;

        Ok(Self {
            to: contract.to_string(),
            value: U256::ZERO,
            data: erc20::encode_transfer(recipient, amount)?,
        })
    }
}

/// Fee fields for one of the two envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeParams {
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    Legacy {
        gas_price: u128,
    },
}

impl FeeParams {
    pub fn tx_type(&self) -> TxType {
        match self {
            FeeParams::Eip1559 { .. } => TxType::Eip1559,
            FeeParams::Legacy { .. } => TxType::Legacy,
        }
    }

    /// Upper bound on the price paid per unit of gas.
    pub fn max_price_per_gas(&self) -> u128 {
        match self {
            FeeParams::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
            FeeParams::Legacy { gas_price } => *gas_price,
        }
    }
}

/// An unsigned EIP-1559 (type 2) transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip1559Transaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    /// Recipient address as a 0x-prefixed hex string.
    pub to: String,
    pub value: U256,
    pub data: Vec<u8>,
}

/// An unsigned EIP-155 legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: String,
    pub value: U256,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignedTransaction {
    Eip1559(Eip1559Transaction),
    Legacy(LegacyTransaction),
}

impl UnsignedTransaction {
    pub fn tx_type(&self) -> TxType {
        match self {
            UnsignedTransaction::Eip1559(_) => TxType::Eip1559,
            UnsignedTransaction::Legacy(_) => TxType::Legacy,
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            UnsignedTransaction::Eip1559(tx) => tx.chain_id,
            UnsignedTransaction::Legacy(tx) => tx.chain_id,
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            UnsignedTransaction::Eip1559(tx) => tx.gas_limit,
            UnsignedTransaction::Legacy(tx) => tx.gas_limit,
        }
    }
}

/// The bytes a wallet signs and the payload they were hashed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningPayload {
    /// Keccak-256 of `payload`.
    pub digest: [u8; 32],
    /// Canonical unsigned serialization.
    pub payload: Vec<u8>,
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEthTransaction {
    pub raw_tx: Vec<u8>,
    /// Transaction hash as a 0x-prefixed hex string.
    pub tx_hash: String,
}

/// Assembles an unsigned transaction. The envelope follows `fees`.
pub fn build_transaction(
    chain_id: u64,
    nonce: u64,
    gas_limit: u64,
    call: TransferCall,
    fees: FeeParams,
) -> UnsignedTransaction {
    match fees {
        FeeParams::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => UnsignedTransaction::Eip1559(Eip1559Transaction {
            chain_id,
            nonce,
            max_priority_fee_per_gas,
            max_fee_per_gas,
            gas_limit,
            to: call.to,
            value: call.value,
            data: call.data,
        }),
        FeeParams::Legacy { gas_price } => UnsignedTransaction::Legacy(LegacyTransaction {
            chain_id,
            nonce,
            gas_price,
            gas_limit,
            to: call.to,
            value: call.value,
            data: call.data,
        }),
    }
}

/// Serializes the unsigned transaction in its chain's canonical encoding.
pub fn encode_unsigned(tx: &UnsignedTransaction) -> Result<Vec<u8>, EthError> {
    match tx {
        UnsignedTransaction::Eip1559(tx) => {
            let fields = Eip1559Fields::try_from(tx)?;

            let mut rlp_buf = Vec::new();
            fields.encode(&mut rlp_buf);

            let mut payload = Vec::with_capacity(1 + rlp_buf.len());
            payload.push(EIP1559_TX_TYPE);
            payload.extend_from_slice(&rlp_buf);
            Ok(payload)
        }
        UnsignedTransaction::Legacy(tx) => {
            let fields = LegacySigningFields::try_from(tx)?;

            let mut payload = Vec::new();
            fields.encode(&mut payload);
            Ok(payload)
        }
    }
}

/// Serializes `tx`, checks its type marker and hashes it.
pub fn signing_payload(tx: &UnsignedTransaction) -> Result<SigningPayload, EthError> {
    let payload = encode_unsigned(tx)?;
    verify_type_marker(&payload, tx.tx_type())?;

    Ok(SigningPayload {
        digest: keccak256(&payload),
        payload,
    })
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Checks that a serialized payload starts with the marker of `expected`.
///
/// A mismatch means the encoder and the chain table disagree.
pub fn verify_type_marker(payload: &[u8], expected: TxType) -> Result<(), EthError> {
    let first = *payload
        .first()
        .ok_or_else(|| EthError::EncodingError("empty transaction payload".into()))?;

    match expected {
        TxType::Eip1559 if first != EIP1559_TX_TYPE => Err(EthError::TypeMarkerMismatch {
            expected: "0x02",
            found: first,
        }),
        TxType::Legacy if first < RLP_LIST_START => Err(EthError::TypeMarkerMismatch {
            expected: "untyped rlp list",
            found: first,
        }),
        _ => Ok(()),
    }
}

/// Parses a signing payload produced by [`encode_unsigned`].
pub fn decode_unsigned(payload: &[u8]) -> Result<UnsignedTransaction, EthError> {
    let first = *payload
        .first()
        .ok_or_else(|| EthError::EncodingError("empty transaction payload".into()))?;

    if first == EIP1559_TX_TYPE {
        let fields: Eip1559Fields = decode_exact(&payload[1..])?;
        Ok(UnsignedTransaction::Eip1559(fields.into()))
    } else if first >= RLP_LIST_START {
        let fields: LegacySigningFields = decode_exact(payload)?;
        if fields.zero_r != 0 || fields.zero_s != 0 {
            return Err(EthError::EncodingError(
                "legacy signing payload must end with chain_id, 0, 0".into(),
            ));
        }
        Ok(UnsignedTransaction::Legacy(fields.into()))
    } else {
        Err(EthError::EncodingError(format!(
            "unsupported transaction type 0x{first:02x}"
        )))
    }
}

/// Maps a wallet-reported `v` onto the 0/1 parity the encodings expect.
///
/// Accepts 0/1 and 27/28 for both envelopes. For legacy transactions an
/// EIP-155 encoded `v` for `chain_id` is accepted too.
pub fn normalize_recovery_id(v: u8, legacy_chain_id: Option<u64>) -> Result<u8, EthError> {
    match v {
        0 | 1 => Ok(v),
        27 | 28 => Ok(v - LEGACY_V_OFFSET),
        _ => {
            if let Some(chain_id) = legacy_chain_id {
                let base = chain_id
                    .checked_mul(2)
                    .and_then(|x| x.checked_add(EIP155_V_OFFSET));
                if let Some(base) = base {
                    let v = u64::from(v);
                    if v == base || v == base + 1 {
                        return Ok((v - base) as u8);
                    }
                }
            }
            Err(EthError::InvalidSignature(format!("invalid recovery id {v}")))
        }
    }
}

/// Combines an unsigned payload with a wallet's 65-byte signature into a
/// broadcastable transaction.
///
/// The payload must be canonical: re-encoding the parsed fields has to give
/// back the exact bytes that were hashed, otherwise the signature would be
/// over something other than what gets broadcast.
pub fn reconstruct_signed(
    unsigned_payload: &[u8],
    signature: &[u8],
) -> Result<SignedEthTransaction, EthError> {
    let (r, s, v) = split_signature(signature)?;

    let tx = decode_unsigned(unsigned_payload)?;
    if encode_unsigned(&tx)? != unsigned_payload {
        return Err(EthError::EncodingError(
            "unsigned payload is not in canonical form".into(),
        ));
    }

    let raw_tx = match &tx {
        UnsignedTransaction::Eip1559(tx) => {
            let y_parity = normalize_recovery_id(v, None)?;
            let f = Eip1559Fields::try_from(tx)?;

            let signed = SignedEip1559Fields {
                chain_id: f.chain_id,
                nonce: f.nonce,
                max_priority_fee_per_gas: f.max_priority_fee_per_gas,
                max_fee_per_gas: f.max_fee_per_gas,
                gas_limit: f.gas_limit,
                to: f.to,
                value: f.value,
                data: f.data,
                access_list: f.access_list,
                signature_y_parity: y_parity,
                signature_r: RlpU256(r),
                signature_s: RlpU256(s),
            };

            let mut rlp_buf = Vec::new();
            signed.encode(&mut rlp_buf);

            let mut raw = Vec::with_capacity(1 + rlp_buf.len());
            raw.push(EIP1559_TX_TYPE);
            raw.extend_from_slice(&rlp_buf);
            raw
        }
        UnsignedTransaction::Legacy(tx) => {
            let parity = normalize_recovery_id(v, Some(tx.chain_id))?;
            let f = LegacySigningFields::try_from(tx)?;

            let signed = SignedLegacyFields {
                nonce: f.nonce,
                gas_price: f.gas_price,
                gas_limit: f.gas_limit,
                to: f.to,
                value: f.value,
                data: f.data,
                v: eip155_v(f.chain_id, parity)?,
                r: RlpU256(r),
                s: RlpU256(s),
            };

            let mut raw = Vec::new();
            signed.encode(&mut raw);
            raw
        }
    };

    let tx_hash = format!("0x{}", hex::encode(keccak256(&raw_tx)));

    Ok(SignedEthTransaction { raw_tx, tx_hash })
}

/// Recovers the checksummed sender address of a signed transaction.
pub fn recover_signer(raw_tx: &[u8]) -> Result<String, EthError> {
    let first = *raw_tx
        .first()
        .ok_or_else(|| EthError::EncodingError("empty transaction".into()))?;

    let (digest, r, s, parity) = if first == EIP1559_TX_TYPE {
        let signed: SignedEip1559Fields = decode_exact(&raw_tx[1..])?;

        let unsigned = Eip1559Fields {
            chain_id: signed.chain_id,
            nonce: signed.nonce,
            max_priority_fee_per_gas: signed.max_priority_fee_per_gas,
            max_fee_per_gas: signed.max_fee_per_gas,
            gas_limit: signed.gas_limit,
            to: signed.to,
            value: signed.value,
            data: signed.data,
            access_list: signed.access_list,
        };

        let mut payload = vec![EIP1559_TX_TYPE];
        unsigned.encode(&mut payload);

        (
            keccak256(&payload),
            signed.signature_r,
            signed.signature_s,
            signed.signature_y_parity,
        )
    } else if first >= RLP_LIST_START {
        let signed: SignedLegacyFields = decode_exact(raw_tx)?;

        if signed.v < EIP155_V_OFFSET {
            return Err(EthError::InvalidSignature(
                "transaction is not EIP-155 replay protected".into(),
            ));
        }
        let chain_id = (signed.v - EIP155_V_OFFSET) / 2;
        let parity = ((signed.v - EIP155_V_OFFSET) % 2) as u8;

        let unsigned = LegacySigningFields {
            nonce: signed.nonce,
            gas_price: signed.gas_price,
            gas_limit: signed.gas_limit,
            to: signed.to,
            value: signed.value,
            data: signed.data,
            chain_id,
            zero_r: 0,
            zero_s: 0,
        };

        let mut payload = Vec::new();
        unsigned.encode(&mut payload);

        (keccak256(&payload), signed.r, signed.s, parity)
    } else {
        return Err(EthError::EncodingError(format!(
            "unsupported transaction type 0x{first:02x}"
        )));
    };

    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&r.0);
    rs[32..].copy_from_slice(&s.0);

    let sig = Signature::from_slice(&rs)
        .map_err(|e| EthError::InvalidSignature(e.to_string()))?;
    let recid = RecoveryId::from_byte(parity)
        .ok_or_else(|| EthError::InvalidSignature(format!("invalid parity {parity}")))?;

    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recid)
        .map_err(|e| EthError::InvalidSignature(format!("recovery failed: {e}")))?;

    verifying_key_to_address(&key)
}

// ---------------------------------------------------------------------------
// RLP-encodable structures
// ---------------------------------------------------------------------------

#[derive(RlpEncodable, RlpDecodable)]
struct Eip1559Fields {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: RlpU256,
    data: RlpBytes,
    access_list: Vec<AccessListItem>,
}

#[derive(RlpEncodable, RlpDecodable)]
struct SignedEip1559Fields {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: RlpU256,
    data: RlpBytes,
    access_list: Vec<AccessListItem>,
    signature_y_parity: u8,
    signature_r: RlpU256,
    signature_s: RlpU256,
}

/// EIP-155 signing list: the six transaction fields then `chain_id, 0, 0`.
#[derive(RlpEncodable, RlpDecodable)]
struct LegacySigningFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: RlpU256,
    data: RlpBytes,
    chain_id: u64,
    zero_r: u8,
    zero_s: u8,
}

#[derive(RlpEncodable, RlpDecodable)]
struct SignedLegacyFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: RlpU256,
    data: RlpBytes,
    v: u64,
    r: RlpU256,
    s: RlpU256,
}

/// An EIP-2930 access list entry. Transfers always send an empty list.
#[derive(Debug, Clone, RlpEncodable, RlpDecodable)]
struct AccessListItem {
    address: RlpAddress,
    storage_keys: Vec<RlpFixedBytes<32>>,
}

impl TryFrom<&Eip1559Transaction> for Eip1559Fields {
    type Error = EthError;

    fn try_from(tx: &Eip1559Transaction) -> Result<Self, Self::Error> {
        Ok(Self {
            chain_id: tx.chain_id,
            nonce: tx.nonce,
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
            max_fee_per_gas: tx.max_fee_per_gas,
            gas_limit: tx.gas_limit,
            to: RlpAddress(parse_address(&tx.to)?),
            value: tx.value.into(),
            data: RlpBytes(tx.data.clone()),
            access_list: Vec::new(),
        })
    }
}

impl From<Eip1559Fields> for Eip1559Transaction {
    fn from(f: Eip1559Fields) -> Self {
        Self {
            chain_id: f.chain_id,
            nonce: f.nonce,
            max_priority_fee_per_gas: f.max_priority_fee_per_gas,
            max_fee_per_gas: f.max_fee_per_gas,
            gas_limit: f.gas_limit,
            to: format_address(&f.to.0),
            value: U256::from_be_bytes(f.value.0),
            data: f.data.0,
        }
    }
}

impl TryFrom<&LegacyTransaction> for LegacySigningFields {
    type Error = EthError;

    fn try_from(tx: &LegacyTransaction) -> Result<Self, Self::Error> {
        Ok(Self {
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: RlpAddress(parse_address(&tx.to)?),
            value: tx.value.into(),
            data: RlpBytes(tx.data.clone()),
            chain_id: tx.chain_id,
            zero_r: 0,
            zero_s: 0,
        })
    }
}

impl From<LegacySigningFields> for LegacyTransaction {
    fn from(f: LegacySigningFields) -> Self {
        Self {
            chain_id: f.chain_id,
            nonce: f.nonce,
            gas_price: f.gas_price,
            gas_limit: f.gas_limit,
            to: format_address(&f.to.0),
            value: U256::from_be_bytes(f.value.0),
            data: f.data.0,
        }
    }
}

/// Wrapper for a 20-byte Ethereum address encoded as an RLP string.
#[derive(Debug, Clone)]
struct RlpAddress([u8; 20]);

impl Encodable for RlpAddress {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

impl Decodable for RlpAddress {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let bytes = Header::decode_bytes(buf, false)?;
        let addr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| alloy_rlp::Error::UnexpectedLength)?;
        Ok(Self(addr))
    }
}

/// Wrapper for a 256-bit integer (32 bytes) that encodes as minimal big-endian
/// bytes with leading zeros stripped (standard RLP integer encoding).
#[derive(Debug, Clone)]
struct RlpU256([u8; 32]);

impl From<U256> for RlpU256 {
    fn from(value: U256) -> Self {
        Self(value.to_be_bytes::<32>())
    }
}

impl RlpU256 {
    fn trimmed(&self) -> &[u8] {
        let start = self.0.iter().position(|&b| b != 0).unwrap_or(32);
        &self.0[start..]
    }
}

impl Encodable for RlpU256 {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.trimmed().encode(out);
    }

    fn length(&self) -> usize {
        self.trimmed().length()
    }
}

impl Decodable for RlpU256 {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let bytes = Header::decode_bytes(buf, false)?;
        if bytes.len() > 32 {
            return Err(alloy_rlp::Error::Overflow);
        }
        if bytes.first() == Some(&0) {
            return Err(alloy_rlp::Error::LeadingZero);
        }

        let mut word = [0u8; 32];
        word[32 - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(word))
    }
}

/// Wrapper for variable-length calldata encoded as an RLP string.
#[derive(Debug, Clone)]
struct RlpBytes(Vec<u8>);

impl Encodable for RlpBytes {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

impl Decodable for RlpBytes {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Ok(Self(Header::decode_bytes(buf, false)?.to_vec()))
    }
}

/// Wrapper for fixed-size byte arrays that implements `Encodable`.
#[derive(Debug, Clone)]
struct RlpFixedBytes<const N: usize>([u8; N]);

impl<const N: usize> Encodable for RlpFixedBytes<N> {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

impl<const N: usize> Decodable for RlpFixedBytes<N> {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let bytes = Header::decode_bytes(buf, false)?;
        let arr: [u8; N] = bytes
            .try_into()
            .map_err(|_| alloy_rlp::Error::UnexpectedLength)?;
        Ok(Self(arr))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Decodes one RLP item and requires the input to be fully consumed.
fn decode_exact<T: Decodable>(data: &[u8]) -> Result<T, EthError> {
    let mut buf = data;
    let value = T::decode(&mut buf)?;
    if !buf.is_empty() {
        return Err(EthError::EncodingError(format!(
            "{} trailing bytes after transaction",
            buf.len()
        )));
    }
    Ok(value)
}

/// Splits a 65-byte wallet signature into `(r, s, v)`, rejecting any other
/// length and any `r`/`s` outside the curve order.
fn split_signature(signature: &[u8]) -> Result<([u8; 32], [u8; 32], u8), EthError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(EthError::InvalidSignature(format!(
            "expected {SIGNATURE_LEN} bytes, got {}",
            signature.len()
        )));
    }

    Signature::from_slice(&signature[..64])
        .map_err(|e| EthError::InvalidSignature(format!("malformed r/s: {e}")))?;

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&signature[..32]);
    s.copy_from_slice(&signature[32..64]);

    Ok((r, s, signature[64]))
}

fn eip155_v(chain_id: u64, parity: u8) -> Result<u64, EthError> {
    chain_id
        .checked_mul(2)
        .and_then(|x| x.checked_add(EIP155_V_OFFSET + u64::from(parity)))
        .ok_or(EthError::UnsupportedChain(chain_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use k256::ecdsa::SigningKey;

    const TEST_ADDRESS: &str = "0x000000000000000000000000000000000000dEaD";

    /// Private key 0x00..01 controls this address.
    const TEST_SENDER: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

    fn test_key() -> SigningKey {
        let mut key = [0u8; 32];
        key[31] = 1;
        SigningKey::from_bytes((&key).into()).unwrap()
    }

    /// Signs a digest the way a wallet does, with `v` in 0/1.
    fn wallet_sign(digest: &[u8; 32]) -> Vec<u8> {
        let (sig, recid): (Signature, RecoveryId) = test_key().sign_prehash(digest).unwrap();
        let mut out = sig.to_bytes().to_vec();
        out.push(recid.to_byte());
        out
    }

    fn one_eth_transfer(chain_id: u64, fees: FeeParams) -> UnsignedTransaction {
        let call = TransferCall::native(TEST_ADDRESS, U256::from(1_000_000_000_000_000_000u128))
            .unwrap();
        build_transaction(chain_id, 7, 21_000, call, fees)
    }

    fn eip1559_fees() -> FeeParams {
        FeeParams::Eip1559 {
            max_fee_per_gas: 50_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        }
    }

    #[test]
    fn native_transfer_payload_starts_with_type_byte() {
        let tx = one_eth_transfer(1, eip1559_fees());
        let signing = signing_payload(&tx).unwrap();

        assert_eq!(signing.payload[0], 0x02);
        assert_eq!(signing.digest.len(), 32);
        assert_eq!(signing.digest, keccak256(&signing.payload));
    }

    #[test]
    fn signing_payload_is_deterministic() {
        let a = signing_payload(&one_eth_transfer(1, eip1559_fees())).unwrap();
        let b = signing_payload(&one_eth_transfer(1, eip1559_fees())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_chains_give_different_digests() {
        let a = signing_payload(&one_eth_transfer(1, eip1559_fees())).unwrap();
        let b = signing_payload(&one_eth_transfer(137, eip1559_fees())).unwrap();
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn legacy_payload_is_untyped_list() {
        let tx = one_eth_transfer(56, FeeParams::Legacy { gas_price: 3_000_000_000 });
        let signing = signing_payload(&tx).unwrap();
        assert!(signing.payload[0] >= 0xc0);
    }

    #[test]
    fn token_call_targets_contract_with_zero_value() {
        let token = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
        let call = TransferCall::token(token, TEST_ADDRESS, U256::from(100u64)).unwrap();

        assert_eq!(call.to, token);
        assert_eq!(call.value, U256::ZERO);
        assert_eq!(call.data.len(), 68);
        assert_eq!(&call.data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn native_call_rejects_bad_recipient() {
        assert!(TransferCall::native("bad-address", U256::ZERO).is_err());
    }

    #[test]
    fn decode_unsigned_inverts_encode() {
        for tx in [
            one_eth_transfer(1, eip1559_fees()),
            one_eth_transfer(56, FeeParams::Legacy { gas_price: 5 }),
        ] {
            let payload = encode_unsigned(&tx).unwrap();
            let decoded = decode_unsigned(&payload).unwrap();
            assert_eq!(decoded, tx);
        }
    }

    #[test]
    fn verify_type_marker_detects_mismatch() {
        let legacy = encode_unsigned(&one_eth_transfer(56, FeeParams::Legacy { gas_price: 5 }))
            .unwrap();
        let err = verify_type_marker(&legacy, TxType::Eip1559).unwrap_err();
        assert!(matches!(err, EthError::TypeMarkerMismatch { .. }));

        let typed = encode_unsigned(&one_eth_transfer(1, eip1559_fees())).unwrap();
        assert!(verify_type_marker(&typed, TxType::Legacy).is_err());
        assert!(verify_type_marker(&[], TxType::Legacy).is_err());
    }

    #[test]
    fn reconstructed_eip1559_recovers_sender() {
        let signing = signing_payload(&one_eth_transfer(1, eip1559_fees())).unwrap();
        let sig = wallet_sign(&signing.digest);

        let signed = reconstruct_signed(&signing.payload, &sig).unwrap();

        assert_eq!(signed.raw_tx[0], 0x02);
        assert_eq!(signed.tx_hash.len(), 66);
        assert_eq!(recover_signer(&signed.raw_tx).unwrap(), TEST_SENDER);
    }

    #[test]
    fn reconstructed_legacy_recovers_sender() {
        let tx = one_eth_transfer(56, FeeParams::Legacy { gas_price: 3_000_000_000 });
        let signing = signing_payload(&tx).unwrap();
        let sig = wallet_sign(&signing.digest);

        let signed = reconstruct_signed(&signing.payload, &sig).unwrap();

        assert!(signed.raw_tx[0] >= 0xc0);
        assert_eq!(recover_signer(&signed.raw_tx).unwrap(), TEST_SENDER);
    }

    #[test]
    fn signed_list_extends_unsigned_fields() {
        let signing = signing_payload(&one_eth_transfer(10, eip1559_fees())).unwrap();
        let signed = reconstruct_signed(&signing.payload, &wallet_sign(&signing.digest)).unwrap();

        let mut unsigned_body = &signing.payload[1..];
        Header::decode(&mut unsigned_body).unwrap();
        let mut signed_body = &signed.raw_tx[1..];
        Header::decode(&mut signed_body).unwrap();

        assert!(signed_body.starts_with(unsigned_body));
        assert!(signed_body.len() > unsigned_body.len());
    }

    #[test]
    fn recovery_id_27_matches_0() {
        let signing = signing_payload(&one_eth_transfer(1, eip1559_fees())).unwrap();
        let sig = wallet_sign(&signing.digest);

        let mut sig_legacy_v = sig.clone();
        sig_legacy_v[64] += 27;

        let a = reconstruct_signed(&signing.payload, &sig).unwrap();
        let b = reconstruct_signed(&signing.payload, &sig_legacy_v).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn eip155_v_accepted_for_legacy_only() {
        assert_eq!(normalize_recovery_id(147, Some(56)).unwrap(), 0);
        assert_eq!(normalize_recovery_id(148, Some(56)).unwrap(), 1);
        assert!(normalize_recovery_id(147, None).is_err());
        assert!(normalize_recovery_id(37, Some(56)).is_err());
        assert!(normalize_recovery_id(29, None).is_err());
    }

    #[test]
    fn reconstruct_rejects_64_byte_signature() {
        let signing = signing_payload(&one_eth_transfer(1, eip1559_fees())).unwrap();
        let sig = wallet_sign(&signing.digest);

        let err = reconstruct_signed(&signing.payload, &sig[..64]).unwrap_err();
        assert!(err.to_string().contains("expected 65 bytes, got 64"));

        let mut long = sig.clone();
        long.push(0);
        assert!(reconstruct_signed(&signing.payload, &long).is_err());
    }

    #[test]
    fn reconstruct_rejects_zero_r_s() {
        let signing = signing_payload(&one_eth_transfer(1, eip1559_fees())).unwrap();
        assert!(reconstruct_signed(&signing.payload, &[0u8; 65]).is_err());
    }

    #[test]
    fn reconstruct_rejects_non_canonical_payload() {
        let signing = signing_payload(&one_eth_transfer(1, eip1559_fees())).unwrap();
        let sig = wallet_sign(&signing.digest);

        let mut trailing = signing.payload.clone();
        trailing.push(0x00);
        assert!(reconstruct_signed(&trailing, &sig).is_err());
    }

    #[test]
    fn rlp_u256_zero_encodes_as_empty() {
        let mut buf = Vec::new();
        RlpU256([0u8; 32]).encode(&mut buf);
        assert_eq!(buf, vec![0x80]);
    }

    #[test]
    fn rlp_u256_decode_rejects_leading_zero() {
        let mut buf: &[u8] = &[0x82, 0x00, 0x01];
        assert!(RlpU256::decode(&mut buf).is_err());
    }

    #[test]
    fn rlp_address_encodes_20_bytes() {
        let mut buf = Vec::new();
        RlpAddress([0xde; 20]).encode(&mut buf);

        assert_eq!(buf.len(), 21);
        assert_eq!(buf[0], 0x94);
        assert_eq!(&buf[1..], &[0xde; 20]);
    }

    #[test]
    fn tx_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TxType::Eip1559).unwrap(), "\"eip1559\"");
        assert_eq!(serde_json::to_string(&TxType::Legacy).unwrap(), "\"legacy\"");
    }
}
