//! Solana versioned message wire format and signature attachment.
//!
//! Messages are compiled by hand without `solana-sdk`. The layout:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message
//!
//! Message (v0):
//!   version prefix          u8  (0x80 | version; absent for legacy messages)
//!   num_required_sigs       u8
//!   num_readonly_signed     u8
//!   num_readonly_unsigned   u8
//!   num_accounts            compact-u16
//!   account_keys            32 bytes * num_accounts
//!   recent_blockhash        32 bytes
//!   num_instructions        compact-u16
//!   instructions[]          (see below)
//!   num_lookups             compact-u16          (v0 only)
//!   address_table_lookups[] (see below)           (v0 only)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//!
//! Address table lookup:
//!   account_key             32 bytes
//!   writable_indexes        compact-u16 length + u8 * n
//!   readonly_indexes        compact-u16 length + u8 * n
//! ```
//!
//! The serialized message is what the wallet signs. The signed transaction is
//! the same message bytes preceded by the signature slots.

use ed25519_dalek::{Signature, VerifyingKey};

use crate::error::SolError;

// ---------------------------------------------------------------------------
// Solana System Program
// ---------------------------------------------------------------------------

/// The Solana System Program public key: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

/// System Program `Transfer` instruction index (little-endian u32).
const SYSTEM_TRANSFER_IX_INDEX: u32 = 2;

/// Length of an Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// High bit of the first message byte marks a versioned message.
const VERSION_PREFIX_MASK: u8 = 0x80;

/// Account indices in compiled instructions are single bytes.
const MAX_ACCOUNT_KEYS: usize = 256;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)` or an error if the data is truncated.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            SolError::SerializationError(
                "unexpected end of data while decoding compact-u16".into(),
            )
        })?;
        consumed += 1;

        value |= ((byte & 0x7f) as u32) << shift;
        shift += 7;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    if value > u16::MAX as u32 {
        return Err(SolError::SerializationError(
            "compact-u16 value overflow".into(),
        ));
    }

    Ok((value as u16, consumed))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in a Solana instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountMeta {
    pub pubkey: [u8; 32],
    pub is_signer: bool,
    pub is_writable: bool,
}

/// A Solana instruction (before it is compiled into a message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolInstruction {
    pub program_id: [u8; 32],
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled instruction where account references are replaced by u8 indices
/// into the message's `account_keys` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// An address lookup table reference (v0 messages only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTableLookup {
    pub account_key: [u8; 32],
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageVersion {
    Legacy,
    V0,
}

/// A compiled Solana message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedMessage {
    pub version: MessageVersion,

    /// Number of required signatures (first N accounts are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,

    /// Static account keys in canonical order:
    ///   1. writable signers
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<[u8; 32]>,

    pub recent_blockhash: [u8; 32],

    pub compiled_instructions: Vec<CompiledInstruction>,

    /// Always empty for legacy messages.
    pub address_table_lookups: Vec<AddressTableLookup>,
}

impl VersionedMessage {
    /// The account keys that must sign, in signature-slot order.
    pub fn signer_keys(&self) -> &[[u8; 32]] {
        let n = (self.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    /// The fee payer is always the first account.
    pub fn fee_payer(&self) -> Option<&[u8; 32]> {
        self.account_keys.first()
    }
}

/// A signed transaction ready for `sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSolTransaction {
    pub raw_tx: Vec<u8>,
    /// Base58 of the first signature, which is the transaction id.
    pub signature: String,
}

// ---------------------------------------------------------------------------
// Message building
// ---------------------------------------------------------------------------

/// Build a System Program `Transfer` instruction.
pub fn build_system_transfer_instruction(
    from: &[u8; 32],
    to: &[u8; 32],
    lamports: u64,
) -> SolInstruction {
    // u32 LE instruction index (2 = Transfer) + u64 LE lamports.
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    SolInstruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta {
                pubkey: *from,
                is_signer: true,
                is_writable: true,
            },
            SolAccountMeta {
                pubkey: *to,
                is_signer: false,
                is_writable: true,
            },
        ],
        data,
    }
}

/// Build a v0 message moving `lamports` from `from_pubkey` to `to_pubkey`.
pub fn build_sol_transfer(
    from_pubkey: &[u8; 32],
    to_pubkey: &[u8; 32],
    lamports: u64,
    recent_blockhash: &[u8; 32],
) -> Result<VersionedMessage, SolError> {
    if lamports == 0 {
        return Err(SolError::TransactionBuildError(
            "lamports must be > 0".into(),
        ));
    }

    let instruction = build_system_transfer_instruction(from_pubkey, to_pubkey, lamports);
    compile_message(&[instruction], from_pubkey, recent_blockhash)
}

/// Compile instructions into a v0 message with a single fee payer.
///
/// The fee payer is always the first signer and is placed at index 0 in the
/// account keys.
pub fn compile_message(
    instructions: &[SolInstruction],
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
) -> Result<VersionedMessage, SolError> {
    struct AccountEntry {
        pubkey: [u8; 32],
        is_signer: bool,
        is_writable: bool,
    }

    let mut entries: Vec<AccountEntry> = Vec::new();

    let mut upsert = |pubkey: [u8; 32], signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    // Stable sort keeps insertion order within a category, so the fee payer
    // stays first among writable signers.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    if entries.len() > MAX_ACCOUNT_KEYS {
        return Err(SolError::TransactionBuildError(format!(
            "{} accounts exceed the {MAX_ACCOUNT_KEYS} addressable keys",
            entries.len()
        )));
    }

    let num_signers = entries.iter().filter(|e| e.is_signer).count() as u8;
    let num_readonly_signed = entries
        .iter()
        .filter(|e| e.is_signer && !e.is_writable)
        .count() as u8;
    let num_readonly_unsigned = entries
        .iter()
        .filter(|e| !e.is_signer && !e.is_writable)
        .count() as u8;

    let account_keys: Vec<[u8; 32]> = entries.iter().map(|e| e.pubkey).collect();

    let index_of = |key: &[u8; 32]| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SolError::TransactionBuildError("account not in account keys".into()))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let account_indices = ix
            .accounts
            .iter()
            .map(|meta| index_of(&meta.pubkey))
            .collect::<Result<Vec<_>, _>>()?;

        compiled.push(CompiledInstruction {
            program_id_index: index_of(&ix.program_id)?,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(VersionedMessage {
        version: MessageVersion::V0,
        num_required_signatures: num_signers,
        num_readonly_signed,
        num_readonly_unsigned,
        account_keys,
        recent_blockhash: *recent_blockhash,
        compiled_instructions: compiled,
        address_table_lookups: Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Serialize the message (the bytes that get signed).
pub fn serialize_message(msg: &VersionedMessage) -> Result<Vec<u8>, SolError> {
    let mut buf = Vec::with_capacity(256);

    if msg.version == MessageVersion::V0 {
        buf.push(VERSION_PREFIX_MASK);
    } else if !msg.address_table_lookups.is_empty() {
        return Err(SolError::SerializationError(
            "legacy messages cannot carry address table lookups".into(),
        ));
    }

    buf.push(msg.num_required_signatures);
    buf.push(msg.num_readonly_signed);
    buf.push(msg.num_readonly_unsigned);

    push_len(&mut buf, msg.account_keys.len())?;
    for key in &msg.account_keys {
        buf.extend_from_slice(key);
    }

    buf.extend_from_slice(&msg.recent_blockhash);

    push_len(&mut buf, msg.compiled_instructions.len())?;
    for ix in &msg.compiled_instructions {
        buf.push(ix.program_id_index);

        push_len(&mut buf, ix.account_indices.len())?;
        buf.extend_from_slice(&ix.account_indices);

        push_len(&mut buf, ix.data.len())?;
        buf.extend_from_slice(&ix.data);
    }

    if msg.version == MessageVersion::V0 {
        push_len(&mut buf, msg.address_table_lookups.len())?;
        for lookup in &msg.address_table_lookups {
            buf.extend_from_slice(&lookup.account_key);
            push_len(&mut buf, lookup.writable_indexes.len())?;
            buf.extend_from_slice(&lookup.writable_indexes);
            push_len(&mut buf, lookup.readonly_indexes.len())?;
            buf.extend_from_slice(&lookup.readonly_indexes);
        }
    }

    Ok(buf)
}

/// Parse serialized message bytes. The input must be consumed exactly.
pub fn deserialize_message(bytes: &[u8]) -> Result<VersionedMessage, SolError> {
    let mut r = Reader::new(bytes);

    let first = r.peek_u8()?;
    let version = if first & VERSION_PREFIX_MASK != 0 {
        let version = first & !VERSION_PREFIX_MASK;
        if version != 0 {
            return Err(SolError::UnsupportedMessageVersion(version));
        }
        r.read_u8()?;
        MessageVersion::V0
    } else {
        MessageVersion::Legacy
    };

    let num_required_signatures = r.read_u8()?;
    let num_readonly_signed = r.read_u8()?;
    let num_readonly_unsigned = r.read_u8()?;

    let num_accounts = r.read_compact_u16()? as usize;
    let mut account_keys = Vec::with_capacity(num_accounts);
    for _ in 0..num_accounts {
        account_keys.push(r.read_array32()?);
    }

    if (num_required_signatures as usize) > account_keys.len() {
        return Err(SolError::SerializationError(format!(
            "{num_required_signatures} required signatures but only {} accounts",
            account_keys.len()
        )));
    }

    let recent_blockhash = r.read_array32()?;

    let num_instructions = r.read_compact_u16()? as usize;
    let mut compiled_instructions = Vec::with_capacity(num_instructions);
    for _ in 0..num_instructions {
        let program_id_index = r.read_u8()?;
        let n = r.read_compact_u16()? as usize;
        let account_indices = r.read_bytes(n)?.to_vec();
        let n = r.read_compact_u16()? as usize;
        let data = r.read_bytes(n)?.to_vec();

        compiled_instructions.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data,
        });
    }

    let mut address_table_lookups = Vec::new();
    if version == MessageVersion::V0 {
        let num_lookups = r.read_compact_u16()? as usize;
        for _ in 0..num_lookups {
            let account_key = r.read_array32()?;
            let n = r.read_compact_u16()? as usize;
            let writable_indexes = r.read_bytes(n)?.to_vec();
            let n = r.read_compact_u16()? as usize;
            let readonly_indexes = r.read_bytes(n)?.to_vec();

            address_table_lookups.push(AddressTableLookup {
                account_key,
                writable_indexes,
                readonly_indexes,
            });
        }
    }

    if !r.is_empty() {
        return Err(SolError::SerializationError(format!(
            "{} trailing bytes after message",
            r.remaining()
        )));
    }

    Ok(VersionedMessage {
        version,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        account_keys,
        recent_blockhash,
        compiled_instructions,
        address_table_lookups,
    })
}

// ---------------------------------------------------------------------------
// Signature attachment
// ---------------------------------------------------------------------------

/// Attach a wallet's signature to serialized message bytes, producing the
/// wire-format transaction.
///
/// Wallets sometimes hand back a longer buffer; anything past the first 64
/// bytes is dropped. Shorter input is rejected. `signer` must be one of the
/// message's required signers; every other slot is left zeroed.
pub fn attach_signature(
    message_bytes: &[u8],
    signer: &[u8; 32],
    signature: &[u8],
) -> Result<SignedSolTransaction, SolError> {
    if signature.len() < SIGNATURE_LEN {
        return Err(SolError::InvalidSignature(format!(
            "expected at least {SIGNATURE_LEN} bytes, got {}",
            signature.len()
        )));
    }
    let signature = &signature[..SIGNATURE_LEN];

    let msg = deserialize_message(message_bytes)?;

    let signer_idx = msg
        .signer_keys()
        .iter()
        .position(|k| k == signer)
        .ok_or_else(|| {
            SolError::InvalidSignature("wallet pubkey not found in message signers".into())
        })?;

    let num_sigs = msg.num_required_signatures as usize;
    let mut raw_tx = Vec::with_capacity(3 + num_sigs * SIGNATURE_LEN + message_bytes.len());
    push_len(&mut raw_tx, num_sigs)?;

    let sigs_start = raw_tx.len();
    raw_tx.resize(sigs_start + num_sigs * SIGNATURE_LEN, 0);
    let offset = sigs_start + signer_idx * SIGNATURE_LEN;
    raw_tx[offset..offset + SIGNATURE_LEN].copy_from_slice(signature);

    raw_tx.extend_from_slice(message_bytes);

    let first_sig = &raw_tx[sigs_start..sigs_start + SIGNATURE_LEN];

    Ok(SignedSolTransaction {
        signature: bs58::encode(first_sig).into_string(),
        raw_tx,
    })
}

/// Split a wire-format transaction into its signatures and message bytes.
pub fn split_transaction(raw_tx: &[u8]) -> Result<(Vec<[u8; 64]>, &[u8]), SolError> {
    let (num_sigs, compact_len) = decode_compact_u16(raw_tx)?;

    if num_sigs == 0 {
        return Err(SolError::TransactionBuildError(
            "transaction has zero signatures".into(),
        ));
    }

    let sigs_end = compact_len + (num_sigs as usize) * SIGNATURE_LEN;
    if sigs_end > raw_tx.len() {
        return Err(SolError::SerializationError(
            "transaction too short: signature slots exceed length".into(),
        ));
    }

    let signatures = raw_tx[compact_len..sigs_end]
        .chunks_exact(SIGNATURE_LEN)
        .map(|c| {
            let mut sig = [0u8; 64];
            sig.copy_from_slice(c);
            sig
        })
        .collect();

    Ok((signatures, &raw_tx[sigs_end..]))
}

/// Verify every signature slot of a wire-format transaction against the
/// corresponding signer key.
pub fn verify_transaction(raw_tx: &[u8]) -> Result<(), SolError> {
    let (signatures, message_bytes) = split_transaction(raw_tx)?;
    let msg = deserialize_message(message_bytes)?;

    if signatures.len() != msg.num_required_signatures as usize {
        return Err(SolError::InvalidSignature(format!(
            "{} signatures for {} required signers",
            signatures.len(),
            msg.num_required_signatures
        )));
    }

    for (sig, key) in signatures.iter().zip(msg.signer_keys()) {
        let vk = VerifyingKey::from_bytes(key)
            .map_err(|e| SolError::InvalidPublicKey(e.to_string()))?;
        vk.verify_strict(message_bytes, &Signature::from_bytes(sig))
            .map_err(|e| SolError::InvalidSignature(e.to_string()))?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn push_len(buf: &mut Vec<u8>, len: usize) -> Result<(), SolError> {
    let len = u16::try_from(len).map_err(|_| {
        SolError::SerializationError(format!("length {len} does not fit compact-u16"))
    })?;
    buf.extend_from_slice(&encode_compact_u16(len));
    Ok(())
}

/// Bounds-checked cursor over message bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn peek_u8(&self) -> Result<u8, SolError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| SolError::SerializationError("message is empty".into()))
    }

    fn read_u8(&mut self) -> Result<u8, SolError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], SolError> {
        if self.remaining() < n {
            return Err(SolError::SerializationError(format!(
                "message truncated: wanted {n} bytes at offset {}",
                self.pos
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_array32(&mut self) -> Result<[u8; 32], SolError> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.read_bytes(32)?);
        Ok(out)
    }

    fn read_compact_u16(&mut self) -> Result<u16, SolError> {
        let (value, consumed) = decode_compact_u16(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair(seed: u8) -> (SigningKey, [u8; 32]) {
        let key = SigningKey::from_bytes(&[seed; 32]);
        let pubkey = key.verifying_key().to_bytes();
        (key, pubkey)
    }

    // -- compact-u16 ----------------------------------------------------------

    #[test]
    fn compact_u16_boundaries() {
        assert_eq!(encode_compact_u16(0), vec![0x00]);
        assert_eq!(encode_compact_u16(0x7f), vec![0x7f]);
        assert_eq!(encode_compact_u16(128), vec![0x80, 0x01]);
        assert_eq!(encode_compact_u16(16383), vec![0xff, 0x7f]);
        assert_eq!(encode_compact_u16(16384), vec![0x80, 0x80, 0x01]);
        assert_eq!(encode_compact_u16(u16::MAX), vec![0xff, 0xff, 0x03]);
    }

    #[test]
    fn decode_compact_u16_roundtrip() {
        for value in [0u16, 1, 127, 128, 255, 256, 16383, 16384, 65535] {
            let encoded = encode_compact_u16(value);
            let (decoded, len) = decode_compact_u16(&encoded).unwrap();
            assert_eq!(decoded, value, "roundtrip failed for {value}");
            assert_eq!(len, encoded.len());
        }
    }

    #[test]
    fn decode_compact_u16_empty_input_fails() {
        assert!(decode_compact_u16(&[]).is_err());
        assert!(decode_compact_u16(&[0x80]).is_err());
    }

    // -- System transfer ------------------------------------------------------

    #[test]
    fn sol_transfer_instruction_layout() {
        let ix = build_system_transfer_instruction(&[1u8; 32], &[2u8; 32], 1_000_000);

        assert_eq!(ix.program_id, SYSTEM_PROGRAM_ID);
        assert_eq!(&ix.data[..4], &[2, 0, 0, 0]);
        assert_eq!(&ix.data[4..], &1_000_000u64.to_le_bytes());
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert!(!ix.accounts[1].is_signer && ix.accounts[1].is_writable);
    }

    #[test]
    fn build_sol_transfer_zero_lamports_fails() {
        assert!(build_sol_transfer(&[1u8; 32], &[2u8; 32], 0, &[0u8; 32]).is_err());
    }

    #[test]
    fn compiled_message_account_order() {
        let from = [1u8; 32];
        let to = [2u8; 32];
        let msg = build_sol_transfer(&from, &to, 1000, &[0xAA; 32]).unwrap();

        assert_eq!(msg.version, MessageVersion::V0);
        assert_eq!(msg.account_keys, vec![from, to, SYSTEM_PROGRAM_ID]);
        assert_eq!(msg.num_required_signatures, 1);
        assert_eq!(msg.num_readonly_signed, 0);
        assert_eq!(msg.num_readonly_unsigned, 1);
        assert_eq!(msg.compiled_instructions[0].program_id_index, 2);
        assert_eq!(msg.compiled_instructions[0].account_indices, vec![0, 1]);
    }

    #[test]
    fn self_transfer_deduplicates_accounts() {
        let key = [0xAAu8; 32];
        let msg = build_sol_transfer(&key, &key, 100, &[0u8; 32]).unwrap();
        assert_eq!(msg.account_keys.len(), 2);
    }

    // -- Serialization --------------------------------------------------------

    #[test]
    fn v0_message_starts_with_version_prefix() {
        let msg = build_sol_transfer(&[1u8; 32], &[2u8; 32], 5, &[0u8; 32]).unwrap();
        let bytes = serialize_message(&msg).unwrap();

        assert_eq!(bytes[0], 0x80);
        assert_eq!(bytes[1], msg.num_required_signatures);
        // No address table lookups.
        assert_eq!(*bytes.last().unwrap(), 0x00);
    }

    #[test]
    fn deserialize_inverts_serialize() {
        let msg = build_sol_transfer(&[1u8; 32], &[2u8; 32], 42, &[0xCC; 32]).unwrap();
        let bytes = serialize_message(&msg).unwrap();

        assert_eq!(deserialize_message(&bytes).unwrap(), msg);
    }

    #[test]
    fn legacy_message_parses_without_prefix() {
        let mut msg = build_sol_transfer(&[1u8; 32], &[2u8; 32], 42, &[0xCC; 32]).unwrap();
        msg.version = MessageVersion::Legacy;
        let bytes = serialize_message(&msg).unwrap();

        assert_eq!(bytes[0], 1);
        assert_eq!(deserialize_message(&bytes).unwrap(), msg);
    }

    #[test]
    fn deserialize_rejects_unknown_version() {
        let msg = build_sol_transfer(&[1u8; 32], &[2u8; 32], 42, &[0xCC; 32]).unwrap();
        let mut bytes = serialize_message(&msg).unwrap();
        bytes[0] = 0x81;

        assert!(matches!(
            deserialize_message(&bytes),
            Err(SolError::UnsupportedMessageVersion(1))
        ));
    }

    #[test]
    fn deserialize_rejects_truncated_and_trailing() {
        let msg = build_sol_transfer(&[1u8; 32], &[2u8; 32], 42, &[0xCC; 32]).unwrap();
        let bytes = serialize_message(&msg).unwrap();

        assert!(deserialize_message(&bytes[..bytes.len() - 1]).is_err());

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(deserialize_message(&trailing).is_err());
    }

    // -- Signature attachment ---------------------------------------------------

    #[test]
    fn attached_signature_verifies() {
        let (key, from) = keypair(0x42);
        let msg = build_sol_transfer(&from, &[0xBB; 32], 1_000_000, &[0xCC; 32]).unwrap();
        let message_bytes = serialize_message(&msg).unwrap();

        let sig = key.sign(&message_bytes).to_bytes();
        let signed = attach_signature(&message_bytes, &from, &sig).unwrap();

        assert_eq!(signed.raw_tx[0], 0x01);
        assert_eq!(&signed.raw_tx[1..65], &sig);
        assert_eq!(&signed.raw_tx[65..], &message_bytes[..]);
        assert_eq!(signed.signature, bs58::encode(sig).into_string());
        verify_transaction(&signed.raw_tx).unwrap();
    }

    #[test]
    fn random_signer_with_token_style_message_verifies() {
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        let owner = key.verifying_key().to_bytes();

        let ix = SolInstruction {
            program_id: [0x09; 32],
            accounts: vec![
                SolAccountMeta {
                    pubkey: [0x01; 32],
                    is_signer: false,
                    is_writable: true,
                },
                SolAccountMeta {
                    pubkey: owner,
                    is_signer: true,
                    is_writable: false,
                },
            ],
            data: vec![12, 1, 0, 0, 0, 0, 0, 0, 0, 6],
        };
        let msg = compile_message(&[ix], &owner, &[0x77; 32]).unwrap();
        let message_bytes = serialize_message(&msg).unwrap();

        let sig = key.sign(&message_bytes).to_bytes();
        let signed = attach_signature(&message_bytes, &owner, &sig).unwrap();
        verify_transaction(&signed.raw_tx).unwrap();
    }

    #[test]
    fn long_signature_is_truncated_to_64() {
        let (key, from) = keypair(0x42);
        let msg = build_sol_transfer(&from, &[0xBB; 32], 7, &[0xCC; 32]).unwrap();
        let message_bytes = serialize_message(&msg).unwrap();

        let sig = key.sign(&message_bytes).to_bytes();
        let mut padded = sig.to_vec();
        padded.extend_from_slice(&[0xFF; 6]);

        let exact = attach_signature(&message_bytes, &from, &sig).unwrap();
        let truncated = attach_signature(&message_bytes, &from, &padded).unwrap();
        assert_eq!(exact, truncated);
    }

    #[test]
    fn short_signature_is_rejected() {
        let (_, from) = keypair(0x42);
        let msg = build_sol_transfer(&from, &[0xBB; 32], 7, &[0xCC; 32]).unwrap();
        let message_bytes = serialize_message(&msg).unwrap();

        let err = attach_signature(&message_bytes, &from, &[1u8; 63]).unwrap_err();
        assert!(err.to_string().contains("got 63"));
    }

    #[test]
    fn attach_signature_unknown_signer_fails() {
        let (key, from) = keypair(0x11);
        let (_, other) = keypair(0x22);
        let msg = build_sol_transfer(&from, &[0xBB; 32], 7, &[0xCC; 32]).unwrap();
        let message_bytes = serialize_message(&msg).unwrap();

        let sig = key.sign(&message_bytes).to_bytes();
        let err = attach_signature(&message_bytes, &other, &sig).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn verify_rejects_wrong_signature() {
        let (_, from) = keypair(0x11);
        let (other_key, _) = keypair(0x22);
        let msg = build_sol_transfer(&from, &[0xBB; 32], 7, &[0xCC; 32]).unwrap();
        let message_bytes = serialize_message(&msg).unwrap();

        let sig = other_key.sign(&message_bytes).to_bytes();
        let signed = attach_signature(&message_bytes, &from, &sig).unwrap();
        assert!(verify_transaction(&signed.raw_tx).is_err());
    }

    #[test]
    fn split_transaction_zero_signatures_fails() {
        let err = split_transaction(&[0x00, 0x01, 0x00, 0x00]).unwrap_err();
        assert!(err.to_string().contains("zero signatures"));
    }
}
