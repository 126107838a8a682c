//! What the sender's wallet signs, per chain.

use alloy_primitives::U256;
use chain_eth::address::same_address;
use chain_eth::transaction::{Eip1559Transaction, LegacyTransaction};
use chain_eth::{SigningPayload, TxType, UnsignedTransaction};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransferError};
use crate::types::{Chain, Token};
use crate::wire;

/// EIP-2930 access list entry. Transfers never populate one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListEntry {
    pub address: String,
    pub storage_keys: Vec<String>,
}

/// Unsigned EIP-1559 fields as shown to the wallet and carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip1559TxFields {
    pub to: String,
    #[serde(with = "wire::u256_dec")]
    pub value: U256,
    pub chain_id: u64,
    #[serde(with = "wire::uint_dec")]
    pub nonce: u64,
    #[serde(with = "wire::uint_dec")]
    pub gas: u64,
    #[serde(with = "wire::uint_dec")]
    pub max_fee_per_gas: u128,
    #[serde(with = "wire::uint_dec")]
    pub max_priority_fee_per_gas: u128,
    #[serde(with = "wire::bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub access_list: Vec<AccessListEntry>,
    #[serde(rename = "type")]
    pub tx_type: TxType,
}

/// Unsigned EIP-155 legacy fields (BNB Smart Chain).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTxFields {
    pub to: String,
    #[serde(with = "wire::u256_dec")]
    pub value: U256,
    pub chain_id: u64,
    #[serde(with = "wire::uint_dec")]
    pub nonce: u64,
    #[serde(with = "wire::uint_dec")]
    pub gas: u64,
    #[serde(with = "wire::uint_dec")]
    pub gas_price: u128,
    #[serde(with = "wire::bytes")]
    pub data: Vec<u8>,
    #[serde(rename = "type")]
    pub tx_type: TxType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmCallPayload {
    pub eth_unsigned_tx_fields: Eip1559TxFields,
    /// `[digest, unsignedPayload]`
    #[serde(with = "wire::signing_pair")]
    pub call_payload: SigningPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BnbCallPayload {
    pub bnb_legacy_tx_fields: LegacyTxFields,
    /// `[digest, unsignedPayload]`
    #[serde(with = "wire::signing_pair")]
    pub call_payload: SigningPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaCallPayload {
    /// Serialized v0 message; the wallet signs exactly these bytes.
    #[serde(with = "wire::bytes")]
    pub call_payload: Vec<u8>,
    /// Last block height at which the message's blockhash is valid.
    #[serde(with = "wire::uint_dec")]
    pub latest_block_height: u64,
}

/// The prepared, unsigned transaction for the sender's network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallPayload {
    Ethereum(EvmCallPayload),
    Base(EvmCallPayload),
    Polygon(EvmCallPayload),
    Optimism(EvmCallPayload),
    Arbitrum(EvmCallPayload),
    Bnb(BnbCallPayload),
    Solana(SolanaCallPayload),
}

impl CallPayload {
    /// Wrap an encoded EVM transaction under the tag for `chain`.
    pub fn from_evm(
        chain: Chain,
        tx: &UnsignedTransaction,
        signing: SigningPayload,
    ) -> Result<CallPayload> {
        let fields = match tx {
            UnsignedTransaction::Eip1559(tx) => {
                let fields = Eip1559TxFields::from(tx);
                let payload = EvmCallPayload {
                    eth_unsigned_tx_fields: fields,
                    call_payload: signing,
                };
                return match chain {
                    Chain::Ethereum => Ok(CallPayload::Ethereum(payload)),
                    Chain::Base => Ok(CallPayload::Base(payload)),
                    Chain::Polygon => Ok(CallPayload::Polygon(payload)),
                    Chain::Optimism => Ok(CallPayload::Optimism(payload)),
                    Chain::Arbitrum => Ok(CallPayload::Arbitrum(payload)),
                    other => Err(TransferError::Codec(format!(
                        "EIP-1559 payload cannot be carried for {other}"
                    ))),
                };
            }
            UnsignedTransaction::Legacy(tx) => LegacyTxFields::from(tx),
        };

        match chain {
            Chain::Bnb => Ok(CallPayload::Bnb(BnbCallPayload {
                bnb_legacy_tx_fields: fields,
                call_payload: signing,
            })),
            other => Err(TransferError::Codec(format!(
                "legacy payload cannot be carried for {other}"
            ))),
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            CallPayload::Ethereum(_) => Chain::Ethereum,
            CallPayload::Base(_) => Chain::Base,
            CallPayload::Polygon(_) => Chain::Polygon,
            CallPayload::Optimism(_) => Chain::Optimism,
            CallPayload::Arbitrum(_) => Chain::Arbitrum,
            CallPayload::Bnb(_) => Chain::Bnb,
            CallPayload::Solana(_) => Chain::Solana,
        }
    }

    /// The bytes handed to the wallet: the Keccak digest for EVM chains,
    /// the serialized message for Solana.
    pub fn signable_bytes(&self) -> &[u8] {
        match self {
            CallPayload::Ethereum(p)
            | CallPayload::Base(p)
            | CallPayload::Polygon(p)
            | CallPayload::Optimism(p)
            | CallPayload::Arbitrum(p) => &p.call_payload.digest,
            CallPayload::Bnb(p) => &p.call_payload.digest,
            CallPayload::Solana(p) => &p.call_payload,
        }
    }

    /// The serialized unsigned transaction the signature is attached to.
    pub fn unsigned_payload(&self) -> &[u8] {
        match self {
            CallPayload::Ethereum(p)
            | CallPayload::Base(p)
            | CallPayload::Polygon(p)
            | CallPayload::Optimism(p)
            | CallPayload::Arbitrum(p) => &p.call_payload.payload,
            CallPayload::Bnb(p) => &p.call_payload.payload,
            CallPayload::Solana(p) => &p.call_payload,
        }
    }

    /// Check the fields agree with the encoded payload they travel with.
    pub fn validate(&self) -> Result<()> {
        match self {
            CallPayload::Ethereum(p)
            | CallPayload::Base(p)
            | CallPayload::Polygon(p)
            | CallPayload::Optimism(p)
            | CallPayload::Arbitrum(p) => {
                if p.eth_unsigned_tx_fields.tx_type != TxType::Eip1559 {
                    return Err(TransferError::Codec(
                        "ethUnsignedTxFields.type must be eip1559".into(),
                    ));
                }
                check_digest(&p.call_payload, TxType::Eip1559)
            }
            CallPayload::Bnb(p) => {
                if p.bnb_legacy_tx_fields.tx_type != TxType::Legacy {
                    return Err(TransferError::Codec(
                        "bnbLegacyTxFields.type must be legacy".into(),
                    ));
                }
                check_digest(&p.call_payload, TxType::Legacy)
            }
            CallPayload::Solana(p) => {
                chain_sol::deserialize_message(&p.call_payload)?;
                Ok(())
            }
        }
    }

    /// Check the encoded transaction moves `amount` of `token` from
    /// `sender` to `receiver`, so the wallet never signs something other
    /// than what the record describes.
    pub fn check_transfer(
        &self,
        sender: &str,
        receiver: &str,
        amount: U256,
        token: &Token,
    ) -> Result<()> {
        if let CallPayload::Solana(p) = self {
            let message = chain_sol::deserialize_message(&p.call_payload)?;
            let sender = chain_sol::address_to_bytes(sender)?;
            if message.fee_payer() != Some(&sender) {
                return Err(TransferError::Validation(
                    "call payload fee payer is not the sender".into(),
                ));
            }
            return Ok(());
        }

        let (to, value, data) = match chain_eth::decode_unsigned(self.unsigned_payload())? {
            UnsignedTransaction::Eip1559(tx) => (tx.to, tx.value, tx.data),
            UnsignedTransaction::Legacy(tx) => (tx.to, tx.value, tx.data),
        };

        let (recipient, moved) = match token.as_fungible() {
            None => {
                if !data.is_empty() {
                    return Err(TransferError::Validation(
                        "native transfer carries call data".into(),
                    ));
                }
                (to, value)
            }
            Some(fungible) => {
                if !same_address(&to, &fungible.address) || !value.is_zero() {
                    return Err(TransferError::Validation(format!(
                        "call payload targets {to}, token contract is {}",
                        fungible.address
                    )));
                }
                chain_eth::erc20::decode_transfer(&data)?
            }
        };

        if !same_address(&recipient, receiver) || moved != amount {
            return Err(TransferError::Validation(format!(
                "call payload sends {moved} to {recipient}, record says {amount} to {receiver}"
            )));
        }
        Ok(())
    }
}

fn check_digest(signing: &SigningPayload, expected: TxType) -> Result<()> {
    chain_eth::transaction::verify_type_marker(&signing.payload, expected)?;
    if chain_eth::transaction::keccak256(&signing.payload) != signing.digest {
        return Err(TransferError::Codec(
            "digest does not match the unsigned payload".into(),
        ));
    }
    Ok(())
}

impl From<&Eip1559Transaction> for Eip1559TxFields {
    fn from(tx: &Eip1559Transaction) -> Self {
        Self {
            to: tx.to.clone(),
            value: tx.value,
            chain_id: tx.chain_id,
            nonce: tx.nonce,
            gas: tx.gas_limit,
            max_fee_per_gas: tx.max_fee_per_gas,
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
            data: tx.data.clone(),
            access_list: Vec::new(),
            tx_type: TxType::Eip1559,
        }
    }
}

impl From<&LegacyTransaction> for LegacyTxFields {
    fn from(tx: &LegacyTransaction) -> Self {
        Self {
            to: tx.to.clone(),
            value: tx.value,
            chain_id: tx.chain_id,
            nonce: tx.nonce,
            gas: tx.gas_limit,
            gas_price: tx.gas_price,
            data: tx.data.clone(),
            tx_type: TxType::Legacy,
        }
    }
}
