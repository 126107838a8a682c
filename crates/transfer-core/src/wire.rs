//! Transport-safe JSON form of a transfer record.
//!
//! The relay and the browser side speak JSON, which has no byte strings and
//! no integers above 2^53. On the wire, byte fields become arrays of
//! integers and big unsigned integers become decimal strings. Everything
//! else is plain serde.
//!
//! Decoding is lenient about how a byte field arrives, since JavaScript
//! clients serialize `Uint8Array`s and Node `Buffer`s differently:
//!
//! ```text
//! [1, 2, 3]                              plain array
//! {"type": "Buffer", "data": [1, 2, 3]}  Node Buffer.toJSON()
//! {"0": 1, "1": 2, "2": 3}               JSON.stringify(Uint8Array)
//! ```
//!
//! Any other shape is an error.

use serde_json::Value;

use crate::error::{Result, TransferError};
use crate::state::TxStateMachine;

/// A record in its transport representation.
pub type WireRecord = Value;

/// Encode a record for transport.
pub fn to_wire(record: &TxStateMachine) -> Result<WireRecord> {
    Ok(serde_json::to_value(record)?)
}

/// Decode a record from transport and check its invariants.
pub fn from_wire(wire: WireRecord) -> Result<TxStateMachine> {
    let record: TxStateMachine = serde_json::from_value(wire)?;
    record.validate()?;
    Ok(record)
}

pub fn to_wire_string(record: &TxStateMachine) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

pub fn from_wire_str(body: &str) -> Result<TxStateMachine> {
    let wire: Value = serde_json::from_str(body)?;
    from_wire(wire)
}

/// Read a byte field from any of the accepted JSON shapes.
pub fn bytes_from_value(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| byte_at(i, item))
            .collect(),
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("Buffer") {
                let data = map.get("data").ok_or_else(|| {
                    TransferError::Codec("Buffer object without a data field".into())
                })?;
                if !data.is_array() {
                    return Err(TransferError::Codec("Buffer data is not an array".into()));
                }
                return bytes_from_value(data);
            }

            let mut indexed = Vec::with_capacity(map.len());
            for (key, item) in map {
                let index: usize = key.parse().map_err(|_| {
                    TransferError::Codec(format!("unexpected key {key:?} in byte object"))
                })?;
                indexed.push((index, item));
            }
            indexed.sort_by_key(|(index, _)| *index);

            indexed
                .into_iter()
                .enumerate()
                .map(|(expected, (index, item))| {
                    if index != expected {
                        return Err(TransferError::Codec(format!(
                            "byte object is missing index {expected}"
                        )));
                    }
                    byte_at(index, item)
                })
                .collect()
        }
        other => Err(TransferError::Codec(format!(
            "expected a byte array, got {}",
            json_type(other)
        ))),
    }
}

fn byte_at(index: usize, item: &Value) -> Result<u8> {
    item.as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| TransferError::Codec(format!("byte {index} is not an integer 0..=255: {item}")))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `Vec<u8>` as an integer array.
pub mod bytes {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let value = Value::deserialize(d)?;
        super::bytes_from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// `Option<Vec<u8>>` as an integer array or null.
pub mod opt_bytes {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => s.collect_seq(bytes),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            value => super::bytes_from_value(&value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// `U256` as a decimal string. Also accepts `0x` hex strings and small
/// JSON integers.
pub mod u256_dec {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        use serde::de::Error;

        match Value::deserialize(d)? {
            Value::String(s) => s
                .parse::<U256>()
                .map_err(|e| D::Error::custom(format!("invalid integer {s:?}: {e}"))),
            Value::Number(n) => n
                .as_u64()
                .map(U256::from)
                .ok_or_else(|| D::Error::custom(format!("{n} is not an unsigned integer"))),
            other => Err(D::Error::custom(format!(
                "expected an integer string, got {other}"
            ))),
        }
    }
}

/// Unsigned machine integers (`u64`, `u128`) as decimal strings.
pub mod uint_dec {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<T: Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(d: D) -> Result<T, D::Error>
    where
        T: FromStr + TryFrom<u64>,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        match Value::deserialize(d)? {
            Value::String(s) => s
                .parse::<T>()
                .map_err(|e| D::Error::custom(format!("invalid integer {s:?}: {e}"))),
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| T::try_from(n).ok())
                .ok_or_else(|| D::Error::custom(format!("{n} is not an unsigned integer"))),
            other => Err(D::Error::custom(format!(
                "expected an integer string, got {other}"
            ))),
        }
    }
}

/// An EVM signing payload as `[digest, unsignedPayload]`.
pub mod signing_pair {
    use chain_eth::SigningPayload;
    use serde::ser::SerializeTuple;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    struct Bytes<'a>(&'a [u8]);

    impl Serialize for Bytes<'_> {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.collect_seq(self.0)
        }
    }

    pub fn serialize<S: Serializer>(pair: &SigningPayload, s: S) -> Result<S::Ok, S::Error> {
        let mut tuple = s.serialize_tuple(2)?;
        tuple.serialize_element(&Bytes(&pair.digest))?;
        tuple.serialize_element(&Bytes(&pair.payload))?;
        tuple.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SigningPayload, D::Error> {
        use serde::de::Error;

        let (digest, payload) = <(Value, Value)>::deserialize(d)?;
        let digest = super::bytes_from_value(&digest).map_err(D::Error::custom)?;
        let digest: [u8; 32] = digest
            .try_into()
            .map_err(|v: Vec<u8>| D::Error::custom(format!("digest is {} bytes, expected 32", v.len())))?;
        let payload = super::bytes_from_value(&payload).map_err(D::Error::custom)?;

        Ok(SigningPayload { digest, payload })
    }
}
