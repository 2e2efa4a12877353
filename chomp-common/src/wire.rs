//! Wire codec for cache values and pub/sub payloads.
//!
//! spec.md §4.1 leaves the on-wire encoding as a "MUST pick one"; the
//! original implementation pickles Python objects, which has no portable
//! Rust equivalent. We settle on MessagePack (`rmp-serde`) since it's a
//! compact self-describing binary format that round-trips serde types
//! without a schema, matching what the pickle encoding bought the original
//! for free.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to encode value: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode value: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        value: f64,
    }

    #[test]
    fn round_trips_a_struct() {
        let original = Sample {
            name: "btc_usd".to_string(),
            value: 64_000.5,
        };
        let bytes = encode(&original).unwrap();
        let decoded: Sample = decode(&bytes).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn decode_of_garbage_fails() {
        let result: Result<Sample, _> = decode(&[0xff, 0x00, 0x01]);
        assert!(result.is_err());
    }
}
