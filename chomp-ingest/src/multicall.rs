//! Multicall3 batching for `evm_caller` (spec.md §4.6.5, Glossary
//! "Multicall"). Grounded on the canonical Multicall3 deployment
//! (deployed at the same address via a deterministic deployer on most EVM
//! chains, https://github.com/mds1/multicall) — the original
//! `examples/original_source/src/ingesters/evm_caller.py` delegates this
//! batching to a third-party `evm_multicall` library it vendors; this
//! reimplements the same `aggregate3` call shape directly against `ethabi`
//! since no such library is in the dependency graph here.

use ethabi::{decode, encode, ParamType, Token};

use crate::error::IngestError;

/// `aggregate3((address,bool,bytes)[])` selector. A fixed ABI constant —
/// no runtime keccak is needed for a signature this well known.
const AGGREGATE3_SELECTOR: &str = "82ad56cb";

/// Canonical Multicall3 address, deployed at the same address on nearly
/// every EVM chain. Chains that deploy it elsewhere can be added here as
/// they're discovered to need an override.
const DEFAULT_MULTICALL3: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

pub fn multicall3_address(_chain_id: &str) -> &'static str {
    DEFAULT_MULTICALL3
}

pub struct Call3 {
    pub target: String,
    pub calldata: Vec<u8>,
}

/// Builds the `eth_call` calldata for one `aggregate3` batch, `allowFailure`
/// set on every sub-call so one bad field can't fail the others (spec.md
/// §4.6.5: "errors in individual sub-calls yield null for that field
/// without failing the batch").
pub fn encode_aggregate3(calls: &[Call3]) -> Result<String, IngestError> {
    let tokens: Vec<Token> = calls
        .iter()
        .map(|c| {
            let address = c
                .target
                .trim_start_matches("0x")
                .parse::<ethabi::Address>()
                .map_err(|e| IngestError::Abi(format!("bad multicall target {}: {e}", c.target)))?;
            Ok(Token::Tuple(vec![
                Token::Address(address),
                Token::Bool(true),
                Token::Bytes(c.calldata.clone()),
            ]))
        })
        .collect::<Result<_, IngestError>>()?;
    let encoded = encode(&[Token::Array(tokens)]);
    Ok(format!("0x{AGGREGATE3_SELECTOR}{}", hex::encode(encoded)))
}

/// Decodes an `aggregate3` return value into `(success, return_data)` per
/// call, in call order (spec.md §4.6.5: "results are fanned back out by
/// field").
pub fn decode_aggregate3(result_hex: &str) -> Result<Vec<(bool, Vec<u8>)>, IngestError> {
    let bytes = hex::decode(result_hex.trim_start_matches("0x")).map_err(|e| IngestError::Abi(e.to_string()))?;
    let output_types = vec![ParamType::Array(Box::new(ParamType::Tuple(vec![
        ParamType::Bool,
        ParamType::Bytes,
    ])))];
    let tokens = decode(&output_types, &bytes).map_err(|e| IngestError::Abi(e.to_string()))?;
    let Some(Token::Array(results)) = tokens.into_iter().next() else {
        return Err(IngestError::Abi("aggregate3 return was not an array".to_string()));
    };
    let mut out = Vec::with_capacity(results.len());
    for token in results {
        let Token::Tuple(entry) = token else {
            return Err(IngestError::Abi("aggregate3 entry was not a tuple".to_string()));
        };
        let success = entry.first().and_then(|t| t.clone().into_bool()).unwrap_or(false);
        let data = entry.get(1).and_then(|t| t.clone().into_bytes()).unwrap_or_default();
        out.push((success, data));
    }
    Ok(out)
}

/// Parses an evm_caller field selector of the form
/// `<4-byte-sig>(<output_type1>,<output_type2>,...)` into the raw
/// 4-byte selector and the output ABI types to decode each sub-call's
/// return data with (spec.md §4.6.5: "typed outputs").
pub fn parse_selector(selector: &str) -> Result<(Vec<u8>, Vec<ParamType>), IngestError> {
    let open = selector
        .find('(')
        .ok_or_else(|| IngestError::Abi(format!("selector '{selector}' is missing '('")))?;
    let close = selector
        .rfind(')')
        .ok_or_else(|| IngestError::Abi(format!("selector '{selector}' is missing ')'")))?;
    let sig_hex = selector[..open].trim_start_matches("0x");
    let sig_bytes = hex::decode(sig_hex).map_err(|e| IngestError::Abi(format!("bad selector hex: {e}")))?;
    let types_str = &selector[open + 1..close];
    let output_types = if types_str.trim().is_empty() {
        Vec::new()
    } else {
        types_str
            .split(',')
            .map(|t| parse_param_type(t.trim()))
            .collect::<Result<Vec<_>, _>>()?
    };
    Ok((sig_bytes, output_types))
}

/// A minimal Solidity ABI type-name parser covering the primitives
/// `evm_caller` fields actually declare: no tuples, no nested arrays.
fn parse_param_type(name: &str) -> Result<ParamType, IngestError> {
    match name {
        "address" => Ok(ParamType::Address),
        "bool" => Ok(ParamType::Bool),
        "string" => Ok(ParamType::String),
        "bytes" => Ok(ParamType::Bytes),
        _ if name.starts_with("uint") => {
            let bits = name[4..].parse::<usize>().unwrap_or(256);
            Ok(ParamType::Uint(bits))
        }
        _ if name.starts_with("int") => {
            let bits = name[3..].parse::<usize>().unwrap_or(256);
            Ok(ParamType::Int(bits))
        }
        _ if name.starts_with("bytes") => {
            let size = name[5..]
                .parse::<usize>()
                .map_err(|_| IngestError::Abi(format!("bad fixed-bytes type '{name}'")))?;
            Ok(ParamType::FixedBytes(size))
        }
        other => Err(IngestError::Abi(format!("unsupported ABI output type '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_uint256_output_selector() {
        let (sig, outputs) = parse_selector("0x70a08231(uint256)").unwrap();
        assert_eq!(sig, vec![0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(outputs, vec![ParamType::Uint(256)]);
    }

    #[test]
    fn parses_multiple_output_types() {
        let (_, outputs) = parse_selector("0x0902f1ac(uint112,uint112,uint32)").unwrap();
        assert_eq!(outputs, vec![ParamType::Uint(112), ParamType::Uint(112), ParamType::Uint(32)]);
    }

    #[test]
    fn encode_aggregate3_prefixes_the_well_known_selector() {
        let calls = vec![Call3 {
            target: "0x0000000000000000000000000000000000000001".to_string(),
            calldata: vec![0x12, 0x34, 0x56, 0x78],
        }];
        let calldata = encode_aggregate3(&calls).unwrap();
        assert!(calldata.starts_with("0x82ad56cb"));
    }

    #[test]
    fn decode_aggregate3_round_trips_success_and_failure_entries() {
        let fake_return = encode(&[Token::Array(vec![
            Token::Tuple(vec![Token::Bool(true), Token::Bytes(vec![0u8; 31].into_iter().chain([42]).collect())]),
            Token::Tuple(vec![Token::Bool(false), Token::Bytes(Vec::new())]),
        ])]);
        let hex_result = format!("0x{}", hex::encode(fake_return));
        let decoded = decode_aggregate3(&hex_result).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].0);
        assert!(!decoded[1].0);
    }
}
