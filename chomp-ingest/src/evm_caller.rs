//! EVM multicall ingester, grounded on `src/ingesters/evm_caller.py` and
//! `src/adapters/evm_rpc.py` in `examples/original_source`. The original
//! batches calls through a vendored `evm_multicall` library; this batches
//! the same way directly against [`crate::multicall`] and `ethabi`, since
//! no such library is in the dependency graph here.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ethabi::{ParamType, Token};
use serde_json::json;
use tracing::warn;

use chomp_common::{Field, FieldValue, Ingester};

use crate::chain::EvmChainPools;
use crate::context::IngestContext;
use crate::epoch::finish_epoch;
use crate::error::IngestError;
use crate::multicall::{self, Call3};
use crate::runner::IngesterRunner;

fn token_to_field_value(token: &Token) -> FieldValue {
    match token {
        Token::Uint(v) | Token::Int(v) => FieldValue::String(v.to_string()),
        Token::Bool(b) => FieldValue::Bool(*b),
        Token::String(s) => FieldValue::String(s.clone()),
        Token::Address(a) => FieldValue::String(format!("{a:#x}")),
        Token::Bytes(b) | Token::FixedBytes(b) => FieldValue::String(hex::encode(b)),
        other => FieldValue::String(format!("{other:?}")),
    }
}

fn tokens_to_field_value(tokens: &[Token]) -> FieldValue {
    match tokens {
        [] => FieldValue::Null,
        [single] => token_to_field_value(single),
        many => FieldValue::Map(
            many.iter()
                .enumerate()
                .map(|(i, t)| (i.to_string(), token_to_field_value(t)))
                .collect(),
        ),
    }
}

/// Ports `EvmRpcClient._encode_param` (`examples/original_source/src/adapters/evm_rpc.py`):
/// non-negative integers are big-endian padded to 32 bytes, everything
/// else (a `0x...` literal or a plain string) is hex-padded the same way.
fn encode_param(param: &str) -> [u8; 32] {
    if let Ok(n) = param.parse::<u128>() {
        let mut buf = [0u8; 32];
        buf[16..].copy_from_slice(&n.to_be_bytes());
        return buf;
    }
    let hex_body = param.strip_prefix("0x").map(str::to_string).unwrap_or_else(|| hex::encode(param.as_bytes()));
    let padded = format!("{hex_body:0>64}");
    let mut buf = [0u8; 32];
    let tail = &padded[padded.len().saturating_sub(64)..];
    if let Ok(bytes) = hex::decode(tail) {
        if bytes.len() == 32 {
            buf.copy_from_slice(&bytes);
        }
    }
    buf
}

fn ordered_param_values(params: &BTreeMap<String, String>) -> Vec<&String> {
    let mut entries: Vec<(&String, &String)> = params.iter().collect();
    entries.sort_by_key(|(k, _)| k.parse::<usize>().unwrap_or(usize::MAX));
    entries.into_iter().map(|(_, v)| v).collect()
}

fn field_calldata(field: &Field, sig_bytes: &[u8]) -> Vec<u8> {
    let mut calldata = sig_bytes.to_vec();
    for value in ordered_param_values(&field.params) {
        calldata.extend_from_slice(&encode_param(value));
    }
    calldata
}

pub struct EvmCallerRunner {
    pub pools: Arc<EvmChainPools>,
}

#[async_trait]
impl IngesterRunner for EvmCallerRunner {
    async fn run_epoch(&self, ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
        // Group field indices by chain id, skipping duplicate targets the
        // way `evm_caller.py`'s `unique_calls` set does.
        let mut by_chain: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut seen_target_ids = std::collections::HashSet::new();
        for (i, field) in ingester.fields.iter().enumerate() {
            if field.target.is_empty() || field.selector.is_empty() {
                continue;
            }
            if !seen_target_ids.insert(field.target_id().to_string()) {
                warn!(ingester = %ingester.name, field = %field.name, "duplicate evm_caller target, skipping");
                continue;
            }
            let Some((chain_id, _)) = field.target.split_once(':') else {
                warn!(ingester = %ingester.name, field = %field.name, target = %field.target, "target is not '<chain_id>:<address>'");
                continue;
            };
            by_chain.entry(chain_id.to_string()).or_default().push(i);
        }

        for (chain_id, indices) in by_chain {
            let Some(pool) = self.pools.get(&chain_id) else {
                warn!(ingester = %ingester.name, chain_id = %chain_id, "no RPC pool configured for chain, fields left null");
                continue;
            };

            let mut calls = Vec::with_capacity(indices.len());
            let mut outputs_by_index = Vec::with_capacity(indices.len());
            for &i in &indices {
                let field = &ingester.fields[i];
                let (_, address) = field.target.split_once(':').expect("validated above");
                let Ok((sig_bytes, output_types)) = multicall::parse_selector(&field.selector) else {
                    warn!(ingester = %ingester.name, field = %field.name, "unparseable evm_caller selector");
                    continue;
                };
                calls.push(Call3 {
                    target: address.to_string(),
                    calldata: field_calldata(field, &sig_bytes),
                });
                outputs_by_index.push((i, output_types));
            }
            if calls.is_empty() {
                continue;
            }

            let calldata = match multicall::encode_aggregate3(&calls) {
                Ok(c) => c,
                Err(e) => {
                    warn!(ingester = %ingester.name, chain_id = %chain_id, error = %e, "failed to encode multicall");
                    continue;
                }
            };
            let params = json!([
                { "to": multicall::multicall3_address(&chain_id), "data": calldata },
                "latest",
            ]);

            let decoded = match pool.call("eth_call", params, 1).await {
                Ok(result) => result
                    .as_str()
                    .ok_or_else(|| IngestError::Abi("eth_call result was not a string".to_string()))
                    .and_then(multicall::decode_aggregate3),
                Err(e) => Err(e),
            };

            let Ok(decoded) = decoded else {
                warn!(ingester = %ingester.name, chain_id = %chain_id, "multicall failed, fields left null");
                continue;
            };

            for ((i, output_types), (success, return_data)) in outputs_by_index.into_iter().zip(decoded) {
                let value = if success {
                    ethabi::decode(&output_types, &return_data)
                        .ok()
                        .map(|tokens| tokens_to_field_value(&tokens))
                        .unwrap_or(FieldValue::Null)
                } else {
                    FieldValue::Null
                };
                ingester.fields[i].value = value;
            }
        }

        finish_epoch(ctx, ingester).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_param_pads_a_small_integer_to_32_bytes() {
        let word = encode_param("42");
        assert_eq!(word[31], 42);
        assert!(word[..31].iter().all(|b| *b == 0));
    }

    #[test]
    fn encode_param_left_pads_a_hex_address() {
        let word = encode_param("0x000000000000000000000000000000000000aa");
        assert_eq!(word[31], 0xaa);
    }

    #[test]
    fn ordered_param_values_sorts_numerically_not_lexically() {
        let mut params = BTreeMap::new();
        params.insert("10".to_string(), "b".to_string());
        params.insert("2".to_string(), "a".to_string());
        assert_eq!(ordered_param_values(&params), vec!["a", "b"]);
    }

    #[test]
    fn tokens_to_field_value_collapses_single_output() {
        assert_eq!(
            tokens_to_field_value(&[Token::Bool(true)]),
            FieldValue::Bool(true)
        );
    }

    #[test]
    fn tokens_to_field_value_maps_multiple_outputs_by_index() {
        let value = tokens_to_field_value(&[Token::Bool(true), Token::Bool(false)]);
        match value {
            FieldValue::Map(m) => {
                assert_eq!(m.get("0"), Some(&FieldValue::Bool(true)));
                assert_eq!(m.get("1"), Some(&FieldValue::Bool(false)));
            }
            other => panic!("expected map, got {other:?}"),
        }
    }
}
