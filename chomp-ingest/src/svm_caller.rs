//! Solana account-data ingester, grounded on `src/ingesters/svm_caller.py`
//! and `src/adapters/svm_rpc.py` in `examples/original_source`: batches
//! `getMultipleAccounts` lookups (Solana's 100-account request cap) and
//! exposes each account's base64 payload as a raw field value; decoding
//! the account layout is left to a transformer expression since layouts
//! are program-specific.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use chomp_common::{FieldValue, Ingester};

use crate::chain::ChainRpcPool;
use crate::context::IngestContext;
use crate::epoch::finish_epoch;
use crate::error::IngestError;
use crate::runner::IngesterRunner;

const MAX_BATCH_SIZE: usize = 100;

pub struct SvmCallerRunner {
    pub pool: Arc<ChainRpcPool>,
}

#[async_trait]
impl IngesterRunner for SvmCallerRunner {
    async fn run_epoch(&self, ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
        let mut accounts: Vec<String> = ingester
            .fields
            .iter()
            .filter(|f| !f.target.is_empty())
            .map(|f| f.target.clone())
            .collect();
        accounts.sort();
        accounts.dedup();

        let mut data_by_account: BTreeMap<String, Option<String>> = BTreeMap::new();
        for batch in accounts.chunks(MAX_BATCH_SIZE) {
            let params = json!([batch, { "encoding": "base64" }]);
            if let Ok(result) = self.pool.call("getMultipleAccounts", params, 1).await {
                if let Some(values) = result.get("value").and_then(|v| v.as_array()) {
                    for (account, entry) in batch.iter().zip(values.iter()) {
                        let data = entry
                            .get("data")
                            .and_then(|d| d.as_array())
                            .and_then(|arr| arr.first())
                            .and_then(|v| v.as_str())
                            .map(|s| s.to_string());
                        data_by_account.insert(account.clone(), data);
                    }
                }
            }
        }

        for field in &mut ingester.fields {
            if field.target.is_empty() {
                continue;
            }
            field.value = match data_by_account.get(&field.target) {
                Some(Some(b64)) => FieldValue::String(b64.clone()),
                _ => FieldValue::Null,
            };
        }

        finish_epoch(ctx, ingester).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_accounts_at_the_solana_batch_limit() {
        let accounts: Vec<String> = (0..250).map(|i| i.to_string()).collect();
        let chunks: Vec<_> = accounts.chunks(MAX_BATCH_SIZE).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 50);
    }
}
