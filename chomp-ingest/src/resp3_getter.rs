//! RESP3 point-read ingester, grounded on `src/ingesters/resp3_getter.py`
//! in `examples/original_source`. Unlike the original's hand-rolled RESP3
//! parser, this reuses the `redis` crate already in the dependency graph
//! (via chomp-cache) against the field's own target server rather than the
//! internal cache bus — each field's `target` is a `redis://` connection
//! URL and `selector` is the command to run (e.g. `GET price:btc`).

use async_trait::async_trait;
use redis::AsyncCommands;

use chomp_common::{FieldValue, Ingester};

use crate::context::IngestContext;
use crate::epoch::finish_epoch;
use crate::error::IngestError;
use crate::runner::IngesterRunner;

fn parse_command(selector: &str) -> Vec<String> {
    selector.split_whitespace().map(|s| s.to_string()).collect()
}

async fn run_get(target: &str, selector: &str) -> Result<FieldValue, IngestError> {
    let parts = parse_command(selector);
    let (cmd, rest) = match parts.split_first() {
        Some((cmd, rest)) => (cmd.clone(), rest.to_vec()),
        None => return Ok(FieldValue::Null),
    };
    let client = redis::Client::open(target).map_err(|e| IngestError::Other(e.into()))?;
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| IngestError::Other(e.into()))?;

    let value: Option<String> = if cmd.eq_ignore_ascii_case("get") {
        conn.get(&rest[0]).await.map_err(|e| IngestError::Other(e.into()))?
    } else {
        let mut c = redis::cmd(&cmd);
        for arg in &rest {
            c.arg(arg);
        }
        c.query_async(&mut conn).await.map_err(|e| IngestError::Other(e.into()))?
    };

    Ok(match value {
        Some(s) => s
            .parse::<f64>()
            .map(FieldValue::Float)
            .unwrap_or(FieldValue::String(s)),
        None => FieldValue::Null,
    })
}

#[derive(Default)]
pub struct Resp3GetterRunner;

#[async_trait]
impl IngesterRunner for Resp3GetterRunner {
    async fn run_epoch(&self, ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
        for field in &mut ingester.fields {
            if field.target.is_empty() || field.selector.is_empty() {
                continue;
            }
            field.value = run_get(&field.target, &field.selector).await.unwrap_or(FieldValue::Null);
        }
        finish_epoch(ctx, ingester).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_command_into_parts() {
        assert_eq!(parse_command("GET price:btc"), vec!["GET".to_string(), "price:btc".to_string()]);
    }
}
