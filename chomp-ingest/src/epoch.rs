//! Shared epoch lifecycle: claim -> (fetch, per ingester type) -> transform
//! -> persist -> publish (spec.md §3 "Ingester lifecycle"). Each concrete
//! ingester type implements only the fetch step and calls
//! [`finish_epoch`] with the raw values it collected.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use chomp_common::{Field, FieldValue, Ingester};
use chomp_transform::Value as TransformValue;

use crate::context::IngestContext;
use crate::error::IngestError;

pub fn json_to_field_value(v: &JsonValue) -> FieldValue {
    match v {
        JsonValue::Null => FieldValue::Null,
        JsonValue::Bool(b) => FieldValue::Bool(*b),
        JsonValue::Number(n) => n
            .as_i64()
            .map(FieldValue::Int)
            .unwrap_or_else(|| FieldValue::Float(n.as_f64().unwrap_or(0.0))),
        JsonValue::String(s) => FieldValue::String(s.clone()),
        JsonValue::Array(items) => {
            let map: BTreeMap<String, FieldValue> = items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), json_to_field_value(v)))
                .collect();
            FieldValue::Map(map)
        }
        JsonValue::Object(obj) => {
            let map: BTreeMap<String, FieldValue> =
                obj.iter().map(|(k, v)| (k.clone(), json_to_field_value(v))).collect();
            FieldValue::Map(map)
        }
    }
}

/// Runs each field's transformer chain against its freshly assigned raw
/// value, in place (spec.md §4.5).
pub fn transform_fields(ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
    let snapshot = ingester.clone();
    for field in &mut ingester.fields {
        if field.transformers.is_empty() {
            continue;
        }
        let raw = TransformValue::from_field_value(&field.value);
        let result = chomp_transform::apply_transformers(&ctx.compiler, field, raw, &snapshot)?;
        field.value = result.into_field_value();
    }
    Ok(())
}

/// Logs and returns the names of fields still null after transformation
/// (spec.md §7 kind 3, "missing fields" warning).
pub fn log_missing_fields(ingester: &Ingester) -> Vec<String> {
    let missing: Vec<String> = ingester.missing_fields().into_iter().map(|s| s.to_string()).collect();
    if !missing.is_empty() {
        warn!(ingester = %ingester.name, fields = ?missing, "missing fields after fetch/transform");
    }
    missing
}

/// Transforms, persists, and caches the current epoch's values, then clears
/// transient state for the next epoch (spec.md §3 lifecycle steps 4-6).
///
/// `value`-resource ingesters skip storage entirely (Glossary: "value ...
/// cache-only, never persisted to storage"). A storage failure for the
/// others is logged, not propagated — the cache write and publish below
/// still happen and the epoch counts as partial (spec.md §7 kind 5).
pub async fn finish_epoch(ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
    transform_fields(ctx, ingester)?;
    log_missing_fields(ingester);

    if ingester.resource_type.is_persisted() {
        if let Err(e) = ctx.storage.ensure_schema(ingester).await {
            warn!(ingester = %ingester.name, error = %e, "storage schema setup failed, epoch continues as partial");
        } else if let Err(e) = ctx.storage.insert(ingester).await {
            warn!(ingester = %ingester.name, error = %e, "storage insert failed, epoch continues as partial");
        }
    }

    let snapshot: BTreeMap<String, FieldValue> = ingester
        .fields
        .iter()
        .map(|f| (f.name.clone(), f.value.clone()))
        .collect();
    ctx.cache
        .cache(&ingester.name, &snapshot, Duration::from_secs(chomp_cache::bus::YEAR_SECONDS))
        .await?;
    ctx.cache.publish(&ingester.name, &snapshot).await?;

    info!(ingester = %ingester.name, "epoch complete");
    ingester.clear_fields_for_epoch();
    Ok(())
}

pub fn field_target_url(field: &Field, ctx_values: &BTreeMap<String, FieldValue>) -> String {
    let mut url = field.target.clone();
    for (name, value) in ctx_values {
        url = url.replace(&format!("{{{name}}}"), &value.to_string());
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_nested_json_object() {
        let v = json!({"usd": 64000.5, "eur": 59000.1});
        let fv = json_to_field_value(&v);
        match fv {
            FieldValue::Map(m) => {
                assert_eq!(m.get("usd"), Some(&FieldValue::Float(64000.5)));
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn converts_integral_number_without_losing_int_type() {
        assert_eq!(json_to_field_value(&json!(42)), FieldValue::Int(42));
    }
}
