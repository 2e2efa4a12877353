//! Applies a field's ordered transformer expressions to its freshly fetched
//! value (spec.md §4.5 "Transformer pipeline"), each step feeding the next
//! via the implicit `value` binding.

use std::collections::BTreeMap;

use chomp_common::{Field, Ingester};

use crate::compiler::TransformerCompiler;
use crate::error::TransformError;
use crate::eval::{eval, Namespace};
use crate::value::Value;

/// Runs `field`'s transformer chain against its current raw value, threading
/// the running result through `value` and exposing sibling fields of
/// `ingester` by name for cross-field expressions.
pub fn apply_transformers(
    compiler: &TransformerCompiler,
    field: &Field,
    raw: Value,
    siblings: &Ingester,
) -> Result<Value, TransformError> {
    let mut current = raw;
    for expr_src in &field.transformers {
        let expr = compiler.compile(expr_src)?;
        let mut ns = Namespace::new().with_var("value", current.clone());
        ns.fields.insert(
            field.name.clone(),
            BTreeMap::from([("value".to_string(), current.clone())]),
        );
        for other in &siblings.fields {
            if other.name == field.name {
                continue;
            }
            let mut entry = BTreeMap::new();
            entry.insert("value".to_string(), Value::from_field_value(&other.value));
            ns.fields.insert(other.name.clone(), entry);
        }
        current = eval(&expr, &ns)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chomp_common::{FieldType, IngesterType, ResourceType};

    #[test]
    fn chains_two_transformers_in_order() {
        let compiler = TransformerCompiler::new();
        let mut field = Field::new("usd_cents", FieldType::Float64, "http://x", ".data.usd");
        field.transformers = vec!["value * 100".to_string(), "round(value)".to_string()];
        let ingester = Ingester::new("px", IngesterType::HttpApi, ResourceType::Timeseries, "m1".parse().unwrap());
        let result = apply_transformers(&compiler, &field, Value::Num(1.005), &ingester).unwrap();
        assert_eq!(result, Value::Num(101.0));
    }

    #[test]
    fn no_transformers_passes_value_through() {
        let compiler = TransformerCompiler::new();
        let field = Field::new("usd", FieldType::Float64, "http://x", ".data.usd");
        let ingester = Ingester::new("px", IngesterType::HttpApi, ResourceType::Timeseries, "m1".parse().unwrap());
        let result = apply_transformers(&compiler, &field, Value::Num(42.0), &ingester).unwrap();
        assert_eq!(result, Value::Num(42.0));
    }
}
