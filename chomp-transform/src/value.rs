use chomp_common::FieldValue;

use crate::error::TransformError;

/// The evaluator's runtime value, distinct from [`chomp_common::FieldValue`]
/// since expressions transiently need list values (e.g. `mean([1,2,3])`)
/// that a persisted field never holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
    Null,
}

impl Value {
    pub fn as_f64(&self) -> Result<f64, TransformError> {
        match self {
            Value::Num(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Str(s) => s
                .parse()
                .map_err(|_| TransformError::TypeError(format!("cannot coerce '{s}' to a number"))),
            other => Err(TransformError::TypeError(format!("expected a number, got {other:?}"))),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0,
            Value::Null => false,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
        }
    }

    pub fn from_field_value(fv: &FieldValue) -> Value {
        match fv {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::Num(*i as f64),
            FieldValue::Float(f) => Value::Num(*f),
            FieldValue::String(s) => Value::Str(s.clone()),
            FieldValue::Bytes(b) => Value::Str(hex::encode(b)),
            FieldValue::Map(_) => Value::Null,
        }
    }

    pub fn into_field_value(self) -> FieldValue {
        match self {
            Value::Num(n) => FieldValue::Float(n),
            Value::Str(s) => FieldValue::String(s),
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Null => FieldValue::Null,
            Value::List(_) => FieldValue::Null,
        }
    }
}
