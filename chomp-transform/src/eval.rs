use std::collections::BTreeMap;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::TransformError;
use crate::functions;
use crate::value::Value;

/// Bindings an expression can see during evaluation: the field's own prior
/// value under the name `value`, any `kwargs`-equivalent injected
/// variables, and sibling ingester field values for `name.field`
/// references (spec.md §4.5).
pub struct Namespace<'a> {
    pub vars: BTreeMap<String, Value>,
    pub fields: BTreeMap<String, BTreeMap<String, Value>>,
    _marker: std::marker::PhantomData<&'a ()>,
}

impl<'a> Namespace<'a> {
    pub fn new() -> Self {
        Namespace {
            vars: BTreeMap::new(),
            fields: BTreeMap::new(),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }
}

impl<'a> Default for Namespace<'a> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn eval(expr: &Expr, ns: &Namespace) -> Result<Value, TransformError> {
    match expr {
        Expr::Num(n) => Ok(Value::Num(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Var(name) => ns
            .vars
            .get(name)
            .cloned()
            .ok_or_else(|| TransformError::UnknownVariable(name.clone())),
        Expr::FieldRef(base, field) => ns
            .fields
            .get(base)
            .and_then(|f| f.get(field))
            .cloned()
            .ok_or_else(|| TransformError::UnknownVariable(format!("{base}.{field}"))),
        Expr::List(items) => {
            let values = items.iter().map(|e| eval(e, ns)).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(values))
        }
        Expr::Unary(op, inner) => {
            let v = eval(inner, ns)?;
            match op {
                UnaryOp::Neg => Ok(Value::Num(-v.as_f64()?)),
                UnaryOp::Not => Ok(Value::Bool(!v.as_bool())),
            }
        }
        Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, ns),
        Expr::Call(name, args) => {
            let values = args.iter().map(|e| eval(e, ns)).collect::<Result<Vec<_>, _>>()?;
            functions::call(name, &values)
        }
    }
}

fn eval_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, ns: &Namespace) -> Result<Value, TransformError> {
    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        let l = eval(lhs, ns)?;
        return match op {
            BinaryOp::And => {
                if !l.as_bool() {
                    Ok(l)
                } else {
                    eval(rhs, ns)
                }
            }
            BinaryOp::Or => {
                if l.as_bool() {
                    Ok(l)
                } else {
                    eval(rhs, ns)
                }
            }
            _ => unreachable!(),
        };
    }

    let l = eval(lhs, ns)?;
    let r = eval(rhs, ns)?;

    match op {
        BinaryOp::Add => {
            if let (Value::Str(a), Value::Str(b)) = (&l, &r) {
                return Ok(Value::Str(format!("{a}{b}")));
            }
            Ok(Value::Num(l.as_f64()? + r.as_f64()?))
        }
        BinaryOp::Sub => Ok(Value::Num(l.as_f64()? - r.as_f64()?)),
        BinaryOp::Mul => Ok(Value::Num(l.as_f64()? * r.as_f64()?)),
        BinaryOp::Div => {
            let denom = r.as_f64()?;
            if denom == 0.0 {
                return Err(TransformError::DivisionByZero);
            }
            Ok(Value::Num(l.as_f64()? / denom))
        }
        BinaryOp::Mod => Ok(Value::Num(l.as_f64()? % r.as_f64()?)),
        BinaryOp::Pow => Ok(Value::Num(l.as_f64()?.powf(r.as_f64()?))),
        BinaryOp::Eq => Ok(Value::Bool(l == r)),
        BinaryOp::Ne => Ok(Value::Bool(l != r)),
        BinaryOp::Lt => Ok(Value::Bool(l.as_f64()? < r.as_f64()?)),
        BinaryOp::Le => Ok(Value::Bool(l.as_f64()? <= r.as_f64()?)),
        BinaryOp::Gt => Ok(Value::Bool(l.as_f64()? > r.as_f64()?)),
        BinaryOp::Ge => Ok(Value::Bool(l.as_f64()? >= r.as_f64()?)),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn eval_str(src: &str, ns: &Namespace) -> Value {
        eval(&Parser::parse(src).unwrap(), ns).unwrap()
    }

    #[test]
    fn evaluates_arithmetic() {
        let ns = Namespace::new();
        assert_eq!(eval_str("1 + 2 * 3", &ns), Value::Num(7.0));
    }

    #[test]
    fn evaluates_with_injected_variable() {
        let ns = Namespace::new().with_var("x", Value::Num(10.0));
        assert_eq!(eval_str("x * 2", &ns), Value::Num(20.0));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let ns = Namespace::new();
        assert_eq!(
            eval(&Parser::parse("1 / 0").unwrap(), &ns),
            Err(TransformError::DivisionByZero)
        );
    }

    #[test]
    fn short_circuits_and() {
        let ns = Namespace::new();
        // `unknown` would error if evaluated; `and` must short-circuit past it.
        assert_eq!(eval_str("False and unknown", &ns), Value::Bool(false));
    }

    #[test]
    fn resolves_field_reference() {
        let mut ns = Namespace::new();
        let mut btc = BTreeMap::new();
        btc.insert("usd".to_string(), Value::Num(64000.0));
        ns.fields.insert("btc_price".to_string(), btc);
        assert_eq!(eval_str("btc_price.usd", &ns), Value::Num(64000.0));
    }
}
