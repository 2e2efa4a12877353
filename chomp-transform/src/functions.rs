//! Allow-listed numeric functions, matching the `numpy` subset named in
//! `SAFE_FUNCTIONS['numpy']` of `safe_eval.py`. Polars DataFrame/Series
//! construction is out of scope here since field values are scalars or
//! small lists, not tabular frames (spec.md §4.5 Non-goals).

use crate::error::TransformError;
use crate::value::Value;

pub fn call(name: &str, args: &[Value]) -> Result<Value, TransformError> {
    match name {
        "abs" => unary(name, args, f64::abs),
        "sqrt" => unary(name, args, f64::sqrt),
        "exp" => unary(name, args, f64::exp),
        "log" => unary(name, args, f64::ln),
        "sin" => unary(name, args, f64::sin),
        "cos" => unary(name, args, f64::cos),
        "tan" => unary(name, args, f64::tan),
        "floor" => unary(name, args, f64::floor),
        "ceil" => unary(name, args, f64::ceil),
        "round" => round(args),
        "min" => variadic(name, args, |nums| nums.iter().cloned().fold(f64::INFINITY, f64::min)),
        "max" => variadic(name, args, |nums| nums.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
        "sum" => variadic(name, args, |nums| nums.iter().sum()),
        "mean" => variadic(name, args, |nums| nums.iter().sum::<f64>() / nums.len().max(1) as f64),
        "median" => variadic(name, args, median),
        "std" => variadic(name, args, std_dev),
        "var" => variadic(name, args, variance),
        "clip" => clip(args),
        "len" => len(args),
        other => Err(TransformError::UnknownFunction(other.to_string())),
    }
}

fn expect_one_number(name: &str, args: &[Value]) -> Result<f64, TransformError> {
    if args.len() != 1 {
        return Err(TransformError::ArgCount {
            name: name.to_string(),
            expected: "1".to_string(),
            got: args.len(),
        });
    }
    args[0].as_f64()
}

fn unary(name: &str, args: &[Value], f: impl Fn(f64) -> f64) -> Result<Value, TransformError> {
    Ok(Value::Num(f(expect_one_number(name, args)?)))
}

fn args_as_numbers(args: &[Value]) -> Result<Vec<f64>, TransformError> {
    if args.len() == 1 {
        if let Value::List(items) = &args[0] {
            return items.iter().map(|v| v.as_f64()).collect();
        }
    }
    args.iter().map(|v| v.as_f64()).collect()
}

fn variadic(name: &str, args: &[Value], f: impl Fn(&[f64]) -> f64) -> Result<Value, TransformError> {
    let nums = args_as_numbers(args)?;
    if nums.is_empty() {
        return Err(TransformError::ArgCount {
            name: name.to_string(),
            expected: "at least 1".to_string(),
            got: 0,
        });
    }
    Ok(Value::Num(f(&nums)))
}

fn round(args: &[Value]) -> Result<Value, TransformError> {
    match args.len() {
        1 => Ok(Value::Num(args[0].as_f64()?.round())),
        2 => {
            let n = args[0].as_f64()?;
            let digits = args[1].as_f64()? as i32;
            let factor = 10f64.powi(digits);
            Ok(Value::Num((n * factor).round() / factor))
        }
        got => Err(TransformError::ArgCount {
            name: "round".to_string(),
            expected: "1 or 2".to_string(),
            got,
        }),
    }
}

fn clip(args: &[Value]) -> Result<Value, TransformError> {
    if args.len() != 3 {
        return Err(TransformError::ArgCount {
            name: "clip".to_string(),
            expected: "3".to_string(),
            got: args.len(),
        });
    }
    let v = args[0].as_f64()?;
    let lo = args[1].as_f64()?;
    let hi = args[2].as_f64()?;
    Ok(Value::Num(v.clamp(lo, hi)))
}

fn len(args: &[Value]) -> Result<Value, TransformError> {
    if args.len() != 1 {
        return Err(TransformError::ArgCount {
            name: "len".to_string(),
            expected: "1".to_string(),
            got: args.len(),
        });
    }
    match &args[0] {
        Value::List(items) => Ok(Value::Num(items.len() as f64)),
        Value::Str(s) => Ok(Value::Num(s.chars().count() as f64)),
        other => Err(TransformError::TypeError(format!("len() unsupported for {other:?}"))),
    }
}

fn median(nums: &[f64]) -> f64 {
    let mut sorted = nums.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn variance(nums: &[f64]) -> f64 {
    let mean = nums.iter().sum::<f64>() / nums.len() as f64;
    nums.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / nums.len() as f64
}

fn std_dev(nums: &[f64]) -> f64 {
    variance(nums).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_with_precision() {
        let result = call("round", &[Value::Num(3.14159), Value::Num(2.0)]).unwrap();
        assert_eq!(result, Value::Num(3.14));
    }

    #[test]
    fn mean_over_a_list_literal() {
        let result = call(
            "mean",
            &[Value::List(vec![Value::Num(1.0), Value::Num(2.0), Value::Num(3.0)])],
        )
        .unwrap();
        assert_eq!(result, Value::Num(2.0));
    }

    #[test]
    fn unknown_function_is_rejected() {
        assert!(matches!(
            call("__import__", &[Value::Num(1.0)]),
            Err(TransformError::UnknownFunction(_))
        ));
    }

    #[test]
    fn clip_bounds_a_value() {
        assert_eq!(
            call("clip", &[Value::Num(15.0), Value::Num(0.0), Value::Num(10.0)]).unwrap(),
            Value::Num(10.0)
        );
    }
}
