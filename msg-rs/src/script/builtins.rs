//! Built-in functions and methods for sandboxed scripts.
//!
//! Free functions receive a `Vec<Value>` of already-evaluated arguments and
//! return `Result<Value, String>`.  A `Math.` or `_.` namespace prefix is
//! accepted and ignored, so `Math.floor(x)`, `_.sample(list)` and `floor(x)`
//! all reach the same implementation.  Methods (`"abc".toUpperCase()`) are
//! dispatched on the receiver's kind by [`call_method`].

use rand::seq::SliceRandom;
use rand::Rng;

use super::value::Value;

/// Longest string a method may build.
const MAX_STRING: usize = 64 * 1024;

/// Dispatch a built-in function call.
///
/// Returns `None` if `name` is not a built-in.
pub fn call_builtin(name: &str, args: Vec<Value>) -> Option<Result<Value, String>> {
    // Ok(None) → not a builtin, Ok(Some(v)) → success, Err(e) → call failed.
    fn inner(name: &str, args: Vec<Value>) -> Result<Option<Value>, String> {
        let bare = name
            .strip_prefix("Math.")
            .or_else(|| name.strip_prefix("_."))
            .unwrap_or(name);
        Ok(Some(match bare {
            // ── Math ─────────────────────────────────────────────────────────
            "abs" => match first(&args, name)? {
                Value::Int(n) => n.checked_abs().map_or(Value::Float((n as f64).abs()), Value::Int),
                other => Value::Float(other.as_float().abs()),
            },
            "floor" => int_or_float(get_float(&args, 0, name)?.floor()),
            "ceil" => int_or_float(get_float(&args, 0, name)?.ceil()),
            "round" => int_or_float(get_float(&args, 0, name)?.round()),
            "trunc" => int_or_float(get_float(&args, 0, name)?.trunc()),
            "sqrt" => Value::Float(get_float(&args, 0, name)?.sqrt()),
            "sin" => Value::Float(get_float(&args, 0, name)?.sin()),
            "cos" => Value::Float(get_float(&args, 0, name)?.cos()),
            "tan" => Value::Float(get_float(&args, 0, name)?.tan()),
            "exp" => Value::Float(get_float(&args, 0, name)?.exp()),
            "log" => Value::Float(get_float(&args, 0, name)?.ln()),
            "log10" => Value::Float(get_float(&args, 0, name)?.log10()),
            "pow" => {
                let base = get_float(&args, 0, name)?;
                let exp = get_float(&args, 1, name)?;
                int_or_float(base.powf(exp))
            }
            "min" | "max" => {
                if args.is_empty() {
                    return Err(format!("{name}: too few args"));
                }
                let pick_max = bare == "max";
                let mut best = args[0].clone();
                for v in &args[1..] {
                    let ord = v.cmp_value(&best);
                    if (pick_max && ord.is_gt()) || (!pick_max && ord.is_lt()) {
                        best = v.clone();
                    }
                }
                best
            }

            // ── Randomness ───────────────────────────────────────────────────
            "random" => {
                let mut rng = rand::thread_rng();
                match (args.first(), args.get(1)) {
                    // Math.random() → [0, 1)
                    (None, _) => Value::Float(rng.gen::<f64>()),
                    // _.random(max) → [0, max]
                    (Some(hi), None) => Value::Int(random_between(&mut rng, 0, hi.as_int())),
                    // _.random(lo, hi) → [lo, hi]
                    (Some(lo), Some(hi)) => {
                        Value::Int(random_between(&mut rng, lo.as_int(), hi.as_int()))
                    }
                }
            }
            "sample" => match first(&args, name)? {
                Value::List(items) => items
                    .choose(&mut rand::thread_rng())
                    .cloned()
                    .unwrap_or_default(),
                _ => Value::Null,
            },

            // ── Conversions ──────────────────────────────────────────────────
            "String" | "str" => Value::Str(first(&args, name)?.as_str()),
            "Number" | "parseFloat" => {
                let x = first(&args, name)?.as_float();
                int_or_float(x)
            }
            "parseInt" => {
                let v = first(&args, name)?;
                let s = v.as_str();
                let digits: String = s
                    .trim()
                    .chars()
                    .enumerate()
                    .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
                    .map(|(_, c)| c)
                    .collect();
                digits
                    .parse::<i64>()
                    .map(Value::Int)
                    .unwrap_or(Value::Float(f64::NAN))
            }
            "isNaN" => Value::Bool(first(&args, name)?.as_float().is_nan()),
            "size" | "len" => match first(&args, name)? {
                Value::List(items) => Value::Int(items.len() as i64),
                Value::Map(m) => Value::Int(m.len() as i64),
                other => Value::Int(other.as_str().chars().count() as i64),
            },

            _ => return Ok(None),
        }))
    }
    inner(name, args).transpose()
}

/// Dispatch a method call on `recv`.
///
/// Returns `None` if the method does not exist for the receiver's kind.
pub fn call_method(recv: &Value, method: &str, args: Vec<Value>) -> Option<Result<Value, String>> {
    fn inner(recv: &Value, method: &str, args: Vec<Value>) -> Result<Option<Value>, String> {
        Ok(Some(match (recv, method) {
            // ── Strings ──────────────────────────────────────────────────────
            (Value::Str(s), "toUpperCase") => Value::Str(s.to_uppercase()),
            (Value::Str(s), "toLowerCase") => Value::Str(s.to_lowercase()),
            (Value::Str(s), "trim") => Value::Str(s.trim().to_owned()),
            (Value::Str(s), "startsWith") => Value::Bool(s.starts_with(&get_str(&args, 0, method)?)),
            (Value::Str(s), "endsWith") => Value::Bool(s.ends_with(&get_str(&args, 0, method)?)),
            (Value::Str(s), "includes") => Value::Bool(s.contains(&get_str(&args, 0, method)?)),
            (Value::Str(s), "indexOf") => {
                let needle = get_str(&args, 0, method)?;
                Value::Int(
                    s.find(&needle)
                        .map(|byte| s[..byte].chars().count() as i64)
                        .unwrap_or(-1),
                )
            }
            (Value::Str(s), "split") => {
                let sep = get_str(&args, 0, method)?;
                let parts: Vec<Value> = if sep.is_empty() {
                    s.chars().map(|c| Value::Str(c.to_string())).collect()
                } else {
                    s.split(sep.as_str()).map(Value::from).collect()
                };
                Value::List(parts)
            }
            (Value::Str(s), "replace") => {
                let from = get_str(&args, 0, method)?;
                let to = get_str(&args, 1, method)?;
                Value::Str(s.replacen(&from, &to, 1))
            }
            (Value::Str(s), "repeat") => {
                let n = usize::try_from(get_int(&args, 0, method)?)
                    .map_err(|_| format!("{method}: invalid count"))?;
                match s.len().checked_mul(n) {
                    Some(len) if len <= MAX_STRING => Value::Str(s.repeat(n)),
                    _ => return Err(format!("{method}: result longer than {MAX_STRING} bytes")),
                }
            }
            (Value::Str(s), "slice") => {
                let chars: Vec<char> = s.chars().collect();
                let (start, end) = slice_bounds(chars.len(), &args);
                Value::Str(chars[start..end].iter().collect())
            }

            // ── Lists ────────────────────────────────────────────────────────
            (Value::List(items), "join") => {
                let sep = args.first().map(Value::as_str).unwrap_or_else(|| ",".to_owned());
                Value::Str(items.iter().map(Value::as_str).collect::<Vec<_>>().join(&sep))
            }
            (Value::List(items), "includes") => {
                let needle = first(&args, method)?;
                Value::Bool(items.iter().any(|v| v.loose_eq(&needle)))
            }
            (Value::List(items), "indexOf") => {
                let needle = first(&args, method)?;
                Value::Int(
                    items
                        .iter()
                        .position(|v| v.loose_eq(&needle))
                        .map(|i| i as i64)
                        .unwrap_or(-1),
                )
            }
            (Value::List(items), "slice") => {
                let (start, end) = slice_bounds(items.len(), &args);
                Value::List(items[start..end].to_vec())
            }

            // ── Numbers ──────────────────────────────────────────────────────
            (Value::Int(_) | Value::Float(_), "toFixed") => {
                let digits = args.first().map(|v| v.as_int().clamp(0, 20)).unwrap_or(0) as usize;
                Value::Str(format!("{:.*}", digits, recv.as_float()))
            }

            (_, "toString") => Value::Str(recv.as_str()),

            _ => return Ok(None),
        }))
    }
    inner(recv, method, args).transpose()
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn int_or_float(x: f64) -> Value {
    if x.fract() == 0.0 && x.is_finite() && x.abs() < 9.0e15 {
        Value::Int(x as i64)
    } else {
        Value::Float(x)
    }
}

fn random_between(rng: &mut impl Rng, a: i64, b: i64) -> i64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    rng.gen_range(lo..=hi)
}

/// JS-style `slice(start, end)` bounds with negative offsets from the end.
fn slice_bounds(len: usize, args: &[Value]) -> (usize, usize) {
    let resolve = |v: &Value| -> usize {
        let n = v.as_int();
        if n < 0 {
            len.saturating_sub(n.unsigned_abs() as usize)
        } else {
            (n as usize).min(len)
        }
    };
    let start = args.first().map(resolve).unwrap_or(0);
    let end = args.get(1).map(resolve).unwrap_or(len);
    (start, end.max(start))
}

// ── Argument accessors ────────────────────────────────────────────────────────

fn first(args: &[Value], name: &str) -> Result<Value, String> {
    args.first()
        .cloned()
        .ok_or_else(|| format!("{name}: too few args"))
}

fn get_str(args: &[Value], idx: usize, name: &str) -> Result<String, String> {
    args.get(idx)
        .map(|v| v.as_str())
        .ok_or_else(|| format!("{name}: argument {idx} missing"))
}

fn get_int(args: &[Value], idx: usize, name: &str) -> Result<i64, String> {
    args.get(idx)
        .map(|v| v.as_int())
        .ok_or_else(|| format!("{name}: argument {idx} missing"))
}

fn get_float(args: &[Value], idx: usize, name: &str) -> Result<f64, String> {
    args.get(idx)
        .map(|v| v.as_float())
        .ok_or_else(|| format!("{name}: argument {idx} missing"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> Value {
        call_builtin(name, args)
            .expect("not a builtin")
            .expect("call failed")
    }

    fn method(recv: Value, name: &str, args: Vec<Value>) -> Value {
        call_method(&recv, name, args)
            .expect("not a method")
            .expect("call failed")
    }

    #[test]
    fn namespaces_are_ignored() {
        assert_eq!(call("Math.floor", vec![Value::Float(2.7)]), Value::Int(2));
        assert_eq!(call("floor", vec![Value::Float(2.7)]), Value::Int(2));
    }

    #[test]
    fn unknown_builtin_is_none() {
        assert!(call_builtin("fetch", vec![]).is_none());
    }

    #[test]
    fn min_max() {
        let args = vec![Value::Int(3), Value::Int(9), Value::Int(1)];
        assert_eq!(call("max", args.clone()), Value::Int(9));
        assert_eq!(call("Math.min", args), Value::Int(1));
    }

    #[test]
    fn random_range_is_inclusive() {
        for _ in 0..200 {
            let v = call("_.random", vec![Value::Int(5), Value::Int(3)]).as_int();
            assert!((3..=5).contains(&v));
        }
    }

    #[test]
    fn sample_of_empty_list_is_null() {
        assert_eq!(call("_.sample", vec![Value::List(vec![])]), Value::Null);
    }

    #[test]
    fn parse_int_stops_at_garbage() {
        assert_eq!(call("parseInt", vec![Value::Str("42px".into())]), Value::Int(42));
    }

    #[test]
    fn string_methods() {
        assert_eq!(method("abc".into(), "toUpperCase", vec![]), Value::Str("ABC".into()));
        assert_eq!(method("a,b".into(), "split", vec![",".into()]).to_string(), "a,b");
        assert_eq!(method("hello".into(), "slice", vec![Value::Int(-3)]), Value::Str("llo".into()));
    }

    #[test]
    fn repeat_is_capped() {
        assert_eq!(method("ab".into(), "repeat", vec![Value::Int(3)]), Value::Str("ababab".into()));
        let huge = call_method(&Value::Str("ab".into()), "repeat", vec![Value::Int(i64::MAX)]).expect("not a method");
        assert!(huge.is_err());
    }

    #[test]
    fn abs_of_min_int_widens() {
        assert_eq!(call("abs", vec![Value::Int(-5)]), Value::Int(5));
        assert_eq!(call("abs", vec![Value::Int(i64::MIN)]), Value::Float(9_223_372_036_854_775_808.0));
    }

    #[test]
    fn list_join() {
        let list = Value::List(vec!["x".into(), "y".into()]);
        assert_eq!(method(list, "join", vec![" & ".into()]), Value::Str("x & y".into()));
    }

    #[test]
    fn to_fixed() {
        assert_eq!(method(Value::Float(1.005), "toFixed", vec![Value::Int(1)]), Value::Str("1.0".into()));
        assert_eq!(method(Value::Int(3), "toFixed", vec![Value::Int(2)]), Value::Str("3.00".into()));
    }
}
