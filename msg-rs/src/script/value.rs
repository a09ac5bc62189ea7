//! Runtime value type for the sandboxed expression language.
//!
//! Values are loosely typed: strings, numbers and booleans coerce freely
//! when an operator needs a particular kind.  Lists and maps exist so that
//! fetched JSON and the viewer list can be exposed to scripts.

use std::collections::BTreeMap;
use std::fmt;

/// A script runtime value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => f.write_str(&format_number(*x)),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Map(_) => f.write_str(&self.to_json().to_string()),
        }
    }
}

/// Format a float the way chat output expects: integral values have no
/// fractional part, everything else uses the shortest round-trip form.
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        "NaN".to_owned()
    } else if x.is_infinite() {
        (if x > 0.0 { "Infinity" } else { "-Infinity" }).to_owned()
    } else if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{x}")
    }
}

impl Value {
    /// Truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0 && !x.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) => true,
        }
    }

    /// Coerce to `i64` (0 when not numeric).
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Float(x) => *x as i64,
            Value::Bool(b) => i64::from(*b),
            Value::Str(s) => {
                let t = s.trim();
                t.parse().unwrap_or_else(|_| t.parse::<f64>().map(|x| x as i64).unwrap_or(0))
            }
            Value::Null | Value::List(_) | Value::Map(_) => 0,
        }
    }

    /// Coerce to `f64` (`NaN` for non-numeric strings and containers).
    pub fn as_float(&self) -> f64 {
        match self {
            Value::Int(n) => *n as f64,
            Value::Float(x) => *x,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Null => 0.0,
            Value::Str(s) if s.trim().is_empty() => 0.0,
            Value::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            Value::List(_) | Value::Map(_) => f64::NAN,
        }
    }

    /// Coerce to a string.
    pub fn as_str(&self) -> String {
        self.to_string()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::Null)
    }

    /// Property access (`value.key`).  Unknown keys yield `Null`.
    pub fn member(&self, key: &str) -> Value {
        match (self, key) {
            (Value::Map(m), _) => m.get(key).cloned().unwrap_or_default(),
            (Value::List(items), "length") => Value::Int(items.len() as i64),
            (Value::Str(s), "length") => Value::Int(s.chars().count() as i64),
            _ => Value::Null,
        }
    }

    /// Index access (`value[idx]`).
    pub fn index(&self, idx: &Value) -> Value {
        match self {
            Value::List(items) => usize::try_from(idx.as_int())
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or_default(),
            Value::Str(s) => usize::try_from(idx.as_int())
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or_default(),
            Value::Map(_) => self.member(&idx.as_str()),
            _ => Value::Null,
        }
    }

    // ── JSON bridge ───────────────────────────────────────────────────────────

    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    // ── Arithmetic helpers ────────────────────────────────────────────────────

    /// `true` if the operation should produce a float.
    fn float_result(a: &Value, b: &Value) -> bool {
        matches!(a, Value::Float(_))
            || matches!(b, Value::Float(_))
            || matches!(a, Value::Str(s) if s.contains('.'))
            || matches!(b, Value::Str(s) if s.contains('.'))
    }

    fn make_numeric(f: f64, is_float: bool) -> Value {
        if is_float || f.fract() != 0.0 || !f.is_finite() {
            Value::Float(f)
        } else {
            Value::Int(f as i64)
        }
    }

    /// `+`: string concatenation when either side is a string or container,
    /// numeric addition otherwise.
    pub fn arith_add(&self, rhs: &Value) -> Value {
        if !self.is_numeric() || !rhs.is_numeric() {
            return Value::Str(format!("{self}{rhs}"));
        }
        if let (Value::Int(a), Value::Int(b)) = (self, rhs) {
            if let Some(n) = a.checked_add(*b) {
                return Value::Int(n);
            }
        }
        Self::make_numeric(self.as_float() + rhs.as_float(), Self::float_result(self, rhs))
    }

    pub fn arith_sub(&self, rhs: &Value) -> Value {
        if let (Value::Int(a), Value::Int(b)) = (self, rhs) {
            if let Some(n) = a.checked_sub(*b) {
                return Value::Int(n);
            }
        }
        Self::make_numeric(self.as_float() - rhs.as_float(), Self::float_result(self, rhs))
    }

    pub fn arith_mul(&self, rhs: &Value) -> Value {
        if let (Value::Int(a), Value::Int(b)) = (self, rhs) {
            if let Some(n) = a.checked_mul(*b) {
                return Value::Int(n);
            }
        }
        Self::make_numeric(self.as_float() * rhs.as_float(), Self::float_result(self, rhs))
    }

    /// `/`: exact integer quotients stay integers, everything else is float.
    pub fn arith_div(&self, rhs: &Value) -> Result<Value, String> {
        let b = rhs.as_float();
        if b == 0.0 {
            return Err("division by zero".into());
        }
        Ok(Self::make_numeric(self.as_float() / b, Self::float_result(self, rhs)))
    }

    pub fn arith_rem(&self, rhs: &Value) -> Result<Value, String> {
        let b = rhs.as_float();
        if b == 0.0 {
            return Err("modulo by zero".into());
        }
        Ok(Self::make_numeric(self.as_float() % b, Self::float_result(self, rhs)))
    }

    pub fn arith_pow(&self, rhs: &Value) -> Value {
        Self::make_numeric(self.as_float().powf(rhs.as_float()), Self::float_result(self, rhs))
    }

    pub fn arith_neg(&self) -> Value {
        match self {
            Value::Int(n) => n.checked_neg().map_or(Value::Float(-(*n as f64)), Value::Int),
            Value::Float(x) => Value::Float(-x),
            other => Self::make_numeric(-other.as_float(), false),
        }
    }

    /// Relational comparison.  Numeric when both sides parse as numbers,
    /// lexical otherwise.
    pub fn cmp_value(&self, rhs: &Value) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => {
                match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                    (Ok(af), Ok(bf)) => af.partial_cmp(&bf).unwrap_or(Ordering::Equal),
                    _ => a.cmp(b),
                }
            }
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                match self.as_float().partial_cmp(&rhs.as_float()) {
                    Some(o) => o,
                    None => self.as_str().cmp(&rhs.as_str()),
                }
            }
            _ => self
                .as_float()
                .partial_cmp(&rhs.as_float())
                .unwrap_or(Ordering::Equal),
        }
    }

    /// Loose equality used by `==` / `===`.
    pub fn loose_eq(&self, rhs: &Value) -> bool {
        match (self, rhs) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::List(_) | Value::Map(_), _) | (_, Value::List(_) | Value::Map(_)) => self == rhs,
            _ => self.cmp_value(rhs) == std::cmp::Ordering::Equal,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_numbers() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(3.5).to_string(), "3.5");
        assert_eq!(Value::Float(2.0).to_string(), "2");
    }

    #[test]
    fn display_null_and_bool() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn display_list_joins_with_commas() {
        let v = Value::List(vec![Value::Int(1), Value::Str("a".into())]);
        assert_eq!(v.to_string(), "1,a");
    }

    #[test]
    fn truthiness() {
        assert!(Value::Str("0".into()).as_bool());
        assert!(!Value::Str("".into()).as_bool());
        assert!(!Value::Int(0).as_bool());
        assert!(!Value::Null.as_bool());
        assert!(Value::List(vec![]).as_bool());
    }

    #[test]
    fn add_concatenates_strings() {
        assert_eq!(Value::Str("a".into()).arith_add(&Value::Int(1)), Value::Str("a1".into()));
        assert_eq!(Value::Int(2).arith_add(&Value::Int(3)), Value::Int(5));
    }

    #[test]
    fn negating_min_int_widens_to_float() {
        assert_eq!(Value::Int(5).arith_neg(), Value::Int(-5));
        assert_eq!(Value::Int(i64::MIN).arith_neg(), Value::Float(9_223_372_036_854_775_808.0));
    }

    #[test]
    fn division_keeps_exact_integers() {
        assert_eq!(Value::Int(6).arith_div(&Value::Int(3)), Ok(Value::Int(2)));
        assert_eq!(Value::Int(7).arith_div(&Value::Int(2)), Ok(Value::Float(3.5)));
        assert!(Value::Int(1).arith_div(&Value::Int(0)).is_err());
    }

    #[test]
    fn member_and_index() {
        let json = serde_json::json!({"a": [10, 20], "b": "xy"});
        let v = Value::from_json(json);
        assert_eq!(v.member("a").index(&Value::Int(1)), Value::Int(20));
        assert_eq!(v.member("b").member("length"), Value::Int(2));
        assert_eq!(v.member("missing"), Value::Null);
    }

    #[test]
    fn loose_equality_across_kinds() {
        assert!(Value::Str("5".into()).loose_eq(&Value::Int(5)));
        assert!(!Value::Null.loose_eq(&Value::Int(0)));
    }
}
