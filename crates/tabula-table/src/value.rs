use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{TableError, TableResult};

/// A dynamically-typed cell value.
///
/// Columns are expected to be homogeneous in practice, but nothing enforces it: the type of a
/// value is whatever the caller chose when the column was assigned.
///
/// Equality and hashing are total so values can be used as group/join keys:
/// - `Integer(n)` and an integral `Number` with the same magnitude compare (and hash) equal,
/// - `NaN` equals `NaN` (via [`OrderedFloat`]).
///
/// Ordering is *not* total; see [`Value::try_cmp`].
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Text(Arc<str>),
}

impl Value {
    pub fn text(s: impl AsRef<str>) -> Self {
        Value::Text(Arc::from(s.as_ref()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Number(n) => exact_i64(*n),
            _ => None,
        }
    }

    /// Numeric view of the value. Booleans and text are not coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Compare two values.
    ///
    /// Integers and numbers compare numerically with each other, booleans with booleans and text
    /// with text (lexicographically by code point). Everything else, including `Null` and `NaN`,
    /// is incomparable and reported as [`TableError::Incomparable`].
    pub fn try_cmp(&self, other: &Value) -> TableResult<Ordering> {
        let ord = match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Number(b)) => cmp_int_number(*a, *b),
            (Value::Number(a), Value::Integer(b)) => cmp_int_number(*b, *a).map(Ordering::reverse),
            _ => None,
        };
        ord.ok_or_else(|| TableError::Incomparable {
            left: self.clone(),
            right: other.clone(),
        })
    }
}

fn exact_i64(n: f64) -> Option<i64> {
    // `i64::MAX as f64` rounds up to 2^63, which is out of range.
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Exact `i64` vs `f64` ordering; `as f64` rounds integers above 2^53.
fn cmp_int_number(a: i64, b: f64) -> Option<Ordering> {
    if b.is_nan() {
        return None;
    }
    // `i64::MIN as f64` is exactly -2^63 and `i64::MAX as f64` rounds up to 2^63.
    if b >= i64::MAX as f64 {
        return Some(Ordering::Less);
    }
    if b < i64::MIN as f64 {
        return Some(Ordering::Greater);
    }
    let whole = b.trunc();
    let ord = a.cmp(&(whole as i64));
    if ord != Ordering::Equal {
        return Some(ord);
    }
    0.0f64.partial_cmp(&(b - whole))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => OrderedFloat(*a) == OrderedFloat(*b),
            (Value::Integer(a), Value::Number(b)) | (Value::Number(b), Value::Integer(a)) => {
                exact_i64(*b) == Some(*a)
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Integer(n) => {
                2u8.hash(state);
                n.hash(state);
            }
            Value::Number(n) => match exact_i64(*n) {
                // Must agree with `Integer` so that `1 == 1.0` implies equal hashes.
                Some(i) => {
                    2u8.hash(state);
                    i.hash(state);
                }
                None => {
                    3u8.hash(state);
                    OrderedFloat(*n).hash(state);
                }
            },
            Value::Text(s) => {
                4u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        match i64::try_from(value) {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Number(value as f64),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(Arc::from(value))
    }
}

impl From<Arc<str>> for Value {
    fn from(value: Arc<str>) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
