//! Canonical payload representation for cached values.
//!
//! The in-memory map stores every payload as a [`Value`]. Typed access goes
//! through [`Cacheable`]: writing converts into a `Value`, reading converts
//! back out and yields `None` when the stored variant does not fit the
//! requested type. A mismatch is therefore indistinguishable from a miss.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A cached payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// A serde-serializable value stored as JSON text.
    Json(String),
}

impl Value {
    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Json(s) => f.write_str(s),
        }
    }
}

/// Types that can be stored in and read back from the cache.
pub trait Cacheable: Sized {
    /// Convert into the canonical stored form.
    fn into_value(self) -> Value;

    /// Convert back from the stored form, `None` on mismatch.
    fn from_value(value: &Value) -> Option<Self>;
}

impl Cacheable for Value {
    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl Cacheable for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

macro_rules! impl_cacheable_int {
    ($($ty:ty),*) => {
        $(
            impl Cacheable for $ty {
                fn into_value(self) -> Value {
                    // Out-of-range u64/usize values saturate rather than wrap.
                    Value::Int(i64::try_from(self).unwrap_or(i64::MAX))
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(*i).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_cacheable_int!(i32, i64, u32, u64, usize);

impl Cacheable for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl Cacheable for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl Cacheable for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }

    fn from_value(_value: &Value) -> Option<Self> {
        None
    }
}

impl Cacheable for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Bytes(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
}

/// Wrapper that caches any serde type as JSON text.
///
/// ```rust,ignore
/// store.set("weather", Json(report), &CacheDuration::ONE_HOUR);
/// let Json(report): Json<Report> = store.get("weather")?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> Cacheable for Json<T> {
    fn into_value(self) -> Value {
        // Serializing plain data structures into a String does not fail in
        // practice; fall back to JSON null so the write is still recorded.
        Value::Json(serde_json::to_string(&self.0).unwrap_or_else(|_| "null".to_string()))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Json(s) => serde_json::from_str(s).ok().map(Json),
            _ => None,
        }
    }
}
