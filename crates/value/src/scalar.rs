//! Nullable scalar values and their coercion from dynamic JSON.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::DynamicValue;

/// A nullable wrapper around one primitive value.
///
/// Either explicitly null or holding exactly one value. The null state is
/// how "unset" is preserved: only non-null scalars end up in request bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypedScalar<T>(Option<T>);

impl<T> TypedScalar<T> {
    /// Creates a null scalar.
    #[must_use]
    pub const fn null() -> Self {
        Self(None)
    }

    /// Creates a scalar holding `value`.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self(Some(value))
    }

    /// Returns true if the scalar is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the held value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        self.0.as_ref()
    }

    /// Consumes the scalar, returning the held value.
    #[must_use]
    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

impl<T> Default for TypedScalar<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<Option<T>> for TypedScalar<T> {
    fn from(value: Option<T>) -> Self {
        Self(value)
    }
}

impl From<&str> for TypedScalar<String> {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for TypedScalar<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<bool> for TypedScalar<bool> {
    fn from(value: bool) -> Self {
        Self::new(value)
    }
}

impl From<f64> for TypedScalar<f64> {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

/// Serializes a typed value back into its wire form.
pub trait ToDynamic {
    /// Returns the JSON representation; null values map to JSON null.
    fn to_dynamic(&self) -> DynamicValue;
}

impl<T: Serialize> ToDynamic for TypedScalar<T> {
    fn to_dynamic(&self) -> DynamicValue {
        // Non-finite floats have no JSON form and serialize as null.
        serde_json::to_value(&self.0).unwrap_or(DynamicValue::Null)
    }
}

/// Coerces a dynamic value into a nullable string.
///
/// Only JSON strings produce a value; every other shape is null.
#[must_use]
pub fn coerce_string(v: &DynamicValue) -> TypedScalar<String> {
    match v {
        DynamicValue::String(s) => TypedScalar::new(s.clone()),
        _ => TypedScalar::null(),
    }
}

/// Coerces a dynamic value into a nullable bool.
///
/// The backend encodes many booleans as the literal tokens `"enable"` and
/// `"disable"`. Matching is case-sensitive and untrimmed.
#[must_use]
pub fn coerce_bool(v: &DynamicValue) -> TypedScalar<bool> {
    match v {
        DynamicValue::Bool(b) => TypedScalar::new(*b),
        DynamicValue::String(s) => match s.as_str() {
            "true" | "enable" => TypedScalar::new(true),
            "false" | "disable" => TypedScalar::new(false),
            _ => TypedScalar::null(),
        },
        _ => TypedScalar::null(),
    }
}

/// Coerces a dynamic value into a nullable float.
///
/// Numeric strings are parsed; anything unparseable degrades to null.
#[must_use]
pub fn coerce_float(v: &DynamicValue) -> TypedScalar<f64> {
    match v {
        DynamicValue::Number(n) => n.as_f64().into(),
        DynamicValue::String(s) => match s.parse::<f64>() {
            Ok(f) => TypedScalar::new(f),
            Err(e) => {
                trace!(input = %s, error = %e, "Numeric string did not parse, coercing to null");
                TypedScalar::null()
            }
        },
        _ => TypedScalar::null(),
    }
}
