//! Zero detection and structural equality.
//!
//! Used by update planning: an optional nested block that is entirely zero
//! is omitted from outgoing payloads, and a field is only sent on update
//! when it differs from prior state.

use crate::DynamicValue;

/// Values that can report whether they equal their type's zero value.
pub trait IsZero {
    /// Returns true if `self` equals the zero value of its type.
    fn is_zero(&self) -> bool;
}

impl<T: Default + PartialEq> IsZero for T {
    fn is_zero(&self) -> bool {
        *self == T::default()
    }
}

/// Returns true if `x` equals the zero value of its type.
#[must_use]
pub fn is_zero<T: IsZero + ?Sized>(x: &T) -> bool {
    x.is_zero()
}

/// Deep structural equality.
#[must_use]
pub fn is_equal<T: PartialEq + ?Sized>(a: &T, b: &T) -> bool {
    a == b
}

/// Deep equality over decoded JSON, comparing every number as `f64`.
///
/// A JSON decoder that yields float64 for all numbers makes `1` and `1.0`
/// the same value; `serde_json` keeps them apart, so compare them here.
#[must_use]
pub fn dynamic_equal(a: &DynamicValue, b: &DynamicValue) -> bool {
    match (a, b) {
        (DynamicValue::Number(x), DynamicValue::Number(y)) => x.as_f64() == y.as_f64(),
        (DynamicValue::Array(xs), DynamicValue::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| dynamic_equal(x, y))
        }
        (DynamicValue::Object(xs), DynamicValue::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| dynamic_equal(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::TypedScalar;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq)]
    struct Nested {
        name: TypedScalar<String>,
        enabled: TypedScalar<bool>,
        weight: TypedScalar<f64>,
    }

    #[test]
    fn test_is_zero_nested_struct() {
        assert!(is_zero(&Nested::default()));

        let configured = Nested {
            enabled: TypedScalar::new(false),
            ..Nested::default()
        };
        assert!(!is_zero(&configured));
    }

    #[test]
    fn test_is_zero_primitives() {
        assert!(is_zero(&0_u32));
        assert!(is_zero(&String::new()));
        assert!(!is_zero(&"x".to_string()));
        assert!(is_zero(&Vec::<u8>::new()));
    }

    #[test]
    fn test_is_equal() {
        assert!(is_equal(&TypedScalar::new(1.0), &TypedScalar::new(1.0)));
        assert!(!is_equal(&TypedScalar::from("a"), &TypedScalar::from("b")));
        assert!(!is_equal(&TypedScalar::<bool>::null(), &TypedScalar::new(false)));
    }

    #[test]
    fn test_dynamic_equal_numbers() {
        assert!(dynamic_equal(&json!(1), &json!(1.0)));
        assert!(dynamic_equal(
            &json!({"a": [1, {"b": 2}]}),
            &json!({"a": [1.0, {"b": 2.0}]})
        ));
        assert!(!dynamic_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!dynamic_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!dynamic_equal(&json!("1"), &json!(1)));
    }
}
