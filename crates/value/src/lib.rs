//! Typed value layer for the FortiSASE provider.
//!
//! The FortiSASE REST API speaks loosely-typed JSON: booleans arrive as
//! `"enable"`/`"disable"`, numbers sometimes arrive as strings, and absent
//! fields must stay distinguishable from empty ones. This crate confines all
//! of that to one translation layer:
//!
//! - [`scalar`]: null-safe coercion of [`DynamicValue`] into [`TypedScalar`]
//! - [`collection`]: sets and lists of coerced elements
//! - [`compare`]: zero detection and structural equality for update diffs
//! - [`filter`]: Terraform-side filter expressions to the search wire format
//! - [`sortkey`]: exclusive upper bounds for prefix range lookups
//! - [`version`]: backend version gating
//! - [`schema`]: declarative attribute tables driving decode/encode/diff
//!
//! Every coercion is total. A shape mismatch becomes null, never an error.
//!
//! ```
//! use fortisase_value::{coerce_bool, coerce_float};
//! use serde_json::json;
//!
//! assert_eq!(coerce_bool(&json!("enable")).value(), Some(&true));
//! assert!(coerce_float(&json!("not-a-number")).is_null());
//! ```

pub mod collection;
pub mod compare;
mod error;
pub mod filter;
pub mod scalar;
pub mod schema;
pub mod sortkey;
pub mod version;

pub use collection::{
    CollectionKind, Element, ElementDiff, ElementKind, TypedCollection, coerce_list, coerce_set,
    diff_elements,
};
pub use compare::{IsZero, dynamic_equal, is_equal, is_zero};
pub use error::ValueError;
pub use filter::{FilterClause, escape_filter, parse_filter};
pub use scalar::{ToDynamic, TypedScalar, coerce_bool, coerce_float, coerce_string};
pub use schema::{Attribute, AttributeKind, Schema, TypedObject, TypedValue};
pub use sortkey::{SortKey, sort_string_with_number};
pub use version::version_matches;

/// An untyped value as produced by a JSON decoder.
pub type DynamicValue = serde_json::Value;

/// A string-keyed JSON object, the shape of every API request and response body.
pub type ResponseMap = serde_json::Map<String, DynamicValue>;
