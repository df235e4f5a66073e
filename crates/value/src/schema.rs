//! Declarative attribute tables.
//!
//! Each resource registers its attributes once: Terraform-side name, wire
//! name, and semantic kind. The table then drives the three marshalling
//! directions every handler needs:
//!
//! - [`Schema::decode`]: API response → typed state
//! - [`Schema::to_body`]: typed plan → create body (non-null fields only)
//! - [`Schema::diff_body`]: prior + planned → minimal update body
//!
//! ```
//! use fortisase_value::{Attribute, ElementKind, Schema, TypedObject, TypedScalar, TypedValue};
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .with(Attribute::string("primary_key").api_name("primaryKey"))
//!     .with(Attribute::toggle("status"))
//!     .with(Attribute::set("domains", ElementKind::String));
//!
//! let planned = TypedObject::new()
//!     .with("primary_key", TypedValue::String(TypedScalar::from("corp")))
//!     .with("status", TypedValue::Bool(TypedScalar::new(true)));
//!
//! let body = schema.to_body(&planned);
//! assert_eq!(serde_json::Value::Object(body), json!({"primaryKey": "corp", "status": "enable"}));
//! ```

use std::collections::BTreeMap;

use crate::collection::{ElementKind, TypedCollection, coerce_list, coerce_set};
use crate::compare::is_zero;
use crate::scalar::{ToDynamic, TypedScalar, coerce_bool, coerce_float, coerce_string};
use crate::{DynamicValue, ResponseMap};

/// Semantic type of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    /// Nullable string
    String,
    /// Nullable bool sent as a JSON boolean
    Bool,
    /// Nullable bool sent as the `"enable"` / `"disable"` tokens
    Toggle,
    /// Nullable float
    Float,
    /// Set of scalars
    Set(ElementKind),
    /// Ordered list of scalars
    List(ElementKind),
    /// Single nested block
    Object(Schema),
    /// Ordered list of nested blocks
    ObjectList(Schema),
}

/// One registered attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    api_name: String,
    kind: AttributeKind,
    computed: bool,
}

impl Attribute {
    /// Creates an attribute whose wire name equals its Terraform name.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        let name = name.into();
        Self {
            api_name: name.clone(),
            name,
            kind,
            computed: false,
        }
    }

    /// String attribute.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::String)
    }

    /// Boolean attribute.
    #[must_use]
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Bool)
    }

    /// Boolean attribute carried as `"enable"` / `"disable"`.
    #[must_use]
    pub fn toggle(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Toggle)
    }

    /// Float attribute.
    #[must_use]
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Float)
    }

    /// Set attribute.
    #[must_use]
    pub fn set(name: impl Into<String>, element_kind: ElementKind) -> Self {
        Self::new(name, AttributeKind::Set(element_kind))
    }

    /// List attribute.
    #[must_use]
    pub fn list(name: impl Into<String>, element_kind: ElementKind) -> Self {
        Self::new(name, AttributeKind::List(element_kind))
    }

    /// Nested block attribute.
    #[must_use]
    pub fn object(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, AttributeKind::Object(schema))
    }

    /// List-of-blocks attribute.
    #[must_use]
    pub fn object_list(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, AttributeKind::ObjectList(schema))
    }

    /// Overrides the wire name.
    #[must_use]
    pub fn api_name(mut self, api_name: impl Into<String>) -> Self {
        self.api_name = api_name.into();
        self
    }

    /// Marks the attribute as backend-computed; it is never sent.
    #[must_use]
    pub const fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Terraform-side name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire name.
    #[must_use]
    pub fn wire_name(&self) -> &str {
        &self.api_name
    }

    /// Semantic kind.
    #[must_use]
    pub const fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    /// Whether the backend owns this attribute.
    #[must_use]
    pub const fn is_computed(&self) -> bool {
        self.computed
    }

    fn decode(&self, v: &DynamicValue) -> TypedValue {
        match &self.kind {
            AttributeKind::String => TypedValue::String(coerce_string(v)),
            AttributeKind::Bool | AttributeKind::Toggle => TypedValue::Bool(coerce_bool(v)),
            AttributeKind::Float => TypedValue::Float(coerce_float(v)),
            AttributeKind::Set(kind) => TypedValue::Collection(coerce_set(v, *kind)),
            AttributeKind::List(kind) => TypedValue::Collection(coerce_list(v, *kind)),
            AttributeKind::Object(schema) => {
                TypedValue::Object(v.as_object().map(|map| schema.decode(map)))
            }
            AttributeKind::ObjectList(schema) => TypedValue::ObjectList(v.as_array().map(|items| {
                items
                    .iter()
                    .map(|item| {
                        item.as_object()
                            .map_or_else(TypedObject::new, |map| schema.decode(map))
                    })
                    .collect()
            })),
        }
    }

    fn encode(&self, value: &TypedValue) -> DynamicValue {
        match (value, &self.kind) {
            (TypedValue::Bool(b), AttributeKind::Toggle) => b.value().map_or(
                DynamicValue::Null,
                |on| DynamicValue::String(if *on { "enable" } else { "disable" }.to_string()),
            ),
            (TypedValue::Object(Some(obj)), AttributeKind::Object(schema)) => {
                DynamicValue::Object(schema.to_body(obj))
            }
            (TypedValue::ObjectList(Some(items)), AttributeKind::ObjectList(schema)) => {
                DynamicValue::Array(
                    items
                        .iter()
                        .map(|obj| DynamicValue::Object(schema.to_body(obj)))
                        .collect(),
                )
            }
            _ => value.to_dynamic(),
        }
    }

    /// Encodes `value` for an update over `prior`.
    ///
    /// A nested block that was configured before is re-sent with explicit
    /// nulls for the fields cleared inside it.
    fn encode_over(&self, prior: Option<&TypedValue>, value: &TypedValue) -> DynamicValue {
        match (prior, value, &self.kind) {
            (
                Some(TypedValue::Object(Some(before))),
                TypedValue::Object(Some(after)),
                AttributeKind::Object(schema),
            ) => DynamicValue::Object(schema.block_body(before, after)),
            _ => self.encode(value),
        }
    }
}

/// An ordered attribute table, built once per resource type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    attributes: Vec<Attribute>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an attribute.
    #[must_use]
    pub fn with(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Returns the registered attributes in order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Looks up an attribute by Terraform name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Coerces an API response into typed state.
    ///
    /// Fields missing from the response decode as null; unknown fields are
    /// ignored.
    #[must_use]
    pub fn decode(&self, response: &ResponseMap) -> TypedObject {
        let values = self
            .attributes
            .iter()
            .map(|attr| {
                let raw = response.get(&attr.api_name).unwrap_or(&DynamicValue::Null);
                (attr.name.clone(), attr.decode(raw))
            })
            .collect();
        TypedObject { values }
    }

    /// Builds a create body from planned state.
    ///
    /// Unset values and computed attributes are omitted, as are nested
    /// blocks that were left entirely unconfigured.
    #[must_use]
    pub fn to_body(&self, planned: &TypedObject) -> ResponseMap {
        let mut body = ResponseMap::new();
        for attr in self.attributes.iter().filter(|a| !a.computed) {
            if let Some(value) = planned.get(&attr.name).filter(|v| !v.is_unset()) {
                body.insert(attr.api_name.clone(), attr.encode(value));
            }
        }
        body
    }

    /// Builds a minimal update body.
    ///
    /// Only attributes whose planned value differs from prior state are
    /// included. A value that was set and is now unset is sent as JSON null.
    #[must_use]
    pub fn diff_body(&self, prior: &TypedObject, planned: &TypedObject) -> ResponseMap {
        let mut body = ResponseMap::new();
        for attr in self.attributes.iter().filter(|a| !a.computed) {
            let before = prior.get(&attr.name);
            let after = planned.get(&attr.name);
            if value_eq(before, after) {
                continue;
            }
            let encoded = after
                .filter(|v| !v.is_unset())
                .map_or(DynamicValue::Null, |v| attr.encode_over(before, v));
            body.insert(attr.api_name.clone(), encoded);
        }
        body
    }

    /// Full body of a nested block over its prior value: every set field,
    /// plus JSON null for each field that was set before and is unset now.
    fn block_body(&self, prior: &TypedObject, planned: &TypedObject) -> ResponseMap {
        let mut body = ResponseMap::new();
        for attr in self.attributes.iter().filter(|a| !a.computed) {
            let before = prior.get(&attr.name).filter(|v| !v.is_unset());
            match planned.get(&attr.name).filter(|v| !v.is_unset()) {
                Some(after) => {
                    body.insert(attr.api_name.clone(), attr.encode_over(before, after));
                }
                None if before.is_some() => {
                    body.insert(attr.api_name.clone(), DynamicValue::Null);
                }
                None => {}
            }
        }
        body
    }

    /// Returns the Terraform names of the attributes an update would send.
    #[must_use]
    pub fn changed_attributes(&self, prior: &TypedObject, planned: &TypedObject) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|attr| !attr.computed)
            .filter(|attr| !value_eq(prior.get(&attr.name), planned.get(&attr.name)))
            .map(|attr| attr.name.clone())
            .collect()
    }
}

/// One typed attribute value.
#[derive(Debug, Clone)]
pub enum TypedValue {
    /// String attribute value
    String(TypedScalar<String>),
    /// Bool or toggle attribute value
    Bool(TypedScalar<bool>),
    /// Float attribute value
    Float(TypedScalar<f64>),
    /// Set or list attribute value
    Collection(TypedCollection),
    /// Nested block; `None` when absent
    Object(Option<TypedObject>),
    /// List of nested blocks; `None` when absent
    ObjectList(Option<Vec<TypedObject>>),
}

impl TypedValue {
    /// Returns true if the value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Self::String(s) => s.is_null(),
            Self::Bool(b) => b.is_null(),
            Self::Float(f) => f.is_null(),
            Self::Collection(c) => c.is_null(),
            Self::Object(o) => o.is_none(),
            Self::ObjectList(l) => l.is_none(),
        }
    }

    /// Returns true if the value is null or an entirely unconfigured block.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Object(Some(obj)) => is_zero(obj),
            other => other.is_null(),
        }
    }

    /// Returns the string value, if this is a non-null string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => s.value().map(String::as_str),
            _ => None,
        }
    }

    /// Returns the bool value, if this is a non-null bool.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => b.value().copied(),
            _ => None,
        }
    }

    /// Returns the float value, if this is a non-null float.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => f.value().copied(),
            _ => None,
        }
    }
}

impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Collection(a), Self::Collection(b)) => a == b,
            (Self::Object(Some(a)), Self::Object(Some(b))) => a == b,
            (Self::Object(_), Self::Object(_)) => self.is_unset() && other.is_unset(),
            (Self::ObjectList(a), Self::ObjectList(b)) => a == b,
            _ => false,
        }
    }
}

impl ToDynamic for TypedValue {
    /// Wire form without schema context: nested blocks use Terraform names.
    fn to_dynamic(&self) -> DynamicValue {
        match self {
            Self::String(s) => s.to_dynamic(),
            Self::Bool(b) => b.to_dynamic(),
            Self::Float(f) => f.to_dynamic(),
            Self::Collection(c) => c.to_dynamic(),
            Self::Object(o) => o.as_ref().map_or(DynamicValue::Null, ToDynamic::to_dynamic),
            Self::ObjectList(l) => l.as_ref().map_or(DynamicValue::Null, |items| {
                DynamicValue::Array(items.iter().map(ToDynamic::to_dynamic).collect())
            }),
        }
    }
}

fn value_eq(a: Option<&TypedValue>, b: Option<&TypedValue>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x == y,
        (Some(x), None) | (None, Some(x)) => x.is_unset(),
        (None, None) => true,
    }
}

/// Typed state of one object, keyed by Terraform attribute name.
///
/// A missing attribute and a null attribute are the same thing, so an empty
/// object equals (and is as zero as) an object whose attributes are all null.
#[derive(Debug, Clone, Default)]
pub struct TypedObject {
    values: BTreeMap<String, TypedValue>,
}

impl TypedObject {
    /// Creates an object with no attributes set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: TypedValue) -> Self {
        self.set(name, value);
        self
    }

    /// Sets an attribute.
    pub fn set(&mut self, name: impl Into<String>, value: TypedValue) {
        self.values.insert(name.into(), value);
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.values.get(name)
    }

    /// Returns a non-null string attribute.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(TypedValue::as_str)
    }

    /// Iterates over attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl PartialEq for TypedObject {
    fn eq(&self, other: &Self) -> bool {
        self.values
            .keys()
            .chain(other.values.keys())
            .all(|key| value_eq(self.values.get(key), other.values.get(key)))
    }
}

impl ToDynamic for TypedObject {
    fn to_dynamic(&self) -> DynamicValue {
        DynamicValue::Object(
            self.values
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.to_dynamic()))
                .collect(),
        )
    }
}
