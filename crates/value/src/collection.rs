//! Nullable sets and lists of coerced scalar elements.
//!
//! The backend schema distinguishes "field omitted" from "field present but
//! empty", so a null collection and an empty collection are never equal.

use serde::{Deserialize, Serialize};

use crate::DynamicValue;
use crate::scalar::{ToDynamic, coerce_bool, coerce_float, coerce_string};

/// The primitive kind of the elements held by a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// String elements
    String,
    /// Boolean elements (accepting the enable/disable tokens)
    Bool,
    /// Float elements (accepting numeric strings)
    Float,
}

impl ElementKind {
    /// Coerces one dynamic value into an element of this kind.
    #[must_use]
    pub fn coerce(self, v: &DynamicValue) -> Element {
        match self {
            Self::String => coerce_string(v).into_inner().map_or(Element::Null, Element::String),
            Self::Bool => coerce_bool(v).into_inner().map_or(Element::Null, Element::Bool),
            Self::Float => coerce_float(v).into_inner().map_or(Element::Null, Element::Float),
        }
    }
}

/// Whether a collection is order-significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Unique elements, order-irrelevant equality
    Set,
    /// Order-significant, duplicates retained
    List,
}

/// One coerced collection element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Element {
    /// The source element did not match the collection's element kind
    Null,
    /// A string element
    String(String),
    /// A boolean element
    Bool(bool),
    /// A float element
    Float(f64),
}

impl ToDynamic for Element {
    fn to_dynamic(&self) -> DynamicValue {
        match self {
            Self::Null => DynamicValue::Null,
            Self::String(s) => DynamicValue::String(s.clone()),
            Self::Bool(b) => DynamicValue::Bool(*b),
            Self::Float(f) => DynamicValue::from(*f),
        }
    }
}

/// A nullable set or list of elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedCollection {
    kind: CollectionKind,
    element_kind: ElementKind,
    elements: Option<Vec<Element>>,
}

impl TypedCollection {
    /// Creates a null collection.
    #[must_use]
    pub const fn null(kind: CollectionKind, element_kind: ElementKind) -> Self {
        Self {
            kind,
            element_kind,
            elements: None,
        }
    }

    /// Creates a collection from already-typed elements.
    ///
    /// Set collections collapse duplicates, keeping the first occurrence.
    #[must_use]
    pub fn from_elements(
        kind: CollectionKind,
        element_kind: ElementKind,
        elements: impl IntoIterator<Item = Element>,
    ) -> Self {
        let elements = match kind {
            CollectionKind::List => elements.into_iter().collect(),
            CollectionKind::Set => dedup(elements),
        };
        Self {
            kind,
            element_kind,
            elements: Some(elements),
        }
    }

    /// Returns the collection kind.
    #[must_use]
    pub const fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Returns the element kind.
    #[must_use]
    pub const fn element_kind(&self) -> ElementKind {
        self.element_kind
    }

    /// Returns true if the collection is null (as opposed to empty).
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.elements.is_none()
    }

    /// Returns the elements, or `None` for a null collection.
    #[must_use]
    pub fn elements(&self) -> Option<&[Element]> {
        self.elements.as_deref()
    }

    /// Returns the number of elements; zero for null collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.as_ref().map_or(0, Vec::len)
    }

    /// Returns true if the collection is null or empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `element` is present.
    #[must_use]
    pub fn contains(&self, element: &Element) -> bool {
        self.elements
            .as_ref()
            .is_some_and(|elements| elements.contains(element))
    }
}

impl PartialEq for TypedCollection {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind || self.element_kind != other.element_kind {
            return false;
        }
        match (&self.elements, &other.elements) {
            (None, None) => true,
            (Some(a), Some(b)) => match self.kind {
                CollectionKind::List => a == b,
                // Both sides are deduplicated at construction.
                CollectionKind::Set => a.len() == b.len() && a.iter().all(|e| b.contains(e)),
            },
            _ => false,
        }
    }
}

impl ToDynamic for TypedCollection {
    fn to_dynamic(&self) -> DynamicValue {
        self.elements.as_ref().map_or(DynamicValue::Null, |elements| {
            DynamicValue::Array(elements.iter().map(ToDynamic::to_dynamic).collect())
        })
    }
}

fn dedup(elements: impl IntoIterator<Item = Element>) -> Vec<Element> {
    let mut unique: Vec<Element> = Vec::new();
    for element in elements {
        if !unique.contains(&element) {
            unique.push(element);
        }
    }
    unique
}

fn coerce_collection(
    v: &DynamicValue,
    kind: CollectionKind,
    element_kind: ElementKind,
) -> TypedCollection {
    match v {
        DynamicValue::Array(items) => TypedCollection::from_elements(
            kind,
            element_kind,
            items.iter().map(|item| element_kind.coerce(item)),
        ),
        _ => TypedCollection::null(kind, element_kind),
    }
}

/// Coerces a dynamic array into a set of `element_kind` elements.
///
/// Null (or any non-array shape) yields a null set.
#[must_use]
pub fn coerce_set(v: &DynamicValue, element_kind: ElementKind) -> TypedCollection {
    coerce_collection(v, CollectionKind::Set, element_kind)
}

/// Coerces a dynamic array into an ordered list of `element_kind` elements.
///
/// Null (or any non-array shape) yields a null list.
#[must_use]
pub fn coerce_list(v: &DynamicValue, element_kind: ElementKind) -> TypedCollection {
    coerce_collection(v, CollectionKind::List, element_kind)
}

/// Elements added and removed between two collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementDiff {
    /// Present in the new collection only
    pub added: Vec<Element>,
    /// Present in the old collection only
    pub removed: Vec<Element>,
}

impl ElementDiff {
    /// Returns true if nothing was added or removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Computes membership changes between two collections.
///
/// Null collections are treated as empty. Order is ignored; duplicates in
/// lists are compared by membership only.
#[must_use]
pub fn diff_elements(old: &TypedCollection, new: &TypedCollection) -> ElementDiff {
    let old_elements = old.elements().unwrap_or_default();
    let new_elements = new.elements().unwrap_or_default();

    ElementDiff {
        added: dedup(
            new_elements
                .iter()
                .filter(|e| !old_elements.contains(e))
                .cloned(),
        ),
        removed: dedup(
            old_elements
                .iter()
                .filter(|e| !new_elements.contains(e))
                .cloned(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_ignores_order_and_duplicates() {
        let a = coerce_set(&json!(["a", "b", "a"]), ElementKind::String);
        let b = coerce_set(&json!(["b", "a"]), ElementKind::String);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_list_keeps_order_and_duplicates() {
        let a = coerce_list(&json!(["a", "b", "a"]), ElementKind::String);
        let b = coerce_list(&json!(["b", "a"]), ElementKind::String);
        assert_ne!(a, b);
        assert_eq!(a.len(), 3);

        let c = coerce_list(&json!(["a", "b"]), ElementKind::String);
        let d = coerce_list(&json!(["b", "a"]), ElementKind::String);
        assert_ne!(c, d);
    }

    #[test]
    fn test_null_and_empty_are_distinct() {
        let null = coerce_set(&DynamicValue::Null, ElementKind::String);
        let empty = coerce_set(&json!([]), ElementKind::String);
        assert!(null.is_null());
        assert!(!empty.is_null());
        assert!(empty.is_empty());
        assert_ne!(null, empty);
        assert_eq!(null.to_dynamic(), DynamicValue::Null);
        assert_eq!(empty.to_dynamic(), json!([]));
    }

    #[test]
    fn test_non_array_degrades_to_null() {
        assert!(coerce_list(&json!("a"), ElementKind::String).is_null());
        assert!(coerce_set(&json!({"a": 1}), ElementKind::Float).is_null());
    }

    #[test]
    fn test_elements_are_coerced_by_kind() {
        let bools = coerce_list(&json!(["enable", false, "nope"]), ElementKind::Bool);
        assert_eq!(
            bools.elements(),
            Some(&[Element::Bool(true), Element::Bool(false), Element::Null][..])
        );

        let floats = coerce_list(&json!([1, "2.5", "x"]), ElementKind::Float);
        assert_eq!(
            floats.elements(),
            Some(&[Element::Float(1.0), Element::Float(2.5), Element::Null][..])
        );
        assert_eq!(floats.to_dynamic(), json!([1.0, 2.5, null]));
    }

    #[test]
    fn test_set_and_list_are_never_equal() {
        let set = coerce_set(&json!(["a"]), ElementKind::String);
        let list = coerce_list(&json!(["a"]), ElementKind::String);
        assert_ne!(set, list);
    }

    #[test]
    fn test_diff_elements() {
        let old = coerce_set(&json!(["a", "b", "c"]), ElementKind::String);
        let new = coerce_set(&json!(["c", "d"]), ElementKind::String);
        let diff = diff_elements(&old, &new);
        assert_eq!(diff.added, vec![Element::String("d".into())]);
        assert_eq!(
            diff.removed,
            vec![Element::String("a".into()), Element::String("b".into())]
        );

        let null = TypedCollection::null(CollectionKind::Set, ElementKind::String);
        let from_null = diff_elements(&null, &new);
        assert_eq!(from_null.added.len(), 2);
        assert!(from_null.removed.is_empty());
        assert!(diff_elements(&new, &new).is_empty());
    }
}
