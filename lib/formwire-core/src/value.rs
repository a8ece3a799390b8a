//! Loosely-typed parameter trees.
//!
//! A [`ParameterValue`] is what callers hand to the serializer: scalars,
//! nested maps, nested lists and raw binary blobs. Maps keep insertion order
//! and unique keys, lists keep index order.
//!
//! # Example
//!
//! ```
//! use formwire_core::{ParameterMap, ParameterValue};
//!
//! let params: ParameterValue = ParameterMap::new()
//!     .with("name", "A B")
//!     .with("tags", vec!["x", "y"])
//!     .into();
//!
//! assert_eq!(params.get("name").and_then(ParameterValue::as_str), Some("A B"));
//! ```

use bytes::Bytes;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde_json::Number;

/// A node of a parameter tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParameterValue {
    /// A string scalar.
    String(String),
    /// A numeric scalar, rendered in canonical decimal form.
    Number(Number),
    /// A boolean scalar, rendered as `1` / `0` in query strings.
    Bool(bool),
    /// An absent value.
    #[default]
    Null,
    /// A map with unique keys in insertion order.
    Map(ParameterMap),
    /// A list in index order.
    List(Vec<ParameterValue>),
    /// Raw bytes, valid in body and multipart contexts only.
    Data(Bytes),
}

impl ParameterValue {
    /// Returns `true` for [`ParameterValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string content, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The map, if this is a map.
    #[must_use]
    pub const fn as_map(&self) -> Option<&ParameterMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this value is a map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_map().and_then(|map| map.get(key))
    }
}

/// An insertion-ordered map of parameters with unique keys.
///
/// Inserting an existing key replaces its value in place, keeping the
/// original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMap {
    entries: Vec<(String, ParameterValue)>,
}

impl ParameterMap {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a value, returning the previous one for that key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Option<ParameterValue> {
        let key = key.into();
        let value = value.into();
        if let Some((_, slot)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<ParameterValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterMap
where
    K: Into<String>,
    V: Into<ParameterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterValue
where
    K: Into<String>,
    V: Into<ParameterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().collect())
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ParameterValue {
    /// Non-finite floats have no decimal form and become [`ParameterValue::Null`].
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<f32> for ParameterValue {
    fn from(value: f32) -> Self {
        Self::from(f64::from(value))
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParameterValue {
                fn from(value: $ty) -> Self {
                    Self::Number(Number::from(value))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<Number> for ParameterValue {
    fn from(value: Number) -> Self {
        Self::Number(value)
    }
}

impl From<Bytes> for ParameterValue {
    fn from(value: Bytes) -> Self {
        Self::Data(value)
    }
}

impl From<ParameterMap> for ParameterValue {
    fn from(value: ParameterMap) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<ParameterValue>> From<Vec<T>> for ParameterValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParameterValue>> From<Option<T>> for ParameterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// ============================================================================
// ToParameters
// ============================================================================

/// Trait for types that can be converted to a parameter tree.
///
/// This is automatically implemented by the `#[derive(Params)]` macro.
///
/// # Example
///
/// ```ignore
/// use formwire::Params;
///
/// #[derive(Params)]
/// #[params(rename_all = "camelCase")]
/// struct Upload {
///     file_name: String,
///     tags: Vec<String>,
///     comment: Option<String>,
/// }
/// ```
pub trait ToParameters {
    /// Convert this value to a [`ParameterValue`].
    fn to_parameters(&self) -> ParameterValue;
}

impl ToParameters for ParameterValue {
    fn to_parameters(&self) -> ParameterValue {
        self.clone()
    }
}

impl ToParameters for ParameterMap {
    fn to_parameters(&self) -> ParameterValue {
        ParameterValue::Map(self.clone())
    }
}

impl ToParameters for str {
    fn to_parameters(&self) -> ParameterValue {
        ParameterValue::from(self)
    }
}

impl ToParameters for String {
    fn to_parameters(&self) -> ParameterValue {
        ParameterValue::String(self.clone())
    }
}

impl ToParameters for Bytes {
    fn to_parameters(&self) -> ParameterValue {
        ParameterValue::Data(self.clone())
    }
}

macro_rules! to_parameters_copy {
    ($($ty:ty),*) => {
        $(
            impl ToParameters for $ty {
                fn to_parameters(&self) -> ParameterValue {
                    ParameterValue::from(*self)
                }
            }
        )*
    };
}

to_parameters_copy!(bool, f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: ToParameters + ?Sized> ToParameters for &T {
    fn to_parameters(&self) -> ParameterValue {
        (**self).to_parameters()
    }
}

impl<T: ToParameters> ToParameters for Option<T> {
    fn to_parameters(&self) -> ParameterValue {
        self.as_ref()
            .map_or(ParameterValue::Null, ToParameters::to_parameters)
    }
}

impl<T: ToParameters> ToParameters for Vec<T> {
    fn to_parameters(&self) -> ParameterValue {
        self.as_slice().to_parameters()
    }
}

impl<T: ToParameters> ToParameters for [T] {
    fn to_parameters(&self) -> ParameterValue {
        ParameterValue::List(self.iter().map(ToParameters::to_parameters).collect())
    }
}

// ============================================================================
// Serialize
// ============================================================================

impl serde::Serialize for ParameterValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => serde::Serialize::serialize(n, serializer),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Null => serializer.serialize_unit(),
            Self::Map(map) => serde::Serialize::serialize(map, serializer),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Data(_) => Err(S::Error::custom(
                "raw data has no representation in this format",
            )),
        }
    }
}

impl serde::Serialize for ParameterMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keeps_insertion_order() {
        let map = ParameterMap::new().with("z", 1).with("a", 2).with("m", 3);
        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn map_insert_replaces_in_place() {
        let mut map = ParameterMap::new().with("a", 1).with("b", 2);
        let previous = map.insert("a", "x");

        assert_eq!(previous, Some(ParameterValue::from(1)));
        assert_eq!(map.len(), 2);
        let first = map.iter().next().expect("first entry");
        assert_eq!(first, ("a", &ParameterValue::from("x")));
    }

    #[test]
    fn map_remove() {
        let mut map = ParameterMap::new().with("a", 1).with("b", 2);
        assert_eq!(map.remove("a"), Some(ParameterValue::from(1)));
        assert_eq!(map.remove("a"), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn conversions() {
        assert_eq!(ParameterValue::from("a"), ParameterValue::String("a".into()));
        assert_eq!(ParameterValue::from(true), ParameterValue::Bool(true));
        assert_eq!(ParameterValue::from(None::<u32>), ParameterValue::Null);
        assert_eq!(ParameterValue::from(f64::NAN), ParameterValue::Null);
        assert_eq!(
            ParameterValue::from(vec![1, 2]),
            ParameterValue::List(vec![1.into(), 2.into()])
        );
        assert!(matches!(
            ParameterValue::from(Bytes::from_static(b"\x00")),
            ParameterValue::Data(_)
        ));
    }

    #[test]
    fn collect_into_map() {
        let value: ParameterValue = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(value.get("b"), Some(&ParameterValue::from(2)));
        assert!(value.get("c").is_none());
    }

    #[test]
    fn to_parameters_nested() {
        let tags = vec!["x".to_string(), "y".to_string()];
        assert_eq!(
            tags.to_parameters(),
            ParameterValue::List(vec!["x".into(), "y".into()])
        );
        assert_eq!(Some(3_u8).to_parameters(), ParameterValue::from(3));
        assert!(None::<String>.to_parameters().is_null());
    }

    #[test]
    fn serialize_preserves_order() {
        let value: ParameterValue = ParameterMap::new()
            .with("b", true)
            .with("a", ParameterValue::Null)
            .with("c", vec![1.5])
            .into();
        let json = serde_json::to_string(&value).expect("serialize");
        assert_eq!(json, r#"{"b":true,"a":null,"c":[1.5]}"#);
    }

    #[test]
    fn serialize_rejects_raw_data() {
        let value: ParameterValue = ParameterMap::new()
            .with("blob", Bytes::from_static(b"abc"))
            .into();
        assert!(serde_json::to_string(&value).is_err());
    }
}
