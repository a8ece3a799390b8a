//! Flattening of parameter trees into key/value pairs.
//!
//! Traversal is depth-first and pre-order: map entries in insertion order
//! get the key `parent[child]`, list elements in index order get the key
//! `parent[]`. Scalars become one pair each.

use std::borrow::Cow;

use crate::{Error, ParameterValue, Result};

/// A flattened, not yet escaped, query parameter.
///
/// A pair without a value comes from a keyed [`ParameterValue::Null`] and is
/// rendered as a bare key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyValuePair {
    /// Flattened key, e.g. `user[tags][]`.
    pub key: String,
    /// String form of the scalar, absent for null.
    pub value: Option<String>,
}

impl KeyValuePair {
    /// Create a pair with a value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Create a pair that renders as a bare key.
    #[must_use]
    pub fn bare(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// Flatten a parameter tree into ordered key/value pairs.
///
/// Raw data at a leaf fails with [`Error::Encoding`], since it has no string
/// form.
///
/// With `key` set to `None` only maps produce named pairs: a top-level
/// scalar or null yields no pair at all, and the items of a top-level list
/// are keyed `[]`.
///
/// # Example
///
/// ```
/// use formwire_core::{KeyValuePair, ParameterMap, ParameterValue, flatten};
///
/// let inner = ParameterMap::new().with("b", 1).with("c", vec![2, 3]);
/// let params: ParameterValue = ParameterMap::new().with("a", inner).into();
///
/// assert_eq!(
///     flatten(None, &params).expect("flatten"),
///     [
///         KeyValuePair::new("a[b]", "1"),
///         KeyValuePair::new("a[c][]", "2"),
///         KeyValuePair::new("a[c][]", "3"),
///     ]
/// );
/// ```
pub fn flatten(key: Option<&str>, value: &ParameterValue) -> Result<Vec<KeyValuePair>> {
    leaves(key, value)
        .into_iter()
        .map(|(key, leaf)| {
            let value = match leaf {
                ParameterValue::Null => None,
                ParameterValue::Data(_) => return Err(Error::encoding(key)),
                scalar => scalar_string(scalar),
            };
            Ok(KeyValuePair { key, value })
        })
        .collect()
}

/// Collect the leaves of a tree with their flattened keys.
///
/// Leaves are scalars, keyed nulls and raw data. Used directly by contexts
/// that accept raw bytes, such as multipart form fields.
#[must_use]
pub fn leaves<'a>(key: Option<&str>, value: &'a ParameterValue) -> Vec<(String, &'a ParameterValue)> {
    let mut out = Vec::new();
    collect(key.map(Cow::Borrowed), value, &mut out);
    out
}

fn collect<'a>(
    key: Option<Cow<'_, str>>,
    value: &'a ParameterValue,
    out: &mut Vec<(String, &'a ParameterValue)>,
) {
    match value {
        ParameterValue::Map(map) => {
            for (child, nested) in map.iter() {
                let composite = match &key {
                    Some(parent) => format!("{parent}[{child}]"),
                    None => child.to_string(),
                };
                collect(Some(Cow::Owned(composite)), nested, out);
            }
        }
        ParameterValue::List(items) => {
            let composite = format!("{}[]", key.as_deref().unwrap_or_default());
            for item in items {
                collect(Some(Cow::Borrowed(composite.as_str())), item, out);
            }
        }
        leaf => {
            if let Some(key) = key {
                out.push((key.into_owned(), leaf));
            }
        }
    }
}

/// String form of a scalar: booleans as `1` / `0`, numbers in decimal.
///
/// Returns `None` for null, maps, lists and raw data.
#[must_use]
pub fn scalar_string(value: &ParameterValue) -> Option<String> {
    match value {
        ParameterValue::String(s) => Some(s.clone()),
        ParameterValue::Number(n) => Some(n.to_string()),
        ParameterValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}
