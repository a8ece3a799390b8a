//! Query-string building.

use crate::{KeyValuePair, ParameterValue, Result, StringEncoding, flatten, percent_escape_with};

/// Build a query string from a parameter tree, preserving input order.
///
/// # Example
///
/// ```
/// use formwire_core::{ParameterMap, ParameterValue, build_query_string};
///
/// let params: ParameterValue = ParameterMap::new()
///     .with("name", "A B")
///     .with("tags", vec!["x", "y"])
///     .into();
///
/// let query = build_query_string(&params).expect("query");
/// assert_eq!(query, "name=A%20B&tags%5B%5D=x&tags%5B%5D=y");
/// ```
pub fn build_query_string(params: &ParameterValue) -> Result<String> {
    build_query_string_with(params, StringEncoding::Utf8)
}

/// Build a query string using the given string encoding.
pub fn build_query_string_with(params: &ParameterValue, encoding: StringEncoding) -> Result<String> {
    let pairs = flatten(None, params)?;
    Ok(join_pairs(&pairs, encoding))
}

/// Build a query string with pairs sorted by key.
///
/// Keys are compared byte-wise; pairs sharing a key keep their input order.
pub fn build_sorted_query_string(params: &ParameterValue) -> Result<String> {
    let mut pairs = flatten(None, params)?;
    pairs.sort_by(|a, b| a.key.as_bytes().cmp(b.key.as_bytes()));
    Ok(join_pairs(&pairs, StringEncoding::Utf8))
}

/// Escape and join flattened pairs as `key=value&key=value`.
#[must_use]
pub fn join_pairs(pairs: &[KeyValuePair], encoding: StringEncoding) -> String {
    pairs
        .iter()
        .map(|pair| {
            let key = percent_escape_with(&pair.key, encoding);
            match &pair.value {
                Some(value) => format!("{key}={}", percent_escape_with(value, encoding)),
                None => key,
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}
