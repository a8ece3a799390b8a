//! Percent-encoding of query-string keys and values.
//!
//! Follows RFC 3986 with one relaxation from section 3.4: `?` and `/` are
//! left as-is so that a full URL can be carried as a parameter value. Every
//! other reserved character (`: # [ ] @ ! $ & ' ( ) * + , ; =`) is escaped.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};

use crate::StringEncoding;

/// Characters escaped in query-string components.
///
/// Everything except ALPHA, DIGIT, the unreserved marks `- . _ ~`, and the
/// `?` / `/` delimiters.
pub const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/')
    .remove(b'?');

/// Percent-escape a UTF-8 string for use as a query key or value.
///
/// # Example
///
/// ```
/// use formwire_core::percent_escape;
///
/// assert_eq!(percent_escape("a b&c"), "a%20b%26c");
/// assert_eq!(percent_escape("https://x.io/p?q"), "https%3A//x.io/p?q");
/// ```
#[must_use]
pub fn percent_escape(s: &str) -> String {
    percent_escape_with(s, StringEncoding::Utf8)
}

/// Percent-escape a string after encoding it with `encoding`.
#[must_use]
pub fn percent_escape_with(s: &str, encoding: StringEncoding) -> String {
    percent_encode(&encoding.encode(s), QUERY_COMPONENT).to_string()
}
