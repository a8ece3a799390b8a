//! Body codecs.
//!
//! A [`BodyCodec`] turns a parameter tree into request body bytes and names
//! the matching `Content-Type`. JSON and XML property lists are provided;
//! callers may plug their own.

use bytes::Bytes;
use serde::ser::SerializeMap;

use crate::{BoxError, ParameterMap, ParameterValue};

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Property list content type (`application/x-plist`).
    PropertyList,
    /// Multipart form content type (`multipart/form-data`), without boundary.
    MultipartFormData,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PropertyList => "application/x-plist",
            Self::MultipartFormData => "multipart/form-data",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encodes parameters into a request body.
pub trait BodyCodec: Send + Sync + std::fmt::Debug {
    /// `Content-Type` of the produced body.
    fn content_type(&self) -> &str;

    /// Encode the parameters.
    fn encode(&self, params: &ParameterValue) -> Result<Bytes, BoxError>;
}

// ============================================================================
// JSON
// ============================================================================

/// JSON body codec.
///
/// # Example
///
/// ```
/// use formwire_core::{BodyCodec, JsonCodec, ParameterMap, ParameterValue};
///
/// let params: ParameterValue = ParameterMap::new().with("b", 1).with("a", true).into();
///
/// let body = JsonCodec::new().encode(&params).expect("encode");
/// assert_eq!(body.as_ref(), br#"{"b":1,"a":true}"#);
///
/// let body = JsonCodec::new().sorted_keys(true).encode(&params).expect("encode");
/// assert_eq!(body.as_ref(), br#"{"a":true,"b":1}"#);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec {
    pretty: bool,
    sorted_keys: bool,
}

impl JsonCodec {
    /// Compact JSON, keys in insertion order.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pretty: false,
            sorted_keys: false,
        }
    }

    /// Indent the output.
    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Write map keys in lexicographic order.
    #[must_use]
    pub const fn sorted_keys(mut self, sorted: bool) -> Self {
        self.sorted_keys = sorted;
        self
    }
}

impl BodyCodec for JsonCodec {
    fn content_type(&self) -> &str {
        ContentType::Json.as_str()
    }

    fn encode(&self, params: &ParameterValue) -> Result<Bytes, BoxError> {
        let bytes = match (self.pretty, self.sorted_keys) {
            (false, false) => serde_json::to_vec(params)?,
            (true, false) => serde_json::to_vec_pretty(params)?,
            (false, true) => serde_json::to_vec(&SortedKeys(params))?,
            (true, true) => serde_json::to_vec_pretty(&SortedKeys(params))?,
        };
        Ok(Bytes::from(bytes))
    }
}

/// Serializes a tree with every map's keys sorted.
struct SortedKeys<'a>(&'a ParameterValue);

impl serde::Serialize for SortedKeys<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            ParameterValue::Map(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let mut out = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    out.serialize_entry(key, &SortedKeys(value))?;
                }
                out.end()
            }
            ParameterValue::List(items) => {
                serializer.collect_seq(items.iter().map(SortedKeys))
            }
            scalar => serde::Serialize::serialize(scalar, serializer),
        }
    }
}

// ============================================================================
// Property list
// ============================================================================

/// XML property list (plist 1.0) body codec.
///
/// Null has no property list representation and fails to encode; raw data
/// is written as a `<data>` element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyListCodec;

/// A value that has no property list representation.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("null at '{path}' has no property list representation")]
pub struct PropertyListError {
    /// Location of the offending value.
    #[error(not(source))]
    pub path: String,
}

impl PropertyListCodec {
    fn to_plist(value: &ParameterValue, path: &str) -> Result<plist::Value, PropertyListError> {
        let converted = match value {
            ParameterValue::String(s) => plist::Value::String(s.clone()),
            ParameterValue::Number(n) => number_to_plist(n),
            ParameterValue::Bool(b) => plist::Value::Boolean(*b),
            ParameterValue::Data(bytes) => plist::Value::Data(bytes.to_vec()),
            ParameterValue::Map(map) => plist::Value::Dictionary(Self::to_dictionary(map, path)?),
            ParameterValue::List(items) => plist::Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| Self::to_plist(item, &format!("{path}[{index}]")))
                    .collect::<Result<_, _>>()?,
            ),
            ParameterValue::Null => {
                return Err(PropertyListError {
                    path: path.to_string(),
                });
            }
        };
        Ok(converted)
    }

    fn to_dictionary(map: &ParameterMap, path: &str) -> Result<plist::Dictionary, PropertyListError> {
        let mut dict = plist::Dictionary::new();
        for (key, value) in map.iter() {
            let child = if path.is_empty() {
                key.to_string()
            } else {
                format!("{path}.{key}")
            };
            dict.insert(key.to_string(), Self::to_plist(value, &child)?);
        }
        Ok(dict)
    }
}

fn number_to_plist(n: &serde_json::Number) -> plist::Value {
    if let Some(i) = n.as_i64() {
        plist::Value::Integer(i.into())
    } else if let Some(u) = n.as_u64() {
        plist::Value::Integer(u.into())
    } else {
        plist::Value::Real(n.as_f64().unwrap_or_default())
    }
}

impl BodyCodec for PropertyListCodec {
    fn content_type(&self) -> &str {
        ContentType::PropertyList.as_str()
    }

    fn encode(&self, params: &ParameterValue) -> Result<Bytes, BoxError> {
        let value = Self::to_plist(params, "")?;
        let mut out = Vec::new();
        plist::to_writer_xml(&mut out, &value)?;
        Ok(Bytes::from(out))
    }
}
