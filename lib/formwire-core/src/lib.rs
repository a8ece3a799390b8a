//! Core types for the formwire request serializer.
//!
//! This crate holds the synchronous half of formwire:
//! - [`ParameterValue`] and [`ParameterMap`] - parameter trees
//! - [`percent_escape`] - query-component percent-encoding
//! - [`flatten`] and [`build_query_string`] - bracket-keyed flattening
//! - [`HeaderStore`] and [`PlatformDefaults`] - default headers
//! - [`Request`] and [`RequestBuilder`] - outgoing requests
//! - [`RequestSerializer`] - query-or-body dispatch per HTTP method
//! - [`BodyCodec`] - JSON and property list bodies
//! - [`Error`] and [`Result`] - error handling
//!
//! Multipart bodies, bandwidth throttling and the async plumbing live in the
//! `formwire` crate.

mod body;
mod config;
mod error;
mod flatten;
mod headers;
mod percent;
pub mod prelude;
mod query;
mod request;
mod serializer;
mod value;

pub use body::{BodyCodec, ContentType, JsonCodec, PropertyListCodec, PropertyListError};
pub use config::{
    CachePolicy, DEFAULT_QUERY_METHODS, DEFAULT_TIMEOUT, NetworkServiceType, QuerySerializer,
    QuerySerializerFn, QueryStringStyle, SerializerConfig, SerializerConfigBuilder,
    StringEncoding,
};
pub use error::{BoxError, Error, Result};
pub use flatten::{KeyValuePair, flatten, leaves, scalar_string};
pub use headers::{HeaderStore, PlatformDefaults};
pub use percent::{QUERY_COMPONENT, percent_escape, percent_escape_with};
pub use query::{build_query_string, build_query_string_with, build_sorted_query_string, join_pairs};
pub use request::{Request, RequestBuilder, RequestOptions};
pub use serializer::{RequestSerialization, RequestSerializer, parse_method};
pub use value::{ParameterMap, ParameterValue, ToParameters};

// Re-export http crate types for methods and headers
pub use http::{Method, header};
