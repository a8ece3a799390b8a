//! Client-side HTTP request serialization.
//!
//! formwire turns an HTTP method, a URL and a parameter tree into a ready to
//! send request: parameters go into the query string for `GET`, `HEAD` and
//! `DELETE`, and into a form, JSON, property list or `multipart/form-data`
//! body otherwise. Sending the request is left to the transport.
//!
//! # Example
//!
//! ```
//! use formwire::prelude::*;
//!
//! #[derive(Params)]
//! struct Search {
//!     q: String,
//!     tags: Vec<String>,
//!     page: Option<u32>,
//! }
//!
//! let serializer = RequestSerializer::default();
//! let params = Search {
//!     q: "rust http".to_string(),
//!     tags: vec!["a".to_string()],
//!     page: None,
//! }
//! .to_parameters();
//!
//! let request = serializer
//!     .request("GET", "https://api.example.com/search", Some(&params))
//!     .expect("request");
//! assert_eq!(
//!     request.url().as_str(),
//!     "https://api.example.com/search?q=rust%20http&tags%5B%5D=a"
//! );
//! ```
//!
//! Multipart uploads are built with [`MultipartSerializerExt`] and can be
//! paced with [`MultipartFormData::throttle_bandwidth`]. Finished requests are
//! handed to hyper-style transports through [`into_http_request`].

mod ext;
mod file_swap;
mod multipart;
pub mod prelude;
mod throttle;
mod transport;

pub use ext::MultipartSerializerExt;
pub use file_swap::request_with_multipart_written_to_file;
pub use multipart::{
    BodyPart, BodyStream, MultipartBody, MultipartFormData, PartReader, PartSource,
    generate_boundary, guess_content_type,
};
pub use throttle::{SUGGESTED_DELAY, SUGGESTED_PACKET_SIZE, Throttle};
pub use transport::{FormwireBody, into_http_request};

// Re-export core types
pub use formwire_core::{
    BodyCodec, BoxError, CachePolicy, ContentType, DEFAULT_QUERY_METHODS, DEFAULT_TIMEOUT, Error,
    HeaderStore, JsonCodec, KeyValuePair, Method, NetworkServiceType, ParameterMap,
    ParameterValue, PlatformDefaults, PropertyListCodec, PropertyListError, QuerySerializer,
    QueryStringStyle, Request, RequestBuilder, RequestOptions, RequestSerialization,
    RequestSerializer, Result, SerializerConfig, SerializerConfigBuilder, StringEncoding,
    ToParameters, build_query_string, build_query_string_with, build_sorted_query_string, flatten,
    header, join_pairs, leaves, parse_method, percent_escape, percent_escape_with, scalar_string,
};

// Re-export crates used in public signatures
pub use bytes;
pub use url;

// Re-export macros
pub use formwire_macro::Params;
