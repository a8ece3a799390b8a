//! Prelude module for convenient imports.
//!
//! ```ignore
//! use formwire_core::prelude::*;
//! ```

pub use crate::{
    ContentType, Error, JsonCodec, Method, ParameterMap, ParameterValue, PlatformDefaults,
    PropertyListCodec, Request, RequestBuilder, RequestSerialization, RequestSerializer, Result,
    SerializerConfig, ToParameters, build_query_string, percent_escape,
};
