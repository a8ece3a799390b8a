//! Prelude module for convenient imports.
//!
//! ```ignore
//! use formwire::prelude::*;
//! ```

pub use crate::{
    ContentType, Error, JsonCodec, Method, MultipartBody, MultipartFormData,
    MultipartSerializerExt, ParameterMap, ParameterValue, Params, PropertyListCodec, Request,
    RequestSerialization, RequestSerializer, Result, SerializerConfig, Throttle, ToParameters,
    into_http_request, request_with_multipart_written_to_file,
};
