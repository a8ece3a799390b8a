//! Request serialization.
//!
//! [`RequestSerializer`] decides, per HTTP method, whether parameters go into
//! the URL query string or into the request body, and applies its default
//! headers and configuration to every request it builds.
//!
//! # Example
//!
//! ```
//! use formwire_core::{ParameterMap, ParameterValue, RequestSerializer};
//!
//! let serializer = RequestSerializer::default();
//! let params: ParameterValue = ParameterMap::new().with("q", "1").into();
//!
//! let get = serializer.request("GET", "http://h/p", Some(&params)).expect("GET");
//! assert_eq!(get.url().as_str(), "http://h/p?q=1");
//! assert!(get.body().is_none());
//!
//! let post = serializer.request("POST", "http://h/p", Some(&params)).expect("POST");
//! assert_eq!(post.url().as_str(), "http://h/p");
//! assert_eq!(post.body().map(|b| b.as_ref()), Some(&b"q=1"[..]));
//! ```

use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use tracing::debug;

use crate::{
    BodyCodec, ContentType, Error, HeaderStore, JsonCodec, ParameterValue, PlatformDefaults,
    PropertyListCodec, Request, RequestOptions, Result, SerializerConfig,
    query::build_query_string_with,
};

/// Encodes parameters into an already-built request.
///
/// Implementors decide where parameters go (URL or body) and which headers
/// accompany them.
pub trait RequestSerialization: Clone + Send + Sync {
    /// Serialize `params` into `request`.
    fn serialize_request(
        &self,
        request: Request<Bytes>,
        params: Option<&ParameterValue>,
    ) -> Result<Request<Bytes>>;
}

/// Request serializer with default headers, configuration and a body codec.
///
/// Without a codec, bodies are form URL-encoded using the same flattening as
/// query strings.
#[derive(Debug, Clone)]
pub struct RequestSerializer {
    config: SerializerConfig,
    headers: HeaderStore,
    codec: Option<Arc<dyn BodyCodec>>,
}

impl Default for RequestSerializer {
    fn default() -> Self {
        Self::new(SerializerConfig::default())
    }
}

impl RequestSerializer {
    /// Form URL-encoded serializer with default platform headers.
    #[must_use]
    pub fn new(config: SerializerConfig) -> Self {
        Self::with_platform(config, &PlatformDefaults::default())
    }

    /// Form URL-encoded serializer with headers seeded from `platform`.
    #[must_use]
    pub fn with_platform(config: SerializerConfig, platform: &PlatformDefaults) -> Self {
        Self {
            config,
            headers: HeaderStore::with_defaults(platform),
            codec: None,
        }
    }

    /// Serializer writing JSON bodies.
    #[must_use]
    pub fn json(config: SerializerConfig) -> Self {
        Self::new(config).with_codec(JsonCodec::new())
    }

    /// Serializer writing XML property list bodies.
    #[must_use]
    pub fn property_list(config: SerializerConfig) -> Self {
        Self::new(config).with_codec(PropertyListCodec)
    }

    /// Use a body codec for methods that encode parameters in the body.
    #[must_use]
    pub fn with_codec(mut self, codec: impl BodyCodec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Default headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    /// Mutable access to the default headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderStore {
        &mut self.headers
    }

    /// Set a default header, or remove it when `value` is `None`.
    pub fn set_header(&mut self, name: impl Into<String>, value: Option<String>) {
        self.headers.set_optional(name, value);
    }

    /// Default header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Set `Authorization` to HTTP basic credentials.
    pub fn set_authorization_basic(&mut self, username: &str, password: &str) {
        self.headers.set_authorization_basic(username, password);
    }

    /// Remove the `Authorization` header.
    pub fn clear_authorization(&mut self) {
        self.headers.clear_authorization();
    }

    /// Build a request and serialize `params` into it.
    ///
    /// Methods listed in [`SerializerConfig::query_methods`] get their
    /// parameters appended to the URL query; others get a body.
    pub fn request(
        &self,
        method: &str,
        url: &str,
        params: Option<&ParameterValue>,
    ) -> Result<Request<Bytes>> {
        let request = self.prepare(method, url)?;
        self.serialize_request(request, params)
    }

    /// Validate the method and URL and build an empty request carrying the
    /// configured options.
    pub fn prepare(&self, method: &str, url: &str) -> Result<Request<Bytes>> {
        let method = parse_method(method)?;
        let url = url::Url::parse(url)?;
        Ok(Request::builder(method, url)
            .options(RequestOptions::from(&self.config))
            .build())
    }

    /// Query string for `params`, using the custom serializer if configured.
    pub fn query_string(&self, request: &Request<Bytes>, params: &ParameterValue) -> Result<String> {
        match &self.config.query_serializer {
            Some(custom) => custom
                .serialize(request, params)
                .map_err(Error::QuerySerialization),
            None => build_query_string_with(params, self.config.string_encoding),
        }
    }

    /// Copy default headers the request does not already carry.
    pub fn apply_headers<B>(&self, request: &mut Request<B>) {
        for (name, value) in self.headers.iter() {
            if !request.headers().contains(name) {
                request.headers_mut().set(name, value);
            }
        }
    }
}

impl RequestSerialization for RequestSerializer {
    fn serialize_request(
        &self,
        mut request: Request<Bytes>,
        params: Option<&ParameterValue>,
    ) -> Result<Request<Bytes>> {
        self.apply_headers(&mut request);

        let Some(params) = params else {
            return Ok(request);
        };

        if self.config.encodes_in_query(request.method().as_str()) {
            let query = self.query_string(&request, params)?;
            debug!(method = %request.method(), url = %request.url(), "encoding parameters in query string");
            request.append_encoded_query(&query);
            return Ok(request);
        }

        let (content_type, body) = match &self.codec {
            Some(codec) => {
                let body = codec.encode(params).map_err(Error::BodyEncoding)?;
                (codec.content_type().to_string(), body)
            }
            None => {
                let query = self.query_string(&request, params)?;
                let body = Bytes::from(self.config.string_encoding.encode(&query).into_owned());
                (ContentType::FormUrlEncoded.to_string(), body)
            }
        };
        debug!(
            method = %request.method(),
            url = %request.url(),
            content_type = %content_type,
            body_len = body.len(),
            "encoding parameters in body"
        );

        if !request.headers().contains("Content-Type") {
            request.headers_mut().set("Content-Type", content_type);
        }
        request.set_body(body);
        Ok(request)
    }
}

/// Parse an HTTP method token, rejecting empty or malformed input.
pub fn parse_method(method: &str) -> Result<Method> {
    if method.is_empty() {
        return Err(Error::invalid_method(method));
    }
    Method::from_bytes(method.as_bytes()).map_err(|_| Error::invalid_method(method))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{CachePolicy, ParameterMap};

    fn params(pairs: &[(&str, &str)]) -> ParameterValue {
        pairs.iter().copied().collect()
    }

    #[test]
    fn get_appends_query() {
        let serializer = RequestSerializer::default();
        let request = serializer
            .request("GET", "http://h/p", Some(&params(&[("q", "1")])))
            .expect("request");

        assert_eq!(request.url().as_str(), "http://h/p?q=1");
        assert!(request.body().is_none());
        assert!(request.header("Content-Type").is_none());
    }

    #[test]
    fn query_methods_are_case_insensitive() {
        let serializer = RequestSerializer::default();
        let request = serializer
            .request("delete", "http://h/p", Some(&params(&[("id", "3")])))
            .expect("request");

        assert_eq!(request.method().as_str(), "delete");
        assert_eq!(request.url().as_str(), "http://h/p?id=3");
    }

    #[test]
    fn existing_query_is_preserved() {
        let serializer = RequestSerializer::default();
        let request = serializer
            .request("HEAD", "http://h/p?a=0", Some(&params(&[("b", "x y")])))
            .expect("request");

        assert_eq!(request.url().as_str(), "http://h/p?a=0&b=x%20y");
    }

    #[test]
    fn post_encodes_form_body() {
        let serializer = RequestSerializer::default();
        let request = serializer
            .request("POST", "http://h/p", Some(&params(&[("q", "1")])))
            .expect("request");

        assert_eq!(request.url().as_str(), "http://h/p");
        assert_eq!(request.body().map(|b| b.as_ref()), Some(&b"q=1"[..]));
        assert_eq!(
            request.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn post_encodes_json_body() {
        let serializer = RequestSerializer::json(SerializerConfig::default());
        let request = serializer
            .request("POST", "http://h/p", Some(&params(&[("q", "1")])))
            .expect("request");

        assert_eq!(request.body().map(|b| b.as_ref()), Some(&br#"{"q":"1"}"#[..]));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn json_serializer_still_uses_query_for_get() {
        let serializer = RequestSerializer::json(SerializerConfig::default());
        let request = serializer
            .request("GET", "http://h/p", Some(&params(&[("q", "1")])))
            .expect("request");

        assert_eq!(request.url().as_str(), "http://h/p?q=1");
        assert!(request.body().is_none());
    }

    #[test]
    fn property_list_body() {
        let serializer = RequestSerializer::property_list(SerializerConfig::default());
        let request = serializer
            .request("PUT", "http://h/p", Some(&params(&[("q", "1")])))
            .expect("request");

        assert_eq!(request.header("Content-Type"), Some("application/x-plist"));
        let body = String::from_utf8(request.body().expect("body").to_vec()).expect("utf8");
        assert!(body.contains("<key>q</key>"));
    }

    #[test]
    fn existing_content_type_is_kept() {
        let serializer = RequestSerializer::json(SerializerConfig::default());
        let mut request = serializer.prepare("POST", "http://h/p").expect("prepare");
        request
            .headers_mut()
            .set("Content-Type", "application/vnd.api+json");

        let request = serializer
            .serialize_request(request, Some(&params(&[("q", "1")])))
            .expect("serialize");
        assert_eq!(
            request.header("content-type"),
            Some("application/vnd.api+json")
        );
    }

    #[test]
    fn no_params_leaves_request_untouched() {
        let serializer = RequestSerializer::default();
        let request = serializer.request("POST", "http://h/p", None).expect("request");
        assert!(request.body().is_none());
        assert!(request.header("Content-Type").is_none());
    }

    #[test]
    fn empty_method_is_rejected() {
        let serializer = RequestSerializer::default();
        let err = serializer.request("", "http://h/p", None).expect_err("empty");
        assert!(matches!(err, Error::InvalidMethod(_)));

        let err = serializer.request("GE T", "http://h/p", None).expect_err("space");
        assert!(matches!(err, Error::InvalidMethod(_)));
    }

    #[test]
    fn malformed_url_is_rejected() {
        let serializer = RequestSerializer::default();
        let err = serializer.request("GET", "::not a url", None).expect_err("url");
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn raw_data_in_query_fails() {
        let serializer = RequestSerializer::default();
        let params: ParameterValue = ParameterMap::new()
            .with("blob", Bytes::from_static(b"\x00"))
            .into();

        let err = serializer
            .request("GET", "http://h/p", Some(&params))
            .expect_err("raw data");
        assert!(matches!(err, Error::Encoding { .. }));
    }

    #[test]
    fn codec_failure_is_wrapped() {
        let serializer = RequestSerializer::json(SerializerConfig::default());
        let params: ParameterValue = ParameterMap::new()
            .with("blob", Bytes::from_static(b"\x00"))
            .into();

        let err = serializer
            .request("POST", "http://h/p", Some(&params))
            .expect_err("raw data");
        assert!(matches!(err, Error::BodyEncoding(_)));
    }

    #[test]
    fn custom_query_serializer_overrides_default() {
        let config = SerializerConfig::builder()
            .query_serializer(|request, _| Ok(format!("method={}", request.method())))
            .build();
        let serializer = RequestSerializer::new(config);

        let get = serializer
            .request("GET", "http://h/p", Some(&params(&[("q", "1")])))
            .expect("GET");
        assert_eq!(get.url().as_str(), "http://h/p?method=GET");

        let post = serializer
            .request("POST", "http://h/p", Some(&params(&[("q", "1")])))
            .expect("POST");
        assert_eq!(post.body().map(|b| b.as_ref()), Some(&b"method=POST"[..]));
    }

    #[test]
    fn custom_query_serializer_error_is_not_wrapped() {
        #[derive(Debug, derive_more::Display, derive_more::Error)]
        #[display("rejected")]
        struct Rejected;

        let config = SerializerConfig::builder()
            .query_serializer(|_, _| Err(Rejected.into()))
            .build();
        let serializer = RequestSerializer::new(config);

        let err = serializer
            .request("GET", "http://h/p", Some(&params(&[("q", "1")])))
            .expect_err("custom failure");
        assert_eq!(err.to_string(), "rejected");
        assert!(
            err.query_serialization_error()
                .is_some_and(|e| e.downcast_ref::<Rejected>().is_some())
        );
    }

    #[test]
    fn default_headers_are_applied() {
        let mut serializer = RequestSerializer::with_platform(
            SerializerConfig::default(),
            &PlatformDefaults {
                preferred_languages: vec!["de".to_string()],
                user_agent: "agent/2".to_string(),
            },
        );
        serializer.set_header("X-Api-Key", Some("secret".to_string()));
        serializer.set_authorization_basic("user", "pass");

        let request = serializer.request("GET", "http://h/p", None).expect("request");
        assert_eq!(request.header("accept-language"), Some("de;q=1"));
        assert_eq!(request.header("user-agent"), Some("agent/2"));
        assert_eq!(request.header("x-api-key"), Some("secret"));
        assert_eq!(request.header("authorization"), Some("Basic dXNlcjpwYXNz"));

        let names: Vec<_> = request.headers().iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Accept-Language", "User-Agent", "X-Api-Key", "Authorization"]);
    }

    #[test]
    fn config_is_applied_to_options() {
        let config = SerializerConfig::builder()
            .timeout(Duration::from_secs(10))
            .cache_policy(CachePolicy::ReturnCacheDataElseLoad)
            .build();
        let serializer = RequestSerializer::new(config);

        let request = serializer.request("GET", "http://h/p", None).expect("request");
        assert_eq!(request.options().timeout, Duration::from_secs(10));
        assert_eq!(
            request.options().cache_policy,
            CachePolicy::ReturnCacheDataElseLoad
        );
    }
}
