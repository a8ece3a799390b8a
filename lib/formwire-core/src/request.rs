//! Outgoing HTTP requests.
//!
//! A [`Request`] is what the serializer hands to the transport: method, URL,
//! ordered headers, an optional body and the per-request options taken from
//! the [`SerializerConfig`](crate::SerializerConfig).
//!
//! # Example
//!
//! ```
//! use formwire_core::Request;
//! use bytes::Bytes;
//!
//! let request = Request::<Bytes>::builder(http::Method::GET, "https://api.example.com".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .query("page", "1")
//!     .build();
//! assert_eq!(request.url().as_str(), "https://api.example.com/?page=1");
//! ```

use std::time::Duration;

use bytes::Bytes;
use http::Method;

use crate::{CachePolicy, HeaderStore, NetworkServiceType, SerializerConfig};

/// Transport options carried by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Request timeout.
    pub timeout: Duration,
    /// Cache policy.
    pub cache_policy: CachePolicy,
    /// Whether the cellular radio may be used.
    pub allows_cellular_access: bool,
    /// Whether default cookie handling applies.
    pub should_handle_cookies: bool,
    /// Whether the request may be pipelined.
    pub should_use_pipelining: bool,
    /// Network service classification.
    pub network_service_type: NetworkServiceType,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::from(&SerializerConfig::default())
    }
}

impl From<&SerializerConfig> for RequestOptions {
    fn from(config: &SerializerConfig) -> Self {
        Self {
            timeout: config.timeout,
            cache_policy: config.cache_policy,
            allows_cellular_access: config.allows_cellular_access,
            should_handle_cookies: config.should_handle_cookies,
            should_use_pipelining: config.should_use_pipelining,
            network_service_type: config.network_service_type,
        }
    }
}

/// An HTTP request with method, URL, headers, and optional body.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HeaderStore,
    body: Option<B>,
    options: RequestOptions,
}

impl<B> Request<B> {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder<B> {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Mutable access to the URL.
    #[must_use]
    pub fn url_mut(&mut self) -> &mut url::Url {
        &mut self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderStore {
        &mut self.headers
    }

    /// Single header value by name, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Transport options.
    #[must_use]
    pub const fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Replace the body, keeping everything else.
    #[must_use]
    pub fn with_body<T>(self, body: Option<T>) -> Request<T> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body,
            options: self.options,
        }
    }

    /// Consume into (method, url, headers, body, options).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HeaderStore, Option<B>, RequestOptions) {
        (self.method, self.url, self.headers, self.body, self.options)
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HeaderStore,
    body: Option<B>,
    options: RequestOptions,
}

impl<B> RequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderStore::new(),
            body: None,
            options: RequestOptions::default(),
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Sets multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the transport options.
    #[must_use]
    pub const fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request<B> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            options: self.options,
        }
    }
}

impl Request<Bytes> {
    /// Append an already-encoded query string to the URL.
    ///
    /// Existing query parameters are kept and the new ones follow them.
    pub(crate) fn append_encoded_query(&mut self, query: &str) {
        if query.is_empty() {
            return;
        }
        let merged = match self.url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
            _ => query.to_string(),
        };
        self.url.set_query(Some(&merged));
    }

    pub(crate) fn set_body(&mut self, body: Bytes) {
        self.body = Some(body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> url::Url {
        url::Url::parse(s).expect("valid URL")
    }

    #[test]
    fn request_builder_basic() {
        let request = Request::<Bytes>::builder(Method::GET, url("https://api.example.com/users"))
            .header("Accept", "application/json")
            .build();

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.url().as_str(), "https://api.example.com/users");
        assert_eq!(request.header("accept"), Some("application/json"));
        assert!(request.body().is_none());
        assert_eq!(request.options(), &RequestOptions::default());
    }

    #[test]
    fn request_builder_with_body() {
        let body = Bytes::from(r#"{"name":"test"}"#);
        let request = Request::builder(Method::POST, url("https://api.example.com/users"))
            .body(body.clone())
            .build();

        assert_eq!(request.body(), Some(&body));
    }

    #[test]
    fn append_query_keeps_existing() {
        let mut request = Request::<Bytes>::builder(Method::GET, url("http://h/p?a=1")).build();
        request.append_encoded_query("b=2&c%5B%5D=3");
        assert_eq!(request.url().as_str(), "http://h/p?a=1&b=2&c%5B%5D=3");
    }

    #[test]
    fn append_empty_query_is_noop() {
        let mut request = Request::<Bytes>::builder(Method::GET, url("http://h/p")).build();
        request.append_encoded_query("");
        assert_eq!(request.url().as_str(), "http://h/p");
    }

    #[test]
    fn with_body_swaps_type() {
        let request = Request::builder(Method::PUT, url("http://h/p"))
            .header("X-Id", "7")
            .body(Bytes::from_static(b"data"))
            .build();

        let request: Request<Vec<u8>> = request.with_body(None);
        assert!(request.body().is_none());
        assert_eq!(request.header("x-id"), Some("7"));
    }

    #[test]
    fn options_from_config() {
        let config = SerializerConfig::builder()
            .timeout(Duration::from_secs(3))
            .allows_cellular_access(false)
            .build();
        let options = RequestOptions::from(&config);
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert!(!options.allows_cellular_access);
    }
}
