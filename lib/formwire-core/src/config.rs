//! Serializer configuration types.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{BoxError, ParameterValue, Request};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP methods whose parameters are encoded into the URL by default.
pub const DEFAULT_QUERY_METHODS: [&str; 3] = ["GET", "HEAD", "DELETE"];

/// Character encoding used to turn parameter strings into bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StringEncoding {
    /// UTF-8.
    #[default]
    Utf8,
    /// ISO-8859-1. Characters above U+00FF are written as `?`.
    Latin1,
}

impl StringEncoding {
    /// Encode a string into bytes.
    #[must_use]
    pub fn encode<'a>(&self, s: &'a str) -> Cow<'a, [u8]> {
        match self {
            Self::Utf8 => Cow::Borrowed(s.as_bytes()),
            Self::Latin1 => Cow::Owned(
                s.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                    .collect(),
            ),
        }
    }
}

/// Cache policy of created requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CachePolicy {
    /// Follow the protocol's caching rules.
    #[default]
    UseProtocolCachePolicy,
    /// Ignore locally cached data.
    ReloadIgnoringLocalCacheData,
    /// Ignore local and intermediate caches.
    ReloadIgnoringLocalAndRemoteCacheData,
    /// Use cached data regardless of age, load otherwise.
    ReturnCacheDataElseLoad,
    /// Use cached data only, never load.
    ReturnCacheDataDontLoad,
    /// Use cached data after revalidation with the origin.
    ReloadRevalidatingCacheData,
}

/// Network service classification of created requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkServiceType {
    /// Standard traffic.
    #[default]
    Default,
    /// Video traffic.
    Video,
    /// Background traffic.
    Background,
    /// Voice data.
    Voice,
    /// Responsive data.
    ResponsiveData,
    /// Audio/video streaming.
    AvStreaming,
    /// Responsive audio/video.
    ResponsiveAv,
    /// Call signaling.
    CallSignaling,
}

/// Signature of a caller-supplied query-string serializer.
pub type QuerySerializerFn =
    dyn Fn(&Request<Bytes>, &ParameterValue) -> Result<String, BoxError> + Send + Sync;

/// Caller-supplied query-string serializer overriding the default flattener.
///
/// Its errors are surfaced as [`crate::Error::QuerySerialization`] without
/// further wrapping.
#[derive(Clone)]
pub struct QuerySerializer(Arc<QuerySerializerFn>);

impl QuerySerializer {
    /// Wrap a serializer function.
    pub fn new<F>(serializer: F) -> Self
    where
        F: Fn(&Request<Bytes>, &ParameterValue) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(serializer))
    }

    /// Run the serializer.
    pub fn serialize(
        &self,
        request: &Request<Bytes>,
        params: &ParameterValue,
    ) -> Result<String, BoxError> {
        (self.0)(request, params)
    }
}

impl fmt::Debug for QuerySerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("QuerySerializer").finish_non_exhaustive()
    }
}

/// Predefined query-string serialization styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryStringStyle {
    /// Bracket-keyed flattening, percent-encoded, in input order.
    #[default]
    Default,
}

/// Configuration applied to every request a serializer builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Encoding of parameter strings.
    pub string_encoding: StringEncoding,
    /// Cache policy of created requests.
    pub cache_policy: CachePolicy,
    /// Whether created requests may use the cellular radio.
    pub allows_cellular_access: bool,
    /// Whether created requests use the default cookie handling.
    pub should_handle_cookies: bool,
    /// Whether created requests may be pipelined.
    pub should_use_pipelining: bool,
    /// Network service classification.
    pub network_service_type: NetworkServiceType,
    /// Request timeout.
    pub timeout: Duration,
    /// HTTP methods whose parameters go into the URL, compared case-insensitively.
    pub query_methods: BTreeSet<String>,
    /// Custom query-string serializer.
    #[serde(skip)]
    pub query_serializer: Option<QuerySerializer>,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            string_encoding: StringEncoding::default(),
            cache_policy: CachePolicy::default(),
            allows_cellular_access: true,
            should_handle_cookies: true,
            should_use_pipelining: false,
            network_service_type: NetworkServiceType::default(),
            timeout: DEFAULT_TIMEOUT,
            query_methods: DEFAULT_QUERY_METHODS
                .iter()
                .map(ToString::to_string)
                .collect(),
            query_serializer: None,
        }
    }
}

impl SerializerConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> SerializerConfigBuilder {
        SerializerConfigBuilder::default()
    }

    /// Returns `true` if parameters for `method` are encoded into the URL.
    #[must_use]
    pub fn encodes_in_query(&self, method: &str) -> bool {
        self.query_methods
            .iter()
            .any(|query_method| query_method.eq_ignore_ascii_case(method))
    }
}

/// Builder for [`SerializerConfig`].
#[derive(Debug, Clone, Default)]
pub struct SerializerConfigBuilder {
    string_encoding: Option<StringEncoding>,
    cache_policy: Option<CachePolicy>,
    allows_cellular_access: Option<bool>,
    should_handle_cookies: Option<bool>,
    should_use_pipelining: Option<bool>,
    network_service_type: Option<NetworkServiceType>,
    timeout: Option<Duration>,
    query_methods: Option<BTreeSet<String>>,
    query_serializer: Option<QuerySerializer>,
}

impl SerializerConfigBuilder {
    /// Set the string encoding.
    #[must_use]
    pub const fn string_encoding(mut self, encoding: StringEncoding) -> Self {
        self.string_encoding = Some(encoding);
        self
    }

    /// Set the cache policy.
    #[must_use]
    pub const fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = Some(policy);
        self
    }

    /// Set whether requests may use the cellular radio.
    #[must_use]
    pub const fn allows_cellular_access(mut self, allowed: bool) -> Self {
        self.allows_cellular_access = Some(allowed);
        self
    }

    /// Set whether requests use the default cookie handling.
    #[must_use]
    pub const fn should_handle_cookies(mut self, handle: bool) -> Self {
        self.should_handle_cookies = Some(handle);
        self
    }

    /// Set whether requests may be pipelined.
    #[must_use]
    pub const fn should_use_pipelining(mut self, pipelining: bool) -> Self {
        self.should_use_pipelining = Some(pipelining);
        self
    }

    /// Set the network service classification.
    #[must_use]
    pub const fn network_service_type(mut self, service_type: NetworkServiceType) -> Self {
        self.network_service_type = Some(service_type);
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the HTTP methods whose parameters are encoded into the URL.
    #[must_use]
    pub fn query_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.query_methods = Some(
            methods
                .into_iter()
                .map(|m| m.as_ref().to_ascii_uppercase())
                .collect(),
        );
        self
    }

    /// Use one of the predefined query-string styles.
    #[must_use]
    pub fn query_style(mut self, style: QueryStringStyle) -> Self {
        match style {
            QueryStringStyle::Default => self.query_serializer = None,
        }
        self
    }

    /// Use a custom query-string serializer.
    #[must_use]
    pub fn query_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&Request<Bytes>, &ParameterValue) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        self.query_serializer = Some(QuerySerializer::new(serializer));
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> SerializerConfig {
        let defaults = SerializerConfig::default();
        SerializerConfig {
            string_encoding: self.string_encoding.unwrap_or(defaults.string_encoding),
            cache_policy: self.cache_policy.unwrap_or(defaults.cache_policy),
            allows_cellular_access: self
                .allows_cellular_access
                .unwrap_or(defaults.allows_cellular_access),
            should_handle_cookies: self
                .should_handle_cookies
                .unwrap_or(defaults.should_handle_cookies),
            should_use_pipelining: self
                .should_use_pipelining
                .unwrap_or(defaults.should_use_pipelining),
            network_service_type: self
                .network_service_type
                .unwrap_or(defaults.network_service_type),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            query_methods: self.query_methods.unwrap_or(defaults.query_methods),
            query_serializer: self.query_serializer,
        }
    }
}
