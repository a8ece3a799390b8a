//! Error types for formwire.

use derive_more::{Display, Error, From};

/// Boxed error used for codec and caller-supplied serializer failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for request serialization.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The HTTP method is empty or not a valid token.
    #[display("invalid HTTP method: {_0:?}")]
    #[from(skip)]
    InvalidMethod(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// The body codec failed to encode the parameters.
    #[display("body encoding error: {_0}")]
    #[from(skip)]
    BodyEncoding(#[error(not(source))] BoxError),

    /// A stream-backed multipart part could not be opened.
    #[display("missing stream for part '{name}'")]
    #[from(skip)]
    MissingStream {
        /// Name of the form part.
        name: String,
    },

    /// I/O failure while reading a part or writing a body to disk.
    #[display("I/O error: {_0}")]
    #[from]
    Io(std::io::Error),

    /// Raw binary data used where only string-encodable scalars are valid.
    #[display("raw data at '{key}' cannot be encoded as a string")]
    #[from(skip)]
    Encoding {
        /// Flattened key of the offending value.
        key: String,
    },

    /// Error returned by a caller-supplied query serializer, carried as-is.
    #[display("{_0}")]
    #[from(skip)]
    QuerySerialization(#[error(not(source))] BoxError),

    /// The request cannot be converted for the transport.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid method error.
    #[must_use]
    pub fn invalid_method(method: impl Into<String>) -> Self {
        Self::InvalidMethod(method.into())
    }

    /// Wrap a codec failure.
    #[must_use]
    pub fn body_encoding(err: impl Into<BoxError>) -> Self {
        Self::BodyEncoding(err.into())
    }

    /// Create a missing stream error for the given part name.
    #[must_use]
    pub fn missing_stream(name: impl Into<String>) -> Self {
        Self::MissingStream { name: name.into() }
    }

    /// Create an encoding error for the given flattened key.
    #[must_use]
    pub fn encoding(key: impl Into<String>) -> Self {
        Self::Encoding { key: key.into() }
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns `true` if this is an I/O error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Returns `true` if a multipart stream could not be opened.
    #[must_use]
    pub const fn is_missing_stream(&self) -> bool {
        matches!(self, Self::MissingStream { .. })
    }

    /// Returns the caller-supplied query serializer error, if any.
    #[must_use]
    pub fn query_serialization_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::QuerySerialization(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, derive_more::Display, derive_more::Error)]
    #[display("quota exceeded")]
    struct QuotaExceeded;

    #[test]
    fn error_display() {
        let err = Error::invalid_method("");
        assert_eq!(err.to_string(), "invalid HTTP method: \"\"");

        let err = Error::missing_stream("avatar");
        assert_eq!(err.to_string(), "missing stream for part 'avatar'");

        let err = Error::encoding("blob[]");
        assert_eq!(
            err.to_string(),
            "raw data at 'blob[]' cannot be encoded as a string"
        );
    }

    #[test]
    fn error_from_url() {
        let err: Error = url::Url::parse("not a url").expect_err("invalid").into();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert!(err.to_string().starts_with("invalid URL"));
    }

    #[test]
    fn error_from_io() {
        let err: Error = std::io::Error::other("disk full").into();
        assert!(err.is_io());
        assert!(!err.is_missing_stream());
    }

    #[test]
    fn query_serialization_keeps_caller_error() {
        let err = Error::QuerySerialization(Box::new(QuotaExceeded));
        assert_eq!(err.to_string(), "quota exceeded");

        let inner = err.query_serialization_error().expect("caller error");
        assert!(inner.downcast_ref::<QuotaExceeded>().is_some());

        assert!(Error::missing_stream("x").query_serialization_error().is_none());
    }

    #[test]
    fn body_encoding_wraps_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid");
        let err = Error::body_encoding(json_err);
        assert!(err.to_string().starts_with("body encoding error"));
        assert!(matches!(err, Error::BodyEncoding(_)));
    }
}
