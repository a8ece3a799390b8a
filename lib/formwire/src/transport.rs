//! Hand-off to an HTTP transport.
//!
//! [`into_http_request`] turns a serialized [`Request`] into an
//! [`http::Request`] whose body implements [`http_body::Body`], ready for
//! hyper or any tower-based client. [`RequestOptions`] travel in the request
//! extensions.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use formwire_core::{Error, Request, RequestOptions, Result};
use futures_core::Stream;
use http::{HeaderName, HeaderValue};
use http_body::{Frame, SizeHint};

use crate::{BodyStream, MultipartBody};

/// Request body handed to the transport.
pub struct FormwireBody {
    kind: Kind,
}

enum Kind {
    Full(Option<Bytes>),
    Stream {
        stream: BodyStream,
        length: Option<u64>,
    },
}

impl FormwireBody {
    /// Body without content.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            kind: Kind::Full(None),
        }
    }

    /// Streamed body with an optional known length.
    #[must_use]
    pub fn stream(stream: BodyStream, length: Option<u64>) -> Self {
        Self {
            kind: Kind::Stream { stream, length },
        }
    }
}

impl Default for FormwireBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for FormwireBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Kind::Full(bytes) => f
                .debug_struct("FormwireBody")
                .field("len", &bytes.as_ref().map_or(0, Bytes::len))
                .finish(),
            Kind::Stream { length, .. } => f
                .debug_struct("FormwireBody")
                .field("length", length)
                .finish_non_exhaustive(),
        }
    }
}

impl From<Bytes> for FormwireBody {
    fn from(bytes: Bytes) -> Self {
        Self {
            kind: Kind::Full(Some(bytes).filter(|bytes| !bytes.is_empty())),
        }
    }
}

impl From<MultipartBody> for FormwireBody {
    fn from(body: MultipartBody) -> Self {
        let length = body.content_length();
        Self::stream(body.into_stream(), length)
    }
}

impl http_body::Body for FormwireBody {
    type Data = Bytes;
    type Error = Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Bytes>, Error>>> {
        match &mut self.get_mut().kind {
            Kind::Full(bytes) => Poll::Ready(bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Stream { stream, .. } => stream
                .as_mut()
                .poll_next(cx)
                .map(|chunk| chunk.map(|chunk| chunk.map(Frame::data))),
        }
    }

    fn is_end_stream(&self) -> bool {
        matches!(self.kind, Kind::Full(None))
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            Kind::Full(bytes) => SizeHint::with_exact(bytes.as_ref().map_or(0, |b| b.len() as u64)),
            Kind::Stream {
                length: Some(length),
                ..
            } => SizeHint::with_exact(*length),
            Kind::Stream { length: None, .. } => SizeHint::default(),
        }
    }
}

/// Convert a serialized request for the transport.
///
/// Fails with [`Error::InvalidRequest`] when a header name or value is not
/// valid HTTP.
pub fn into_http_request<B>(request: Request<B>) -> Result<http::Request<FormwireBody>>
where
    B: Into<FormwireBody>,
{
    let (method, url, headers, body, options) = request.into_parts();

    let uri = url
        .as_str()
        .parse::<http::Uri>()
        .map_err(|err| Error::invalid_request(format!("invalid URI {url}: {err}")))?;

    let mut http_request = http::Request::new(body.map_or_else(FormwireBody::empty, Into::into));
    *http_request.method_mut() = method;
    *http_request.uri_mut() = uri;

    for (name, value) in headers.iter() {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| Error::invalid_request(format!("invalid header name {name:?}: {err}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|err| Error::invalid_request(format!("invalid value for header {name}: {err}")))?;
        http_request.headers_mut().insert(header_name, header_value);
    }
    http_request.extensions_mut().insert::<RequestOptions>(options);

    Ok(http_request)
}
