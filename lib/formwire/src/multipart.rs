//! `multipart/form-data` body assembly.
//!
//! [`MultipartFormData`] accumulates parts in append order and builds a
//! [`MultipartBody`]: the boundary plus the parts, streamed lazily so files
//! and readers are only opened when the transport starts pulling bytes.
//!
//! Each part is framed as
//!
//! ```text
//! --<boundary>\r\n
//! Content-Disposition: form-data; name="<name>"[; filename="<filename>"]\r\n
//! [Content-Type: <mime>\r\n]
//! \r\n
//! <content>\r\n
//! ```
//!
//! and the body ends with `--<boundary>--\r\n`.
//!
//! # Example
//!
//! ```
//! use formwire::MultipartFormData;
//!
//! # tokio_test_block_on(async {
//! let mut form = MultipartFormData::with_boundary("XyZ");
//! form.append_form_data("x", "1");
//!
//! let body = form.build();
//! assert_eq!(body.content_length(), Some(63));
//! let bytes = body.into_bytes().await.expect("body");
//! assert_eq!(
//!     bytes.as_ref(),
//!     &b"--XyZ\r\nContent-Disposition: form-data; name=\"x\"\r\n\r\n1\r\n--XyZ--\r\n"[..]
//! );
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().expect("runtime").block_on(f)
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use futures_core::Stream;
use futures_util::future;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use formwire_core::{ContentType, Error, Result};

use crate::Throttle;

/// Boxed stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Boxed async reader backing a stream part.
pub type PartReader = Box<dyn AsyncRead + Send + Unpin>;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Where the content of a stream-backed part comes from.
#[derive(Clone)]
pub enum PartSource {
    /// A file, opened when the body is streamed.
    File(PathBuf),
    /// A reader, consumed by the first body that streams it.
    Reader(Arc<Mutex<Option<PartReader>>>),
}

impl PartSource {
    /// Wrap a reader.
    pub fn reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Reader(Arc::new(Mutex::new(Some(Box::new(reader)))))
    }

    async fn open(self, name: &str) -> Result<PartReader> {
        match self {
            Self::File(path) => match tokio::fs::File::open(&path).await {
                Ok(file) => Ok(Box::new(file)),
                Err(err) => {
                    warn!(part = name, path = %path.display(), error = %err, "cannot open part file");
                    Err(Error::missing_stream(name))
                }
            },
            Self::Reader(slot) => slot
                .lock()
                .ok()
                .and_then(|mut reader| reader.take())
                .ok_or_else(|| Error::missing_stream(name)),
        }
    }
}

impl fmt::Debug for PartSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Reader(_) => f.debug_tuple("Reader").finish_non_exhaustive(),
        }
    }
}

/// One part of a multipart body.
#[derive(Debug, Clone)]
pub enum BodyPart {
    /// A plain form field.
    FormField {
        /// Field name.
        name: String,
        /// Field value.
        value: Bytes,
    },
    /// In-memory file content.
    FileBytes {
        /// Field name.
        name: String,
        /// File name sent to the server.
        filename: String,
        /// MIME type of the content.
        mime_type: String,
        /// File content.
        content: Bytes,
    },
    /// File content read from a file or reader while streaming.
    FileStream {
        /// Field name.
        name: String,
        /// File name sent to the server.
        filename: String,
        /// MIME type of the content.
        mime_type: String,
        /// Content source.
        source: PartSource,
        /// Declared content length, `None` when unknown.
        length: Option<u64>,
    },
    /// A part with caller-supplied headers, written verbatim.
    RawHeadered {
        /// Part headers, in order.
        headers: Vec<(String, String)>,
        /// Part content.
        body: Bytes,
    },
}

impl BodyPart {
    /// Part headers in emission order.
    #[must_use]
    pub fn headers(&self) -> Vec<(String, String)> {
        match self {
            Self::FormField { name, .. } => {
                vec![content_disposition(name, None)]
            }
            Self::FileBytes {
                name,
                filename,
                mime_type,
                ..
            }
            | Self::FileStream {
                name,
                filename,
                mime_type,
                ..
            } => vec![
                content_disposition(name, Some(filename)),
                ("Content-Type".to_string(), mime_type.clone()),
            ],
            Self::RawHeadered { headers, .. } => headers.clone(),
        }
    }

    /// Content length, `None` for a stream part of unknown length.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        match self {
            Self::FormField { value: data, .. }
            | Self::FileBytes { content: data, .. }
            | Self::RawHeadered { body: data, .. } => Some(data.len() as u64),
            Self::FileStream { length, .. } => *length,
        }
    }

    /// Field name, `None` for a raw headered part.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::FormField { name, .. }
            | Self::FileBytes { name, .. }
            | Self::FileStream { name, .. } => Some(name),
            Self::RawHeadered { .. } => None,
        }
    }

    fn head(&self, boundary: &str) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"\r\n");
        for (name, value) in self.headers() {
            buf.put_slice(name.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"\r\n");
        buf.freeze()
    }

    fn into_content(self, throttle: Option<Throttle>) -> BodyStream {
        match self {
            Self::FormField { value: data, .. }
            | Self::FileBytes { content: data, .. }
            | Self::RawHeadered { body: data, .. } => single(data),
            Self::FileStream {
                name,
                source,
                length,
                ..
            } => {
                let content = stream::once(async move {
                    let reader = source.open(&name).await?;
                    Ok::<_, Error>(read_chunks(reader, length))
                })
                .try_flatten();
                match throttle {
                    Some(throttle) => throttle.wrap(content),
                    None => Box::pin(content),
                }
            }
        }
    }
}

fn single(chunk: Bytes) -> BodyStream {
    Box::pin(stream::once(future::ready(Ok(chunk))))
}

fn content_disposition(name: &str, filename: Option<&str>) -> (String, String) {
    let value = match filename {
        Some(filename) => format!("form-data; name=\"{name}\"; filename=\"{filename}\""),
        None => format!("form-data; name=\"{name}\""),
    };
    ("Content-Disposition".to_string(), value)
}

/// Read a source to the end, enforcing a declared length.
fn read_chunks(reader: PartReader, declared: Option<u64>) -> BodyStream {
    Box::pin(stream::try_unfold(
        (reader, 0_u64),
        move |(mut reader, read)| async move {
            let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);
            let n = reader.read_buf(&mut buf).await?;
            if n == 0 {
                return match declared {
                    Some(expected) if read < expected => Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("stream ended after {read} of {expected} declared bytes"),
                    ))),
                    _ => Ok(None),
                };
            }
            let read = read + n as u64;
            if let Some(expected) = declared.filter(|expected| read > *expected) {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("stream produced more than {expected} declared bytes"),
                )));
            }
            Ok(Some((buf.freeze(), (reader, read))))
        },
    ))
}

#[derive(Debug, Clone)]
struct Entry {
    part: BodyPart,
    throttle: Option<Throttle>,
}

/// Accumulates the parts of a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartFormData {
    boundary: String,
    entries: Vec<Entry>,
    throttle: Option<Throttle>,
}

impl Default for MultipartFormData {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartFormData {
    /// Create an empty form with a random boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create an empty form with a fixed boundary.
    ///
    /// The boundary must not occur in any part content.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            entries: Vec::new(),
            throttle: None,
        }
    }

    /// Boundary token.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `Content-Type` header value, `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        content_type(&self.boundary)
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no part was appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parts in append order.
    pub fn parts(&self) -> impl Iterator<Item = &BodyPart> {
        self.entries.iter().map(|entry| &entry.part)
    }

    /// Append a part.
    ///
    /// Stream-backed parts are throttled if [`throttle_bandwidth`](Self::throttle_bandwidth)
    /// was called before.
    pub fn append(&mut self, part: BodyPart) -> &mut Self {
        let throttle = if matches!(part, BodyPart::FileStream { .. }) {
            self.throttle
        } else {
            None
        };
        self.entries.push(Entry { part, throttle });
        self
    }

    /// Append a plain form field.
    pub fn append_form_data(&mut self, name: impl Into<String>, value: impl Into<Bytes>) -> &mut Self {
        self.append(BodyPart::FormField {
            name: name.into(),
            value: value.into(),
        })
    }

    /// Append in-memory file content.
    pub fn append_file_data(
        &mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> &mut Self {
        self.append(BodyPart::FileBytes {
            name: name.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            content: content.into(),
        })
    }

    /// Append a file, guessing the file name and MIME type from the path.
    ///
    /// Fails with [`Error::MissingStream`] if the path is not a readable
    /// regular file.
    pub fn append_file(&mut self, path: impl AsRef<Path>, name: impl Into<String>) -> Result<&mut Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|filename| filename.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = guess_content_type(path);
        self.append_file_with(path, name, filename, mime_type)
    }

    /// Append a file with an explicit file name and MIME type.
    pub fn append_file_with(
        &mut self,
        path: impl AsRef<Path>,
        name: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Result<&mut Self> {
        let path = path.as_ref();
        let name = name.into();
        let length = match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            Ok(_) => {
                warn!(part = %name, path = %path.display(), "not a regular file");
                return Err(Error::missing_stream(name));
            }
            Err(err) => {
                warn!(part = %name, path = %path.display(), error = %err, "cannot read file metadata");
                return Err(Error::missing_stream(name));
            }
        };
        Ok(self.append(BodyPart::FileStream {
            name,
            filename: filename.into(),
            mime_type: mime_type.into(),
            source: PartSource::File(path.to_path_buf()),
            length: Some(length),
        }))
    }

    /// Append content read from `reader`.
    ///
    /// With a declared `length` the body length is known up front and the
    /// reader must produce exactly that many bytes.
    pub fn append_stream(
        &mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
        length: Option<u64>,
    ) -> &mut Self {
        self.append(BodyPart::FileStream {
            name: name.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            source: PartSource::reader(reader),
            length,
        })
    }

    /// Append a part with caller-supplied headers.
    pub fn append_headers<N, V>(
        &mut self,
        headers: impl IntoIterator<Item = (N, V)>,
        body: impl Into<Bytes>,
    ) -> &mut Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.append(BodyPart::RawHeadered {
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
            body: body.into(),
        })
    }

    /// Throttle stream-backed parts appended from now on.
    ///
    /// Their content is delivered in packets of at most `packet_size` bytes
    /// with `delay` between full packets.
    pub fn throttle_bandwidth(&mut self, packet_size: usize, delay: Duration) -> &mut Self {
        self.throttle = Some(Throttle::new(packet_size, delay));
        self
    }

    /// Build the body.
    ///
    /// The boundary is fixed at form creation, so building twice yields the
    /// same bytes. A reader part can only be streamed once; streaming it again
    /// fails with [`Error::MissingStream`].
    #[must_use]
    pub fn build(&self) -> MultipartBody {
        let body = MultipartBody {
            boundary: self.boundary.clone(),
            entries: self.entries.clone(),
        };
        debug!(
            boundary = %body.boundary,
            parts = body.entries.len(),
            content_length = ?body.content_length(),
            "multipart body built"
        );
        body
    }
}

/// An assembled `multipart/form-data` body, streamed once by the transport.
#[derive(Debug)]
pub struct MultipartBody {
    boundary: String,
    entries: Vec<Entry>,
}

impl MultipartBody {
    /// Boundary token.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `Content-Type` header value.
    #[must_use]
    pub fn content_type(&self) -> String {
        content_type(&self.boundary)
    }

    /// Parts in append order.
    pub fn parts(&self) -> impl Iterator<Item = &BodyPart> {
        self.entries.iter().map(|entry| &entry.part)
    }

    /// Total length in bytes, `None` if a stream part has an unknown length.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        let framing = self.closing().len() as u64;
        self.entries.iter().try_fold(framing, |total, entry| {
            let head = entry.part.head(&self.boundary).len() as u64;
            let content = entry.part.content_length()?;
            Some(total + head + content + 2)
        })
    }

    /// Stream the body.
    ///
    /// The stream ends after the first error.
    #[must_use]
    pub fn into_stream(self) -> BodyStream {
        let closing = self.closing();
        let boundary = self.boundary;
        let mut segments: Vec<BodyStream> = Vec::with_capacity(self.entries.len() * 3 + 1);
        for Entry { part, throttle } in self.entries {
            let head = part.head(&boundary);
            debug!(part = part.name().unwrap_or("<raw>"), "streaming multipart part");
            segments.push(single(head));
            segments.push(part.into_content(throttle));
            segments.push(single(Bytes::from_static(b"\r\n")));
        }
        segments.push(single(closing));

        Box::pin(
            stream::iter(segments)
                .flatten()
                .scan(false, |failed, item: Result<Bytes>| {
                    if *failed {
                        return future::ready(None);
                    }
                    *failed = item.is_err();
                    future::ready(Some(item))
                }),
        )
    }

    /// Read the whole body into memory.
    pub async fn into_bytes(self) -> Result<Bytes> {
        let capacity = self
            .content_length()
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or_default();
        let mut buf = BytesMut::with_capacity(capacity);
        let mut stream = self.into_stream();
        while let Some(chunk) = stream.next().await {
            buf.put_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    fn closing(&self) -> Bytes {
        Bytes::from(format!("--{}--\r\n", self.boundary))
    }
}

fn content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/// Random boundary token, `Boundary+` followed by 16 hex digits.
#[must_use]
pub fn generate_boundary() -> String {
    format!(
        "Boundary+{:08X}{:08X}",
        rand::random::<u32>(),
        rand::random::<u32>()
    )
}

/// Guess a MIME type from a path extension.
///
/// Unknown extensions map to `application/octet-stream`.
#[must_use]
pub fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "text" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "json" => ContentType::Json.as_str(),
        "xml" => "application/xml",
        "plist" => ContentType::PropertyList.as_str(),
        "js" => "application/javascript",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => ContentType::OctetStream.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head_str(part: &BodyPart) -> String {
        String::from_utf8(part.head("b").to_vec()).expect("utf8")
    }

    #[test]
    fn form_field_head() {
        let part = BodyPart::FormField {
            name: "x".to_string(),
            value: Bytes::from_static(b"1"),
        };
        assert_eq!(
            head_str(&part),
            "--b\r\nContent-Disposition: form-data; name=\"x\"\r\n\r\n"
        );
    }

    #[test]
    fn file_head_has_filename_and_type() {
        let part = BodyPart::FileBytes {
            name: "avatar".to_string(),
            filename: "me.png".to_string(),
            mime_type: "image/png".to_string(),
            content: Bytes::from_static(b"\x89PNG"),
        };
        assert_eq!(
            head_str(&part),
            "--b\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        );
    }

    #[test]
    fn raw_headers_are_verbatim() {
        let part = BodyPart::RawHeadered {
            headers: vec![("X-Custom".to_string(), "a b%20c".to_string())],
            body: Bytes::new(),
        };
        assert_eq!(head_str(&part), "--b\r\nX-Custom: a b%20c\r\n\r\n");
    }

    #[test]
    fn boundary_shape() {
        let boundary = generate_boundary();
        let hex = boundary.strip_prefix("Boundary+").expect("prefix");
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(generate_boundary(), generate_boundary());
    }

    #[test]
    fn content_type_carries_boundary() {
        let form = MultipartFormData::with_boundary("abc");
        assert_eq!(form.content_type(), "multipart/form-data; boundary=abc");
        assert_eq!(form.build().content_type(), form.content_type());
    }

    #[test]
    fn content_length_sums_framing() {
        let mut form = MultipartFormData::with_boundary("b");
        form.append_form_data("x", "1")
            .append_file_data("f", "a.txt", "text/plain", "hello");

        let expected = "--b\r\nContent-Disposition: form-data; name=\"x\"\r\n\r\n1\r\n".len()
            + "--b\r\nContent-Disposition: form-data; name=\"f\"; filename=\"a.txt\"\r\n\
               Content-Type: text/plain\r\n\r\nhello\r\n"
                .len()
            + "--b--\r\n".len();
        assert_eq!(form.build().content_length(), Some(expected as u64));
    }

    #[test]
    fn unknown_stream_length_is_indeterminate() {
        let mut form = MultipartFormData::with_boundary("b");
        form.append_form_data("x", "1");
        form.append_stream("s", "s.bin", "application/octet-stream", &b"abc"[..], None);
        assert_eq!(form.build().content_length(), None);
    }

    #[test]
    fn empty_form_is_just_the_terminator() {
        let form = MultipartFormData::with_boundary("b");
        assert!(form.is_empty());
        assert_eq!(form.build().content_length(), Some(7));
    }

    #[test]
    fn throttle_applies_to_later_stream_parts() {
        let mut form = MultipartFormData::with_boundary("b");
        form.append_stream("before", "a", "text/plain", &b""[..], Some(0));
        form.throttle_bandwidth(4, Duration::from_millis(10));
        form.append_form_data("field", "x");
        form.append_stream("after", "b", "text/plain", &b""[..], Some(0));

        let throttles: Vec<_> = form.entries.iter().map(|e| e.throttle.is_some()).collect();
        assert_eq!(throttles, [false, false, true]);
    }

    #[test]
    fn missing_file_fails_on_append() {
        let mut form = MultipartFormData::new();
        let err = form
            .append_file("/definitely/not/here.txt", "doc")
            .expect_err("missing file");
        assert!(err.is_missing_stream());
        assert!(form.is_empty());
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut form = MultipartFormData::new();
        let err = form.append_file(dir.path(), "doc").expect_err("directory");
        assert!(matches!(err, Error::MissingStream { name } if name == "doc"));
    }

    #[test]
    fn append_file_guesses_name_and_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Report.PDF");
        std::fs::write(&path, b"%PDF-1.7").expect("write");

        let mut form = MultipartFormData::new();
        form.append_file(&path, "doc").expect("append");

        let part = form.parts().next().expect("part");
        let BodyPart::FileStream {
            filename,
            mime_type,
            length,
            ..
        } = part
        else {
            panic!("expected a stream part, got {part:?}");
        };
        assert_eq!(filename, "Report.PDF");
        assert_eq!(mime_type, "application/pdf");
        assert_eq!(*length, Some(8));
    }

    #[test]
    fn guesses_types() {
        assert_eq!(guess_content_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("dir/b.JSON")), "application/json");
        assert_eq!(guess_content_type(Path::new("noext")), "application/octet-stream");
        assert_eq!(guess_content_type(Path::new("c.unknown")), "application/octet-stream");
    }
}
