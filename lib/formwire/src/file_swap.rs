//! Writing a streamed multipart body to disk.
//!
//! Some transports drop `Content-Length` when the body is a stream. The
//! workaround is to spool the body to a file, upload the file, and send the
//! request without a body stream.

use std::path::Path;

use bytes::Bytes;
use formwire_core::{Error, Request, Result};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::MultipartBody;

/// Write the multipart body of `request` to `path` and return the same
/// request without a body.
///
/// Headers, including `Content-Type` and `Content-Length`, are kept. The
/// file is created or truncated; on failure it may be left partially
/// written and the error is returned as [`Error::Io`] (or
/// [`Error::MissingStream`] for a part that cannot be opened).
pub async fn request_with_multipart_written_to_file(
    request: Request<MultipartBody>,
    path: impl AsRef<Path>,
) -> Result<Request<Bytes>> {
    let path = path.as_ref();
    let (request, body) = take_body(request);
    let body = body.ok_or_else(|| Error::invalid_request("request has no multipart body"))?;

    match write_body(body, path).await {
        Ok(written) => {
            debug!(path = %path.display(), written, "multipart body written to file");
            Ok(request)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to write multipart body to file");
            Err(err)
        }
    }
}

fn take_body(request: Request<MultipartBody>) -> (Request<Bytes>, Option<MultipartBody>) {
    let (method, url, headers, body, options) = request.into_parts();
    let request = Request::builder(method, url)
        .headers(
            headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        )
        .options(options)
        .build();
    (request, body)
}

async fn write_body(body: MultipartBody, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = body.into_stream();
    let mut written = 0_u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
