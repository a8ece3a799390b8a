//! Multipart request construction on top of [`RequestSerializer`].

use bytes::Bytes;
use formwire_core::{
    Error, ParameterValue, Request, RequestSerialization, RequestSerializer, Result, leaves,
    parse_method, scalar_string,
};
use tracing::debug;

use crate::{MultipartBody, MultipartFormData};

/// Extension trait adding `multipart/form-data` requests to a serializer.
pub trait MultipartSerializerExt {
    /// Build a multipart request.
    ///
    /// `params` are flattened into form fields first (raw data is kept as
    /// bytes), then `build` appends the caller's parts. The request gets
    /// `Content-Type: multipart/form-data; boundary=...` and, when every part
    /// has a known length, `Content-Length`.
    ///
    /// `GET` and `HEAD` have no body and fail with [`Error::InvalidMethod`].
    ///
    /// # Example
    ///
    /// ```
    /// use formwire::{MultipartSerializerExt, ParameterMap, ParameterValue, RequestSerializer};
    ///
    /// let serializer = RequestSerializer::default();
    /// let params: ParameterValue = ParameterMap::new().with("title", "holiday").into();
    ///
    /// let request = serializer
    ///     .multipart_form_request("POST", "http://h/upload", Some(&params), |form| {
    ///         form.append_file_data("photo", "a.jpg", "image/jpeg", vec![0xFF, 0xD8]);
    ///         Ok(())
    ///     })
    ///     .expect("request");
    ///
    /// let body = request.body().expect("body");
    /// assert_eq!(
    ///     request.header("Content-Length"),
    ///     body.content_length().map(|len| len.to_string()).as_deref()
    /// );
    /// ```
    fn multipart_form_request<F>(
        &self,
        method: &str,
        url: &str,
        params: Option<&ParameterValue>,
        build: F,
    ) -> Result<Request<MultipartBody>>
    where
        F: FnOnce(&mut MultipartFormData) -> Result<()>;
}

impl MultipartSerializerExt for RequestSerializer {
    fn multipart_form_request<F>(
        &self,
        method: &str,
        url: &str,
        params: Option<&ParameterValue>,
        build: F,
    ) -> Result<Request<MultipartBody>>
    where
        F: FnOnce(&mut MultipartFormData) -> Result<()>,
    {
        let parsed = parse_method(method)?;
        if ["GET", "HEAD"]
            .iter()
            .any(|bodyless| parsed.as_str().eq_ignore_ascii_case(bodyless))
        {
            return Err(Error::invalid_method(method));
        }

        let request = self.prepare(method, url)?;
        let mut request = self.serialize_request(request, None)?;

        let mut form = MultipartFormData::new();
        if let Some(params) = params {
            for (key, leaf) in leaves(None, params) {
                let value = match leaf {
                    ParameterValue::Data(bytes) => bytes.clone(),
                    scalar => scalar_string(scalar).map(Bytes::from).unwrap_or_default(),
                };
                form.append_form_data(key, value);
            }
        }
        build(&mut form)?;

        let body = form.build();
        request
            .headers_mut()
            .set("Content-Type", body.content_type());
        match body.content_length() {
            Some(length) => request
                .headers_mut()
                .set("Content-Length", length.to_string()),
            None => {
                request.headers_mut().remove("Content-Length");
            }
        }
        debug!(
            method = %request.method(),
            url = %request.url(),
            boundary = body.boundary(),
            parts = form.len(),
            content_length = ?body.content_length(),
            "multipart request built"
        );

        Ok(request.with_body(Some(body)))
    }
}

#[cfg(test)]
mod tests {
    use formwire_core::ParameterMap;

    use super::*;
    use crate::BodyPart;

    fn serializer() -> RequestSerializer {
        RequestSerializer::default()
    }

    #[test]
    fn rejects_bodyless_methods() {
        for method in ["GET", "head"] {
            let err = serializer()
                .multipart_form_request(method, "http://h/p", None, |_| Ok(()))
                .expect_err("bodyless method");
            assert!(matches!(err, Error::InvalidMethod(_)), "{method}");
        }
    }

    #[test]
    fn params_become_fields_before_parts() {
        let params: ParameterValue = ParameterMap::new()
            .with("user", ParameterMap::new().with("name", "ada").with("admin", true))
            .with("blob", Bytes::from_static(b"\x00\x01"))
            .with("tags", vec!["a"])
            .into();

        let request = serializer()
            .multipart_form_request("PUT", "http://h/p", Some(&params), |form| {
                form.append_file_data("doc", "d.txt", "text/plain", "x");
                Ok(())
            })
            .expect("request");

        let body = request.body().expect("body");
        assert!(request.header("content-type").is_some_and(|ct| ct.ends_with(body.boundary())));
        assert_eq!(request.url().as_str(), "http://h/p");

        let names: Vec<_> = body.parts().filter_map(BodyPart::name).collect();
        assert_eq!(names, ["user[name]", "user[admin]", "blob", "tags[]", "doc"]);
        let values: Vec<_> = body
            .parts()
            .filter_map(|part| match part {
                BodyPart::FormField { value, .. } => Some(value.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(values, [&b"ada"[..], &b"1"[..], &b"\x00\x01"[..], &b"a"[..]]);
    }

    #[test]
    fn build_error_is_returned() {
        let err = serializer()
            .multipart_form_request("POST", "http://h/p", None, |form| {
                form.append_file("/no/such/file.bin", "file")?;
                Ok(())
            })
            .expect_err("missing file");
        assert!(err.is_missing_stream());
    }

    #[test]
    fn unknown_length_has_no_content_length() {
        let request = serializer()
            .multipart_form_request("POST", "http://h/p", None, |form| {
                form.append_stream("s", "s.bin", "application/octet-stream", &b"abc"[..], None);
                Ok(())
            })
            .expect("request");

        assert!(request.header("Content-Length").is_none());
        assert!(request.body().is_some_and(|b| b.content_length().is_none()));
    }

    #[test]
    fn default_headers_are_applied() {
        let mut serializer = serializer();
        serializer.set_header("X-Client", Some("tests".to_string()));

        let request = serializer
            .multipart_form_request("POST", "http://h/p", None, |_| Ok(()))
            .expect("request");
        assert_eq!(request.header("x-client"), Some("tests"));
        assert!(request.header("user-agent").is_some());
    }
}
