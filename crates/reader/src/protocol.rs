//! The request and response heads a body read looks at.
//!
//! A read only needs the header half of a request: `content-type` to resolve the
//! charset and multipart boundary, `content-encoding` to pick a decoder and
//! `content-length` for the length claim. The response head is never read here; it
//! is handed to verification hooks so they can set headers on it.

use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Method, Request, Response, Uri, Version};
use mime::Mime;

use crate::BodyError;

/// The response head passed through to verification hooks.
pub type ResponseHead = Response<()>;

/// Represents an HTTP request header.
///
/// Wraps a bodyless `http::Request<()>` and adds typed access to the fields that
/// drive a body read.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn content_encoding(&self) -> Option<&HeaderValue> {
        self.headers().get(CONTENT_ENCODING)
    }

    /// The parsed `content-type`, or `None` when it is missing or unparseable.
    pub fn content_type(&self) -> Option<Mime> {
        self.headers().get(CONTENT_TYPE)?.to_str().ok()?.parse().ok()
    }

    /// The declared body length.
    ///
    /// A missing header is no claim at all; a header that is not a decimal byte count
    /// fails with [`BodyError::InvalidContentLength`].
    pub fn content_length(&self) -> Result<Option<u64>, BodyError> {
        let Some(value) = self.headers().get(CONTENT_LENGTH) else {
            return Ok(None);
        };

        let value = value.to_str().map_err(BodyError::invalid_content_length)?.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BodyError::invalid_content_length(format!("{value:?} is not a byte count")));
        }

        value.parse().map(Some).map_err(BodyError::invalid_content_length)
    }
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
