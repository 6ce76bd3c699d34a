//! Reading a whole request body.
//!
//! A [`Reader`] turns a body into a value: it resolves the charset, runs the
//! pre-verify hooks, streams the body through the pipeline, runs the verify hooks,
//! decodes the text and hands it to a parse function. A [`RawReader`] stops after the
//! verify hooks and returns the bytes.

use std::fmt;
use std::sync::Arc;

use bytes::{Buf, Bytes};
use http_body::Body;
use tracing::trace;

use crate::body::OptionReqBody;
use crate::charset::request_charset;
use crate::config::ReadOptions;
use crate::pipeline::{self, ContentEncoding, StreamLimits};
use crate::protocol::{RequestHeader, ResponseHead};
use crate::{BodyError, BoxError};

/// Streams the body of a request through the pipeline configured by `options`.
///
/// The content-encoding and content-length are checked before the body is taken, so a
/// request failing those checks keeps its body.
pub(crate) async fn read_bytes<B>(header: &RequestHeader, body: &OptionReqBody<B>, options: &ReadOptions) -> Result<Bytes, BodyError>
where
    B: Body + Unpin,
    B::Data: Buf,
    B::Error: Into<BoxError>,
{
    let encoding = ContentEncoding::from_header(header.content_encoding(), options.allow_decompression())?;
    let limits = StreamLimits { expected_length: header.content_length()?, size_limit: options.size_limit() };
    trace!(%encoding, ?limits, "read request body");

    let transport = body.take().await?;
    pipeline::read_raw(transport, encoding, limits).await
}

/// Reads a body into a value through a parse function.
///
/// ```
/// use bytes::Bytes;
/// use http::Request;
/// use http_body_util::Full;
/// use micro_body::config::ReadOptions;
/// use micro_body::read::Reader;
/// use micro_body::{OptionReqBody, RequestHeader, ResponseHead};
///
/// # tokio_test();
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn tokio_test() {
/// let reader = Reader::new(ReadOptions::default(), |text: &str| serde_json::from_str::<serde_json::Value>(text));
///
/// let header = RequestHeader::from(Request::builder().header("content-type", "application/json").body(()).unwrap());
/// let body = OptionReqBody::from(Full::new(Bytes::from_static(br#"{"a":1}"#)));
///
/// let value = reader.read(&header, &body, &mut ResponseHead::default()).await.unwrap();
/// assert_eq!(value["a"], 1);
/// # }
/// ```
pub struct Reader<P> {
    options: Arc<ReadOptions>,
    parse: P,
}

impl<P> Reader<P> {
    pub fn new<O: Into<Arc<ReadOptions>>>(options: O, parse: P) -> Self {
        Self { options: options.into(), parse }
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub async fn read<B, T, E>(&self, header: &RequestHeader, body: &OptionReqBody<B>, response: &mut ResponseHead) -> Result<T, BodyError>
    where
        P: Fn(&str) -> Result<T, E>,
        E: Into<BoxError>,
        B: Body + Unpin,
        B::Data: Buf,
        B::Error: Into<BoxError>,
    {
        let charset = request_charset(header)?;
        self.options.run_pre_verify(header, response, charset.as_ref())?;

        let bytes = read_bytes(header, body, &self.options).await?;
        self.options.run_verify(header, response, &bytes, charset.as_ref())?;

        let text = charset.unwrap_or_else(|| self.options.default_charset()).decode(&bytes)?;
        match (self.parse)(&text) {
            Ok(value) => Ok(value),
            Err(e) => Err(BodyError::parse(text, e)),
        }
    }
}

impl<P> fmt::Debug for Reader<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader").field("options", &self.options).finish_non_exhaustive()
    }
}

/// Reads a body into bytes, without any charset handling.
///
/// Hooks see no charset.
#[derive(Debug, Clone)]
pub struct RawReader {
    options: Arc<ReadOptions>,
}

impl RawReader {
    pub fn new<O: Into<Arc<ReadOptions>>>(options: O) -> Self {
        Self { options: options.into() }
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub async fn read<B>(&self, header: &RequestHeader, body: &OptionReqBody<B>, response: &mut ResponseHead) -> Result<Bytes, BodyError>
    where
        B: Body + Unpin,
        B::Data: Buf,
        B::Error: Into<BoxError>,
    {
        self.options.run_pre_verify(header, response, None)?;
        let bytes = read_bytes(header, body, &self.options).await?;
        self.options.run_verify(header, response, &bytes, None)?;
        Ok(bytes)
    }
}
