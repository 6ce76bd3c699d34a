use std::error::Error;
use std::io;

use bytes::Bytes;
use http::StatusCode;
use micro_body_parser::ParseError;
use thiserror::Error;

/// Boxed error for failures coming from the transport or from caller supplied code.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Every failure a body read can end with.
///
/// Each variant maps to a stable [`code`](BodyError::code) and an HTTP
/// [`status_code`](BodyError::status_code). Wrapping variants keep the original
/// failure as their `source`.
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("unsupported content encoding \"{encoding}\"")]
    EncodingUnsupported { encoding: String },

    #[error("unsupported charset \"{charset}\"")]
    CharsetUnsupported { charset: String },

    #[error("request body does not adhere to charset {charset}")]
    CharsetMismatch { charset: &'static str },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("request body exceeded the content-length {expected}")]
    ContentLengthExceeded { expected: u64, received: u64 },

    #[error("request body size {received} did not match the content-length {expected}")]
    ContentLengthMismatch { expected: u64, received: u64 },

    #[error("decoded request body exceeded the size limit {limit}")]
    SizeLimitExceeded { limit: u64, received: u64 },

    #[error("invalid {encoding} content: {source}")]
    ContentDecode { encoding: &'static str, source: io::Error },

    #[error("malformed request body: {source}")]
    Malformed {
        #[from]
        source: ParseError,
    },

    #[error("multipart body cannot be parsed without 'boundary' parameter")]
    BoundaryRequired,

    #[error("pre-verify failed: {source}")]
    PreVerifyFailed { source: BoxError },

    #[error("verify failed: {source}")]
    VerifyFailed { body: Bytes, source: BoxError },

    #[error("parse failed: {source}")]
    ParseFailed { text: String, source: BoxError },

    #[error("transport error: {source}")]
    Transport { source: BoxError },

    #[error("request body has been consumed")]
    AlreadyConsumed,
}

impl BodyError {
    pub fn encoding_unsupported<S: ToString>(encoding: S) -> Self {
        Self::EncodingUnsupported { encoding: encoding.to_string() }
    }

    pub fn charset_unsupported<S: ToString>(charset: S) -> Self {
        Self::CharsetUnsupported { charset: charset.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(reason: S) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }

    pub fn content_decode(encoding: &'static str, source: io::Error) -> Self {
        Self::ContentDecode { encoding, source }
    }

    pub fn pre_verify<E: Into<BoxError>>(source: E) -> Self {
        Self::PreVerifyFailed { source: source.into() }
    }

    pub fn verify<E: Into<BoxError>>(body: Bytes, source: E) -> Self {
        Self::VerifyFailed { body, source: source.into() }
    }

    pub fn parse<E: Into<BoxError>>(text: String, source: E) -> Self {
        Self::ParseFailed { text, source: source.into() }
    }

    pub fn transport<E: Into<BoxError>>(source: E) -> Self {
        Self::Transport { source: source.into() }
    }

    /// Stable machine readable code of this failure.
    pub fn code(&self) -> &'static str {
        match self {
            BodyError::EncodingUnsupported { .. } => "encoding.unsupported",
            BodyError::CharsetUnsupported { .. } => "charset.unsupported",
            BodyError::CharsetMismatch { .. } => "charset.mismatch",
            BodyError::InvalidContentLength { .. } => "content-length.malformed",
            BodyError::ContentLengthExceeded { .. } => "content-length.exceeded-claim",
            BodyError::ContentLengthMismatch { .. } => "content-length.mismatched-claim",
            BodyError::SizeLimitExceeded { .. } => "entity.too-large",
            BodyError::ContentDecode { .. } => "encoding.malformed",
            BodyError::Malformed { source } => source.code(),
            BodyError::BoundaryRequired => "multipart.boundary-required",
            BodyError::PreVerifyFailed { .. } => "entity.pre-verify.failed",
            BodyError::VerifyFailed { .. } => "entity.verify.failed",
            BodyError::ParseFailed { .. } => "entity.parse.failed",
            BodyError::Transport { .. } => "stream.transport",
            BodyError::AlreadyConsumed => "body.consumed",
        }
    }

    /// The response status a server should answer this failure with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BodyError::EncodingUnsupported { .. } | BodyError::CharsetUnsupported { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            BodyError::SizeLimitExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            BodyError::PreVerifyFailed { .. } | BodyError::VerifyFailed { .. } => StatusCode::FORBIDDEN,
            BodyError::AlreadyConsumed => StatusCode::INTERNAL_SERVER_ERROR,
            BodyError::CharsetMismatch { .. }
            | BodyError::InvalidContentLength { .. }
            | BodyError::ContentLengthExceeded { .. }
            | BodyError::ContentLengthMismatch { .. }
            | BodyError::ContentDecode { .. }
            | BodyError::Malformed { .. }
            | BodyError::BoundaryRequired
            | BodyError::ParseFailed { .. }
            | BodyError::Transport { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_status() {
        let cases = [
            (BodyError::encoding_unsupported("foobar"), "encoding.unsupported", 415),
            (BodyError::charset_unsupported("utf-16"), "charset.unsupported", 415),
            (BodyError::CharsetMismatch { charset: "UTF-8" }, "charset.mismatch", 400),
            (BodyError::invalid_content_length("abc"), "content-length.malformed", 400),
            (BodyError::ContentLengthExceeded { expected: 1, received: 2 }, "content-length.exceeded-claim", 400),
            (BodyError::ContentLengthMismatch { expected: 2, received: 1 }, "content-length.mismatched-claim", 400),
            (BodyError::SizeLimitExceeded { limit: 1, received: 2 }, "entity.too-large", 413),
            (BodyError::content_decode("gzip", io::Error::other("corrupt")), "encoding.malformed", 400),
            (ParseError::invalid_multipart("no parts").into(), "multipart.malformed", 400),
            (ParseError::invalid_form_data("no name").into(), "form-data.malformed", 400),
            (BodyError::BoundaryRequired, "multipart.boundary-required", 400),
            (BodyError::pre_verify("denied"), "entity.pre-verify.failed", 403),
            (BodyError::verify(Bytes::from_static(b"x"), "denied"), "entity.verify.failed", 403),
            (BodyError::parse("x".to_string(), "bad"), "entity.parse.failed", 400),
            (BodyError::transport("reset"), "stream.transport", 400),
            (BodyError::AlreadyConsumed, "body.consumed", 500),
        ];

        for (error, code, status) in cases {
            assert_eq!(error.code(), code);
            assert_eq!(error.status_code().as_u16(), status, "status of {code}");
        }
    }

    #[test]
    fn wrapped_failures_keep_their_source() {
        let error = BodyError::pre_verify("denied");
        assert_eq!(error.source().map(ToString::to_string), Some("denied".to_string()));

        let error: BodyError = ParseError::invalid_header("missing colon").into();
        assert_eq!(error.source().map(ToString::to_string), Some("invalid header field-line: missing colon".to_string()));
    }
}
