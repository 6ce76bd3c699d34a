//! Verification hooks run around the body read.
//!
//! A [`PreVerify`] hook runs before any byte is read and sees the request head and
//! the resolved charset. A [`Verify`] hook runs on the raw (decoded, not yet charset
//! decoded) bytes. Both may write to the response head. Any closure with the matching
//! signature is a hook.

use bytes::Bytes;

use crate::charset::Charset;
use crate::protocol::{RequestHeader, ResponseHead};
use crate::{BodyError, BoxError};

pub trait PreVerify: Send + Sync {
    fn pre_verify(&self, header: &RequestHeader, response: &mut ResponseHead, charset: Option<&Charset>) -> Result<(), BoxError>;
}

pub trait Verify: Send + Sync {
    fn verify(&self, header: &RequestHeader, response: &mut ResponseHead, body: &Bytes, charset: Option<&Charset>) -> Result<(), BoxError>;
}

impl<F> PreVerify for F
where
    F: Fn(&RequestHeader, &mut ResponseHead, Option<&Charset>) -> Result<(), BoxError> + Send + Sync,
{
    fn pre_verify(&self, header: &RequestHeader, response: &mut ResponseHead, charset: Option<&Charset>) -> Result<(), BoxError> {
        (self)(header, response, charset)
    }
}

impl<F> Verify for F
where
    F: Fn(&RequestHeader, &mut ResponseHead, &Bytes, Option<&Charset>) -> Result<(), BoxError> + Send + Sync,
{
    fn verify(&self, header: &RequestHeader, response: &mut ResponseHead, body: &Bytes, charset: Option<&Charset>) -> Result<(), BoxError> {
        (self)(header, response, body, charset)
    }
}

/// Rejects requests that name any charset other than UTF-8.
///
/// Formats such as JSON are only ever read as UTF-8; a request without a charset
/// passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Only;

impl PreVerify for Utf8Only {
    fn pre_verify(&self, _header: &RequestHeader, _response: &mut ResponseHead, charset: Option<&Charset>) -> Result<(), BoxError> {
        match charset {
            Some(charset) if !charset.is_utf8() => Err(BodyError::charset_unsupported(charset.name().to_ascii_lowercase()).into()),
            _ => Ok(()),
        }
    }
}

pub fn charset_must_be_utf8() -> Utf8Only {
    Utf8Only
}

#[cfg(test)]
mod tests {
    use http::{HeaderValue, Request};

    use super::*;

    fn header() -> RequestHeader {
        Request::builder().body(()).unwrap().into()
    }

    #[test]
    fn closures_are_hooks() {
        let pre_verify = |_: &RequestHeader, response: &mut ResponseHead, _: Option<&Charset>| -> Result<(), BoxError> {
            response.headers_mut().insert("x-pre-verified", HeaderValue::from_static("1"));
            Ok(())
        };
        let verify = |_: &RequestHeader, _: &mut ResponseHead, body: &Bytes, _: Option<&Charset>| -> Result<(), BoxError> {
            if body.is_empty() { Err("empty body".into()) } else { Ok(()) }
        };

        let mut response = ResponseHead::default();
        pre_verify.pre_verify(&header(), &mut response, None).unwrap();
        assert!(response.headers().contains_key("x-pre-verified"));

        assert!(verify.verify(&header(), &mut response, &Bytes::from_static(b"x"), None).is_ok());
        assert!(verify.verify(&header(), &mut response, &Bytes::new(), None).is_err());
    }

    #[test]
    fn utf8_only() {
        let hook = charset_must_be_utf8();
        let mut response = ResponseHead::default();

        assert!(hook.pre_verify(&header(), &mut response, None).is_ok());
        assert!(hook.pre_verify(&header(), &mut response, Some(&Charset::utf8())).is_ok());

        let latin1 = Charset::for_label("latin1").unwrap();
        let error = hook.pre_verify(&header(), &mut response, Some(&latin1)).unwrap_err();
        assert_eq!(error.to_string(), "unsupported charset \"windows-1252\"");
    }
}
