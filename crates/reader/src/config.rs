//! Read options.
//!
//! [`ReadOptions`] are built once and shared by every read of a reader. They can be
//! assembled in code with [`ReadOptions::builder`] or loaded from configuration
//! through [`ReadConfig`]:
//!
//! ```
//! use micro_body::config::ReadConfig;
//!
//! let config: ReadConfig = serde_json::from_str(r#"{ "size_limit": "1mb", "default_charset": "latin1" }"#).unwrap();
//! let options = config.into_builder().build().unwrap();
//!
//! assert_eq!(options.size_limit(), Some(1024 * 1024));
//! assert_eq!(options.default_charset().name(), "windows-1252");
//! ```

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::BodyError;
use crate::BoxError;
use crate::charset::Charset;
use crate::hooks::{PreVerify, Verify};
use crate::protocol::{RequestHeader, ResponseHead};

/// Size limit of a text or raw read unless configured otherwise.
pub const DEFAULT_SIZE_LIMIT: u64 = 100 * 1024;

/// Size limit of a multipart read unless configured otherwise.
pub const DEFAULT_MULTIPART_SIZE_LIMIT: u64 = 10 * 1024 * 1024;

/// What a multipart read does when the request names no boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Fail with [`BodyError::BoundaryRequired`].
    #[default]
    Required,
    /// Leave the body unread and return nothing.
    Skip,
}

pub struct ReadOptions {
    size_limit: Option<u64>,
    allow_decompression: bool,
    default_charset: Charset,
    pre_verify: Vec<Box<dyn PreVerify>>,
    verify: Vec<Box<dyn Verify>>,
    boundary_policy: BoundaryPolicy,
}

impl ReadOptions {
    pub fn builder() -> ReadOptionsBuilder {
        ReadOptionsBuilder::new(DEFAULT_SIZE_LIMIT)
    }

    /// A builder starting from the larger multipart size limit.
    pub fn multipart_builder() -> ReadOptionsBuilder {
        ReadOptionsBuilder::new(DEFAULT_MULTIPART_SIZE_LIMIT)
    }

    pub fn size_limit(&self) -> Option<u64> {
        self.size_limit
    }

    pub fn allow_decompression(&self) -> bool {
        self.allow_decompression
    }

    pub fn default_charset(&self) -> Charset {
        self.default_charset
    }

    pub fn boundary_policy(&self) -> BoundaryPolicy {
        self.boundary_policy
    }

    /// Runs the pre-verify hooks in order, stopping at the first failure.
    pub(crate) fn run_pre_verify(&self, header: &RequestHeader, response: &mut ResponseHead, charset: Option<&Charset>) -> Result<(), BodyError> {
        self.pre_verify.iter().try_for_each(|hook| hook.pre_verify(header, response, charset)).map_err(BodyError::pre_verify)
    }

    /// Runs the verify hooks in order, stopping at the first failure.
    pub(crate) fn run_verify(
        &self,
        header: &RequestHeader,
        response: &mut ResponseHead,
        body: &Bytes,
        charset: Option<&Charset>,
    ) -> Result<(), BodyError> {
        self.verify
            .iter()
            .try_for_each(|hook| hook.verify(header, response, body, charset))
            .map_err(|e| BodyError::verify(body.clone(), e))
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            size_limit: Some(DEFAULT_SIZE_LIMIT),
            allow_decompression: true,
            default_charset: Charset::utf8(),
            pre_verify: Vec::new(),
            verify: Vec::new(),
            boundary_policy: BoundaryPolicy::Required,
        }
    }
}

impl fmt::Debug for ReadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("size_limit", &self.size_limit)
            .field("allow_decompression", &self.allow_decompression)
            .field("default_charset", &self.default_charset)
            .field("pre_verify", &self.pre_verify.len())
            .field("verify", &self.verify.len())
            .field("boundary_policy", &self.boundary_policy)
            .finish()
    }
}

pub struct ReadOptionsBuilder {
    size_limit: Option<u64>,
    allow_decompression: bool,
    default_charset: Option<String>,
    pre_verify: Vec<Box<dyn PreVerify>>,
    verify: Vec<Box<dyn Verify>>,
    boundary_policy: BoundaryPolicy,
}

impl ReadOptionsBuilder {
    fn new(size_limit: u64) -> Self {
        Self {
            size_limit: Some(size_limit),
            allow_decompression: true,
            default_charset: None,
            pre_verify: Vec::new(),
            verify: Vec::new(),
            boundary_policy: BoundaryPolicy::Required,
        }
    }

    /// Caps the decoded body size in bytes.
    pub fn size_limit(mut self, size_limit: u64) -> Self {
        self.size_limit = Some(size_limit);
        self
    }

    /// Removes the size cap.
    pub fn unlimited(mut self) -> Self {
        self.size_limit = None;
        self
    }

    /// With decompression off, any content-encoding but `identity` is rejected.
    pub fn allow_decompression(mut self, allow: bool) -> Self {
        self.allow_decompression = allow;
        self
    }

    /// Charset used when the request does not name one. Checked by [`build`](Self::build).
    pub fn default_charset<S: Into<String>>(mut self, label: S) -> Self {
        self.default_charset = Some(label.into());
        self
    }

    pub fn pre_verify<F>(self, hook: F) -> Self
    where
        F: Fn(&RequestHeader, &mut ResponseHead, Option<&Charset>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.pre_verify_hook(hook)
    }

    pub fn pre_verify_hook<H: PreVerify + 'static>(mut self, hook: H) -> Self {
        self.pre_verify.push(Box::new(hook));
        self
    }

    pub fn verify<F>(self, hook: F) -> Self
    where
        F: Fn(&RequestHeader, &mut ResponseHead, &Bytes, Option<&Charset>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.verify_hook(hook)
    }

    pub fn verify_hook<H: Verify + 'static>(mut self, hook: H) -> Self {
        self.verify.push(Box::new(hook));
        self
    }

    pub fn boundary_policy(mut self, policy: BoundaryPolicy) -> Self {
        self.boundary_policy = policy;
        self
    }

    /// Fails with [`BodyError::CharsetUnsupported`] when the default charset is not supported.
    pub fn build(self) -> Result<ReadOptions, BodyError> {
        let default_charset = match self.default_charset {
            Some(label) => Charset::for_label(&label)?,
            None => Charset::utf8(),
        };

        Ok(ReadOptions {
            size_limit: self.size_limit,
            allow_decompression: self.allow_decompression,
            default_charset,
            pre_verify: self.pre_verify,
            verify: self.verify,
            boundary_policy: self.boundary_policy,
        })
    }
}

impl fmt::Debug for ReadOptionsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptionsBuilder")
            .field("size_limit", &self.size_limit)
            .field("allow_decompression", &self.allow_decompression)
            .field("default_charset", &self.default_charset)
            .field("boundary_policy", &self.boundary_policy)
            .finish_non_exhaustive()
    }
}

/// Read options as they appear in a configuration file.
///
/// `size_limit` takes a byte count or a human readable size such as `"100kb"`; `null`
/// removes the limit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadConfig {
    #[serde(deserialize_with = "deserialize_size_limit")]
    pub size_limit: Option<u64>,
    pub allow_decompression: bool,
    pub default_charset: String,
    pub boundary_policy: BoundaryPolicy,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            size_limit: Some(DEFAULT_SIZE_LIMIT),
            allow_decompression: true,
            default_charset: "utf-8".to_owned(),
            boundary_policy: BoundaryPolicy::Required,
        }
    }
}

impl ReadConfig {
    /// A builder holding these settings; hooks can be added before building.
    pub fn into_builder(self) -> ReadOptionsBuilder {
        let builder = ReadOptionsBuilder::new(DEFAULT_SIZE_LIMIT)
            .allow_decompression(self.allow_decompression)
            .default_charset(self.default_charset)
            .boundary_policy(self.boundary_policy);

        match self.size_limit {
            Some(size_limit) => builder.size_limit(size_limit),
            None => builder.unlimited(),
        }
    }
}

impl From<ReadConfig> for ReadOptionsBuilder {
    fn from(config: ReadConfig) -> Self {
        config.into_builder()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ByteSize {
    Count(u64),
    Text(String),
}

fn deserialize_size_limit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<ByteSize>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ByteSize::Count(count)) => Ok(Some(count)),
        Some(ByteSize::Text(text)) => parse_byte_size(&text).map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid byte size {value:?}")]
pub struct InvalidByteSize {
    value: String,
}

/// Parses sizes like `512`, `"100kb"` or `"1.5 MB"`. Units are 1024 based.
pub fn parse_byte_size(value: &str) -> Result<u64, InvalidByteSize> {
    let invalid = || InvalidByteSize { value: value.to_owned() };

    let text = value.trim();
    let split = text.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(text.len());
    let (number, unit) = text.split_at(split);

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1 << 10,
        "mb" => 1 << 20,
        "gb" => 1 << 30,
        "tb" => 1 << 40,
        "pb" => 1 << 50,
        _ => return Err(invalid()),
    };

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() || (fraction.is_empty() && number.contains('.')) {
        return Err(invalid());
    }

    let whole: u64 = whole.parse().ok().ok_or_else(invalid)?;
    let mut size = whole.checked_mul(multiplier).ok_or_else(invalid)?;

    if !fraction.is_empty() {
        let digits = u32::try_from(fraction.len()).ok().ok_or_else(invalid)?;
        let scale = 10_u64.checked_pow(digits).ok_or_else(invalid)?;
        let fraction: u64 = fraction.parse().ok().ok_or_else(invalid)?;
        let fraction = fraction.checked_mul(multiplier).ok_or_else(invalid)? / scale;
        size = size.checked_add(fraction).ok_or_else(invalid)?;
    }

    Ok(size)
}

#[cfg(test)]
mod tests {
    use http::Request;

    use super::*;

    #[test]
    fn byte_sizes() {
        assert_eq!(parse_byte_size("512"), Ok(512));
        assert_eq!(parse_byte_size("512b"), Ok(512));
        assert_eq!(parse_byte_size("100kb"), Ok(100 * 1024));
        assert_eq!(parse_byte_size("10MB"), Ok(10 * 1024 * 1024));
        assert_eq!(parse_byte_size(" 1.5 mb "), Ok(1024 * 1024 + 512 * 1024));
        assert_eq!(parse_byte_size("1gb"), Ok(1 << 30));
    }

    #[test]
    fn invalid_byte_sizes() {
        for value in ["", "kb", "ten kb", "1.kb", ".5kb", "1.2.3kb", "10xb", "-1kb", "99999999999pb"] {
            assert!(parse_byte_size(value).is_err(), "{value:?}");
        }
    }

    #[test]
    fn builder_defaults() {
        let options = ReadOptions::builder().build().unwrap();
        assert_eq!(options.size_limit(), Some(DEFAULT_SIZE_LIMIT));
        assert!(options.allow_decompression());
        assert!(options.default_charset().is_utf8());
        assert_eq!(options.boundary_policy(), BoundaryPolicy::Required);

        let options = ReadOptions::multipart_builder().build().unwrap();
        assert_eq!(options.size_limit(), Some(DEFAULT_MULTIPART_SIZE_LIMIT));
    }

    #[test]
    fn builder_rejects_unsupported_default_charset() {
        let error = ReadOptions::builder().default_charset("utf-16").build().unwrap_err();
        assert_eq!(error.code(), "charset.unsupported");
    }

    #[test]
    fn hooks_run_in_order_until_failure() {
        let options = ReadOptions::builder()
            .pre_verify(|_, response, _| {
                response.headers_mut().append("x-order", "first".parse()?);
                Ok(())
            })
            .pre_verify(|_, _, _| Err("denied".into()))
            .pre_verify(|_, response, _| {
                response.headers_mut().append("x-order", "never".parse()?);
                Ok(())
            })
            .build()
            .unwrap();

        let header = RequestHeader::from(Request::builder().body(()).unwrap());
        let mut response = ResponseHead::default();
        let error = options.run_pre_verify(&header, &mut response, None).unwrap_err();

        assert_eq!(error.code(), "entity.pre-verify.failed");
        assert_eq!(response.headers().get_all("x-order").iter().collect::<Vec<_>>(), vec!["first"]);
    }

    #[test]
    fn verify_failure_carries_the_body() {
        let options = ReadOptions::builder().verify(|_, _, body, _| if body.starts_with(b"{") { Ok(()) } else { Err("not json".into()) }).build().unwrap();

        let header = RequestHeader::from(Request::builder().body(()).unwrap());
        let mut response = ResponseHead::default();

        assert!(options.run_verify(&header, &mut response, &Bytes::from_static(b"{}"), None).is_ok());
        let error = options.run_verify(&header, &mut response, &Bytes::from_static(b"[]"), None).unwrap_err();
        assert!(matches!(error, BodyError::VerifyFailed { body, .. } if body == "[]"));
    }

    #[test]
    fn config_from_json() {
        let config: ReadConfig = serde_json::from_str(
            r#"{ "size_limit": "10mb", "allow_decompression": false, "default_charset": "latin1", "boundary_policy": "skip" }"#,
        )
        .unwrap();
        assert_eq!(config.size_limit, Some(10 * 1024 * 1024));

        let options = config.into_builder().build().unwrap();
        assert_eq!(options.size_limit(), Some(10 * 1024 * 1024));
        assert!(!options.allow_decompression());
        assert_eq!(options.default_charset().name(), "windows-1252");
        assert_eq!(options.boundary_policy(), BoundaryPolicy::Skip);
    }

    #[test]
    fn config_defaults_and_limits() {
        let config: ReadConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReadConfig::default());

        let config: ReadConfig = serde_json::from_str(r#"{ "size_limit": 2048 }"#).unwrap();
        assert_eq!(config.size_limit, Some(2048));

        let config: ReadConfig = serde_json::from_str(r#"{ "size_limit": null }"#).unwrap();
        assert_eq!(config.into_builder().build().unwrap().size_limit(), None);

        assert!(serde_json::from_str::<ReadConfig>(r#"{ "size_limit": "lots" }"#).is_err());
        assert!(serde_json::from_str::<ReadConfig>(r#"{ "limit": 1 }"#).is_err());
    }
}
