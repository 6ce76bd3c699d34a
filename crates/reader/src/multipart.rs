//! Reading `multipart/*` request bodies.
//!
//! The boundary comes from the request `content-type`. The body is read through the
//! same pipeline as any other body, then split into parts and, for form data,
//! assembled into fields. Hooks see no charset.

use std::sync::Arc;

use bytes::{Buf, Bytes};
use http_body::Body;
use micro_body_parser::multipart::{FormData, RawPart, parse_form_data, parse_multipart};
use tracing::{debug, trace};

use crate::body::OptionReqBody;
use crate::config::{BoundaryPolicy, ReadOptions};
use crate::protocol::{RequestHeader, ResponseHead};
use crate::read::read_bytes;
use crate::{BodyError, BoxError};

/// The `boundary` parameter of a `multipart/*` content type.
pub fn request_boundary(header: &RequestHeader) -> Option<String> {
    let content_type = header.content_type()?;
    if content_type.type_() != mime::MULTIPART {
        return None;
    }

    content_type.get_param(mime::BOUNDARY).map(|boundary| boundary.as_str().to_owned()).filter(|boundary| !boundary.is_empty())
}

#[derive(Debug, Clone)]
pub struct MultipartReader {
    options: Arc<ReadOptions>,
}

impl MultipartReader {
    pub fn new<O: Into<Arc<ReadOptions>>>(options: O) -> Self {
        Self { options: options.into() }
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Reads the body and splits it into raw parts.
    ///
    /// Returns `Ok(None)` without touching the body when the request names no boundary
    /// and the options say to skip such requests.
    pub async fn read_parts<B>(&self, header: &RequestHeader, body: &OptionReqBody<B>, response: &mut ResponseHead) -> Result<Option<Vec<RawPart>>, BodyError>
    where
        B: Body + Unpin,
        B::Data: Buf,
        B::Error: Into<BoxError>,
    {
        let Some((boundary, bytes)) = self.read_multipart(header, body, response).await? else {
            return Ok(None);
        };

        let parts = parse_multipart(&bytes, boundary.as_bytes())?;
        trace!(parts = parts.len(), "read multipart body");
        Ok(Some(parts))
    }

    /// Reads the body as `multipart/form-data`.
    pub async fn read_form_data<B>(&self, header: &RequestHeader, body: &OptionReqBody<B>, response: &mut ResponseHead) -> Result<Option<FormData>, BodyError>
    where
        B: Body + Unpin,
        B::Data: Buf,
        B::Error: Into<BoxError>,
    {
        let Some((boundary, bytes)) = self.read_multipart(header, body, response).await? else {
            return Ok(None);
        };

        let form = parse_form_data(&bytes, boundary.as_bytes())?;
        trace!(fields = form.len(), "read form data");
        Ok(Some(form))
    }

    async fn read_multipart<B>(&self, header: &RequestHeader, body: &OptionReqBody<B>, response: &mut ResponseHead) -> Result<Option<(String, Bytes)>, BodyError>
    where
        B: Body + Unpin,
        B::Data: Buf,
        B::Error: Into<BoxError>,
    {
        let Some(boundary) = request_boundary(header) else {
            return match self.options.boundary_policy() {
                BoundaryPolicy::Required => Err(BodyError::BoundaryRequired),
                BoundaryPolicy::Skip => {
                    debug!("no multipart boundary, skip reading body");
                    Ok(None)
                }
            };
        };

        self.options.run_pre_verify(header, response, None)?;
        let bytes = read_bytes(header, body, &self.options).await?;
        self.options.run_verify(header, response, &bytes, None)?;

        Ok(Some((boundary, bytes)))
    }
}
