use bytes::Bytes;
use memchr::memmem;
use tracing::trace;

use crate::ParseError;
use crate::header::{HeaderFields, parse_field_line};

use super::splitter::split_multipart;

const CRLF: &[u8] = b"\r\n";
const BLANK_LINE: &[u8] = b"\r\n\r\n";

/// One part of a multipart body: its header fields and the raw content after them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPart {
    headers: HeaderFields,
    content: Bytes,
}

impl RawPart {
    pub fn new(headers: HeaderFields, content: Bytes) -> Self {
        Self { headers, content }
    }

    pub fn headers(&self) -> &HeaderFields {
        &self.headers
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn into_parts(self) -> (HeaderFields, Bytes) {
        (self.headers, self.content)
    }
}

/// Parses the header block and content of one part.
///
/// Field-lines are read up to the first empty line; everything after that line's CRLF
/// is content. A part without the empty line is malformed, even if it has no headers.
pub fn parse_part(raw: &Bytes) -> Result<RawPart, ParseError> {
    let (header_block, content_start) = if raw.starts_with(CRLF) {
        (&raw[..0], CRLF.len())
    } else {
        let end = memmem::find(raw, BLANK_LINE)
            .ok_or_else(|| ParseError::invalid_multipart("missing empty line after part headers"))?;
        (&raw[..end], end + BLANK_LINE.len())
    };

    let mut headers = HeaderFields::new();
    let mut rest = header_block;
    while !rest.is_empty() {
        let (line, next) = match memmem::find(rest, CRLF) {
            Some(index) => (&rest[..index], &rest[index + CRLF.len()..]),
            None => (rest, &rest[rest.len()..]),
        };
        parse_field_line(line, &mut headers)?;
        rest = next;
    }

    let content = raw.slice(content_start..);
    trace!(headers = headers.len(), content_size = content.len(), "parsed multipart part");
    Ok(RawPart { headers, content })
}

/// Splits `body` on `boundary` and parses every part between preamble and epilogue.
pub fn parse_multipart(body: &Bytes, boundary: &[u8]) -> Result<Vec<RawPart>, ParseError> {
    let slices = split_multipart(body, boundary)?;
    slices[1..slices.len() - 1].iter().map(parse_part).collect()
}
