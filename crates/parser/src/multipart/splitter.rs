//! Boundary-exact splitting of a multipart body.
//!
//! See [RFC 2046 section 5.1.1](https://datatracker.ietf.org/doc/html/rfc2046#section-5.1.1).
//! A body looks like
//!
//! ```text
//! preamble CRLF "--" boundary *LWSP CRLF
//! part     CRLF "--" boundary *LWSP CRLF
//! part     CRLF "--" boundary "--" *LWSP CRLF
//! epilogue
//! ```
//!
//! where the first delimiter may also open the body without the preamble and its CRLF,
//! and the CRLF after the close delimiter may be missing when the body ends there.

use bytes::Bytes;
use memchr::memmem;
use tracing::trace;

use crate::ParseError;
use crate::ensure;
use crate::header::is_whitespace_byte;

const CRLF: &[u8] = b"\r\n";
const DOUBLE_HYPHEN: &[u8] = b"--";

/// Builds the delimiter `CRLF "--" boundary` that separates parts.
pub fn delimiter(boundary: &[u8]) -> Vec<u8> {
    let mut delimiter = Vec::with_capacity(CRLF.len() + DOUBLE_HYPHEN.len() + boundary.len());
    delimiter.extend_from_slice(CRLF);
    delimiter.extend_from_slice(DOUBLE_HYPHEN);
    delimiter.extend_from_slice(boundary);
    delimiter
}

/// Splits `body` into `[preamble, part, ..., part, epilogue]`.
///
/// The returned slices share the memory of `body`. At least one part is required, so
/// a successful result always holds three or more slices.
///
/// # Errors
///
/// Returns [`ParseError::InvalidMultipart`] if:
/// - the boundary is empty
/// - a delimiter line carries anything other than linear whitespace before its CRLF
/// - a delimiter appears after the close delimiter
/// - the close delimiter is missing
/// - there is no part between preamble and epilogue
pub fn split_multipart(body: &Bytes, boundary: &[u8]) -> Result<Vec<Bytes>, ParseError> {
    ensure!(!boundary.is_empty(), ParseError::invalid_multipart("empty boundary"));

    let delimiter = delimiter(boundary);
    let finder = memmem::Finder::new(&delimiter);

    // a body may open with "--" boundary, without a preamble or leading CRLF
    let opening = &delimiter[CRLF.len()..];
    let mut next = if body.starts_with(opening) {
        Some((0, opening.len()))
    } else {
        finder.find(body).map(|index| (index, delimiter.len()))
    };

    let mut slices = Vec::new();
    let mut part_start = 0;
    let mut closed = false;

    while let Some((index, delimiter_len)) = next {
        ensure!(!closed, ParseError::invalid_multipart("delimiter found after the close delimiter"));
        slices.push(body.slice(part_start..index));

        let mut cursor = index + delimiter_len;
        if body[cursor..].starts_with(DOUBLE_HYPHEN) {
            cursor += DOUBLE_HYPHEN.len();
            closed = true;
        }

        while body.get(cursor).copied().is_some_and(is_whitespace_byte) {
            cursor += 1;
        }

        if body[cursor..].starts_with(CRLF) {
            cursor += CRLF.len();
        } else if !(closed && cursor == body.len()) {
            return Err(ParseError::invalid_multipart("delimiter line is not terminated by CRLF"));
        }

        part_start = cursor;
        next = finder.find(&body[cursor..]).map(|index| (cursor + index, delimiter.len()));
    }

    ensure!(closed, ParseError::invalid_multipart("missing close delimiter"));
    slices.push(body.slice(part_start..));
    ensure!(slices.len() >= 3, ParseError::invalid_multipart("no parts found"));

    trace!(parts = slices.len() - 2, body_size = body.len(), "split multipart body");
    Ok(slices)
}
