//! Tokenizer for a single header field-line.
//!
//! Grammar, from RFC 9110 / RFC 9112:
//!
//! ```text
//! field-line    = field-name ":" OWS field-value OWS
//! field-name    = token
//! field-value   = *field-content
//! field-content = field-vchar [ 1*( SP / HTAB / field-vchar ) field-vchar ]
//! field-vchar   = VCHAR / obs-text
//! ```
//!
//! The line is handed in without its terminating CRLF.

use tracing::trace;

use crate::ParseError;
use crate::ensure;

use super::fields::HeaderFields;

/// `tchar`: any VCHAR except delimiters.
#[inline]
pub(crate) fn is_token_byte(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}

/// `field-vchar`: visible ASCII except DEL, plus obs-text.
#[inline]
pub(crate) fn is_field_vchar(b: u8) -> bool {
    matches!(b, 0x21..=0x7e | 0x80..=0xff)
}

#[inline]
pub(crate) fn is_whitespace_byte(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Parses one field-line and stores it into `dest`.
///
/// The name is matched against the known-field table to decide how a repeated field
/// is merged. Any grammar violation fails with [`ParseError::InvalidHeader`].
pub fn parse_field_line(line: &[u8], dest: &mut HeaderFields) -> Result<(), ParseError> {
    // phase 1: field-name up to the first colon
    let colon = line.iter().position(|b| *b == b':').ok_or_else(|| ParseError::invalid_header("missing colon"))?;
    ensure!(colon > 0, ParseError::invalid_header("missing field name"));

    let name = &line[..colon];
    ensure!(name.iter().copied().all(is_token_byte), ParseError::invalid_header("invalid character in field name"));

    // phase 2: leading whitespace
    let rest = &line[colon + 1..];
    let start = rest
        .iter()
        .position(|b| !is_whitespace_byte(*b))
        .ok_or_else(|| ParseError::invalid_header("missing field value"))?;

    // phase 3: field value, remembering the last non-whitespace byte
    let mut end = start;
    for (index, b) in rest.iter().copied().enumerate().skip(start) {
        if is_field_vchar(b) {
            end = index;
        } else if !is_whitespace_byte(b) {
            return Err(ParseError::invalid_header(format!("invalid byte 0x{b:02x} in field value")));
        }
    }

    let name = std::str::from_utf8(name).map_err(ParseError::invalid_header)?;
    let value = decode_value(&rest[start..=end]);
    trace!(name, value_len = value.len(), "parsed header field-line");

    dest.append(name, value)
}

/// Reads value bytes as UTF-8, falling back to ISO-8859-1 for obs-text that is not UTF-8.
fn decode_value(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(value) => value.to_owned(),
        Err(_) => bytes.iter().copied().map(char::from).collect(),
    }
}
