//! Character set resolution and decoding.
//!
//! Labels are resolved through the WHATWG encoding registry of `encoding_rs`. Only
//! ASCII compatible encodings are supported, which rules out UTF-16 and the like.

use std::fmt;

use encoding_rs::Encoding;
use tracing::trace;

use crate::BodyError;
use crate::protocol::RequestHeader;

/// A supported character encoding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    encoding: &'static Encoding,
}

impl Charset {
    pub fn utf8() -> Self {
        Self { encoding: encoding_rs::UTF_8 }
    }

    /// Resolves a charset label such as `utf-8`, `latin1` or `Shift_JIS`.
    pub fn for_label(label: &str) -> Result<Self, BodyError> {
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) if encoding.is_ascii_compatible() => Ok(Self { encoding }),
            _ => Err(BodyError::charset_unsupported(label.trim().to_ascii_lowercase())),
        }
    }

    /// Canonical name of the encoding, e.g. `UTF-8` or `windows-1252`.
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    pub fn is_utf8(&self) -> bool {
        self.encoding == encoding_rs::UTF_8
    }

    /// Decodes `bytes` into text, dropping a leading byte order mark.
    ///
    /// Bytes that are not valid in this charset fail with [`BodyError::CharsetMismatch`].
    pub fn decode(&self, bytes: &[u8]) -> Result<String, BodyError> {
        let (text, had_errors) = self.encoding.decode_with_bom_removal(bytes);
        if had_errors {
            return Err(BodyError::CharsetMismatch { charset: self.name() });
        }

        trace!(charset = self.name(), size = bytes.len(), "decoded request body");
        Ok(text.into_owned())
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The charset named by the request `content-type`.
///
/// A missing or unparseable content type, or one without a `charset` parameter, names
/// no charset. A named charset that is not supported fails.
pub fn request_charset(header: &RequestHeader) -> Result<Option<Charset>, BodyError> {
    let Some(content_type) = header.content_type() else {
        return Ok(None);
    };

    content_type.get_param(mime::CHARSET).map(|label| Charset::for_label(label.as_str())).transpose()
}
