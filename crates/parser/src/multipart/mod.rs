//! Multipart body parsing.
//!
//! Parsing happens in three layers, each usable on its own:
//!
//! - [`split_multipart`] cuts the body on its boundary into preamble, parts and epilogue
//! - [`parse_part`] reads the header block and content of one part
//! - [`assemble_form_data`] groups `multipart/form-data` parts into [`FormData`]
//!
//! All content is handed out as [`bytes::Bytes`] views of the input body.

mod form_data;
mod part;
mod splitter;

pub use form_data::{FormData, FormField, FormFile, assemble_form_data, parse_form_data};
pub use part::{RawPart, parse_multipart, parse_part};
pub use splitter::{delimiter, split_multipart};
