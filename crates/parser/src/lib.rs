//! Zero-copy parsers for the structured parts of an HTTP request body
//!
//! This crate holds the synchronous half of micro-body: everything that turns an
//! already buffered request body into structure. Nothing here performs I/O; the
//! companion crate `micro-body` is responsible for pulling the bytes off the
//! transport, decompressing and limiting them.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use micro_body_parser::multipart::{parse_form_data, FormField};
//!
//! let body = Bytes::from_static(
//!     b"--B\r\ncontent-disposition: form-data; name=foo\r\n\r\nbar\r\n--B--\r\n",
//! );
//!
//! let form = parse_form_data(&body, b"B").unwrap();
//! match form.get("foo") {
//!     Some(FormField::Value { content, .. }) => assert_eq!(&content[..], b"bar"),
//!     other => panic!("unexpected field: {other:?}"),
//! }
//! ```
//!
//! # Architecture
//!
//! - [`header`]: the field-line tokenizer and the [`header::HeaderFields`] map it
//!   fills, including aggregation of duplicate known fields and the structured
//!   reading of `content-type` / `content-disposition`
//! - [`multipart`]: the boundary scanner, the per-part parser and the
//!   `multipart/form-data` assembler
//! - [`ParseError`]: the single error type of this crate
//!
//! # Zero-copy
//!
//! Every slice handed out by the multipart parsers is a [`bytes::Bytes`] view
//! into the buffer passed in. Parts, files and field values share that one
//! allocation; it is released once the last view is dropped.

pub mod header;
pub mod multipart;

mod error;
pub use error::ParseError;

mod utils;
pub(crate) use utils::ensure;
