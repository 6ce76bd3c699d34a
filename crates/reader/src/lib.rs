//! Async reading of HTTP request bodies
//!
//! micro-body pulls a request body off any [`http_body::Body`] and turns it into
//! bytes, text, a parsed value or multipart form data, enforcing the declared
//! `content-length`, undoing the `content-encoding` and capping the decoded size on
//! the way.
//!
//! # Reading a body
//!
//! A read is configured once through [`ReadOptions`] and then shared by every request:
//!
//! ```
//! use bytes::Bytes;
//! use http::Request;
//! use http_body_util::Full;
//! use micro_body::{OptionReqBody, ReadOptions, RawReader, RequestHeader, ResponseHead};
//!
//! # tokio_test();
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn tokio_test() {
//! let reader = RawReader::new(ReadOptions::builder().size_limit(1024).build().unwrap());
//!
//! let header = RequestHeader::from(Request::builder().header("content-length", "5").body(()).unwrap());
//! let body = OptionReqBody::from(Full::new(Bytes::from_static(b"hello")));
//!
//! let bytes = reader.read(&header, &body, &mut ResponseHead::default()).await.unwrap();
//! assert_eq!(bytes, "hello");
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`pipeline`]: the body adapters a read streams through
//! - [`charset`]: charset labels and text decoding
//! - [`hooks`]: pre-verify and verify hooks
//! - [`read`] and [`multipart`]: the read entry points
//! - [`config`]: read options and their serde form
//! - [`BodyError`]: every failure of a read, with its code and status
//!
//! The synchronous parsers for header lines and multipart bodies live in the
//! `micro-body-parser` crate, re-exported here as [`parser`].

mod body;
mod error;
mod protocol;

pub mod charset;
pub mod config;
pub mod hooks;
pub mod multipart;
pub mod pipeline;
pub mod read;

pub use body::OptionReqBody;
pub use charset::Charset;
pub use config::{BoundaryPolicy, ReadConfig, ReadOptions, ReadOptionsBuilder};
pub use error::{BodyError, BoxError};
pub use multipart::MultipartReader;
pub use protocol::{RequestHeader, ResponseHead};
pub use read::{RawReader, Reader};

pub use micro_body_parser as parser;
