//! HTTP header field-line parsing.
//!
//! This module turns raw `name: value` lines into a [`HeaderFields`] map. It is used
//! for the header block of every multipart part, where no full HTTP parser is
//! available.
//!
//! # Components
//!
//! - [`parse_field_line`]: three-phase tokenizer for one field-line
//!   - field-name made of token characters up to the first `:`
//!   - optional whitespace
//!   - field-value with only the surrounding whitespace trimmed
//! - [`HeaderFields`]: lower-cased, unique names with aggregated values
//! - [`Aggregation`]: per-name policy for repeated fields
//!   - comma-join for list-valued fields such as `accept`
//!   - semicolon-join for `cookie`
//!   - list for `set-cookie`
//!   - first-wins for everything else
//! - [`Parameterized`]: structured `content-type` / `content-disposition` values

mod field_line;
mod fields;
mod known_fields;
mod parameterized;

pub use field_line::parse_field_line;
pub(crate) use field_line::is_whitespace_byte;
pub use fields::{FieldValue, HeaderFields};
pub use known_fields::Aggregation;
pub use parameterized::Parameterized;
