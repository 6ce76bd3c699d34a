//! The fixed table of header names whose duplicates are aggregated.
//!
//! Field names are compared case-insensitively. Every name not in the table keeps
//! its first value and drops later duplicates.

use std::borrow::Cow;

/// How a repeated occurrence of a field is merged into the value already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Join values with `", "`.
    Comma,
    /// Join values with `"; "`; only `cookie`.
    Semicolon,
    /// Keep every value in order; only `set-cookie`.
    List,
    /// Keep the first value, drop the rest.
    FirstWins,
}

impl Aggregation {
    /// The separator for the joining policies.
    pub fn separator(self) -> Option<&'static str> {
        match self {
            Aggregation::Comma => Some(", "),
            Aggregation::Semicolon => Some("; "),
            Aggregation::List | Aggregation::FirstWins => None,
        }
    }
}

const KNOWN_FIELDS: &[(&str, Aggregation)] = &[
    ("accept", Aggregation::Comma),
    ("accept-encoding", Aggregation::Comma),
    ("accept-language", Aggregation::Comma),
    ("age", Aggregation::FirstWins),
    ("authorization", Aggregation::FirstWins),
    ("cache-control", Aggregation::Comma),
    ("connection", Aggregation::Comma),
    ("content-disposition", Aggregation::FirstWins),
    ("content-encoding", Aggregation::Comma),
    ("content-length", Aggregation::FirstWins),
    ("content-type", Aggregation::FirstWins),
    ("cookie", Aggregation::Semicolon),
    ("date", Aggregation::Comma),
    ("etag", Aggregation::FirstWins),
    ("expect", Aggregation::Comma),
    ("expires", Aggregation::FirstWins),
    ("from", Aggregation::FirstWins),
    ("host", Aggregation::FirstWins),
    ("if-match", Aggregation::Comma),
    ("if-modified-since", Aggregation::FirstWins),
    ("if-none-match", Aggregation::Comma),
    ("if-unmodified-since", Aggregation::FirstWins),
    ("last-modified", Aggregation::FirstWins),
    ("location", Aggregation::FirstWins),
    ("max-forwards", Aggregation::FirstWins),
    ("origin", Aggregation::Comma),
    ("proxy-authorization", Aggregation::FirstWins),
    ("referer", Aggregation::FirstWins),
    ("retry-after", Aggregation::FirstWins),
    ("server", Aggregation::FirstWins),
    ("set-cookie", Aggregation::List),
    ("transfer-encoding", Aggregation::Comma),
    ("upgrade", Aggregation::Comma),
    ("user-agent", Aggregation::FirstWins),
    ("vary", Aggregation::Comma),
    ("x-forwarded-for", Aggregation::Comma),
    ("x-forwarded-host", Aggregation::Comma),
    ("x-forwarded-proto", Aggregation::Comma),
];

/// Returns the lower-cased field name together with its aggregation policy.
///
/// Known names borrow the table entry, unknown names are lower-cased into a new string.
pub fn classify(name: &str) -> (Cow<'static, str>, Aggregation) {
    match KNOWN_FIELDS.iter().find(|(known, _)| known.eq_ignore_ascii_case(name)) {
        Some((known, aggregation)) => (Cow::Borrowed(*known), *aggregation),
        None => (Cow::Owned(name.to_ascii_lowercase()), Aggregation::FirstWins),
    }
}
