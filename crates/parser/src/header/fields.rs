use std::borrow::Cow;
use std::collections::HashMap;

use crate::ParseError;

use super::known_fields::{self, Aggregation};
use super::parameterized::Parameterized;

/// Field names whose first value is additionally read as a [`Parameterized`] value.
const STRUCTURED_FIELDS: [&str; 2] = ["content-type", "content-disposition"];

/// The value stored for one field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A plain, possibly joined, value.
    Text(String),
    /// A parsed `content-type` or `content-disposition` value.
    Structured(Parameterized),
    /// Every `set-cookie` value in arrival order.
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Structured(_) | FieldValue::List(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Parameterized> {
        match self {
            FieldValue::Structured(structured) => Some(structured),
            FieldValue::Text(_) | FieldValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(list) => Some(list),
            FieldValue::Text(_) | FieldValue::Structured(_) => None,
        }
    }
}

/// Header fields of one multipart part (or any other block of field-lines).
///
/// Names are stored lower-cased and are unique; insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    entries: Vec<(String, FieldValue)>,
    positions: HashMap<String, usize>,
}

impl HeaderFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let name = if name.bytes().any(|b| b.is_ascii_uppercase()) { Cow::Owned(name.to_ascii_lowercase()) } else { Cow::Borrowed(name) };
        self.positions.get(name.as_ref()).map(|&index| &self.entries[index].1)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn content_type(&self) -> Option<&Parameterized> {
        self.get("content-type").and_then(FieldValue::as_structured)
    }

    pub fn content_disposition(&self) -> Option<&Parameterized> {
        self.get("content-disposition").and_then(FieldValue::as_structured)
    }

    /// Stores `value` under `name` following the aggregation policy of the name.
    ///
    /// Fails only when a structured field is set for the first time with a value
    /// that does not follow the parameter grammar.
    pub(crate) fn append(&mut self, name: &str, value: String) -> Result<(), ParseError> {
        let (name, aggregation) = known_fields::classify(name);
        let position = self.positions.get(name.as_ref()).copied();

        match (aggregation, position) {
            (Aggregation::Comma | Aggregation::Semicolon, Some(index)) => {
                if let (FieldValue::Text(existing), Some(separator)) = (&mut self.entries[index].1, aggregation.separator()) {
                    existing.push_str(separator);
                    existing.push_str(&value);
                }
            }
            (Aggregation::List, Some(index)) => {
                if let FieldValue::List(values) = &mut self.entries[index].1 {
                    values.push(value);
                }
            }
            // drop duplicates
            (Aggregation::FirstWins, Some(_)) => {}
            (Aggregation::List, None) => self.insert(name.into_owned(), FieldValue::List(vec![value])),
            (Aggregation::Comma | Aggregation::Semicolon | Aggregation::FirstWins, None) => {
                let value = if STRUCTURED_FIELDS.iter().any(|field| *field == name) {
                    FieldValue::Structured(Parameterized::parse(&value)?)
                } else {
                    FieldValue::Text(value)
                };
                self.insert(name.into_owned(), value);
            }
        }

        Ok(())
    }

    fn insert(&mut self, name: String, value: FieldValue) {
        self.positions.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
    }
}
