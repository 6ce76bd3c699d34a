//! Structured reading of `content-type` and `content-disposition` values.
//!
//! Both share the same shape:
//!
//! ```text
//! value     = type *( OWS ";" OWS parameter )
//! type      = token [ "/" token ]
//! parameter = token "=" ( token / quoted-string )
//! ```
//!
//! Type and parameter names are case-insensitive and stored lower-cased. Parameter
//! values keep their case; quoted-pairs are unescaped.

use std::iter::Peekable;
use std::str::Chars;

use crate::ParseError;
use crate::ensure;

use super::field_line::{is_token_byte, is_whitespace_byte};

/// A media type or disposition type with its ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameterized {
    value: String,
    parameters: Vec<(String, String)>,
}

impl Parameterized {
    /// Parses a field value such as `form-data; name="file"; filename="a.txt"`.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut chars = input.chars().peekable();

        skip_whitespace(&mut chars);
        let value = read_type(&mut chars)?;

        let mut parameters = Vec::new();
        loop {
            skip_whitespace(&mut chars);
            match chars.next() {
                None => break,
                Some(';') => {}
                Some(c) => return Err(ParseError::invalid_header(format!("unexpected character {c:?} after {value}"))),
            }

            skip_whitespace(&mut chars);
            // tolerate empty parameters, e.g. a trailing ';'
            if matches!(chars.peek(), None | Some(';')) {
                continue;
            }

            let name = read_token(&mut chars).to_ascii_lowercase();
            ensure!(!name.is_empty(), ParseError::invalid_header(format!("missing parameter name in {value}")));
            ensure!(chars.next() == Some('='), ParseError::invalid_header(format!("missing '=' after parameter {name}")));

            let param_value = if chars.peek() == Some(&'"') {
                chars.next();
                read_quoted(&mut chars)?
            } else {
                let token = read_token(&mut chars);
                ensure!(!token.is_empty(), ParseError::invalid_header(format!("missing value for parameter {name}")));
                token
            };

            parameters.push((name, param_value));
        }

        Ok(Self { value, parameters })
    }

    /// The lower-cased media type (`type/subtype`) or disposition type.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Looks up a parameter by case-insensitive name; the first occurrence wins.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.parameters.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    /// All parameters in the order they were written.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| u8::try_from(*c).is_ok_and(is_whitespace_byte)).is_some() {}
}

fn read_token(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut token = String::new();
    while let Some(c) = chars.next_if(|c| u8::try_from(*c).is_ok_and(is_token_byte)) {
        token.push(c);
    }
    token
}

fn read_type(chars: &mut Peekable<Chars<'_>>) -> Result<String, ParseError> {
    let mut value = read_token(chars);
    ensure!(!value.is_empty(), ParseError::invalid_header("missing type in structured field value"));

    if chars.next_if_eq(&'/').is_some() {
        let subtype = read_token(chars);
        ensure!(!subtype.is_empty(), ParseError::invalid_header(format!("missing subtype after {value}/")));
        value.push('/');
        value.push_str(&subtype);
    }

    value.make_ascii_lowercase();
    Ok(value)
}

fn read_quoted(chars: &mut Peekable<Chars<'_>>) -> Result<String, ParseError> {
    let mut value = String::new();
    loop {
        match chars.next() {
            Some('"') => return Ok(value),
            Some('\\') => match chars.next() {
                Some(escaped) => value.push(escaped),
                None => break,
            },
            Some(c) => value.push(c),
            None => break,
        }
    }
    Err(ParseError::invalid_header("unterminated quoted-string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_with_parameters() {
        let parsed = Parameterized::parse("Multipart/Mixed; Boundary=BbC04y").unwrap();
        assert_eq!(parsed.value(), "multipart/mixed");
        assert_eq!(parsed.param("boundary"), Some("BbC04y"));
        assert_eq!(parsed.param("BOUNDARY"), Some("BbC04y"));
    }

    #[test]
    fn disposition_with_quoted_parameters() {
        let parsed = Parameterized::parse(r#"form-data; name="files"; filename="a \"quoted\" name.txt""#).unwrap();
        assert_eq!(parsed.value(), "form-data");
        assert_eq!(parsed.param("name"), Some("files"));
        assert_eq!(parsed.param("filename"), Some(r#"a "quoted" name.txt"#));
        assert_eq!(parsed.parameters().collect::<Vec<_>>(), vec![("name", "files"), ("filename", r#"a "quoted" name.txt"#)]);
    }

    #[test]
    fn tab_separated_and_trailing_semicolon() {
        let parsed = Parameterized::parse("attachment;\tfilename=foo.json;").unwrap();
        assert_eq!(parsed.value(), "attachment");
        assert_eq!(parsed.param("filename"), Some("foo.json"));
    }

    #[test]
    fn non_ascii_quoted_value() {
        let parsed = Parameterized::parse("form-data; name=f; filename=\"résumé.pdf\"").unwrap();
        assert_eq!(parsed.param("filename"), Some("résumé.pdf"));
    }

    #[test]
    fn first_duplicate_parameter_wins() {
        let parsed = Parameterized::parse("form-data; name=a; name=b").unwrap();
        assert_eq!(parsed.param("name"), Some("a"));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(Parameterized::parse("").is_err());
        assert!(Parameterized::parse("; name=a").is_err());
        assert!(Parameterized::parse("text/").is_err());
        assert!(Parameterized::parse("form-data; name").is_err());
        assert!(Parameterized::parse("form-data; name=").is_err());
        assert!(Parameterized::parse("form-data; name=\"open").is_err());
        assert!(Parameterized::parse("form-data name=a").is_err());
    }
}
