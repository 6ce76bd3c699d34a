use thiserror::Error;

/// Grammar violations found while parsing header field-lines or multipart data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid header field-line: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid multipart data: {reason}")]
    InvalidMultipart { reason: String },

    #[error("invalid multipart form-data: {reason}")]
    InvalidFormData { reason: String },
}

impl ParseError {
    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_multipart<S: ToString>(str: S) -> Self {
        Self::InvalidMultipart { reason: str.to_string() }
    }

    pub fn invalid_form_data<S: ToString>(str: S) -> Self {
        Self::InvalidFormData { reason: str.to_string() }
    }

    /// Stable, machine readable identifier of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::InvalidHeader { .. } => "header.malformed",
            ParseError::InvalidMultipart { .. } => "multipart.malformed",
            ParseError::InvalidFormData { .. } => "form-data.malformed",
        }
    }
}
