//! Assembly of `multipart/form-data` parts into named fields.
//!
//! Every part must carry `Content-Disposition: form-data; name=...`. A part with a
//! `filename` parameter is a file; a part whose content type is `multipart/mixed` holds
//! several files under one name ([RFC 7578 section 4.3](https://datatracker.ietf.org/doc/html/rfc7578#section-4.3));
//! anything else is a plain value.
//!
//! Names are unique. The first part seen for a name decides its kind: later values are
//! dropped, later files are appended to an existing file list and dropped otherwise.

use std::collections::HashMap;

use bytes::Bytes;
use tracing::trace;

use crate::ParseError;
use crate::ensure;
use crate::header::HeaderFields;

use super::part::{RawPart, parse_multipart};

const FORM_DATA: &str = "form-data";
const MULTIPART_MIXED: &str = "multipart/mixed";

/// A file uploaded through a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    filename: String,
    headers: HeaderFields,
    content: Bytes,
}

impl FormFile {
    pub fn new(filename: impl Into<String>, headers: HeaderFields, content: Bytes) -> Self {
        Self { filename: filename.into(), headers, content }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn headers(&self) -> &HeaderFields {
        &self.headers
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// The declared media type of the file, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.content_type().map(|content_type| content_type.value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormField {
    /// A plain field value.
    Value { name: String, headers: HeaderFields, content: Bytes },
    /// One or more files sharing a field name, in arrival order.
    FileList { name: String, files: Vec<FormFile> },
}

impl FormField {
    pub fn name(&self) -> &str {
        match self {
            FormField::Value { name, .. } | FormField::FileList { name, .. } => name,
        }
    }

    pub fn as_value(&self) -> Option<&Bytes> {
        match self {
            FormField::Value { content, .. } => Some(content),
            FormField::FileList { .. } => None,
        }
    }

    pub fn as_files(&self) -> Option<&[FormFile]> {
        match self {
            FormField::FileList { files, .. } => Some(files),
            FormField::Value { .. } => None,
        }
    }
}

/// Form fields in the order their names first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<FormField>,
    positions: HashMap<String, usize>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a field by its exact name.
    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.positions.get(name).map(|&index| &self.fields[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter()
    }

    /// Adds one part following the first-wins rules of this module.
    pub fn add_part(&mut self, part: RawPart) -> Result<(), ParseError> {
        let disposition = part
            .headers()
            .content_disposition()
            .ok_or_else(|| ParseError::invalid_form_data("missing content-disposition"))?;
        ensure!(
            disposition.value() == FORM_DATA,
            ParseError::invalid_form_data(format!("unexpected content-disposition type {}", disposition.value()))
        );

        let name = disposition
            .param("name")
            .ok_or_else(|| ParseError::invalid_form_data("missing name in content-disposition"))?
            .to_owned();
        let filename = disposition.param("filename").map(str::to_owned);

        if let Some(filename) = filename {
            let (headers, content) = part.into_parts();
            self.add_files(name, vec![FormFile::new(filename, headers, content)]);
            return Ok(());
        }

        if let Some(content_type) = part.headers().content_type().filter(|content_type| content_type.value() == MULTIPART_MIXED) {
            let boundary = content_type
                .param("boundary")
                .ok_or_else(|| ParseError::invalid_form_data(format!("missing boundary for mixed field {name}")))?;
            let files = files_from_mixed(part.content(), boundary.as_bytes())?;
            self.add_files(name, files);
            return Ok(());
        }

        if self.positions.contains_key(&name) {
            trace!(%name, "dropped duplicate form value");
            return Ok(());
        }

        let (headers, content) = part.into_parts();
        self.push(FormField::Value { name, headers, content });
        Ok(())
    }

    fn add_files(&mut self, name: String, mut files: Vec<FormFile>) {
        let Some(&index) = self.positions.get(&name) else {
            self.push(FormField::FileList { name, files });
            return;
        };

        match &mut self.fields[index] {
            FormField::FileList { files: existing, .. } => existing.append(&mut files),
            FormField::Value { .. } => trace!(%name, "dropped files shadowed by a form value"),
        }
    }

    fn push(&mut self, field: FormField) {
        self.positions.insert(field.name().to_owned(), self.fields.len());
        self.fields.push(field);
    }
}

impl IntoIterator for FormData {
    type Item = FormField;
    type IntoIter = std::vec::IntoIter<FormField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a FormData {
    type Item = &'a FormField;
    type IntoIter = std::slice::Iter<'a, FormField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Reads the files of a nested `multipart/mixed` body.
///
/// A nested part names its file through `content-disposition: file; filename=...` or,
/// failing that, the `name` parameter of its content type. Parts with neither are skipped.
fn files_from_mixed(content: &Bytes, boundary: &[u8]) -> Result<Vec<FormFile>, ParseError> {
    let mut files = Vec::new();
    for part in parse_multipart(content, boundary)? {
        let filename = part
            .headers()
            .content_disposition()
            .and_then(|disposition| disposition.param("filename"))
            .or_else(|| part.headers().content_type().and_then(|content_type| content_type.param("name")))
            .map(str::to_owned);

        match filename {
            Some(filename) => {
                let (headers, content) = part.into_parts();
                files.push(FormFile::new(filename, headers, content));
            }
            None => trace!("skipped nested part without a filename"),
        }
    }
    Ok(files)
}

/// Groups parsed parts into [`FormData`].
pub fn assemble_form_data(parts: impl IntoIterator<Item = RawPart>) -> Result<FormData, ParseError> {
    let mut form = FormData::new();
    for part in parts {
        form.add_part(part)?;
    }
    Ok(form)
}

/// Parses a complete `multipart/form-data` body.
pub fn parse_form_data(body: &Bytes, boundary: &[u8]) -> Result<FormData, ParseError> {
    assemble_form_data(parse_multipart(body, boundary)?)
}
