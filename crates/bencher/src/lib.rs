use bytes::Bytes;

/// One benchmark input, with the group it is reported under.
#[derive(Debug, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    input: Bytes,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, input: impl Into<Bytes>) -> Self {
        Self { name, group, input: input.into() }
    }

    pub fn small(name: &'static str, input: impl Into<Bytes>) -> Self {
        Self::new(name, TestGroup::Small, input)
    }

    pub fn normal(name: &'static str, input: impl Into<Bytes>) -> Self {
        Self::new(name, TestGroup::Normal, input)
    }

    pub fn large(name: &'static str, input: impl Into<Bytes>) -> Self {
        Self::new(name, TestGroup::Large, input)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn input(&self) -> &Bytes {
        &self.input
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

pub const BOUNDARY: &str = "----bencherBoundary7MA4YWxkTrZu0gW";

/// Builds a `multipart/form-data` body with `values` text fields followed by
/// `files` file fields of `file_size` bytes each.
pub fn form_data_body(values: usize, files: usize, file_size: usize) -> Bytes {
    let mut body = Vec::new();

    for i in 0..values {
        body.extend_from_slice(format!("--{BOUNDARY}\r\ncontent-disposition: form-data; name=\"field{i}\"\r\n\r\nvalue of field {i}\r\n").as_bytes());
    }

    for i in 0..files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\ncontent-disposition: form-data; name=\"upload\"; filename=\"file{i}.bin\"\r\ncontent-type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend((0..file_size).map(|n| b'a' + (n % 26) as u8));
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Bytes::from(body)
}

/// Header field lines as they appear in a multipart part, without line endings.
pub fn field_lines() -> Vec<&'static [u8]> {
    vec![
        b"Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"",
        b"Content-Type: image/png",
        b"Content-Transfer-Encoding: binary",
        b"X-Custom-Header:   padded value with trailing space   ",
        b"Content-Type: multipart/mixed; boundary=\"nested-boundary\"",
    ]
}
