//! Minimal `multipart/form-data` writer producing an in-memory body.

use std::io::{self, Read, Write};

use bytes::Bytes;
use uuid::Uuid;

use crate::encode::RequestPayload;
use crate::error::EncodeError;

pub struct MultipartWriter {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartWriter {
    pub fn new() -> Self {
        Self::with_boundary(format!("tgb-{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn text(&mut self, name: &str, value: &str) -> Result<(), EncodeError> {
        check_name(name)?;
        self.open_part(&format!("form-data; name=\"{name}\""), None);
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        Ok(())
    }

    pub fn file(
        &mut self,
        name: &str,
        filename: &str,
        reader: &mut dyn Read,
    ) -> Result<(), EncodeError> {
        check_name(name)?;
        let disposition = format!(
            "form-data; name=\"{name}\"; filename=\"{}\"",
            escape_quotes(filename)
        );
        self.open_part(&disposition, Some("application/octet-stream"));
        io::copy(reader, &mut self.body).map_err(|source| EncodeError::Io {
            name: name.to_string(),
            source,
        })?;
        self.body.extend_from_slice(b"\r\n");
        Ok(())
    }

    pub fn finish(mut self) -> RequestPayload {
        let content_type = self.content_type();
        // Writing into a Vec cannot fail.
        let _ = write!(self.body, "--{}--\r\n", self.boundary);
        RequestPayload {
            content_type,
            body: Bytes::from(self.body),
        }
    }

    fn open_part(&mut self, disposition: &str, content_type: Option<&str>) {
        let _ = write!(self.body, "--{}\r\n", self.boundary);
        let _ = write!(self.body, "Content-Disposition: {disposition}\r\n");
        if let Some(content_type) = content_type {
            let _ = write!(self.body, "Content-Type: {content_type}\r\n");
        }
        self.body.extend_from_slice(b"\r\n");
    }
}

fn check_name(name: &str) -> Result<(), EncodeError> {
    if name.is_empty() || name.contains(['"', '\r', '\n']) {
        return Err(EncodeError::InvalidPartName(name.to_string()));
    }
    Ok(())
}

fn escape_quotes(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], "")
}
