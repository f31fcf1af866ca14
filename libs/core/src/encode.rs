//! Builds the body of an outgoing call.
//!
//! Parameters are sent as compact JSON unless at least one attached file is a
//! local upload, in which case the call switches to `multipart/form-data`:
//! top-level uploads become file parts named after their field, uploads nested
//! inside JSON structures are replaced by `attach://<name>` and sent as a part
//! called `<name>`, and every other field becomes a text part.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::EncodeError;
use crate::input_file::{InputFile, NamedSource};
use crate::multipart::MultipartWriter;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const ATTACH_PREFIX: &str = "attach://";

/// Encoded body of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPayload {
    pub content_type: String,
    pub body: Bytes,
}

impl RequestPayload {
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self {
            content_type: JSON_CONTENT_TYPE.to_string(),
            body: body.into(),
        }
    }

    pub fn is_multipart(&self) -> bool {
        self.content_type.starts_with("multipart/form-data")
    }
}

/// A file parameter located by a JSON pointer into the serialized parameters,
/// e.g. `/photo` or `/media/0/thumbnail`.
#[derive(Debug, Clone)]
pub struct Attachment<'a> {
    pub pointer: String,
    pub file: &'a InputFile,
}

impl<'a> Attachment<'a> {
    pub fn new(pointer: impl Into<String>, file: &'a InputFile) -> Self {
        Self {
            pointer: pointer.into(),
            file,
        }
    }
}

/// How an upload is referenced from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Multipart field name carrying the content.
    pub part_name: String,
    /// Replacement for the JSON value at the pointer. `None` for top-level
    /// fields, which are sent as the part itself.
    pub placeholder: Option<String>,
}

/// Computes the reference for a file at `pointer`, or `None` when the file
/// is not a local upload. The file itself is never modified, so encoding the
/// same value twice gives the same result.
pub fn attachment_ref(pointer: &str, file: &InputFile) -> Option<AttachmentRef> {
    if !file.is_upload() {
        return None;
    }
    let segments: Vec<&str> = pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    let part_name = segments.join("_");
    let placeholder = (segments.len() > 1).then(|| format!("{ATTACH_PREFIX}{part_name}"));
    Some(AttachmentRef {
        part_name,
        placeholder,
    })
}

/// Encodes `params` together with the files it references.
pub fn encode_request<P>(
    params: &P,
    attachments: &[Attachment<'_>],
) -> Result<RequestPayload, EncodeError>
where
    P: Serialize + ?Sized,
{
    let uploads: Vec<(&str, AttachmentRef, &Arc<dyn NamedSource>)> = attachments
        .iter()
        .filter_map(|attachment| {
            let source = attachment.file.source()?;
            attachment_ref(&attachment.pointer, attachment.file)
                .map(|reference| (attachment.pointer.as_str(), reference, source))
        })
        .collect();

    if uploads.is_empty() {
        let body = serde_json::to_vec(params).map_err(EncodeError::Serialize)?;
        return Ok(RequestPayload::json(body));
    }

    let mut value = serde_json::to_value(params).map_err(EncodeError::Serialize)?;
    for (pointer, reference, _) in &uploads {
        apply_reference(&mut value, pointer, reference)?;
    }
    let Value::Object(fields) = value else {
        return Err(EncodeError::NotAnObject);
    };

    let mut writer = MultipartWriter::new();
    write_text_fields(&mut writer, &fields)?;
    for (_, reference, source) in uploads {
        let mut reader = source.open().map_err(|err| EncodeError::Io {
            name: reference.part_name.clone(),
            source: err,
        })?;
        writer.file(&reference.part_name, source.name(), &mut reader)?;
    }
    Ok(writer.finish())
}

fn apply_reference(
    value: &mut Value,
    pointer: &str,
    reference: &AttachmentRef,
) -> Result<(), EncodeError> {
    match &reference.placeholder {
        Some(placeholder) => {
            let slot = value
                .pointer_mut(pointer)
                .ok_or_else(|| EncodeError::MissingAttachmentPath(pointer.to_string()))?;
            *slot = Value::String(placeholder.clone());
        }
        None => {
            let fields = value.as_object_mut().ok_or(EncodeError::NotAnObject)?;
            fields.remove(&reference.part_name);
        }
    }
    Ok(())
}

fn write_text_fields(
    writer: &mut MultipartWriter,
    fields: &Map<String, Value>,
) -> Result<(), EncodeError> {
    for (name, value) in fields {
        match value {
            Value::Null => continue,
            Value::String(text) => writer.text(name, text)?,
            other => {
                let text = serde_json::to_string(other).map_err(EncodeError::Serialize)?;
                writer.text(name, &text)?;
            }
        }
    }
    Ok(())
}
