//! Files attached to outgoing calls.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use serde::{Serialize, Serializer};

/// A named byte stream that can be uploaded.
pub trait NamedSource: fmt::Debug + Send + Sync {
    /// File name sent to the server.
    fn name(&self) -> &str;

    /// Opens a fresh reader over the content. Called once per encoded request.
    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>>;
}

/// In-memory upload.
#[derive(Debug, Clone)]
pub struct BytesSource {
    name: String,
    data: Bytes,
}

impl BytesSource {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl NamedSource for BytesSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(Cursor::new(self.data.clone())))
    }
}

/// Upload read from disk when the request is encoded.
#[derive(Debug, Clone)]
pub struct PathSource {
    path: PathBuf,
    name: String,
}

impl PathSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Self { path, name }
    }
}

impl NamedSource for PathSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

/// A file parameter: local content, a file already stored on the server, or a
/// URL the server downloads itself. Only [`InputFile::Upload`] switches a
/// request to multipart.
#[derive(Debug, Clone)]
pub enum InputFile {
    Upload(Arc<dyn NamedSource>),
    FileId(String),
    Url(String),
}

impl InputFile {
    pub fn upload(source: impl NamedSource + 'static) -> Self {
        InputFile::Upload(Arc::new(source))
    }

    pub fn bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::upload(BytesSource::new(name, data))
    }

    pub fn path(path: impl AsRef<Path>) -> Self {
        Self::upload(PathSource::new(path))
    }

    pub fn file_id(id: impl Into<String>) -> Self {
        InputFile::FileId(id.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        InputFile::Url(url.into())
    }

    pub fn source(&self) -> Option<&Arc<dyn NamedSource>> {
        match self {
            InputFile::Upload(source) => Some(source),
            _ => None,
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, InputFile::Upload(_))
    }
}

/// Remote references serialize as plain strings. Uploads serialize as `null`;
/// the request encoder replaces them with a part or an `attach://` reference.
impl Serialize for InputFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            InputFile::FileId(id) => serializer.serialize_str(id),
            InputFile::Url(url) => serializer.serialize_str(url),
            InputFile::Upload(_) => serializer.serialize_none(),
        }
    }
}
