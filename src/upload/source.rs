use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use std::path::Path;

/// Bytes to upload plus the metadata sent in the initiate phase.
#[derive(Debug, Clone)]
pub struct UploadSource {
    data: Bytes,
    mime_type: String,
    display_name: Option<String>,
}

impl UploadSource {
    pub fn bytes(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            display_name: None,
        }
    }

    /// Read a file from disk. The mime type is guessed from the extension and
    /// the display name defaults to the file name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            Error::invalid_request(format!("cannot read {}: {}", path.display(), e))
                .with_context(ErrorContext::new().with_source("upload"))
        })?;
        Ok(Self {
            data: Bytes::from(data),
            mime_type: guess_mime_type(path).to_string(),
            display_name: path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string),
        })
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub(crate) fn into_data(self) -> Bytes {
        self.data
    }
}

/// Mime type for a path, by extension. Unknown extensions are
/// `application/octet-stream`.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "jsonl" => "application/jsonl",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "py" => "text/x-python",
        "js" => "text/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "aac" => "audio/aac",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
