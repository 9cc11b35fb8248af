//! Media attachments for new posts.
//!
//! A file picker hands over either raw bytes or an embedded `data:` URI;
//! both are normalized into an [`Upload`] right before transmission.

use super::PostType;
use crate::error::{Result, SyncError};
use base64::Engine;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn post_type(&self) -> PostType {
        match self {
            MediaKind::Image => PostType::Image,
            MediaKind::Video => PostType::Video,
        }
    }

    /// Multipart field name expected by the posts endpoint.
    pub fn field_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    fn default_file_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "image.jpg",
            MediaKind::Video => "video.mp4",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Binary { bytes: Vec<u8>, mime: String },
    DataUri(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub kind: MediaKind,
    pub source: MediaSource,
}

/// Binary payload ready for a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
    pub mime: String,
    pub file_name: String,
}

impl MediaAttachment {
    pub fn new(kind: MediaKind, source: MediaSource) -> Self {
        Self { kind, source }
    }

    /// Read a local file and guess its MIME type from the extension.
    pub async fn from_file(kind: MediaKind, path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let mime = guess_mime(path, kind).to_string();
        Ok(Self::new(kind, MediaSource::Binary { bytes, mime }))
    }

    pub fn into_upload(self) -> Result<Upload> {
        let (bytes, mime) = match self.source {
            MediaSource::Binary { bytes, mime } => (bytes, mime),
            MediaSource::DataUri(uri) => decode_data_uri(&uri)?,
        };
        if bytes.is_empty() {
            return Err(SyncError::Media("attachment is empty".to_string()));
        }
        Ok(Upload {
            kind: self.kind,
            bytes,
            mime,
            file_name: self.kind.default_file_name().to_string(),
        })
    }
}

/// Decode `data:<mime>;base64,<payload>` into bytes and its MIME type.
pub fn decode_data_uri(uri: &str) -> Result<(Vec<u8>, String)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| SyncError::Media("not a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SyncError::Media("data URI has no payload".to_string()))?;

    let mut params = header.split(';');
    let mime = match params.next() {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => "text/plain".to_string(),
    };
    if !params.any(|p| p == "base64") {
        return Err(SyncError::Media(
            "only base64 data URIs are supported".to_string(),
        ));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| SyncError::Media(format!("bad base64 payload: {}", e)))?;
    Ok((bytes, mime))
}

fn guess_mime(path: &Path, kind: MediaKind) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        _ => match kind {
            MediaKind::Image => "image/jpeg",
            MediaKind::Video => "video/mp4",
        },
    }
}
