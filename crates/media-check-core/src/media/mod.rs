use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod store;

/// Default upload ceiling, matching the largest video the backend accepts.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 500 * 1024 * 1024;

/// Broad category of submitted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
    Document,
    Text,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Document => "document",
            Self::Text => "text",
        }
    }

    /// Label used when describing a file of this kind to the backend.
    pub fn message_label(self) -> &'static str {
        match self {
            Self::Video => "Video file",
            Self::Audio => "Audio file",
            Self::Image => "Image file",
            Self::Document => "Document file",
            Self::Text => "Text content",
        }
    }
}

/// Extension → (MIME type, kind) for every accepted upload format.
const MEDIA_TYPES: &[(&str, &str, MediaKind)] = &[
    ("mp4", "video/mp4", MediaKind::Video),
    ("webm", "video/webm", MediaKind::Video),
    ("mkv", "video/x-matroska", MediaKind::Video),
    ("avi", "video/x-msvideo", MediaKind::Video),
    ("mov", "video/quicktime", MediaKind::Video),
    ("mp3", "audio/mpeg", MediaKind::Audio),
    ("wav", "audio/wav", MediaKind::Audio),
    ("flac", "audio/flac", MediaKind::Audio),
    ("aac", "audio/aac", MediaKind::Audio),
    ("ogg", "audio/ogg", MediaKind::Audio),
    ("opus", "audio/opus", MediaKind::Audio),
    ("m4a", "audio/x-m4a", MediaKind::Audio),
    ("weba", "audio/webm", MediaKind::Audio),
    ("jpg", "image/jpeg", MediaKind::Image),
    ("jpeg", "image/jpeg", MediaKind::Image),
    ("png", "image/png", MediaKind::Image),
    ("gif", "image/gif", MediaKind::Image),
    ("webp", "image/webp", MediaKind::Image),
    ("svg", "image/svg+xml", MediaKind::Image),
    ("bmp", "image/bmp", MediaKind::Image),
    ("tif", "image/tiff", MediaKind::Image),
    ("tiff", "image/tiff", MediaKind::Image),
    ("heic", "image/heic", MediaKind::Image),
    ("heif", "image/heif", MediaKind::Image),
    ("pdf", "application/pdf", MediaKind::Document),
    ("doc", "application/msword", MediaKind::Document),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        MediaKind::Document,
    ),
];

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"];

/// Input rejected before any request is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported file type for `{name}`; accepted: video, audio, image, PDF or Word documents")]
    UnsupportedType { name: String },
    #[error("`{name}` is {size} bytes; the limit is {limit} bytes")]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("`{url}` is not a valid URL")]
    InvalidUrl { url: String },
    #[error("text to check must not be empty")]
    EmptyText,
}

/// A file accepted for checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub size: u64,
    pub kind: MediaKind,
    pub mime: &'static str,
}

/// Look up the MIME type and kind for a file name by extension.
pub fn detect_media_type(file_name: &str) -> Option<(&'static str, MediaKind)> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(candidate, _, _)| *candidate == ext)
        .map(|(_, mime, kind)| (*mime, *kind))
}

/// Validate a file's type and size against the upload policy.
pub fn validate_file(file_name: &str, size: u64, max_bytes: u64) -> Result<MediaFile, ValidationError> {
    let (mime, kind) =
        detect_media_type(file_name).ok_or_else(|| ValidationError::UnsupportedType {
            name: file_name.to_string(),
        })?;
    if size > max_bytes {
        return Err(ValidationError::TooLarge {
            name: file_name.to_string(),
            size,
            limit: max_bytes,
        });
    }
    Ok(MediaFile {
        name: file_name.to_string(),
        size,
        kind,
        mime,
    })
}

/// Require an absolute, parseable URL.
pub fn validate_url(url: &str) -> Result<reqwest::Url, ValidationError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidUrl {
            url: url.to_string(),
        });
    }
    reqwest::Url::parse(trimmed).map_err(|_| ValidationError::InvalidUrl {
        url: url.to_string(),
    })
}

/// True when the URL points at a specific YouTube video.
pub fn is_youtube_url(url: &str) -> bool {
    let Ok(parsed) = validate_url(url) else {
        return false;
    };
    let Some(host) = parsed.host_str().map(str::to_ascii_lowercase) else {
        return false;
    };
    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return false;
    }
    if host == "youtu.be" {
        return parsed.path().len() > 1;
    }
    parsed.query_pairs().any(|(key, _)| key == "v")
        || parsed.path().contains("/embed/")
        || parsed.path().contains("/watch")
}

pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    Ok(())
}
