//! Media attachment classification and object key layout.

use bytes::Bytes;
use time::OffsetDateTime;

const FALLBACK_FILE_NAME: &str = "upload";

/// The two attachment kinds a post can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify by MIME type prefix. Anything other than `image/*` or `video/*` is unsupported.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let normalized = content_type.trim().to_ascii_lowercase();
        if normalized.starts_with("image/") {
            Some(Self::Image)
        } else if normalized.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }

    pub fn directory(self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Video => "videos",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// A file selected in the edit form, fully buffered.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl MediaUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_content_type(&self.content_type)
    }
}

/// Build the storage key `<kind dir>/<epoch-ms>_<file name>`.
///
/// Only the final path component of `file_name` is kept so a client cannot
/// place objects outside the kind directory.
pub fn object_key(kind: MediaKind, at: OffsetDateTime, file_name: &str) -> String {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    format!("{}/{millis}_{}", kind.directory(), base_file_name(file_name))
}

fn base_file_name(file_name: &str) -> &str {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .unwrap_or_default();

    match name {
        "" | "." | ".." => FALLBACK_FILE_NAME,
        other => other,
    }
}
