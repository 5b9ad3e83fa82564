//! Disk-backed store for uploaded post/message attachments.
//!
//! Files are stored at `{DATA_DIR}/uploads/{hash}.{ext}` and deduplicated by
//! SHA-256 hash — uploading the same file twice returns the same URL. Served
//! files get long-lived cache headers since content-hash names never change.

mod api;

pub use api::serve_upload;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ApiError;

/// Max file size per uploaded file (50 MB).
pub const MAX_FILE_BYTES: usize = 50 * 1024 * 1024;

/// Max files accepted per post or message.
pub const MAX_FILES_PER_ITEM: usize = 10;

/// Allowed file extensions: common image, video, and document types.
const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpeg", "jpg", "png", "gif", "webp", "mp4", "mov", "avi", "mkv", "pdf", "doc", "docx", "xls",
    "xlsx", "ppt", "pptx", "txt", "zip", "rar",
];

/// Broad category of an uploaded file, derived from its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Video,
    Document,
    Other,
}

impl FileKind {
    /// Classify a MIME type the same way the upload filter accepts it.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            FileKind::Image
        } else if mime.starts_with("video/") {
            FileKind::Video
        } else if mime.contains("pdf")
            || mime.contains("document")
            || mime.contains("word")
            || mime.contains("spreadsheet")
            || mime.contains("presentation")
            || mime.contains("text")
        {
            FileKind::Document
        } else {
            FileKind::Other
        }
    }
}

/// An attachment reference embedded in posts and messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub filename: String,
    pub original_name: String,
    pub file_type: FileKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Disk-backed upload store.
#[derive(Clone)]
pub struct UploadStore {
    /// Directory for stored files (None = uploads rejected).
    uploads_dir: Option<PathBuf>,
}

impl UploadStore {
    /// Create a new upload store rooted at `{data_dir}/uploads`.
    pub fn new(data_dir: Option<&str>) -> Self {
        let uploads_dir = data_dir.map(|d| PathBuf::from(d).join("uploads"));
        Self { uploads_dir }
    }

    /// Whether a filename's extension is on the allow-list.
    pub fn is_allowed_name(name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
            None => false,
        }
    }

    /// Store one uploaded file and return its attachment record.
    ///
    /// Validates the extension allow-list and the per-file size cap, writes
    /// atomically (temp file then rename), and deduplicates by content hash.
    pub fn store_file(
        &self,
        original_name: &str,
        content_type: &str,
        data: &[u8],
        caption: Option<String>,
    ) -> Result<FileAttachment, ApiError> {
        let dir = self.uploads_dir.as_ref().ok_or_else(|| {
            ApiError::Internal("No upload directory configured on this server".to_string())
        })?;

        if !Self::is_allowed_name(original_name) {
            return Err(ApiError::Validation(
                "Invalid file type. Only images, videos, and documents are allowed.".to_string(),
            ));
        }

        if data.len() > MAX_FILE_BYTES {
            return Err(ApiError::Validation(format!(
                "File too large ({} bytes). Max per file: {} bytes",
                data.len(),
                MAX_FILE_BYTES
            )));
        }

        let ext = original_name
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(data);
        let hash = hex::encode(hasher.finalize());
        let filename = format!("{}.{}", hash, ext);
        let file_path = dir.join(&filename);

        if !file_path.exists() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                tracing::error!(error = %e, path = %dir.display(), "Failed to create uploads directory");
                return Err(ApiError::Internal("Failed to create upload directory".to_string()));
            }

            let tmp_path = file_path.with_extension(format!("{}.tmp", ext));
            if let Err(e) = std::fs::write(&tmp_path, data) {
                tracing::error!(error = %e, path = %tmp_path.display(), "Failed to write upload");
                return Err(ApiError::Internal("Failed to write uploaded file".to_string()));
            }
            if let Err(e) = std::fs::rename(&tmp_path, &file_path) {
                tracing::error!(error = %e, "Failed to finalize uploaded file");
                let _ = std::fs::remove_file(&tmp_path);
                return Err(ApiError::Internal("Failed to finalize uploaded file".to_string()));
            }

            tracing::info!(hash = %hash, size = data.len(), content_type, "Upload stored");
        }

        Ok(FileAttachment {
            filename: filename.clone(),
            original_name: original_name.to_string(),
            file_type: FileKind::from_mime(content_type),
            url: format!("/uploads/{}", filename),
            caption,
        })
    }

    /// Read a stored file from disk, inferring its content type from the
    /// extension. Returns None when the file is unknown.
    pub fn read_file(&self, filename: &str) -> Option<(Vec<u8>, &'static str)> {
        let dir = self.uploads_dir.as_ref()?;

        // Hash-named files only; reject anything path-like.
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return None;
        }

        let content_type = match filename.rsplit_once('.').map(|(_, e)| e) {
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("mp4") => "video/mp4",
            Some("mov") => "video/quicktime",
            Some("avi") => "video/x-msvideo",
            Some("mkv") => "video/x-matroska",
            Some("pdf") => "application/pdf",
            Some("txt") => "text/plain",
            Some("zip") => "application/zip",
            _ => "application/octet-stream",
        };

        let data = std::fs::read(dir.join(filename)).ok()?;
        Some((data, content_type))
    }
}
