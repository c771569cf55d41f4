//! Document uploads: validation, storage on disk, and multipart parsing.
//!
//! Files land in `<upload_dir>/<category>/<owner>-<field>-<random>.<ext>`;
//! the database stores the path relative to `upload_dir`.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::ApiError;

const ACCEPTED: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("application/pdf", "pdf"),
];

/// An uploaded file held in memory until it is stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// File extension for an accepted MIME type.
    #[must_use]
    pub fn extension_for(content_type: &str) -> Option<&'static str> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        ACCEPTED
            .iter()
            .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
            .map(|(_, ext)| *ext)
    }

    fn content_type_for(path: &Path) -> &'static str {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        ACCEPTED
            .iter()
            .find(|(_, e)| e.eq_ignore_ascii_case(ext))
            .map_or("application/octet-stream", |(mime, _)| *mime)
    }

    /// Write `file` and return its path relative to the upload root.
    ///
    /// # Errors
    ///
    /// `UnsupportedMediaType`, `PayloadTooLarge`, or `Internal` on I/O failure.
    pub async fn save(
        &self,
        category: &str,
        owner_id: &str,
        field: &str,
        file: &UploadedFile,
    ) -> Result<String, ApiError> {
        let ext = Self::extension_for(&file.content_type)
            .ok_or_else(|| ApiError::UnsupportedMediaType(file.content_type.clone()))?;
        if file.bytes.len() > self.max_bytes {
            return Err(self.too_large());
        }

        let mut suffix = [0u8; 4];
        getrandom::fill(&mut suffix).map_err(|e| ApiError::Internal(format!("rng: {e}")))?;
        let relative = format!("{category}/{owner_id}-{field}-{}.{ext}", hex::encode(suffix));

        let path = self.resolve(&relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &file.bytes).await?;
        tracing::debug!(path = %relative, bytes = file.bytes.len(), "upload stored");
        Ok(relative)
    }

    /// Read a stored file and its content type.
    ///
    /// # Errors
    ///
    /// `NotFound` when the file is missing or the path escapes the root.
    pub async fn read(&self, relative: &str) -> Result<(Vec<u8>, &'static str), ApiError> {
        let path = self.resolve(relative)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((bytes, Self::content_type_for(&path))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ApiError::not_found("file")),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored file, logging failures.
    pub async fn remove(&self, relative: &str) {
        let Ok(path) = self.resolve(relative) else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %relative, error = %e, "failed to remove upload");
        }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, ApiError> {
        let rel = Path::new(relative);
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(ApiError::not_found("file"));
        }
        Ok(self.root.join(rel))
    }

    fn too_large(&self) -> ApiError {
        ApiError::PayloadTooLarge(format!("upload exceeds {} bytes", self.max_bytes))
    }
}

/// Text fields and files collected from a `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    text: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Drain `multipart`, checking each file's type and size as it arrives.
    ///
    /// # Errors
    ///
    /// `BadRequest` for malformed bodies, `UnsupportedMediaType` or
    /// `PayloadTooLarge` for unacceptable files.
    pub async fn read(mut multipart: Multipart, store: &UploadStore) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(String::from) else {
                continue;
            };
            if field.file_name().is_some() {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if UploadStore::extension_for(&content_type).is_none() {
                    return Err(ApiError::UnsupportedMediaType(content_type));
                }
                let bytes = field.bytes().await?;
                if bytes.len() > store.max_bytes() {
                    return Err(store.too_large());
                }
                if bytes.is_empty() {
                    return Err(ApiError::Validation(format!("{name} is empty")));
                }
                form.files.insert(name, UploadedFile { content_type, bytes });
            } else {
                form.text.insert(name, field.text().await?);
            }
        }
        Ok(form)
    }

    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    /// # Errors
    ///
    /// `Validation` when the field is missing.
    pub fn require(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::Validation(format!("{name} is required")))
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn png(len: usize) -> UploadedFile {
        UploadedFile {
            content_type: "image/png".into(),
            bytes: Bytes::from(vec![0x89; len]),
        }
    }

    #[test]
    fn extension_mapping() {
        assert_eq!(UploadStore::extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(UploadStore::extension_for("application/pdf; charset=binary"), Some("pdf"));
        assert_eq!(UploadStore::extension_for("IMAGE/PNG"), Some("png"));
        assert_eq!(UploadStore::extension_for("text/html"), None);
    }

    #[tokio::test]
    async fn save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);
        let path = store.save("kyc", "usr-1", "document", &png(10)).await.unwrap();
        assert!(path.starts_with("kyc/usr-1-document-"));
        assert!(path.ends_with(".png"));

        let (bytes, content_type) = store.read(&path).await.unwrap();
        assert_eq!(bytes.len(), 10);
        assert_eq!(content_type, "image/png");

        let again = store.save("kyc", "usr-1", "document", &png(10)).await.unwrap();
        assert_ne!(path, again);

        store.remove(&path).await;
        assert!(matches!(store.read(&path).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn oversize_and_wrong_type_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 8);
        assert!(matches!(
            store.save("kyc", "usr-1", "document", &png(9)).await,
            Err(ApiError::PayloadTooLarge(_))
        ));
        let html = UploadedFile {
            content_type: "text/html".into(),
            bytes: Bytes::from_static(b"<p>"),
        };
        assert!(matches!(
            store.save("kyc", "usr-1", "document", &html).await,
            Err(ApiError::UnsupportedMediaType(_))
        ));
    }

    #[tokio::test]
    async fn traversal_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 8);
        assert!(matches!(store.read("../etc/passwd").await, Err(ApiError::NotFound(_))));
        assert!(matches!(store.read("/etc/passwd").await, Err(ApiError::NotFound(_))));
    }
}
