use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::api::error;
use crate::modules::file_upload::model::{Bucket, UploadConfig, UploadedFile};

/// Write-once blob store on local disk. Every upload gets a fresh file name,
/// stored paths are relative to `upload_dir` (e.g. `products/<uuid>.jpg`).
#[derive(Clone)]
pub struct BlobStorage {
    config: UploadConfig,
}

impl BlobStorage {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn max_file_size(&self) -> usize {
        self.config.max_file_size
    }

    /// Validate file type and size
    fn validate_file(&self, file: &UploadedFile) -> Result<(), error::SystemError> {
        if file.bytes.is_empty() {
            return Err(error::SystemError::bad_request("Uploaded file is empty"));
        }

        if file.bytes.len() > self.config.max_file_size {
            return Err(error::SystemError::bad_request(format!(
                "File size exceeds maximum allowed size of {} bytes",
                self.config.max_file_size
            )));
        }

        if !self.config.allowed_mime_types.iter().any(|m| m == &file.mime_type) {
            return Err(error::SystemError::bad_request(format!(
                "File type '{}' is not allowed",
                file.mime_type
            )));
        }

        Ok(())
    }

    fn generate_filename(&self, original_filename: &str) -> String {
        let extension =
            Path::new(original_filename).extension().and_then(|ext| ext.to_str()).unwrap_or("");
        let uuid = Uuid::now_v7();
        if extension.is_empty() {
            uuid.to_string()
        } else {
            format!("{}.{}", uuid, extension.to_ascii_lowercase())
        }
    }

    /// Store one blob, returning its relative path
    pub async fn store(
        &self,
        bucket: Bucket,
        file: &UploadedFile,
    ) -> Result<String, error::SystemError> {
        self.validate_file(file)?;

        let dir = Path::new(&self.config.upload_dir).join(bucket.as_str());
        tokio::fs::create_dir_all(&dir).await?;

        let filename = self.generate_filename(&file.filename);
        tokio::fs::write(dir.join(&filename), &file.bytes).await?;

        tracing::debug!("Stored {} bytes as {}/{}", file.bytes.len(), bucket.as_str(), filename);
        Ok(format!("{}/{}", bucket.as_str(), filename))
    }

    /// Store several blobs; files already written are removed if a later one fails
    pub async fn store_all(
        &self,
        bucket: Bucket,
        files: &[UploadedFile],
    ) -> Result<Vec<String>, error::SystemError> {
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            match self.store(bucket, file).await {
                Ok(path) => stored.push(path),
                Err(e) => {
                    self.remove_all(&stored).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/uploads/{}", self.config.public_base_url, path)
    }

    /// Map a relative path onto disk, refusing anything that escapes `upload_dir`
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        if path.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(Path::new(&self.config.upload_dir).join(relative))
    }

    /// Best-effort delete; a missing file is not an error
    pub async fn remove(&self, path: &str) {
        let Some(full_path) = self.resolve(path) else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&full_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Could not remove blob {}: {}", path, e);
            }
        }
    }

    pub async fn remove_all(&self, paths: &[String]) {
        for path in paths {
            self.remove(path).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> BlobStorage {
        BlobStorage::new(UploadConfig::new("/srv/uploads", "https://market.example"))
    }

    fn image(mime: &str, len: usize) -> UploadedFile {
        UploadedFile {
            field_name: "image".into(),
            filename: "Photo.JPG".into(),
            mime_type: mime.into(),
            bytes: vec![0; len],
        }
    }

    #[test]
    fn public_url_uses_uploads_prefix() {
        assert_eq!(
            storage().public_url("avatars/a.png"),
            "https://market.example/uploads/avatars/a.png"
        );
    }

    #[test]
    fn resolve_rejects_traversal() {
        let s = storage();
        assert!(s.resolve("../etc/passwd").is_none());
        assert!(s.resolve("/etc/passwd").is_none());
        assert!(s.resolve("products/../../x").is_none());
        assert_eq!(s.resolve("products/a.png"), Some(PathBuf::from("/srv/uploads/products/a.png")));
    }

    #[test]
    fn validation_rejects_non_images_and_oversized_files() {
        let s = storage();
        assert!(s.validate_file(&image("image/jpeg", 10)).is_ok());
        assert!(s.validate_file(&image("application/pdf", 10)).is_err());
        assert!(s.validate_file(&image("image/png", 0)).is_err());
        assert!(s.validate_file(&image("image/png", s.max_file_size() + 1)).is_err());
    }

    #[test]
    fn generated_names_keep_lowercased_extension() {
        let name = storage().generate_filename("Photo.JPG");
        assert!(name.ends_with(".jpg"));
        assert_ne!(name, storage().generate_filename("Photo.JPG"));
    }
}
