use std::collections::HashMap;
use std::str::FromStr;

use crate::api::error;

/// Blob storage configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_file_size: usize,
    pub allowed_mime_types: Vec<String>,
    pub upload_dir: String,
    pub public_base_url: String,
}

impl UploadConfig {
    pub fn new(upload_dir: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            public_base_url: public_base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10MB
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
            upload_dir: "./uploads".to_string(),
            public_base_url: "http://localhost:5000".to_string(),
        }
    }
}

/// Sub-directory an upload lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Products,
    Reviews,
    Avatars,
    Messages,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Products => "products",
            Bucket::Reviews => "reviews",
            Bucket::Avatars => "avatars",
            Bucket::Messages => "messages",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Text fields and files collected from a multipart body
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, error::SystemError> {
        match self.text(name) {
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                error::SystemError::bad_request(format!("Invalid value for '{name}'"))
            }),
            None => Ok(None),
        }
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let idx = self.files.iter().position(|f| f.field_name == name)?;
        Some(self.files.remove(idx))
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let (matched, rest): (Vec<UploadedFile>, Vec<UploadedFile>) =
            std::mem::take(&mut self.files).into_iter().partition(|f| f.field_name == name);
        self.files = rest;
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(field: &str, name: &str) -> UploadedFile {
        UploadedFile {
            field_name: field.to_string(),
            filename: name.to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn blank_text_fields_read_as_missing() {
        let mut form = MultipartForm::default();
        form.fields.insert("name".into(), "  ".into());
        form.fields.insert("price".into(), " 100000 ".into());
        assert_eq!(form.text("name"), None);
        assert_eq!(form.parse::<i64>("price").unwrap(), Some(100_000));
    }

    #[test]
    fn unparsable_number_is_bad_request() {
        let mut form = MultipartForm::default();
        form.fields.insert("price".into(), "cheap".into());
        assert!(matches!(form.parse::<i64>("price"), Err(error::SystemError::BadRequest(_))));
    }

    #[test]
    fn take_files_only_removes_matching_field() {
        let mut form = MultipartForm::default();
        form.files =
            vec![file("images", "a.png"), file("avatar", "b.png"), file("images", "c.png")];
        let images = form.take_files("images");
        assert_eq!(images.len(), 2);
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.take_file("avatar").map(|f| f.filename), Some("b.png".to_string()));
        assert!(form.take_file("avatar").is_none());
    }
}
