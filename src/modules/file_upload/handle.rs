use actix_multipart::Multipart;
use actix_web::{HttpResponse, get, web};
use futures_util::TryStreamExt;

use crate::api::error;
use crate::modules::file_upload::model::{MultipartForm, UploadedFile};
use crate::modules::file_upload::service::BlobStorage;

const MAX_TEXT_FIELD: usize = 64 * 1024;

/// Drain a multipart body into text fields and in-memory files.
/// `max_files` bounds how many file parts are accepted in total.
pub async fn read_multipart(
    mut payload: Multipart,
    max_file_size: usize,
    max_files: usize,
) -> Result<MultipartForm, error::SystemError> {
    let mut form = MultipartForm::default();

    while let Some(mut field) = payload.try_next().await? {
        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| error::SystemError::bad_request("Missing content disposition"))?;

        let name = content_disposition
            .get_name()
            .ok_or_else(|| error::SystemError::bad_request("Missing field name"))?
            .to_string();
        let filename = content_disposition.get_filename().map(str::to_string);

        let limit = if filename.is_some() { max_file_size } else { MAX_TEXT_FIELD };
        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > limit {
                return Err(error::SystemError::bad_request(format!(
                    "Field '{name}' exceeds {limit} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match filename {
            Some(filename) => {
                // empty file inputs arrive as a part with no name and no bytes
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                if form.files.len() >= max_files {
                    return Err(error::SystemError::bad_request(format!(
                        "At most {max_files} file(s) allowed"
                    )));
                }
                // browsers sometimes send octet-stream for images, fall back to the extension
                let mime_type = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .filter(|m| m != "application/octet-stream")
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&filename).first_or_octet_stream().to_string()
                    });
                form.files.push(UploadedFile { field_name: name, filename, mime_type, bytes });
            }
            None => {
                let text = String::from_utf8(bytes)
                    .map_err(|_| error::SystemError::bad_request("Text field is not valid UTF-8"))?;
                form.fields.insert(name, text);
            }
        }
    }

    Ok(form)
}

/// Static serving for stored blobs under `/uploads/...`
#[get("/uploads/{path:.*}")]
pub async fn serve_upload(
    storage: web::Data<BlobStorage>,
    path: web::Path<String>,
) -> Result<HttpResponse, error::Error> {
    let full_path =
        storage.resolve(&path).ok_or_else(|| error::Error::not_found("File not found"))?;

    let bytes = match tokio::fs::read(&full_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(error::Error::not_found("File not found"));
        }
        Err(e) => return Err(error::SystemError::from(e).into()),
    };

    let mime = mime_guess::from_path(&full_path).first_or_octet_stream();
    Ok(HttpResponse::Ok()
        .content_type(mime.as_ref())
        .insert_header(("Cache-Control", "public, max-age=31536000, immutable"))
        .body(bytes))
}
