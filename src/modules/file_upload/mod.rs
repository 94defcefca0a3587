pub mod handle;
pub mod model;
pub mod service;

pub use handle::{read_multipart, serve_upload};
pub use model::{Bucket, MultipartForm, UploadConfig, UploadedFile};
pub use service::BlobStorage;
