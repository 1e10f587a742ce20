//! Image ingestion: bound and recompress an image, store it in the bucket,
//! hand back its public URL, and optionally write that URL into a row.

pub mod folder;
pub mod optimize;
pub mod storage;
pub mod target;

use tracing::{debug, info};

pub use folder::UploadFolder;
pub use optimize::OptimizeOptions;
pub use storage::{ObjectStore, S3Store};
pub use target::ImageTarget;

use optimize::optimize;
use storage::{extension_from_name, object_key};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("File is empty")]
    Empty,

    #[error("Unknown upload folder: {0}")]
    UnknownFolder(String),

    #[error("Invalid image options: {0}")]
    InvalidOptions(String),

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Upload failed: {0}")]
    Storage(String),

    #[error("URL does not belong to the media bucket: {0}")]
    ForeignUrl(String),

    #[error(transparent)]
    Task(#[from] tokio::task::JoinError),
}

/// One file on its way into the bucket.
#[derive(Debug)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
    pub folder: UploadFolder,
    /// Skip resize/recompress when false. Non-images are never optimized.
    pub optimize: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

/// Runs the whole pipeline once. Any failure aborts before anything is stored.
pub async fn ingest(
    store: &dyn ObjectStore,
    upload: ImageUpload,
    options: OptimizeOptions,
) -> Result<StoredObject, MediaError> {
    if upload.bytes.is_empty() {
        return Err(MediaError::Empty);
    }
    options.validate()?;

    let original_size = upload.bytes.len();
    let (bytes, content_type, extension) =
        if upload.optimize && upload.content_type.starts_with("image/") {
            let source = upload.bytes;
            let optimized =
                tokio::task::spawn_blocking(move || optimize(&source, &options)).await??;
            debug!(
                original = original_size,
                optimized = optimized.bytes.len(),
                width = optimized.width,
                height = optimized.height,
                "image optimized"
            );
            (
                optimized.bytes,
                optimized.content_type.to_string(),
                optimized.extension.to_string(),
            )
        } else {
            let content_type = if upload.content_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                upload.content_type
            };
            (
                upload.bytes,
                content_type,
                extension_from_name(&upload.file_name),
            )
        };

    let key = object_key(upload.folder, &extension);
    let size = bytes.len();
    info!(%key, size, %content_type, "uploading object");
    store.put(&key, bytes, &content_type).await?;

    let url = store.urls().url_for(&key);
    info!(%url, "upload complete");
    Ok(StoredObject {
        key,
        url,
        content_type,
        size,
    })
}

/// Deletes the object behind a public URL of this bucket.
pub async fn delete_by_url(store: &dyn ObjectStore, url: &str) -> Result<(), MediaError> {
    let key = store
        .urls()
        .key_for(url)
        .ok_or_else(|| MediaError::ForeignUrl(url.to_string()))?;
    store.delete(&key).await?;
    info!(%key, "object deleted");
    Ok(())
}
