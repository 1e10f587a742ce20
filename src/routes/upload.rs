use axum::{
    Json, Router,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    media::{self, ImageUpload, OptimizeOptions, StoredObject, UploadFolder},
    router::AppState,
    tenant::Tenant,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload).delete(remove))
        .route("/upload/bytes", post(upload_bytes))
}

/// Optional overrides of the resize bounds, taken from the query string.
#[derive(Debug, Default, Deserialize)]
pub struct OptimizeQuery {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub quality: Option<f32>,
}

impl OptimizeQuery {
    pub fn options(&self) -> OptimizeOptions {
        let defaults = OptimizeOptions::default();
        OptimizeOptions {
            max_width: self.max_width.unwrap_or(defaults.max_width),
            max_height: self.max_height.unwrap_or(defaults.max_height),
            quality: self.quality.unwrap_or(defaults.quality),
        }
    }
}

/// The parts of a multipart upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<(Vec<u8>, String, String)>,
    pub folder: Option<String>,
    pub optimize: bool,
}

impl UploadForm {
    /// `forced` takes precedence over the form's `folder` field.
    pub fn into_upload(self, forced: Option<UploadFolder>) -> Result<ImageUpload, AppError> {
        let (bytes, file_name, content_type) = self
            .file
            .ok_or_else(|| AppError::validation("No file provided"))?;
        let folder = match (forced, self.folder) {
            (Some(folder), _) => folder,
            (None, Some(name)) => name.parse::<UploadFolder>()?,
            (None, None) => return Err(AppError::validation("No folder provided")),
        };
        Ok(ImageUpload {
            bytes,
            file_name,
            content_type,
            folder,
            optimize: self.optimize,
        })
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::TooLarge
    } else {
        AppError::validation(err.body_text())
    }
}

pub async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm {
        optimize: true,
        ..Default::default()
    };
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name().map(str::to_owned).as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some((bytes.to_vec(), file_name, content_type));
            }
            Some("folder") => {
                form.folder = Some(field.text().await.map_err(multipart_error)?.trim().to_string());
            }
            Some("optimize") => {
                let value = field.text().await.map_err(multipart_error)?;
                form.optimize = !matches!(value.trim(), "false" | "0" | "no");
            }
            _ => {}
        }
    }
    Ok(form)
}

#[derive(Debug, serde::Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// `multipart/form-data` with `file`, `folder` and optionally `optimize=false`.
pub async fn upload(
    State(state): State<AppState>,
    _tenant: Tenant,
    Query(query): Query<OptimizeQuery>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_form(multipart).await?.into_upload(None)?;
    let stored = media::ingest(state.storage.as_ref(), upload, query.options()).await?;
    Ok(Json(UploadResponse { url: stored.url }))
}

#[derive(Debug, Deserialize)]
pub struct BytesUpload {
    pub bytes: Vec<u8>,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub folder: String,
}

/// Upload result in the `{success, url}` / `{success: false, error}` shape.
pub enum BytesUploadResult {
    Stored(StoredObject),
    Failed(AppError),
}

impl IntoResponse for BytesUploadResult {
    fn into_response(self) -> Response {
        match self {
            BytesUploadResult::Stored(stored) => {
                Json(json!({ "success": true, "url": stored.url })).into_response()
            }
            BytesUploadResult::Failed(err) => {
                let status = err.status();
                if status.is_server_error() {
                    tracing::error!(error = ?err, "byte upload failed");
                }
                (
                    status,
                    Json(json!({ "success": false, "error": err.public_message() })),
                )
                    .into_response()
            }
        }
    }
}

/// JSON body `{bytes: [..], name, type, folder}`.
pub async fn upload_bytes(
    State(state): State<AppState>,
    _tenant: Tenant,
    Json(body): Json<BytesUpload>,
) -> BytesUploadResult {
    let folder = match body.folder.parse::<UploadFolder>() {
        Ok(folder) => folder,
        Err(err) => return BytesUploadResult::Failed(err.into()),
    };
    let upload = ImageUpload {
        bytes: body.bytes,
        file_name: body.name,
        content_type: body.content_type,
        folder,
        optimize: true,
    };
    match media::ingest(state.storage.as_ref(), upload, OptimizeOptions::default()).await {
        Ok(stored) => BytesUploadResult::Stored(stored),
        Err(err) => BytesUploadResult::Failed(err.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub url: String,
}

pub async fn remove(
    State(state): State<AppState>,
    _tenant: Tenant,
    Json(body): Json<DeleteRequest>,
) -> Result<StatusCode, AppError> {
    media::delete_by_url(state.storage.as_ref(), &body.url).await?;
    Ok(StatusCode::NO_CONTENT)
}
