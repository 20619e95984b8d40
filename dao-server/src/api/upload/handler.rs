//! Blob handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use http::header;
use serde::Serialize;

use crate::auth::Principal;
use crate::core::ServerState;
use crate::storage::{object_key, BlobStore};
use crate::utils::{AppError, AppResult};
use shared::ApiResponse;

/// Maximum upload size (10MB)
const MAX_BLOB_SIZE: usize = 10 * 1024 * 1024;

#[derive(Serialize)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
    pub size: usize,
}

/// POST /v1/blob - upload one file, content-addressed
pub async fn upload(
    State(state): State<ServerState>,
    _principal: Principal,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<UploadResponse>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid(format!("Bad multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .to_string()
            });
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::invalid(format!("Upload read failed: {e}")))?;
        if bytes.is_empty() {
            return Err(AppError::invalid("Empty file"));
        }
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(AppError::invalid("File exceeds the 10MB limit"));
        }

        let key = object_key(&bytes, &filename);
        let size = bytes.len();
        let url = state.blobs.put(&key, bytes.to_vec(), &content_type).await?;
        return Ok(Json(ApiResponse::ok(UploadResponse { key, url, size })));
    }
    Err(AppError::invalid("No file field in the request"))
}

pub(crate) enum BlobResponse {
    Ok(Bytes, String),
    NotFound,
}

impl IntoResponse for BlobResponse {
    fn into_response(self) -> axum::response::Response {
        match self {
            BlobResponse::Ok(content, content_type) => (
                http::StatusCode::OK,
                [(header::CONTENT_TYPE, content_type)],
                content,
            )
                .into_response(),
            BlobResponse::NotFound => {
                (http::StatusCode::NOT_FOUND, "Blob not found").into_response()
            }
        }
    }
}

/// GET /v1/blob/{key} - serve a locally stored blob
pub async fn serve(
    State(state): State<ServerState>,
    Path(key): Path<String>,
) -> AppResult<BlobResponse> {
    let BlobStore::Local(store) = &state.blobs else {
        return Ok(BlobResponse::NotFound);
    };
    let path = store.resolve(&key)?;
    match tokio::fs::read(&path).await {
        Ok(content) => {
            let content_type = mime_guess::from_path(&path)
                .first_or_octet_stream()
                .to_string();
            Ok(BlobResponse::Ok(content.into(), content_type))
        }
        Err(_) => Ok(BlobResponse::NotFound),
    }
}
