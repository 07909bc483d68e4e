use super::common::{created_response, no_content_response};
use crate::{
    entities::model_file,
    errors::ServiceError,
    services::model_files::FileUpload,
    ApiResponse, AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::fmt::Write as _;
use tracing::debug;

pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/models/:id/files", get(list_files).post(upload_file))
        .route(
            "/models/:id/files/:file_id",
            get(download_file).delete(delete_file),
        )
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(file_name: &str) -> Result<HeaderValue, ServiceError> {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            ' ' => c,
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();
    let mut encoded = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{:02X}", byte);
        }
    }
    HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    ))
    .map_err(|e| ServiceError::InternalError(format!("invalid file name header: {}", e)))
}

#[utoipa::path(
    get,
    path = "/api/v1/models/{id}/files",
    params(("id" = i32, Path, description = "Product model id")),
    responses(
        (status = 200, description = "Files attached to the model", body = ApiResponse<Vec<model_file::Model>>),
        (status = 404, description = "Model not found", body = crate::errors::ErrorResponse)
    ),
    tag = "files"
)]
pub async fn list_files(
    State(state): State<AppState>,
    Path(model_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<model_file::Model>>>, ServiceError> {
    let files = state.services.files.list(model_id).await?;
    Ok(Json(ApiResponse::success(files)))
}

/// Attach a file; a file of the same data type is replaced
#[utoipa::path(
    post,
    path = "/api/v1/models/{id}/files",
    params(("id" = i32, Path, description = "Product model id")),
    request_body(content_type = "multipart/form-data", description = "`data_type` text field and `file` file field"),
    responses(
        (status = 201, description = "File stored", body = ApiResponse<model_file::Model>),
        (status = 400, description = "Missing field", body = crate::errors::ErrorResponse),
        (status = 404, description = "Model not found", body = crate::errors::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::errors::ErrorResponse)
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    Path(model_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Response, ServiceError> {
    let mut data_type = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("data_type") => data_type = Some(field.text().await?),
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            other => debug!(field = ?other, "ignoring multipart field"),
        }
    }

    let data_type = data_type
        .ok_or_else(|| ServiceError::ValidationError("data_type field is required".to_string()))?;
    let (file_name, content_type, bytes) =
        file.ok_or_else(|| ServiceError::ValidationError("file field is required".to_string()))?;

    let stored = state
        .services
        .files
        .store(
            model_id,
            FileUpload {
                data_type,
                file_name,
                content_type,
                bytes,
            },
        )
        .await?;
    Ok(created_response(stored))
}

#[utoipa::path(
    get,
    path = "/api/v1/models/{id}/files/{file_id}",
    params(
        ("id" = i32, Path, description = "Product model id"),
        ("file_id" = i32, Path, description = "File id")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = crate::errors::ErrorResponse)
    ),
    tag = "files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path((model_id, file_id)): Path<(i32, i32)>,
) -> Result<Response, ServiceError> {
    let download = state.services.files.download(model_id, file_id).await?;
    let content_type = download
        .file
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&download.file.file_name)?,
            ),
        ],
        download.bytes,
    )
        .into_response())
}

#[utoipa::path(
    delete,
    path = "/api/v1/models/{id}/files/{file_id}",
    params(
        ("id" = i32, Path, description = "Product model id"),
        ("file_id" = i32, Path, description = "File id")
    ),
    responses(
        (status = 204, description = "File deleted"),
        (status = 404, description = "File not found", body = crate::errors::ErrorResponse)
    ),
    tag = "files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path((model_id, file_id)): Path<(i32, i32)>,
) -> Result<Response, ServiceError> {
    state.services.files.delete(model_id, file_id).await?;
    Ok(no_content_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_keeps_ascii_and_encodes_the_rest() {
        let value = content_disposition("bom v2.xlsx").unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "attachment; filename=\"bom v2.xlsx\"; filename*=UTF-8''bom%20v2.xlsx"
        );

        let value = content_disposition("좌표.csv").unwrap();
        let text = value.to_str().unwrap();
        assert!(text.starts_with("attachment; filename=\"__.csv\""));
        assert!(text.ends_with("filename*=UTF-8''%EC%A2%8C%ED%91%9C.csv"));
    }
}
