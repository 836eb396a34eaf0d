use crate::{
    auth::ExtractAuth,
    error::{AppError, AppResult},
    lifecycle,
    policy::Operation,
    read_model::{envelope, Envelope},
    uploads::validate_image,
    AppState,
};
use axum::{
    extract::Multipart,
    routing::post,
    Extension, Json, Router,
};
use serde::Serialize;

#[derive(Serialize)]
struct UploadResponse {
    url: String,
}

async fn upload(
    Extension(state): Extension<AppState>,
    ExtractAuth(caller): ExtractAuth,
    mut multipart: Multipart,
) -> AppResult<Json<Envelope<UploadResponse>>> {
    lifecycle::authorize(&caller, Operation::UploadImage)?;

    let limit = state.settings.max_upload_bytes;
    let mut file = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("invalid multipart request: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(String::from);
        let mut bytes = Vec::new();
        // stop reading one byte past the limit, validation reports the size
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::bad_request(format!("failed to read upload: {e}")))?
        {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > limit {
                bytes.truncate(limit + 1);
                break;
            }
        }
        file = Some((file_name, bytes));
        break;
    }
    let (file_name, bytes) =
        file.ok_or_else(|| AppError::bad_request("missing multipart field `file`"))?;

    let content_type = validate_image(file_name.as_deref(), &bytes, limit)?;
    let url = state.images.store(bytes, &content_type).await?;

    tracing::info!(by = %caller.id, %url, "image uploaded");
    Ok(envelope(UploadResponse { url }))
}

pub fn app() -> Router {
    Router::new().route("/upload", post(upload))
}
