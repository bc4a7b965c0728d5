/// Image upload handler
///
/// Accepts `multipart/form-data` with the image in a `file` (or `image`)
/// field. The body is read with a hard cap so oversized uploads are rejected
/// before they are buffered in full.
use crate::error::{AppError, Result};
use crate::metrics::UPLOADS_TOTAL;
use crate::middleware::AuthUser;
use crate::services::MediaService;
use crate::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use mime::Mime;

const FILE_FIELDS: &[&str] = &["file", "image"];

/// POST /api/v1/uploads/images
pub async fn upload_image(
    state: web::Data<AppState>,
    user: AuthUser,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let store = state
        .images
        .clone()
        .ok_or_else(|| AppError::Unavailable("Image storage is not configured".to_string()))?;
    let max_bytes = state.config.uploads.max_bytes;

    let mut upload: Option<(Vec<u8>, Option<Mime>)> = None;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        let is_file = field.name().map_or(false, |name| FILE_FIELDS.contains(&name));
        if !is_file || upload.is_some() {
            // Drain fields we don't use
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| AppError::BadRequest(format!("Multipart read error: {}", e)))?;
            }
            continue;
        }

        let declared = field.content_type().cloned();
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| AppError::BadRequest(format!("Multipart read error: {}", e)))?;
            if bytes.len() + data.len() > max_bytes {
                UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(AppError::Validation(format!(
                    "File exceeds the {} byte limit",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&data);
        }
        upload = Some((bytes, declared));
    }

    let (bytes, declared) =
        upload.ok_or_else(|| AppError::BadRequest("Missing file field".to_string()))?;

    let image = MediaService::new(store, max_bytes)
        .upload_image(user.user_id, bytes, declared.as_ref())
        .await?;
    Ok(HttpResponse::Created().json(image))
}
