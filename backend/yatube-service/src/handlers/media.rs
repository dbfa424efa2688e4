use actix_web::{http::header, web, HttpResponse};

use crate::error::{AppError, Result};
use crate::media::content_type_for;
use crate::AppState;

/// GET /media/{path} - stored uploads
pub async fn serve_media(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let path = path.into_inner();
    let bytes = state
        .media
        .read(&path)
        .await?
        .ok_or_else(|| AppError::not_found(format!("/media/{}", path)))?;

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&path))
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(bytes))
}
