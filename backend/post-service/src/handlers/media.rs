use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// GET /uploads/{post_id}/{file_name}
///
/// Serves a stored image with a content-hash `ETag`; a matching
/// `If-None-Match` gets 304.
pub async fn serve_upload(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse> {
    let (post_id, file_name) = path.into_inner();

    let stored = state
        .media
        .read(post_id, &file_name)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    let etag = crypto_core::hash::content_etag(&stored.data);
    let not_modified = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|tag| tag.trim() == etag))
        .unwrap_or(false);

    if not_modified {
        return Ok(HttpResponse::NotModified()
            .insert_header((header::ETAG, etag))
            .finish());
    }

    Ok(HttpResponse::Ok()
        .content_type(stored.content_type)
        .insert_header((header::ETAG, etag))
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(stored.data))
}
