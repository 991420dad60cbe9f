use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{PaginationParams, PostUpdate};
use crate::services::media::{ImageUpload, MAX_IMAGES_PER_POST, MAX_IMAGE_BYTES};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(max = 200, message = "title must be at most 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "text must be at most 5000 characters"))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(max = 200, message = "title must be at most 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "text must be at most 5000 characters"))]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(max = 1000, message = "comment must be at most 1000 characters"))]
    pub text: String,
}

/// Blank titles are stored as no title
fn normalize_title(title: String) -> Option<String> {
    let trimmed = title.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// GET /api/posts
pub async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let pagination = query.resolve()?;
    let page = state.post_service().list_posts(pagination).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// POST /api/posts
pub async fn create_post(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let req = body.into_inner();
    let text = super::require_text("text", &req.text)?;

    let post = state
        .post_service()
        .create_post(user.id, req.title.and_then(normalize_title), text)
        .await?;

    Ok(HttpResponse::Created().json(post))
}

/// GET /api/posts/{post_id}
pub async fn get_post(
    state: web::Data<AppState>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = state.post_service().get_post(post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// PUT /api/posts/{post_id}
pub async fn update_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let req = body.into_inner();

    let update = PostUpdate {
        // a blank title clears it
        title: req.title.map(normalize_title),
        text: req
            .text
            .map(|t| super::require_text("text", &t))
            .transpose()?,
    };
    if update.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }

    let post = state
        .post_service()
        .update_post(&user, post_id.into_inner(), update)
        .await?;

    Ok(HttpResponse::Ok().json(post))
}

/// DELETE /api/posts/{post_id}
pub async fn delete_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state
        .post_service()
        .delete_post(&user, post_id.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Post deleted" })))
}

/// POST /api/posts/{post_id}/images (multipart, one image per field)
pub async fn upload_images(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let mut uploads = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let content_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > MAX_IMAGE_BYTES {
                return Err(AppError::Validation(format!(
                    "Image exceeds the {} MiB limit",
                    MAX_IMAGE_BYTES / (1024 * 1024)
                )));
            }
            data.extend_from_slice(&chunk);
        }

        uploads.push(ImageUpload { content_type, data });
        if uploads.len() > MAX_IMAGES_PER_POST {
            return Err(AppError::Validation(format!(
                "A post can carry at most {} images",
                MAX_IMAGES_PER_POST
            )));
        }
    }

    let post = state
        .post_service()
        .add_images(&user, post_id.into_inner(), uploads)
        .await?;

    Ok(HttpResponse::Ok().json(post))
}

/// PUT /api/posts/like/{post_id}
pub async fn toggle_like(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let outcome = state
        .post_service()
        .toggle_like(user.id, post_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// PUT /api/posts/save/{post_id}
pub async fn toggle_save(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let outcome = state
        .post_service()
        .toggle_save(user.id, post_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// POST /api/posts/comment/{post_id}
pub async fn add_comment(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let text = super::require_text("text", &body.text)?;

    let comments = state
        .post_service()
        .add_comment(user.id, post_id.into_inner(), text)
        .await?;

    Ok(HttpResponse::Created().json(comments))
}

/// DELETE /api/posts/comment/{post_id}/{comment_id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comments = state
        .post_service()
        .delete_comment(&user, post_id, comment_id)
        .await?;

    Ok(HttpResponse::Ok().json(comments))
}

/// GET /api/posts/feed
pub async fn get_feed(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let pagination = query.resolve()?;
    let page = state.post_service().feed(user.id, pagination).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/posts/user/{user_id}
pub async fn get_user_posts(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let pagination = query.resolve()?;
    let page = state
        .post_service()
        .user_posts(user_id.into_inner(), pagination)
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/posts/saved
pub async fn get_saved_posts(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let pagination = query.resolve()?;
    let page = state.post_service().saved_posts(user.id, pagination).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/posts/liked
pub async fn get_liked_posts(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let pagination = query.resolve()?;
    let page = state.post_service().liked_posts(user.id, pagination).await?;
    Ok(HttpResponse::Ok().json(page))
}
